//! Sequential traversal engine.
//!
//! The [`Collector`] visits an adapter's listing documents one at a time,
//! follows each draft's detail document when it names one, and accumulates
//! finished posts into a [`Batch`]. Fetch failures are logged and skipped;
//! they never end the traversal.

use std::time::Instant;

use scraper::Html;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use devread_shared::{IdentityStrategy, Post};

use crate::adapters::{PostDraft, SourceAdapter};
use crate::fetch::DocumentFetcher;

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Everything one traversal produced, handed off once all documents were visited.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Adapter name.
    pub source: String,
    /// Identity strategy the source's posts reconcile with.
    pub strategy: IdentityStrategy,
    /// Finished posts, in extraction order.
    pub posts: Vec<Post>,
    /// Documents fetched successfully (listings and detail pages).
    pub documents_visited: usize,
    /// Documents whose fetch failed (URL, error message).
    pub failures: Vec<(String, String)>,
    /// Drafts dropped for a missing name or link.
    pub drafts_dropped: usize,
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Drives a [`SourceAdapter`] over its documents using a [`DocumentFetcher`].
pub struct Collector<F> {
    fetcher: F,
}

impl<F: DocumentFetcher> Collector<F> {
    /// Create a collector around a fetcher.
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Visit every location of `adapter` and return the accumulated batch.
    #[instrument(skip_all, fields(source = adapter.name()))]
    pub async fn collect(&self, adapter: &dyn SourceAdapter) -> Batch {
        let start = Instant::now();
        let locations = adapter.locations();
        let mut batch = Batch {
            source: adapter.name().to_string(),
            strategy: adapter.strategy(),
            posts: Vec::new(),
            documents_visited: 0,
            failures: Vec::new(),
            drafts_dropped: 0,
        };

        info!(documents = locations.len(), "starting traversal");

        for url in &locations {
            let drafts = match self.fetcher.fetch(url).await {
                Ok(body) => {
                    batch.documents_visited += 1;
                    let doc = Html::parse_document(&body);
                    adapter.extract(&doc, url)
                }
                Err(e) => {
                    warn!(%url, error = %e, "listing fetch failed, skipping");
                    batch.failures.push((url.to_string(), e.to_string()));
                    continue;
                }
            };

            debug!(%url, drafts = drafts.len(), "extracted drafts");

            for mut draft in drafts {
                if let Some(detail) = draft.detail_url.take() {
                    self.visit_detail(adapter, &detail, &mut draft, &mut batch)
                        .await;
                }
                match draft.finish() {
                    Some(post) => batch.posts.push(post),
                    None => {
                        trace!(%url, "dropping draft without name or link");
                        batch.drafts_dropped += 1;
                    }
                }
            }
        }

        info!(
            posts = batch.posts.len(),
            visited = batch.documents_visited,
            failed = batch.failures.len(),
            dropped = batch.drafts_dropped,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "traversal complete"
        );
        batch
    }

    /// Fetch a draft's detail document and let the adapter amend the draft in place.
    async fn visit_detail(
        &self,
        adapter: &dyn SourceAdapter,
        detail: &Url,
        draft: &mut PostDraft,
        batch: &mut Batch,
    ) {
        match self.fetcher.fetch(detail).await {
            Ok(body) => {
                batch.documents_visited += 1;
                let doc = Html::parse_document(&body);
                adapter.amend(&doc, draft);
            }
            Err(e) => {
                warn!(url = %detail, error = %e, "detail fetch failed, keeping listing fields");
                batch.failures.push((detail.to_string(), e.to_string()));
            }
        }
    }
}
