//! Per-post reconciliation: insert, update, or leave alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, error, info, instrument};

use devread_shared::{IdentityStrategy, Post, PostStore, Result};

use crate::pool::{Job, JobFuture};

/// What a reconciliation did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Decide and perform the single store operation `post` needs.
///
/// - Hash strategy: look up by identity; insert when absent, update when the
///   stored identity differs, otherwise nothing.
/// - Name strategy: look up by name; insert when absent, update when the
///   stored name differs, otherwise nothing.
///
/// Only a lookup that finds nothing leads to an insert; a lookup error is returned as-is.
#[instrument(skip_all, fields(name = post.name(), post_id = post.post_id(), %strategy))]
pub async fn reconcile<S: PostStore>(
    store: &S,
    post: &Post,
    strategy: IdentityStrategy,
) -> Result<Outcome> {
    let existing = match strategy {
        IdentityStrategy::Hash => store.lookup_by_id(post.post_id()).await?,
        IdentityStrategy::Name => store.lookup_by_name(post.name()).await?,
    };

    let Some(existing) = existing else {
        store.insert(post).await?;
        info!("added post");
        return Ok(Outcome::Inserted);
    };

    let changed = match strategy {
        IdentityStrategy::Hash => existing.post_id() != post.post_id(),
        IdentityStrategy::Name => existing.name() != post.name(),
    };

    if changed {
        store.update(post).await?;
        info!("updated post");
        Ok(Outcome::Updated)
    } else {
        debug!("post unchanged");
        Ok(Outcome::Unchanged)
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Outcome counters shared by every job of one crawl cycle.
#[derive(Debug, Default)]
pub struct Tally {
    inserted: AtomicUsize,
    updated: AtomicUsize,
    unchanged: AtomicUsize,
    failed: AtomicUsize,
}

/// Point-in-time copy of a [`Tally`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&self, outcome: Result<Outcome>) {
        let counter = match outcome {
            Ok(Outcome::Inserted) => &self.inserted,
            Ok(Outcome::Updated) => &self.updated,
            Ok(Outcome::Unchanged) => &self.unchanged,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the current counts.
    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            inserted: self.inserted.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Pool job reconciling one post. Failures are logged and counted, never propagated.
pub struct ReconcileJob<S> {
    post: Post,
    strategy: IdentityStrategy,
    store: Arc<S>,
    tally: Arc<Tally>,
}

impl<S> ReconcileJob<S> {
    pub fn new(post: Post, strategy: IdentityStrategy, store: Arc<S>, tally: Arc<Tally>) -> Self {
        Self {
            post,
            strategy,
            store,
            tally,
        }
    }
}

impl<S: PostStore + 'static> Job for ReconcileJob<S> {
    fn execute(self: Box<Self>) -> JobFuture {
        Box::pin(async move {
            let outcome = reconcile(self.store.as_ref(), &self.post, self.strategy).await;
            if let Err(e) = &outcome {
                error!(
                    name = self.post.name(),
                    post_id = self.post.post_id(),
                    error = %e,
                    "reconciliation failed"
                );
            }
            self.tally.record(outcome);
        })
    }
}
