//! Crawl cycle: one adapter traversal bound to one worker pool lifecycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use devread_crawler::{Collector, DocumentFetcher, SourceAdapter};
use devread_shared::{PoolConfig, PostStore};

use crate::pool::WorkerPool;
use crate::reconcile::{ReconcileJob, Tally};

/// Result of one crawl cycle, reported through [`CrawlProgress::done`].
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// Source name.
    pub source: String,
    /// Documents fetched successfully.
    pub documents_visited: usize,
    /// Documents whose fetch failed.
    pub documents_failed: usize,
    /// Records handed to reconciliation.
    pub extracted: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Records whose lookup or write failed.
    pub failed: usize,
    /// Total cycle time.
    pub elapsed: Duration,
}

/// Progress callback for reporting crawl status.
pub trait CrawlProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the cycle's pool has drained.
    fn done(&self, summary: &CycleSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &CycleSummary) {}
}

/// Runs crawl cycles against a store using explicit fetch and pool settings.
pub struct Orchestrator<F, S> {
    collector: Collector<F>,
    store: Arc<S>,
    pool: PoolConfig,
}

impl<F, S> Orchestrator<F, S>
where
    F: DocumentFetcher,
    S: PostStore + 'static,
{
    pub fn new(fetcher: F, store: Arc<S>, pool: PoolConfig) -> Self {
        Self {
            collector: Collector::new(fetcher),
            store,
            pool,
        }
    }

    /// Run one crawl cycle for `adapter`.
    ///
    /// Traverses every document, then reconciles the batch on a fresh pool
    /// that is always stopped before returning. Nothing is returned: the
    /// outcome is visible through logs, the store and `progress`.
    #[instrument(skip_all, fields(source = adapter.name()))]
    pub async fn crawl(&self, adapter: &dyn SourceAdapter, progress: &dyn CrawlProgress) {
        let start = Instant::now();

        progress.phase(&format!("Crawling {}", adapter.name()));
        let batch = self.collector.collect(adapter).await;

        progress.phase(&format!(
            "Reconciling {} posts from {}",
            batch.posts.len(),
            batch.source
        ));

        let tally = Arc::new(Tally::default());
        let mut pool = WorkerPool::new(self.pool);
        let extracted = batch.posts.len();

        match pool.start() {
            Ok(()) => {
                for post in batch.posts {
                    let job = ReconcileJob::new(
                        post,
                        batch.strategy,
                        Arc::clone(&self.store),
                        Arc::clone(&tally),
                    );
                    if let Err(e) = pool.submit(job).await {
                        error!(error = %e, "job submission failed, abandoning remaining posts");
                        break;
                    }
                }
                if let Err(e) = pool.stop().await {
                    error!(error = %e, "worker pool failed to stop");
                }
            }
            Err(e) => error!(error = %e, "worker pool failed to start"),
        }

        let counts = tally.snapshot();
        let summary = CycleSummary {
            source: batch.source,
            documents_visited: batch.documents_visited,
            documents_failed: batch.failures.len(),
            extracted,
            inserted: counts.inserted,
            updated: counts.updated,
            unchanged: counts.unchanged,
            failed: counts.failed,
            elapsed: start.elapsed(),
        };

        info!(
            visited = summary.documents_visited,
            fetch_failures = summary.documents_failed,
            extracted = summary.extracted,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "crawl cycle complete"
        );
        progress.done(&summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::tests::MemoryStore;
    use devread_crawler::{HttpFetcher, ThefullsnackAdapter};
    use devread_shared::{FetchConfig, Post};
    use std::sync::Mutex;
    use url::Url;

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        summary: Mutex<Option<CycleSummary>>,
    }

    impl CrawlProgress for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn done(&self, summary: &CycleSummary) {
            *self.summary.lock().unwrap() = Some(summary.clone());
        }
    }

    fn orchestrator(store: Arc<MemoryStore>) -> Orchestrator<HttpFetcher, MemoryStore> {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        Orchestrator::new(
            fetcher,
            store,
            PoolConfig {
                workers: 2,
                queue_capacity: 2,
            },
        )
    }

    async fn serve_home(server: &wiremock::MockServer, body: &str) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    const HOME: &str = r#"<html><body>
        <div class="home-list-item"><a href="/posts/intro-to-x.html">Intro to X</a><span>12-03-2021python</span></div>
        <div class="home-list-item"><a href="/posts/guide-to-y.html">Guide to Y</a><span>01-02-2020web</span></div>
        <div class="home-list-item"><a href="/posts/untitled.html"></a></div>
    </body></html>"#;

    #[tokio::test]
    async fn cycle_inserts_new_posts_and_skips_stored_ones() {
        let server = wiremock::MockServer::start().await;
        serve_home(&server, HOME).await;

        let guide = Post::new(
            "Guide to Y",
            &format!("{}/posts/guide-to-y.html", server.uri()),
            vec!["web".into()],
        )
        .unwrap();
        let store = Arc::new(MemoryStore::with_posts([guide]));
        let adapter = ThefullsnackAdapter::with_base(Url::parse(&server.uri()).unwrap());
        let progress = RecordingProgress::default();

        orchestrator(Arc::clone(&store))
            .crawl(&adapter, &progress)
            .await;

        assert_eq!(store.writes(), (1, 0));
        assert_eq!(store.names(), vec!["Guide to Y", "Intro to X"]);

        let summary = progress.summary.lock().unwrap().clone().unwrap();
        assert_eq!(summary.source, "thefullsnack");
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(progress.phases.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_cycle_is_a_no_op() {
        let server = wiremock::MockServer::start().await;
        serve_home(&server, HOME).await;

        let store = Arc::new(MemoryStore::default());
        let adapter = ThefullsnackAdapter::with_base(Url::parse(&server.uri()).unwrap());
        let orchestrator = orchestrator(Arc::clone(&store));

        orchestrator.crawl(&adapter, &SilentProgress).await;
        orchestrator.crawl(&adapter, &SilentProgress).await;

        assert_eq!(store.writes(), (2, 0));
    }

    #[tokio::test]
    async fn store_failures_are_counted_not_fatal() {
        let server = wiremock::MockServer::start().await;
        serve_home(&server, HOME).await;

        let store = Arc::new(MemoryStore::failing_lookups());
        let adapter = ThefullsnackAdapter::with_base(Url::parse(&server.uri()).unwrap());
        let progress = RecordingProgress::default();

        orchestrator(Arc::clone(&store))
            .crawl(&adapter, &progress)
            .await;

        let summary = progress.summary.lock().unwrap().clone().unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.inserted, 0);
        assert_eq!(store.writes(), (0, 0));
    }

    #[tokio::test]
    async fn empty_batch_still_completes_the_cycle() {
        let server = wiremock::MockServer::start().await;
        let store = Arc::new(MemoryStore::default());
        let adapter = ThefullsnackAdapter::with_base(Url::parse(&server.uri()).unwrap());
        let progress = RecordingProgress::default();

        orchestrator(Arc::clone(&store))
            .crawl(&adapter, &progress)
            .await;

        let summary = progress.summary.lock().unwrap().clone().unwrap();
        assert_eq!(summary.extracted, 0);
        assert_eq!(summary.documents_failed, 1);
        assert_eq!(store.writes(), (0, 0));
    }
}
