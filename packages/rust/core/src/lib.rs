//! Crawl orchestration for devread.
//!
//! This crate binds a source traversal to a bounded [`pool::WorkerPool`] that
//! reconciles every extracted post against a [`devread_shared::PostStore`].

pub mod orchestrator;
pub mod pool;
pub mod reconcile;

pub use orchestrator::{CrawlProgress, CycleSummary, Orchestrator, SilentProgress};
pub use pool::{Job, JobFuture, WorkerPool};
pub use reconcile::{Outcome, ReconcileJob, Tally, TallySnapshot, reconcile};
