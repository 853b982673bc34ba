//! The persistence port the ingestion pipeline depends on.
//!
//! A lookup returns `Ok(None)` when nothing is stored under the key. That is
//! the normal "not found" signal and drives the insert path; `Err` is reserved
//! for genuine query or connectivity failures.

use std::future::Future;

use crate::error::Result;
use crate::types::Post;

/// Lookup, insert and update operations over persisted posts.
///
/// Implementations must tolerate concurrent calls for different keys; the
/// pipeline does no locking of its own.
pub trait PostStore: Send + Sync {
    /// Find the post stored under `post_id`.
    fn lookup_by_id(&self, post_id: &str) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// Find a post stored under `name`.
    fn lookup_by_name(&self, name: &str) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// Persist a new post and return the stored copy.
    fn insert(&self, post: &Post) -> impl Future<Output = Result<Post>> + Send;

    /// Overwrite the stored copy of `post` and return it.
    fn update(&self, post: &Post) -> impl Future<Output = Result<Post>> + Send;
}
