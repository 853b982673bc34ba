//! Document fetching, per-site source adapters, and the traversal engine.
//!
//! This crate provides:
//! - [`fetch`]: the [`DocumentFetcher`] seam and its reqwest implementation
//! - [`adapters`]: site-specific extraction rules and the [`SourceRegistry`]
//! - [`engine`]: the [`Collector`] that turns an adapter run into a [`Batch`]

pub mod adapters;
pub mod engine;
pub mod fetch;

pub use adapters::{
    PostDraft, SourceAdapter, SourceRegistry, ThefullsnackAdapter, ToidicodedaoAdapter,
    YellowcodeAdapter, split_tag_phrase,
};
pub use engine::{Batch, Collector};
pub use fetch::{DocumentFetcher, HttpFetcher};
