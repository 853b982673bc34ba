//! Shared types, error model, and configuration for devread.
//!
//! This crate is the foundation depended on by all other devread crates.
//! It provides:
//! - [`DevreadError`]: the unified error type
//! - Domain types ([`Post`], [`IdentityStrategy`])
//! - The [`PostStore`] persistence port
//! - Configuration ([`AppConfig`], [`FetchConfig`], [`PoolConfig`], config loading)

pub mod config;
pub mod error;
pub mod store;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, FetchSection, PoolConfig, PoolSection,
    SourcesConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_db_path,
};
pub use error::{DevreadError, Result};
pub use store::PostStore;
pub use types::{IdentityStrategy, Post, normalize_tag, post_identity};
