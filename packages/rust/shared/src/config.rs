//! Application configuration for devread.
//!
//! User config lives at `~/.devread/devread.toml`.
//! CLI flags override config file values, which override defaults.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DevreadError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "devread.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".devread";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "devread.db";

// ---------------------------------------------------------------------------
// Config structs (matching devread.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Document fetch settings.
    #[serde(default)]
    pub fetch: FetchSection,

    /// Worker pool sizing.
    #[serde(default)]
    pub pool: PoolSection,

    /// Which sources to crawl.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Database path; empty means `~/.devread/devread.db`.
    #[serde(default)]
    pub db_path: String,

    /// Seconds between scheduled crawl cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: String::new(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    360
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    /// Per-document request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override for the User-Agent header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// `[pool]` section. Zero means "derive from the host".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolSection {
    /// Worker count; 0 uses the available parallelism.
    #[serde(default)]
    pub workers: usize,

    /// Submission queue capacity; 0 matches the worker count.
    #[serde(default)]
    pub queue_capacity: usize,
}

/// `[sources]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Names of the sources crawled by `crawl` and `watch`.
    #[serde(default = "default_enabled_sources")]
    pub enabled: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_sources(),
        }
    }
}

fn default_enabled_sources() -> Vec<String> {
    vec![
        "yellowcode".into(),
        "thefullsnack".into(),
        "toidicodedao".into(),
    ]
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout after which a document is abandoned.
    pub timeout: Duration,
    /// User-Agent override.
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            user_agent: config.fetch.user_agent.clone(),
        }
    }
}

/// Runtime worker pool configuration with resolved sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of long-lived workers (at least 1).
    pub workers: usize,
    /// Bounded queue capacity (at least 1).
    pub queue_capacity: usize,
}

impl PoolConfig {
    /// Size a pool from explicit values, falling back to the host's parallelism for zeros.
    pub fn sized(workers: usize, queue_capacity: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            workers
        };
        let queue_capacity = if queue_capacity == 0 {
            workers
        } else {
            queue_capacity
        };
        Self {
            workers,
            queue_capacity,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::sized(0, 0)
    }
}

impl From<&AppConfig> for PoolConfig {
    fn from(config: &AppConfig) -> Self {
        Self::sized(config.pool.workers, config.pool.queue_capacity)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.devread/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DevreadError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.devread/devread.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the database path: explicit config value, else `~/.devread/devread.db`.
pub fn resolve_db_path(config: &AppConfig) -> Result<PathBuf> {
    if config.defaults.db_path.is_empty() {
        Ok(config_dir()?.join(DB_FILE_NAME))
    } else {
        Ok(PathBuf::from(&config.defaults.db_path))
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DevreadError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DevreadError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DevreadError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DevreadError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DevreadError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("interval_secs"));
        assert!(toml_str.contains("timeout_secs"));
        assert!(toml_str.contains("toidicodedao"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.interval_secs, 360);
        assert_eq!(parsed.fetch.timeout_secs, 30);
        assert_eq!(parsed.sources.enabled.len(), 3);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[pool]
workers = 2

[sources]
enabled = ["yellowcode"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pool.workers, 2);
        assert_eq!(config.pool.queue_capacity, 0);
        assert_eq!(config.sources.enabled, vec!["yellowcode".to_string()]);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn pool_config_resolves_zeros() {
        let pool = PoolConfig::sized(0, 0);
        assert!(pool.workers >= 1);
        assert_eq!(pool.queue_capacity, pool.workers);

        let pool = PoolConfig::sized(3, 10);
        assert_eq!(pool.workers, 3);
        assert_eq!(pool.queue_capacity, 10);
    }

    #[test]
    fn fetch_config_from_app_config() {
        let mut app = AppConfig::default();
        app.fetch.timeout_secs = 5;
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.timeout, Duration::from_secs(5));
        assert!(fetch.user_agent.is_none());
    }

    #[test]
    fn explicit_db_path_wins() {
        let mut app = AppConfig::default();
        app.defaults.db_path = "/tmp/posts.db".into();
        assert_eq!(resolve_db_path(&app).unwrap(), PathBuf::from("/tmp/posts.db"));
    }
}
