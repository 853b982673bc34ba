//! Document fetching.
//!
//! [`DocumentFetcher`] is the transport seam the traversal engine depends on;
//! [`HttpFetcher`] is the reqwest-backed implementation.

use std::future::Future;

use reqwest::Client;
use tracing::debug;
use url::Url;

use devread_shared::{DevreadError, FetchConfig, Result};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("devread/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw HTML body of a document.
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `url` and return its body. Non-success statuses and timeouts are errors.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String>> + Send;
}

/// HTTP fetcher with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher from the runtime fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or(USER_AGENT);
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| DevreadError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching document");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| DevreadError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DevreadError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| DevreadError::Network(format!("{url}: body read failed: {e}")))
    }
}
