//! Remote source access: the GET seam and the chapter-level operations on
//! top of it.
//!
//! Every network operation in the crate goes through [`HttpSource`], so the
//! resolver, the prober and the fetch pipeline can run against a fake in tests.

#[cfg(test)]
pub(crate) mod fake;
mod prober;
mod resolver;

pub use prober::PageProber;
pub use resolver::{ChapterResolver, extract_routing_token};

use crate::config::SourceConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP GET operations used against the remote service.
///
/// Only an exact `200 OK` counts as success; every other status is
/// reported as [`FetchError::Status`].
#[async_trait]
pub trait HttpSource: Send + Sync {
    /// Fetches a page body as text.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetches a body as raw bytes.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Checks that a resource exists without keeping its body.
    async fn probe(&self, url: &str) -> Result<(), FetchError>;
}

/// [`HttpSource`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: reqwest::Client,
}

impl ReqwestSource {
    /// Creates a source with a client built from the given configuration.
    pub fn new(config: &SourceConfig, max_connections: usize) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_http_client(config, max_connections)?,
        })
    }

    async fn get_ok(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpSource for ReqwestSource {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.get_ok(url).await?.text().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(self.get_ok(url).await?.bytes().await?.to_vec())
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.get_ok(url).await.map(drop)
    }
}

/// Common HTTP client configuration.
///
/// Idle connections per host are capped at `max_connections`; the number of
/// requests in flight is bounded by the fetch pipeline itself.
pub fn create_http_client(
    config: &SourceConfig,
    max_connections: usize,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .cookie_store(true)
        .timeout(Duration::from_secs(config.request_timeout_sec))
        .pool_max_idle_per_host(max_connections)
        .build()
}
