//! Remote data source plumbing
//!
//! The pipeline treats its remote source as opaque: a URL goes in, a raw
//! JSON payload or a failure comes out. The [`RemoteFetcher`] trait is the
//! seam tests use to substitute deterministic fetchers.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// An asynchronous data source resolving a URL to a raw JSON payload
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch the payload behind `url`
    async fn fetch(&self, url: &str) -> Result<Value>;
}

/// reqwest-backed fetcher used for configured remote and prefetch sources
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(crate::DEFAULT_TIMEOUT))
    }

    /// Create a fetcher with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("request to {url} returned {status}"));
        }
        Ok(response.json().await?)
    }
}

/// Expand a URL template, replacing the wildcard token with the
/// percent-encoded query
pub fn expand_url(template: &str, wildcard: &str, query: &str) -> String {
    template.replace(wildcard, &urlencoding::encode(query))
}
