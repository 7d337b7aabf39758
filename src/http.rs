//! HTTP GET client for the feed.
//!
//! The [`HttpClient`] trait is the seam the cache and service talk to; tests
//! swap in scripted fakes, the binary uses [`ReqwestClient`].

use crate::error::QueryError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `path` (relative to the client's base URL) and parse the body as JSON.
    async fn get_json(&self, path: &str) -> Result<Value, QueryError>;
}

/// reqwest-backed client with a hard per-request timeout.
///
/// The timeout covers connect, headers and body; when it fires the request is
/// dropped and the call resolves to [`QueryError::Network`].
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .user_agent(concat!("ddx/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_json(&self, path: &str) -> Result<Value, QueryError> {
        let url = self.url(path);
        log::debug!("[http] GET {url}");

        let res = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = res.status();
        if !status.is_success() {
            log::warn!("[http] GET {url} -> {status}");
            return Err(QueryError::HttpStatus {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = res.bytes().await.map_err(|e| transport_error(&url, e))?;
        serde_json::from_slice(&body).map_err(|e| {
            log::warn!("[http] GET {url}: body is not JSON: {e}");
            QueryError::Decode(format!("{path}: {e}"))
        })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> QueryError {
    let what = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    log::warn!("[http] GET {url} {what}: {e}");
    QueryError::Network(format!("{what}: {e}"))
}
