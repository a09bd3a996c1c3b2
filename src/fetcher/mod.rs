//! Single-request HTTP GET boundary.
//!
//! Everything above this module talks to the remote API through the
//! [`HttpGet`] trait, so the batch and collector logic can run against an
//! in-memory stub in tests. [`ReqwestFetcher`] is the production client.
//! No retries happen here; callers see every failure.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// A GET-only JSON client.
#[async_trait]
pub trait HttpGet: Send + Sync {
    async fn get_json(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<serde_json::Value, FetchError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Build with a client-level timeout as a backstop to the batch timer.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::Transport(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::Transport(format!("invalid header value: {}", e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl HttpGet for ReqwestFetcher {
    async fn get_json(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .headers(header_map(headers)?)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("{}: {}", url, e)))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(format!("{}: {}", url, e)))?;

        debug!(url = url, "fetched");
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Canned reply for one URL.
    #[derive(Clone)]
    pub enum Reply {
        Json(serde_json::Value),
        Fail(FetchError),
        Delayed(Duration, serde_json::Value),
    }

    /// In-memory [`HttpGet`] keyed by URL. Unknown URLs answer 404.
    #[derive(Default)]
    pub struct StubFetcher {
        replies: HashMap<String, Reply>,
        calls: AtomicUsize,
        seen_headers: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn json(mut self, url: &str, value: serde_json::Value) -> Self {
            self.replies.insert(url.to_string(), Reply::Json(value));
            self
        }

        pub fn fail(mut self, url: &str, error: FetchError) -> Self {
            self.replies.insert(url.to_string(), Reply::Fail(error));
            self
        }

        pub fn delayed(mut self, url: &str, delay: Duration, value: serde_json::Value) -> Self {
            self.replies
                .insert(url.to_string(), Reply::Delayed(delay, value));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn seen_headers(&self) -> Vec<Vec<(String, String)>> {
            self.seen_headers.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpGet for StubFetcher {
        async fn get_json(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<serde_json::Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_headers.lock().unwrap().push(headers.to_vec());
            match self.replies.get(url).cloned() {
                Some(Reply::Json(v)) => Ok(v),
                Some(Reply::Fail(e)) => Err(e),
                Some(Reply::Delayed(d, v)) => {
                    tokio::time::sleep(d).await;
                    Ok(v)
                }
                None => Err(FetchError::Status {
                    status: 404,
                    body: format!("no stub for {}", url),
                }),
            }
        }
    }
}
