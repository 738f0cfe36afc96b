//! Rate payload fetchers.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// Source of raw rate payloads.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Get the fetcher name, for logging.
    fn name(&self) -> &str;

    /// Fetch one raw payload. An empty body is a transport failure.
    async fn fetch(&self) -> FxResult<Vec<u8>>;
}

/// Fetches the rate payload with a single HTTP GET.
pub struct HttpRateFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpRateFetcher {
    /// Create a fetcher for `url` bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, url, timeout))
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn get(&self) -> FxResult<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::Transport(format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        if body.is_empty() {
            return Err(FxError::Transport("empty response body".to_string()));
        }

        debug!(url = %self.url, bytes = body.len(), "Fetched rate payload");
        Ok(body.to_vec())
    }

    fn map_error(&self, e: reqwest::Error) -> FxError {
        if e.is_timeout() {
            FxError::Timeout(self.timeout)
        } else {
            FxError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn fetch(&self) -> FxResult<Vec<u8>> {
        // The client timeout covers each request phase; this bounds the whole call.
        tokio::time::timeout(self.timeout, self.get())
            .await
            .map_err(|_| FxError::Timeout(self.timeout))?
    }
}

/// Mock fetcher for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateFetcher {
    responses: parking_lot::Mutex<std::collections::VecDeque<FxResult<Vec<u8>>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateFetcher {
    /// Create a mock with no queued responses; fetching fails until one is pushed.
    pub fn new() -> Self {
        Self {
            responses: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Queue a successful payload.
    pub fn push_payload(&self, payload: impl Into<Vec<u8>>) {
        self.responses.lock().push_back(Ok(payload.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: FxError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockRateFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateFetcher for MockRateFetcher {
    fn name(&self) -> &str {
        "MOCK"
    }

    async fn fetch(&self) -> FxResult<Vec<u8>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FxError::Transport("no response queued".to_string())))
    }
}
