//! FX engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::conversion::DEFAULT_MAX_HOPS;
use crate::error::{FxError, FxResult};

/// Configuration for the FX engine.
#[derive(Debug, Clone)]
pub struct FxEngineConfig {
    /// Rate endpoint URL.
    pub endpoint_url: String,
    /// Directory holding the rate snapshot.
    pub data_dir: PathBuf,
    /// Bound on a single fetch.
    pub request_timeout: Duration,
    /// Hop budget for conversion searches.
    pub max_hops: usize,
    /// Buffered update events per slow subscriber.
    pub notify_capacity: usize,
}

impl Default for FxEngineConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "https://rates.ratebook.app/v1/exchange-rates".to_string(),
            data_dir: PathBuf::from("./data"),
            request_timeout: Duration::from_secs(20),
            max_hops: DEFAULT_MAX_HOPS,
            notify_capacity: 16,
        }
    }
}

impl FxEngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("RATEBOOK_URL") {
            config.endpoint_url = url;
        }

        if let Ok(dir) = std::env::var("RATEBOOK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = std::env::var("RATEBOOK_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(hops) = std::env::var("RATEBOOK_MAX_HOPS") {
            if let Ok(hops) = hops.parse() {
                config.max_hops = hops;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        if self.endpoint_url.trim().is_empty() {
            return Err(FxError::InvalidConfig("Endpoint URL cannot be empty".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(FxError::InvalidConfig("Request timeout cannot be 0".to_string()));
        }

        if self.notify_capacity == 0 {
            return Err(FxError::InvalidConfig(
                "Notification capacity cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}
