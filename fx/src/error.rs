//! FX engine error types.

use std::time::Duration;

use ratebook_common::{Currency, ExchangeRateSource};
use thiserror::Error;

/// Errors that can occur in the FX engine.
///
/// None of these are fatal: callers log them and keep serving whatever is
/// already cached.
#[derive(Debug, Error)]
pub enum FxError {
    /// The rate endpoint could not be reached or returned no usable body.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The rate endpoint did not answer in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The payload is not valid JSON or lacks a success indicator.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Reading or writing the rate snapshot failed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// No conversion path exists within the hop budget.
    #[error("No conversion available for {from}/{to} via {provider}")]
    ConversionUnavailable {
        from: Currency,
        to: Currency,
        provider: ExchangeRateSource,
    },

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

impl FxError {
    /// Whether a later attempt of the same operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FxError::Transport(_) | FxError::Timeout(_) | FxError::Persistence(_)
        )
    }
}

impl From<std::io::Error> for FxError {
    fn from(e: std::io::Error) -> Self {
        FxError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for FxError {
    fn from(e: serde_json::Error) -> Self {
        FxError::MalformedPayload(e.to_string())
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
