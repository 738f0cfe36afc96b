//! Ratebook FX Engine
//!
//! Exchange rate engine: caches the latest rate table of every provider,
//! converts amounts between currencies even when no provider quotes the pair
//! directly, and keeps the cache fresh from a remote endpoint with an on-disk
//! snapshot as fallback.
//!
//! # Features
//!
//! - Concurrent per-provider rate cache
//! - Bounded multi-hop, multi-provider conversion search
//! - Partial-update payload parsing
//! - Atomic snapshot persistence and startup hydration
//! - "Rates updated" broadcast
//!
//! # Example
//!
//! ```rust,ignore
//! use ratebook_fx::{FxEngine, FxEngineConfig};
//! use ratebook_common::{Currency, ExchangeRateSource};
//!
//! let engine = FxEngine::from_config(FxEngineConfig::from_env())?;
//! engine.load();
//! engine.refresh().await;
//!
//! let eur = engine.convert_minor(100, Currency::USD, Currency::EUR, ExchangeRateSource::Ecb);
//! ```

pub mod cache;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod notifier;
pub mod payload;
pub mod provider;
pub mod store;

pub use cache::{CacheStats, RateCache, SharedRateCache};
pub use config::FxEngineConfig;
pub use conversion::{ConversionEngine, PathResult, DEFAULT_MAX_HOPS};
pub use engine::FxEngine;
pub use error::{FxError, FxResult};
pub use notifier::{RateNotifier, RatesUpdated};
pub use payload::{parse, ParseSummary};
pub use provider::{HttpRateFetcher, RateFetcher};
pub use store::{RateStore, SNAPSHOT_FILE};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateFetcher;
