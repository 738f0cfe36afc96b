//! Main FX engine implementation.

use std::sync::Arc;

use chrono::Utc;
use ratebook_common::{Currency, ExchangeRateSource, RateTable};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, RateCache, SharedRateCache};
use crate::config::FxEngineConfig;
use crate::conversion::ConversionEngine;
use crate::error::{FxError, FxResult};
use crate::notifier::{RateNotifier, RatesUpdated};
use crate::payload::{self, ParseSummary};
use crate::provider::{HttpRateFetcher, RateFetcher};
use crate::store::RateStore;

/// The main FX engine.
///
/// Owns the rate cache and everything that feeds it. Conversions only take
/// the cache's shard locks for the duration of a lookup, so they never wait
/// on a refresh that is fetching or persisting.
pub struct FxEngine {
    cache: SharedRateCache,
    conversion: ConversionEngine,
    fetcher: Arc<dyn RateFetcher>,
    store: RateStore,
    notifier: RateNotifier,
    refresh_lock: Mutex<()>,
    config: FxEngineConfig,
}

impl FxEngine {
    /// Create a new FX engine with the given fetcher.
    pub fn new(config: FxEngineConfig, fetcher: Arc<dyn RateFetcher>) -> Self {
        let cache = Arc::new(RateCache::new());
        Self {
            conversion: ConversionEngine::new(Arc::clone(&cache)).with_max_hops(config.max_hops),
            cache,
            fetcher,
            store: RateStore::new(&config.data_dir),
            notifier: RateNotifier::new(config.notify_capacity),
            refresh_lock: Mutex::new(()),
            config,
        }
    }

    /// Create an engine fetching over HTTP from the configured endpoint.
    pub fn from_config(config: FxEngineConfig) -> FxResult<Self> {
        config.validate()?;
        let fetcher = HttpRateFetcher::new(config.endpoint_url.clone(), config.request_timeout)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &FxEngineConfig {
        &self.config
    }

    /// The shared rate cache.
    pub fn cache(&self) -> &SharedRateCache {
        &self.cache
    }

    pub fn store(&self) -> &RateStore {
        &self.store
    }

    /// Latest rate table of a source, if any was loaded.
    pub fn exchange_rates(&self, source: ExchangeRateSource) -> Option<Arc<RateTable>> {
        self.cache.get(source)
    }

    /// Convert a major-unit amount.
    pub fn convert(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
        source: ExchangeRateSource,
    ) -> Option<f64> {
        self.conversion.convert(amount, from, to, source)
    }

    /// Convert an integer minor-unit amount.
    pub fn convert_minor(
        &self,
        amount: i64,
        from: Currency,
        to: Currency,
        source: ExchangeRateSource,
    ) -> Option<i64> {
        self.conversion.convert_minor(amount, from, to, source)
    }

    /// Like [`convert`](Self::convert), reporting a missing path as an error.
    pub fn try_convert(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
        source: ExchangeRateSource,
    ) -> FxResult<f64> {
        self.convert(amount, from, to, source)
            .ok_or(FxError::ConversionUnavailable {
                from,
                to,
                provider: source,
            })
    }

    /// Subscribe to "rates updated" events.
    pub fn subscribe(&self) -> broadcast::Receiver<RatesUpdated> {
        self.notifier.subscribe()
    }

    /// Register a callback run after every successful refresh.
    pub fn on_rates_updated<F>(&self, observer: F)
    where
        F: Fn(&RatesUpdated) + Send + Sync + 'static,
    {
        self.notifier.observe(observer);
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Hydrate the cache from the on-disk snapshot.
    ///
    /// Returns whether a snapshot was found and parsed. Failures are logged
    /// and leave the cache as it was.
    pub fn load(&self) -> bool {
        let raw = match self.store.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(path = %self.store.path().display(), "No rate snapshot to load");
                return false;
            }
            Err(e) => {
                warn!(error = %e, path = %self.store.path().display(), "Failed to read rate snapshot");
                return false;
            }
        };

        match payload::parse(&raw, &self.cache) {
            Ok(summary) => {
                info!(sources = ?summary.updated, "Loaded rate snapshot");
                true
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable rate snapshot");
                false
            }
        }
    }

    /// Fetch, parse, persist, and announce a new rate payload.
    ///
    /// Returns `None` when the refresh was abandoned: another refresh is in
    /// flight, the fetch failed, or the payload was rejected. In every such
    /// case the cache keeps its current tables.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Option<ParseSummary> {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            debug!("Refresh already in flight");
            return None;
        };

        let raw = match self.fetcher.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(fetcher = self.fetcher.name(), error = %e, "Rate fetch failed, keeping cached rates");
                return None;
            }
        };

        let summary = match payload::parse(&raw, &self.cache) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Rejected rate payload, keeping cached rates");
                return None;
            }
        };

        // The cache is already updated; a failed write only leaves disk stale.
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.persist(&raw)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to persist rate snapshot"),
            Err(e) => warn!(error = %e, "Rate snapshot task failed"),
        }

        info!(
            updated = ?summary.updated,
            unchanged = ?summary.unchanged,
            skipped_rates = summary.skipped_rates,
            "Exchange rates refreshed"
        );

        self.notifier.notify(RatesUpdated {
            sources: summary.updated.clone(),
            at: Utc::now(),
        });

        Some(summary)
    }

    /// Start a refresh in the background.
    pub fn update_exchange_rates(self: &Arc<Self>) -> JoinHandle<Option<ParseSummary>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.refresh().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockRateFetcher;
    use async_trait::async_trait;
    use ratebook_common::ExchangeRate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::Notify;

    fn payload() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "code": 1,
            "2": { "rates": [ { "from": "USD", "to": "EUR", "rate": 0.9 } ] },
            "1": { "rates": [ { "from": "EUR", "to": "JPY", "rate": 130.0 } ] },
            "3": { "rates": [ { "from": "BTC", "to": "USD", "rate": 64000.0 } ] }
        }))
        .unwrap()
    }

    fn setup_engine(dir: &TempDir) -> (FxEngine, Arc<MockRateFetcher>) {
        let config = FxEngineConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let fetcher = Arc::new(MockRateFetcher::new());
        (FxEngine::new(config, fetcher.clone()), fetcher)
    }

    fn rates_of(engine: &FxEngine, source: ExchangeRateSource) -> Vec<ExchangeRate> {
        engine
            .exchange_rates(source)
            .map(|t| t.rates().to_vec())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_refresh_updates_persists_and_notifies() {
        let dir = TempDir::new().unwrap();
        let (engine, fetcher) = setup_engine(&dir);
        fetcher.push_payload(payload());
        let mut rx = engine.subscribe();

        let summary = engine.refresh().await.unwrap();

        assert_eq!(
            summary.updated,
            vec![
                ExchangeRateSource::Ecb,
                ExchangeRateSource::Fixer,
                ExchangeRateSource::Coinbase
            ]
        );
        assert_eq!(engine.stats(), CacheStats { tables: 3, rates: 3 });
        assert_eq!(engine.store().read().unwrap(), Some(payload()));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.sources, summary.updated);
    }

    #[tokio::test]
    async fn test_convert_after_refresh() {
        let dir = TempDir::new().unwrap();
        let (engine, fetcher) = setup_engine(&dir);
        fetcher.push_payload(payload());
        engine.refresh().await.unwrap();

        assert_eq!(
            engine.convert_minor(100, Currency::USD, Currency::EUR, ExchangeRateSource::Fixer),
            Some(90)
        );

        let jpy = engine
            .convert(1.0, Currency::USD, Currency::JPY, ExchangeRateSource::Fixer)
            .unwrap();
        assert!((jpy - 117.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_cache() {
        let dir = TempDir::new().unwrap();
        let (engine, fetcher) = setup_engine(&dir);
        fetcher.push_payload(payload());
        engine.refresh().await.unwrap();
        let before = rates_of(&engine, ExchangeRateSource::Ecb);

        let mut rx = engine.subscribe();
        fetcher.push_error(FxError::Transport("connection reset".to_string()));

        assert!(engine.refresh().await.is_none());
        assert_eq!(rates_of(&engine, ExchangeRateSource::Ecb), before);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_failure_code_is_not_cached_or_persisted() {
        let dir = TempDir::new().unwrap();
        let (engine, fetcher) = setup_engine(&dir);
        let failed = serde_json::to_vec(&json!({
            "code": 0,
            "1": { "rates": [ { "from": "USD", "to": "EUR", "rate": 0.9 } ] }
        }))
        .unwrap();
        fetcher.push_payload(failed);

        assert!(engine.refresh().await.is_none());
        assert!(engine.cache().is_empty());
        assert_eq!(engine.store().read().unwrap(), None);
    }

    #[tokio::test]
    async fn test_persist_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let (engine, fetcher) = setup_engine(&dir);
        fetcher.push_payload(payload());
        engine.refresh().await.unwrap();

        let (restarted, _) = setup_engine(&dir);
        assert!(restarted.load());

        let direct = RateCache::new();
        payload::parse(&payload(), &direct).unwrap();

        assert_eq!(restarted.cache().sources(), direct.sources());
        for source in direct.sources() {
            assert_eq!(
                rates_of(&restarted, source),
                direct.get(source).unwrap().rates().to_vec()
            );
        }
    }

    #[test]
    fn test_load_without_snapshot() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = setup_engine(&dir);

        assert!(!engine.load());
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn test_load_corrupt_snapshot() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = setup_engine(&dir);
        std::fs::write(engine.store().path(), b"{\"code\": 1, \"1\": ").unwrap();

        assert!(!engine.load());
        assert!(engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_roll_back() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let config = FxEngineConfig {
            data_dir: blocker.join("data"),
            ..Default::default()
        };
        let fetcher = Arc::new(MockRateFetcher::new());
        fetcher.push_payload(payload());
        let engine = FxEngine::new(config, fetcher);

        assert!(engine.refresh().await.is_some());
        assert_eq!(engine.cache().len(), 3);
    }

    #[tokio::test]
    async fn test_background_update_notifies_observers() {
        let dir = TempDir::new().unwrap();
        let (engine, fetcher) = setup_engine(&dir);
        fetcher.push_payload(payload());
        let engine = Arc::new(engine);

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        engine.on_rates_updated(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let summary = engine.update_exchange_rates().await.unwrap();

        assert!(summary.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_convert_unavailable() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = setup_engine(&dir);

        let result = engine.try_convert(1.0, Currency::USD, Currency::EUR, ExchangeRateSource::Ecb);
        assert!(matches!(
            result,
            Err(FxError::ConversionUnavailable {
                provider: ExchangeRateSource::Ecb,
                ..
            })
        ));
    }

    /// Holds its fetch open until released.
    struct GatedFetcher {
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateFetcher for GatedFetcher {
        fn name(&self) -> &str {
            "GATED"
        }

        async fn fetch(&self) -> FxResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(payload())
        }
    }

    #[tokio::test]
    async fn test_single_refresh_in_flight() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(GatedFetcher {
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let config = FxEngineConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let engine = Arc::new(FxEngine::new(config, fetcher.clone()));

        let first = engine.update_exchange_rates();
        while fetcher.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // Conversions and a second refresh do not wait on the pending fetch.
        assert!(engine
            .convert(1.0, Currency::USD, Currency::EUR, ExchangeRateSource::Ecb)
            .is_none());
        let second = tokio::time::timeout(Duration::from_secs(1), engine.refresh())
            .await
            .unwrap();
        assert!(second.is_none());

        fetcher.release.notify_one();
        assert!(first.await.unwrap().is_some());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
