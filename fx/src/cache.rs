//! Per-provider rate table cache.

use dashmap::DashMap;
use ratebook_common::{ExchangeRateSource, RateTable};
use std::sync::Arc;
use tracing::debug;

/// Thread-safe cache holding the latest rate table of each provider.
///
/// Tables are swapped whole behind an `Arc`, so a reader either sees the old
/// table or the new one, never a mix. There is no expiry; freshness is driven
/// by how often the engine refreshes.
pub struct RateCache {
    tables: DashMap<ExchangeRateSource, Arc<RateTable>>,
}

impl RateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Get the last stored table for a source.
    pub fn get(&self, source: ExchangeRateSource) -> Option<Arc<RateTable>> {
        let table = self.tables.get(&source).map(|entry| Arc::clone(entry.value()));
        if table.is_none() {
            debug!(source = %source, "Cache miss");
        }
        table
    }

    /// Replace the table stored for a source.
    pub fn set(&self, source: ExchangeRateSource, table: RateTable) {
        debug!(source = %source, rates = table.len(), "Replacing rate table");
        self.tables.insert(source, Arc::new(table));
    }

    /// Sources that currently have a table, in id order.
    pub fn sources(&self) -> Vec<ExchangeRateSource> {
        let mut sources: Vec<_> = self.tables.iter().map(|e| *e.key()).collect();
        sources.sort();
        sources
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Drop every cached table.
    pub fn clear(&self) {
        self.tables.clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let tables = self.tables.len();
        let rates = self.tables.iter().map(|e| e.value().len()).sum();

        CacheStats { tables, rates }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub tables: usize,
    pub rates: usize,
}

/// Shared rate cache.
pub type SharedRateCache = Arc<RateCache>;
