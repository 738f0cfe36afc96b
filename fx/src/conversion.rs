//! Multi-hop currency conversion over cached rate tables.

use std::collections::HashSet;

use ratebook_common::{Currency, ExchangeRateSource};
use tracing::{debug, instrument};

use crate::cache::SharedRateCache;

/// Default bound on how deep the fallback search may go.
pub const DEFAULT_MAX_HOPS: usize = 5;

/// Outcome of a conversion path search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathResult {
    /// A path was found. `hops` counts the currency or provider substitutions taken.
    Found { amount: f64, hops: usize },
    /// No path within the hop budget.
    NotFound,
}

impl PathResult {
    /// The converted amount, if a path was found.
    pub fn amount(self) -> Option<f64> {
        match self {
            PathResult::Found { amount, .. } => Some(amount),
            PathResult::NotFound => None,
        }
    }
}

/// Search state: convert `amount` of `from` into `to` using `source`'s table.
#[derive(Debug, Clone, Copy)]
struct Hop {
    amount: f64,
    from: Currency,
    to: Currency,
    source: ExchangeRateSource,
    depth: usize,
}

enum Step {
    Found(f64),
    Next(Hop),
    NotFound,
}

/// Converts amounts using the cached rate tables.
///
/// When the requested source has no quote for a pair, the engine pivots
/// through the source's main currencies and falls back to the canonical fiat
/// or crypto provider, up to `max_hops` substitutions deep.
#[derive(Clone)]
pub struct ConversionEngine {
    cache: SharedRateCache,
    max_hops: usize,
}

impl ConversionEngine {
    /// Create a conversion engine over a shared cache.
    pub fn new(cache: SharedRateCache) -> Self {
        Self {
            cache,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Override the hop budget.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Convert a major-unit amount from `from` to `to`, preferring `source`.
    pub fn convert(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
        source: ExchangeRateSource,
    ) -> Option<f64> {
        self.find_path(amount, from, to, source, self.max_hops).amount()
    }

    /// Convert an integer minor-unit amount.
    ///
    /// Intermediate hops run in floating point; the result is truncated to
    /// `to`'s minor unit once, at the end.
    pub fn convert_minor(
        &self,
        amount: i64,
        from: Currency,
        to: Currency,
        source: ExchangeRateSource,
    ) -> Option<i64> {
        if from == to {
            return Some(amount);
        }
        let converted = self.convert(from.to_major_units(amount), from, to, source)?;
        to.to_minor_units(converted)
    }

    /// Effective rate for one unit of `from`.
    pub fn quote(&self, from: Currency, to: Currency, source: ExchangeRateSource) -> Option<f64> {
        self.convert(1.0, from, to, source)
    }

    /// Search for a conversion path with an explicit hop budget.
    ///
    /// Identical currencies convert to the same amount without consulting any
    /// table. A step evaluated at depth `d` requires `d < max_hops`.
    #[instrument(level = "debug", skip(self))]
    pub fn find_path(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
        source: ExchangeRateSource,
        max_hops: usize,
    ) -> PathResult {
        if from == to {
            return PathResult::Found { amount, hops: 0 };
        }

        let mut hop = Hop {
            amount,
            from,
            to,
            source,
            depth: 0,
        };
        let mut visited = HashSet::new();

        loop {
            // Steps are deterministic, so revisiting a state can only loop.
            if !visited.insert((hop.from, hop.to, hop.source)) {
                debug!(from = %hop.from, to = %hop.to, source = %hop.source, "Conversion path cycles");
                return PathResult::NotFound;
            }

            match self.step(hop, max_hops) {
                Step::Found(amount) => {
                    return PathResult::Found {
                        amount,
                        hops: hop.depth,
                    }
                }
                Step::Next(next) => hop = next,
                Step::NotFound => {
                    debug!(from = %from, to = %to, source = %source, "No conversion path");
                    return PathResult::NotFound;
                }
            }
        }
    }

    fn step(&self, hop: Hop, max_hops: usize) -> Step {
        if hop.depth >= max_hops {
            return Step::NotFound;
        }

        let fallback = ExchangeRateSource::canonical_for(hop.from, hop.to);

        // No table yet: try the canonical source without spending a hop.
        let Some(table) = self.cache.get(hop.source) else {
            return Step::Next(Hop {
                source: fallback,
                ..hop
            });
        };

        if let Some(rate) = table.rate(hop.from, hop.to) {
            return Step::Found(hop.amount * rate);
        }
        if let Some(rate) = table.rate(hop.to, hop.from) {
            return Step::Found(hop.amount * (1.0 / rate));
        }

        for &main in hop.source.main_currencies() {
            if let Some(rate) = table.rate(hop.from, main) {
                return Step::Next(Hop {
                    amount: hop.amount * rate,
                    from: main,
                    to: hop.to,
                    source: fallback,
                    depth: hop.depth + 1,
                });
            }
        }

        Step::Next(Hop {
            source: fallback,
            depth: hop.depth + 1,
            ..hop
        })
    }
}
