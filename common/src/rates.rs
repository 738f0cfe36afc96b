//! Exchange rate quotes and per-provider rate tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::monetary::Currency;
use crate::source::ExchangeRateSource;

/// A directed quote: 1 unit of `from` buys `rate` units of `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRate")]
pub struct ExchangeRate {
    /// Provider that quoted the rate.
    pub source: ExchangeRateSource,
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
}

impl ExchangeRate {
    /// Create a quote, rejecting self-quotes and rates that are not finite and positive.
    pub fn new(source: ExchangeRateSource, from: Currency, to: Currency, rate: f64) -> Option<Self> {
        if from == to || !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        Some(Self {
            source,
            from,
            to,
            rate,
        })
    }

    /// Whether this quote is for exactly `from -> to`.
    pub fn quotes(&self, from: Currency, to: Currency) -> bool {
        self.from == from && self.to == to
    }
}

#[derive(Deserialize)]
struct UncheckedRate {
    source: ExchangeRateSource,
    from: Currency,
    to: Currency,
    rate: f64,
}

impl TryFrom<UncheckedRate> for ExchangeRate {
    type Error = String;

    fn try_from(raw: UncheckedRate) -> Result<Self, Self::Error> {
        ExchangeRate::new(raw.source, raw.from, raw.to, raw.rate).ok_or_else(|| {
            format!("invalid rate {} for {}/{}", raw.rate, raw.from, raw.to)
        })
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {} ({})", self.from, self.to, self.rate, self.source)
    }
}

/// All rates currently known from one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    source: ExchangeRateSource,
    rates: Vec<ExchangeRate>,
    updated_at: DateTime<Utc>,
}

impl RateTable {
    /// Build a table, keeping only the rates quoted by `source`.
    pub fn new(source: ExchangeRateSource, rates: Vec<ExchangeRate>) -> Self {
        let rates = rates.into_iter().filter(|r| r.source == source).collect();
        Self {
            source,
            rates,
            updated_at: Utc::now(),
        }
    }

    pub fn source(&self) -> ExchangeRateSource {
        self.source
    }

    pub fn rates(&self) -> &[ExchangeRate] {
        &self.rates
    }

    /// When this table was built.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Exact-match lookup of `from -> to`. The reverse direction is not consulted.
    ///
    /// If the table carries the pair more than once, the first entry wins.
    pub fn rate(&self, from: Currency, to: Currency) -> Option<f64> {
        self.rates
            .iter()
            .find(|r| r.quotes(from, to))
            .map(|r| r.rate)
    }
}
