//! Rate payload parsing.
//!
//! The rate endpoint answers with a single JSON document:
//!
//! ```json
//! {
//!   "code": 1,
//!   "1": { "rates": [ { "from": "USD", "to": "EUR", "rate": 0.9 } ] },
//!   "3": { "rates": [ { "from": "BTC", "to": "USD", "rate": 64000.0 } ] }
//! }
//! ```
//!
//! Keys other than `code` are provider ids. Providers this build does not
//! know and malformed entries are skipped so newer payloads keep working.

use ratebook_common::{Currency, ExchangeRate, ExchangeRateSource, RateTable};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::RateCache;
use crate::error::{FxError, FxResult};

/// Top-level success indicator; any non-zero integer means success.
const SUCCESS_FIELD: &str = "code";

#[derive(Debug, Deserialize)]
struct RawRate {
    from: String,
    to: String,
    rate: f64,
}

/// What a successful parse changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Sources whose table was replaced, in id order.
    pub updated: Vec<ExchangeRateSource>,
    /// Recognized sources that sent nothing usable; their old tables are kept.
    pub unchanged: Vec<ExchangeRateSource>,
    /// Entries keyed by providers this build does not know.
    pub unknown_sources: usize,
    /// Individual rate entries dropped as malformed or invalid.
    pub skipped_rates: usize,
}

impl ParseSummary {
    /// Whether no provider table was replaced.
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Parse a raw payload and install every usable provider table into `cache`.
///
/// Fails without touching the cache when the payload is not a JSON object or
/// its success indicator is missing or zero. Providers with no valid entries
/// keep whatever table they already had.
pub fn parse(raw: &[u8], cache: &RateCache) -> FxResult<ParseSummary> {
    let root: Value = serde_json::from_slice(raw)?;
    let Value::Object(entries) = root else {
        return Err(FxError::MalformedPayload(
            "payload is not a JSON object".to_string(),
        ));
    };

    match entries.get(SUCCESS_FIELD).and_then(Value::as_i64) {
        Some(0) => {
            return Err(FxError::MalformedPayload(
                "endpoint reported failure".to_string(),
            ))
        }
        Some(_) => {}
        None => {
            return Err(FxError::MalformedPayload(format!(
                "missing `{}` success indicator",
                SUCCESS_FIELD
            )))
        }
    }

    let mut summary = ParseSummary::default();
    let mut tables = Vec::new();

    for (key, value) in &entries {
        if key == SUCCESS_FIELD {
            continue;
        }

        let Some(source) = ExchangeRateSource::from_key(key) else {
            debug!(key = %key, "Skipping unknown rate provider");
            summary.unknown_sources += 1;
            continue;
        };

        let Some(items) = value.get("rates").and_then(Value::as_array) else {
            warn!(source = %source, "Provider entry has no rate list");
            summary.unchanged.push(source);
            continue;
        };

        let rates: Vec<ExchangeRate> = items
            .iter()
            .filter_map(|item| parse_rate(source, item))
            .collect();
        summary.skipped_rates += items.len() - rates.len();

        if rates.is_empty() {
            warn!(source = %source, "Provider sent no valid rates, keeping cached table");
            summary.unchanged.push(source);
            continue;
        }

        tables.push(RateTable::new(source, rates));
    }

    for table in tables {
        let source = table.source();
        debug!(source = %source, rates = table.len(), "Installing rate table");
        cache.set(source, table);
        summary.updated.push(source);
    }
    summary.updated.sort();
    summary.unchanged.sort();

    Ok(summary)
}

fn parse_rate(source: ExchangeRateSource, item: &Value) -> Option<ExchangeRate> {
    let raw = RawRate::deserialize(item).ok()?;
    let from = Currency::find(&raw.from);
    let to = Currency::find(&raw.to);

    match (from, to) {
        (Some(from), Some(to)) => ExchangeRate::new(source, from, to, raw.rate),
        _ => {
            debug!(source = %source, from = %raw.from, to = %raw.to, "Skipping rate with unknown currency");
            None
        }
    }
}
