//! Exchange rate provider identities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::monetary::{Currency, CurrencyKind};

/// A provider of exchange rate data.
///
/// The numeric id is the key used for the provider in the rates payload and
/// must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRateSource {
    /// European Central Bank reference rates. Canonical fiat provider.
    Ecb,
    /// Fixer fiat rates.
    Fixer,
    /// Coinbase spot prices. Canonical crypto provider.
    Coinbase,
    /// Kraken spot prices.
    Kraken,
}

impl ExchangeRateSource {
    /// All sources, in id order.
    pub const ALL: [ExchangeRateSource; 4] = [
        ExchangeRateSource::Ecb,
        ExchangeRateSource::Fixer,
        ExchangeRateSource::Coinbase,
        ExchangeRateSource::Kraken,
    ];

    /// Stable numeric identity.
    pub fn id(&self) -> u32 {
        match self {
            ExchangeRateSource::Ecb => 1,
            ExchangeRateSource::Fixer => 2,
            ExchangeRateSource::Coinbase => 3,
            ExchangeRateSource::Kraken => 4,
        }
    }

    /// Resolve a numeric identity, `None` for providers this build does not know.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Resolve a payload key, the decimal id written exactly (`"1"`, not `" 1"` or `"01"`).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id().to_string() == key)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExchangeRateSource::Ecb => "ecb",
            ExchangeRateSource::Fixer => "fixer",
            ExchangeRateSource::Coinbase => "coinbase",
            ExchangeRateSource::Kraken => "kraken",
        }
    }

    /// Resolve a source by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Kind of currencies this source primarily quotes.
    pub fn kind(&self) -> CurrencyKind {
        match self {
            ExchangeRateSource::Ecb | ExchangeRateSource::Fixer => CurrencyKind::Fiat,
            ExchangeRateSource::Coinbase | ExchangeRateSource::Kraken => CurrencyKind::Crypto,
        }
    }

    /// Hub currencies to pivot through when no direct quote exists, in preference order.
    pub fn main_currencies(&self) -> &'static [Currency] {
        match self {
            ExchangeRateSource::Ecb => &[Currency::EUR, Currency::USD],
            ExchangeRateSource::Fixer => &[Currency::EUR, Currency::USD],
            ExchangeRateSource::Coinbase => &[Currency::USD, Currency::BTC, Currency::EUR],
            ExchangeRateSource::Kraken => &[Currency::USD, Currency::EUR, Currency::BTC],
        }
    }

    /// The canonical source to fall back to for a pair.
    ///
    /// Pairs made only of fiat currencies go to the canonical fiat provider;
    /// anything involving crypto goes to the canonical crypto provider.
    pub fn canonical_for(from: Currency, to: Currency) -> Self {
        if from.is_fiat() && to.is_fiat() {
            ExchangeRateSource::Ecb
        } else {
            ExchangeRateSource::Coinbase
        }
    }
}

impl fmt::Display for ExchangeRateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        for source in ExchangeRateSource::ALL {
            assert_eq!(ExchangeRateSource::from_id(source.id()), Some(source));
            assert_eq!(ExchangeRateSource::from_key(&source.id().to_string()), Some(source));
            assert_eq!(ExchangeRateSource::from_name(source.name()), Some(source));
        }
    }

    #[test]
    fn test_unknown_keys() {
        assert_eq!(ExchangeRateSource::from_id(0), None);
        assert_eq!(ExchangeRateSource::from_key("99"), None);
        assert_eq!(ExchangeRateSource::from_key("code"), None);
        assert_eq!(ExchangeRateSource::from_key(" 1"), None);
        assert_eq!(ExchangeRateSource::from_key("01"), None);
        assert_eq!(ExchangeRateSource::from_key("+1"), None);
        assert_eq!(ExchangeRateSource::from_name("bitstamp"), None);
    }

    #[test]
    fn test_canonical_fallback() {
        assert_eq!(
            ExchangeRateSource::canonical_for(Currency::USD, Currency::JPY),
            ExchangeRateSource::Ecb
        );
        assert_eq!(
            ExchangeRateSource::canonical_for(Currency::USD, Currency::BTC),
            ExchangeRateSource::Coinbase
        );
        assert_eq!(
            ExchangeRateSource::canonical_for(Currency::ETH, Currency::BTC),
            ExchangeRateSource::Coinbase
        );
    }

    #[test]
    fn test_main_currencies_are_known() {
        for source in ExchangeRateSource::ALL {
            assert!(!source.main_currencies().is_empty());
            assert!(source.main_currencies().iter().all(|c| c.is_known()));
        }
    }
}
