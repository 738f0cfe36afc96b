//! Currency registry for Ratebook.
//!
//! Currencies are static: every code the application understands lives in
//! [`REGISTRY`], together with its minor-unit precision and whether it is a
//! fiat or a crypto currency. Lookups never fail; unknown codes resolve to
//! the [`Currency::UNKNOWN`] sentinel.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// ULPs of distance from a whole minor unit treated as float noise.
const MINOR_UNIT_NOISE_ULPS: f64 = 8.0;

/// Classification of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    /// Government-issued currency.
    Fiat,
    /// Crypto asset.
    Crypto,
}

impl fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencyKind::Fiat => write!(f, "fiat"),
            CurrencyKind::Crypto => write!(f, "crypto"),
        }
    }
}

/// A currency known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Currency {
    code: &'static str,
    decimals: u32,
    kind: CurrencyKind,
}

impl Currency {
    const fn fiat(code: &'static str, decimals: u32) -> Self {
        Self {
            code,
            decimals,
            kind: CurrencyKind::Fiat,
        }
    }

    const fn crypto(code: &'static str, decimals: u32) -> Self {
        Self {
            code,
            decimals,
            kind: CurrencyKind::Crypto,
        }
    }

    /// Sentinel returned for codes missing from the registry (ISO 4217 "XXX").
    pub const UNKNOWN: Currency = Currency::fiat("XXX", 0);

    pub const USD: Currency = Currency::fiat("USD", 2);
    pub const EUR: Currency = Currency::fiat("EUR", 2);
    pub const GBP: Currency = Currency::fiat("GBP", 2);
    pub const JPY: Currency = Currency::fiat("JPY", 0);
    pub const CHF: Currency = Currency::fiat("CHF", 2);
    pub const CAD: Currency = Currency::fiat("CAD", 2);
    pub const AUD: Currency = Currency::fiat("AUD", 2);
    pub const NZD: Currency = Currency::fiat("NZD", 2);
    pub const CNY: Currency = Currency::fiat("CNY", 2);
    pub const HKD: Currency = Currency::fiat("HKD", 2);
    pub const SGD: Currency = Currency::fiat("SGD", 2);
    pub const KRW: Currency = Currency::fiat("KRW", 0);
    pub const INR: Currency = Currency::fiat("INR", 2);
    pub const SEK: Currency = Currency::fiat("SEK", 2);
    pub const NOK: Currency = Currency::fiat("NOK", 2);
    pub const DKK: Currency = Currency::fiat("DKK", 2);
    pub const PLN: Currency = Currency::fiat("PLN", 2);
    pub const CZK: Currency = Currency::fiat("CZK", 2);
    pub const HUF: Currency = Currency::fiat("HUF", 2);
    pub const TRY: Currency = Currency::fiat("TRY", 2);
    pub const BRL: Currency = Currency::fiat("BRL", 2);
    pub const MXN: Currency = Currency::fiat("MXN", 2);
    pub const ZAR: Currency = Currency::fiat("ZAR", 2);
    pub const KWD: Currency = Currency::fiat("KWD", 3);
    pub const BHD: Currency = Currency::fiat("BHD", 3);

    pub const BTC: Currency = Currency::crypto("BTC", 8);
    // Gwei precision keeps realistic balances inside i64 minor units.
    pub const ETH: Currency = Currency::crypto("ETH", 9);
    pub const LTC: Currency = Currency::crypto("LTC", 8);
    pub const SOL: Currency = Currency::crypto("SOL", 9);
    pub const XRP: Currency = Currency::crypto("XRP", 6);
    pub const ADA: Currency = Currency::crypto("ADA", 6);
    pub const DOGE: Currency = Currency::crypto("DOGE", 8);
    pub const USDT: Currency = Currency::crypto("USDT", 6);
    pub const USDC: Currency = Currency::crypto("USDC", 6);

    /// Look up a currency by code, case-insensitively.
    ///
    /// Returns [`Currency::UNKNOWN`] when the code is not registered.
    pub fn lookup(code: &str) -> Currency {
        Self::find(code).unwrap_or(Currency::UNKNOWN)
    }

    /// Look up a currency by code, returning `None` for unregistered codes.
    pub fn find(code: &str) -> Option<Currency> {
        let code = code.trim();
        REGISTRY
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .copied()
    }

    /// All registered currencies, in registry order.
    pub fn all() -> &'static [Currency] {
        REGISTRY
    }

    /// Get the currency code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Number of decimal places in the minor unit.
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn kind(&self) -> CurrencyKind {
        self.kind
    }

    pub fn is_fiat(&self) -> bool {
        self.kind == CurrencyKind::Fiat
    }

    pub fn is_crypto(&self) -> bool {
        self.kind == CurrencyKind::Crypto
    }

    /// Whether this is a registered currency rather than the sentinel.
    pub fn is_known(&self) -> bool {
        *self != Currency::UNKNOWN
    }

    /// Scale factor between major and minor units (`10^decimals`).
    pub fn minor_unit_scale(&self) -> f64 {
        10f64.powi(self.decimals as i32)
    }

    /// Convert an integer minor-unit amount to major units.
    pub fn to_major_units(&self, minor: i64) -> f64 {
        minor as f64 / self.minor_unit_scale()
    }

    /// Convert a major-unit amount to integer minor units, truncating toward zero.
    ///
    /// Returns `None` if the result is not finite or does not fit in an `i64`.
    pub fn to_minor_units(&self, major: f64) -> Option<i64> {
        let scaled = major * self.minor_unit_scale();
        if !scaled.is_finite() || scaled >= i64::MAX as f64 || scaled < i64::MIN as f64 {
            return None;
        }
        // 0.29 * 100.0 is 28.999..; snap representation noise (a few ULPs of
        // the result) to the whole minor unit before truncating.
        let nearest = scaled.round();
        let noise = nearest.abs().max(1.0) * f64::EPSILON * MINOR_UNIT_NOISE_ULPS;
        let quantized = if (scaled - nearest).abs() <= noise {
            nearest
        } else {
            scaled.trunc()
        };
        Some(quantized as i64)
    }
}

/// Every currency the application knows about.
pub static REGISTRY: &[Currency] = &[
    Currency::USD,
    Currency::EUR,
    Currency::GBP,
    Currency::JPY,
    Currency::CHF,
    Currency::CAD,
    Currency::AUD,
    Currency::NZD,
    Currency::CNY,
    Currency::HKD,
    Currency::SGD,
    Currency::KRW,
    Currency::INR,
    Currency::SEK,
    Currency::NOK,
    Currency::DKK,
    Currency::PLN,
    Currency::CZK,
    Currency::HUF,
    Currency::TRY,
    Currency::BRL,
    Currency::MXN,
    Currency::ZAR,
    Currency::KWD,
    Currency::BHD,
    Currency::BTC,
    Currency::ETH,
    Currency::LTC,
    Currency::SOL,
    Currency::XRP,
    Currency::ADA,
    Currency::DOGE,
    Currency::USDT,
    Currency::USDC,
];

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::lookup(s)
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Currency::lookup(&code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known() {
        assert_eq!(Currency::lookup("USD"), Currency::USD);
        assert_eq!(Currency::lookup("btc"), Currency::BTC);
        assert_eq!(Currency::lookup(" eur "), Currency::EUR);
    }

    #[test]
    fn test_lookup_unknown_is_sentinel() {
        let c = Currency::lookup("ZZZ");
        assert_eq!(c, Currency::UNKNOWN);
        assert!(!c.is_known());
        assert!(Currency::find("ZZZ").is_none());
    }

    #[test]
    fn test_classification() {
        assert!(Currency::USD.is_fiat());
        assert!(!Currency::USD.is_crypto());
        assert!(Currency::BTC.is_crypto());
        assert!(!Currency::BTC.is_fiat());
    }

    #[test]
    fn test_registry_codes_unique() {
        let mut codes: Vec<_> = Currency::all().iter().map(|c| c.code()).collect();
        let total = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), total);
        assert!(!codes.contains(&Currency::UNKNOWN.code()));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Currency::USD.to_major_units(12345), 123.45);
        assert_eq!(Currency::JPY.to_major_units(500), 500.0);
        assert_eq!(Currency::EUR.to_minor_units(0.9), Some(90));
        assert_eq!(Currency::USD.to_minor_units(-1.239), Some(-123));
        assert_eq!(Currency::USD.to_minor_units(0.29), Some(29));
        assert_eq!(Currency::USD.to_minor_units(0.2999), Some(29));
        assert_eq!(Currency::USD.to_minor_units(f64::NAN), None);
        assert_eq!(Currency::BTC.to_minor_units(1e12), None);
    }

    #[test]
    fn test_large_minor_amounts_truncate() {
        assert_eq!(Currency::BTC.to_minor_units(10.123456789), Some(1_012_345_678));
        assert_eq!(Currency::USD.to_minor_units(5_000_000.009), Some(500_000_000));
        assert_eq!(Currency::USD.to_minor_units(-5_000_000.009), Some(-500_000_000));
        assert_eq!(Currency::USD.to_minor_units(12_345_678.29), Some(1_234_567_829));
    }

    #[test]
    fn test_serde_as_code() {
        let json = serde_json::to_string(&Currency::GBP).unwrap();
        assert_eq!(json, "\"GBP\"");

        let back: Currency = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(back, Currency::GBP);

        let unknown: Currency = serde_json::from_str("\"QQQ\"").unwrap();
        assert_eq!(unknown, Currency::UNKNOWN);
    }
}
