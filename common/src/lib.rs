//! Ratebook Common Types
//!
//! This crate contains the shared types used across Ratebook: the static
//! currency registry, the exchange rate provider identities, and the rate
//! tables cached per provider.

pub mod monetary;
pub mod rates;
pub mod source;

pub use monetary::*;
pub use rates::*;
pub use source::*;
