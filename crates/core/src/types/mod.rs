//! Core types for Kruuse.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod country;
pub mod id;
pub mod price;
pub mod status;

pub use country::{CountryCode, CountryCodeError};
pub use id::*;
pub use price::{
    CalculatedPrice, CurrencyCode, CurrencyCodeError, FALLBACK_CURRENCY, PriceReference,
};
pub use status::ProductStatus;
