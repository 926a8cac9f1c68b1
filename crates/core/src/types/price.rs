//! Price and currency types.
//!
//! Amounts use decimal arithmetic and are serialized as JSON numbers, which
//! is what storefront UI code expects for `calculated_amount` and friends.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::PriceId;

/// Currency used when a variant has no price rows at all.
pub const FALLBACK_CURRENCY: &str = "USD";

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyCodeError {
    /// The input is not three ASCII letters.
    #[error("currency code must be 3 ASCII letters (got {0:?})")]
    Invalid(String),
}

/// An ISO 4217 currency code, normalized to upper case (`CLP`, `USD`).
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code, trimming whitespace and upper-casing.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is exactly three ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CurrencyCodeError> {
        let trimmed = s.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyCodeError::Invalid(s.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The currency reported when no price row exists.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_CURRENCY.to_owned())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Reference to the price row a calculated price was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceReference {
    /// ID of the source price row, absent when the variant has no prices.
    pub money_amount_id: Option<PriceId>,
    /// Amount of the source price row.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
}

/// Derived price view attached to every variant on read.
///
/// No price lists or discount rules are evaluated: the calculated and
/// original amounts are always the same source amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculatedPrice {
    /// Amount after price rules (identical to `original_amount`).
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub calculated_amount: Decimal,
    /// Amount before price rules.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub original_amount: Decimal,
    /// Currency of both amounts.
    pub currency_code: CurrencyCode,
    /// Source of the calculated amount.
    pub calculated_price: PriceReference,
    /// Source of the original amount.
    pub original_price: PriceReference,
}

impl CalculatedPrice {
    /// Build the view from a single source price row.
    #[must_use]
    pub fn from_source(id: Option<PriceId>, amount: Decimal, currency_code: CurrencyCode) -> Self {
        let reference = PriceReference {
            money_amount_id: id,
            amount,
        };
        Self {
            calculated_amount: amount,
            original_amount: amount,
            currency_code,
            calculated_price: reference.clone(),
            original_price: reference,
        }
    }

    /// The view reported for a variant without any price rows.
    #[must_use]
    pub fn unpriced() -> Self {
        Self::from_source(None, Decimal::ZERO, CurrencyCode::fallback())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_normalizes() {
        assert_eq!(CurrencyCode::parse("clp").unwrap().as_str(), "CLP");
        assert!(CurrencyCode::parse("dollars").is_err());
        assert!(CurrencyCode::parse("U$D").is_err());
    }

    #[test]
    fn test_calculated_price_serializes_numbers() {
        let price = CalculatedPrice::from_source(
            Some(PriceId::new("price_1")),
            Decimal::new(1990, 0),
            CurrencyCode::parse("clp").unwrap(),
        );
        let json = serde_json::to_value(&price).unwrap();

        assert_eq!(json["calculated_amount"], serde_json::json!(1990.0));
        assert_eq!(json["original_amount"], serde_json::json!(1990.0));
        assert_eq!(json["currency_code"], "CLP");
        assert_eq!(json["calculated_price"]["money_amount_id"], "price_1");
        assert_eq!(json["original_price"]["amount"], serde_json::json!(1990.0));
    }

    #[test]
    fn test_unpriced_defaults() {
        let price = CalculatedPrice::unpriced();
        assert_eq!(price.calculated_amount, Decimal::ZERO);
        assert_eq!(price.currency_code.as_str(), "USD");
        assert!(price.calculated_price.money_amount_id.is_none());
    }
}
