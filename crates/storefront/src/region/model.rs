//! Region and country records as read from the data store.

use std::collections::HashSet;

use kruuse_core::{CountryCode, CountryId, CurrencyCode, RegionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{BackendError, Embed, Row, Select, compare_key_text};

/// A grouping of countries sharing currency and tax configuration.
///
/// Columns beyond the ones the storefront reasons about are kept in
/// `fields` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    #[serde(default)]
    pub name: String,
    pub currency_code: CurrencyCode,
    #[serde(
        default,
        deserialize_with = "crate::backend::null_as_default",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub tax_rate: Decimal,
    #[serde(default, deserialize_with = "crate::backend::null_as_default")]
    pub countries: Vec<Country>,
    #[serde(flatten)]
    pub fields: Row,
}

/// A country belonging to exactly one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub iso_2: CountryCode,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub fields: Row,
}

impl Region {
    /// Query for every region with its countries embedded.
    #[must_use]
    pub fn select() -> Select {
        Select::all("regions").embed(Embed::new("countries", "countries", "region_id"))
    }

    /// Parse and validate a region row with embedded countries.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::DataCorruption` if the row does not describe a
    /// region or violates a region invariant.
    pub fn from_row(row: Row) -> Result<Self, BackendError> {
        let region: Self = serde_json::from_value(Value::Object(row))
            .map_err(|e| BackendError::DataCorruption(format!("malformed region: {e}")))?;
        region.validated()
    }

    /// Enforce the region invariants.
    ///
    /// The tax rate must not be negative. Country ISO-2 codes are unique
    /// within the region; duplicates keep the country with the lowest id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::DataCorruption` for a negative tax rate.
    pub fn validated(mut self) -> Result<Self, BackendError> {
        if self.tax_rate < Decimal::ZERO {
            return Err(BackendError::DataCorruption(format!(
                "region {} has negative tax rate {}",
                self.id, self.tax_rate
            )));
        }

        self.countries
            .sort_by(|a, b| compare_key_text(a.id.as_str(), b.id.as_str()));
        let mut seen = HashSet::new();
        self.countries
            .retain(|country| seen.insert(country.iso_2.clone()));

        Ok(self)
    }

    /// ISO-2 codes of this region's countries.
    pub fn country_codes(&self) -> impl Iterator<Item = &CountryCode> {
        self.countries.iter().map(|country| &country.iso_2)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test row must be an object"),
        }
    }

    #[test]
    fn test_from_row_keeps_extra_columns() {
        let region = Region::from_row(row(json!({
            "id": "reg_cl",
            "name": "Chile",
            "currency_code": "clp",
            "tax_rate": 19,
            "automatic_taxes": true,
            "countries": [
                {"id": 1, "iso_2": "CL", "name": "Chile", "region_id": "reg_cl"}
            ]
        })))
        .unwrap();

        assert_eq!(region.currency_code.as_str(), "CLP");
        assert_eq!(region.tax_rate, Decimal::new(19, 0));
        assert_eq!(region.countries[0].iso_2.as_str(), "cl");
        assert_eq!(region.fields["automatic_taxes"], json!(true));
        assert_eq!(region.countries[0].fields["region_id"], json!("reg_cl"));
    }

    #[test]
    fn test_duplicate_countries_keep_lowest_id() {
        let region = Region::from_row(row(json!({
            "id": "reg_us",
            "currency_code": "usd",
            "countries": [
                {"id": 12, "iso_2": "us", "name": "United States (dup)"},
                {"id": 3, "iso_2": "US", "name": "United States"},
                {"id": 7, "iso_2": "pr", "name": "Puerto Rico"}
            ]
        })))
        .unwrap();

        let codes: Vec<&str> = region.country_codes().map(CountryCode::as_str).collect();
        assert_eq!(codes, ["us", "pr"]);
        assert_eq!(region.countries[0].name, "United States");
    }

    #[test]
    fn test_negative_tax_rate_is_corruption() {
        let result = Region::from_row(row(json!({
            "id": "reg_bad",
            "currency_code": "eur",
            "tax_rate": -1.5,
            "countries": []
        })));
        assert!(matches!(result, Err(BackendError::DataCorruption(_))));
    }

    #[test]
    fn test_null_countries_and_bad_iso() {
        let region = Region::from_row(row(json!({
            "id": "reg_x", "currency_code": "usd", "tax_rate": null, "countries": null
        })))
        .unwrap();
        assert!(region.countries.is_empty());
        assert!(region.tax_rate.is_zero());

        let result = Region::from_row(row(json!({
            "id": "reg_y",
            "currency_code": "usd",
            "countries": [{"id": 1, "iso_2": "usa"}]
        })));
        assert!(result.is_err());
    }
}
