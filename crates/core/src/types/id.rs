//! Newtype IDs for type-safe record references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different tables.
//!
//! Backing tables may use text keys (`prod_01H...`), UUIDs or integer
//! sequences. IDs compare by their text form and serialize back in the JSON
//! type they were read from.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

use serde::de::{self, Visitor};
use serde::{Deserializer, Serialize, Serializer};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Deserialize` from a string or integer, `Serialize` back as the same JSON type
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use kruuse_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(ShelfId);
///
/// let warehouse = WarehouseId::new("wh_1");
/// let shelf = ShelfId::from(42_i64.to_string());
///
/// assert_eq!(warehouse.as_str(), "wh_1");
/// assert_eq!(shelf.to_string(), "42");
/// // These are different types, so this won't compile:
/// // let _: WarehouseId = shelf;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name($crate::types::id::RecordKey);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self($crate::types::id::RecordKey::text(id))
            }

            /// Get the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0.into_text()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                <$crate::types::id::RecordKey as ::serde::Deserialize>::deserialize(deserializer)
                    .map(Self)
            }
        }
    };
}

define_id!(RegionId);
define_id!(CountryId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(PriceId);
define_id!(CartId);

/// A record key as read from a row.
///
/// Equality, hashing and ordering use the text form only, so `7` and `"7"`
/// name the same record. Keys read from JSON integers serialize back as
/// integers.
#[derive(Debug, Clone)]
pub struct RecordKey {
    text: String,
    integer: bool,
}

impl RecordKey {
    #[must_use]
    pub fn text(id: impl Into<String>) -> Self {
        Self {
            text: id.into(),
            integer: false,
        }
    }

    fn integer(id: impl ToString) -> Self {
        Self {
            text: id.to_string(),
            integer: true,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Whether the key was read from a JSON integer.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        self.integer
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for RecordKey {}

impl Hash for RecordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for RecordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.integer {
            if let Ok(n) = self.text.parse::<i64>() {
                return serializer.serialize_i64(n);
            }
            if let Ok(n) = self.text.parse::<u64>() {
                return serializer.serialize_u64(n);
            }
        }
        serializer.serialize_str(&self.text)
    }
}

impl<'de> serde::Deserialize<'de> for RecordKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KeyVisitor)
    }
}

struct KeyVisitor;

impl Visitor<'_> for KeyVisitor {
    type Value = RecordKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer record key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(RecordKey::text(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(RecordKey::text(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(RecordKey::integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(RecordKey::integer(v))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_string_and_integer() {
        let from_str: ProductId = serde_json::from_str(r#""prod_01""#).unwrap();
        assert_eq!(from_str.as_str(), "prod_01");

        let from_int: ProductId = serde_json::from_str("17").unwrap();
        assert_eq!(from_int.as_str(), "17");
    }

    #[test]
    fn test_id_rejects_other_json() {
        assert!(serde_json::from_str::<RegionId>("true").is_err());
        assert!(serde_json::from_str::<RegionId>("null").is_err());
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = CartId::new("cart_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""cart_1""#);
    }

    #[test]
    fn test_integer_id_keeps_json_type() {
        let id: RegionId = serde_json::from_str("7").unwrap();
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!(7));
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_integer_and_text_ids_compare_equal() {
        let from_int: CountryId = serde_json::from_str("42").unwrap();
        assert_eq!(from_int, CountryId::new("42"));
        assert!(CountryId::new("10") < CountryId::new("9"));
    }
}
