//! ISO 3166-1 alpha-2 country code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CountryCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryCodeError {
    /// The input string is empty.
    #[error("country code cannot be empty")]
    Empty,
    /// The input is not exactly two characters long.
    #[error("country code must be exactly 2 letters (got {len})")]
    InvalidLength {
        /// Length of the rejected input.
        len: usize,
    },
    /// The input contains something other than ASCII letters.
    #[error("country code must contain only ASCII letters")]
    InvalidCharacter,
}

/// A lower-cased ISO 3166-1 alpha-2 country code (e.g. `cl`, `us`).
///
/// Country codes key the region cache and appear as the first path segment
/// of storefront URLs, so they are normalized to lower case on parse.
/// Ordering is lexicographic, which gives the region cache a stable
/// "first available" fallback.
///
/// ## Examples
///
/// ```
/// use kruuse_core::CountryCode;
///
/// assert_eq!(CountryCode::parse("CL").unwrap().as_str(), "cl");
/// assert_eq!(CountryCode::parse(" us ").unwrap().as_str(), "us");
///
/// assert!(CountryCode::parse("").is_err());
/// assert!(CountryCode::parse("usa").is_err());
/// assert!(CountryCode::parse("u1").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a `CountryCode`, trimming whitespace and lower-casing.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, is not two characters
    /// long, or contains non-ASCII-letter characters.
    pub fn parse(s: &str) -> Result<Self, CountryCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CountryCodeError::Empty);
        }

        let len = trimmed.chars().count();
        if len != 2 {
            return Err(CountryCodeError::InvalidLength { len });
        }

        if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryCodeError::InvalidCharacter);
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CountryCode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for CountryCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
