//! Data store backends for the storefront.
//!
//! # Architecture
//!
//! - Every read and write goes through the [`DataStore`] trait
//! - Queries are structured [`Select`] descriptors (table, nested embeds,
//!   filters, range, count), never raw query strings
//! - Rows are JSON documents; nested relations are embedded as arrays
//!
//! # Backends
//!
//! - [`PostgrestStore`] - the hosted store's REST interface (default)
//! - [`PgStore`] - direct `PostgreSQL` queries via `sqlx`
//! - [`MemoryStore`] - in-process tables for tests and local development
//!
//! [`Backend`] wraps the three so the choice can be made at startup.

mod memory;
mod postgres;
mod postgrest;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use postgrest::PostgrestStore;

use std::cmp::Ordering;
use std::future::Future;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A single row (or nested document) returned by a data store.
pub type Row = serde_json::Map<String, Value>;

/// Maximum length of a `PostgreSQL` identifier.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Errors that can occur when talking to a data store.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request to the hosted store failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Direct database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store rejected the request.
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The store answered with something that is not a row set.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A table or column name is not a plain identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A stored row violates a domain invariant.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// A nested relation embedded into each parent row.
///
/// The child rows are those whose `foreign_key` column equals the parent's
/// `id`, ordered by `id`, and appear under `alias` in the parent document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub alias: &'static str,
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub embeds: Vec<Self>,
}

impl Embed {
    /// Embed `table` under `alias`, joined on `foreign_key`.
    #[must_use]
    pub const fn new(alias: &'static str, table: &'static str, foreign_key: &'static str) -> Self {
        Self {
            alias,
            table,
            foreign_key,
            embeds: Vec::new(),
        }
    }

    /// Embed a further relation inside each child row.
    #[must_use]
    pub fn with(mut self, child: Self) -> Self {
        self.embeds.push(child);
        self
    }
}

/// Row filter. Values are compared against the column's text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value`
    Eq { column: String, value: String },
    /// `a = x OR b = y OR ...`
    AnyOf(Vec<(String, String)>),
}

impl Filter {
    /// Equality filter.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Columns referenced by this filter.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Eq { column, .. } => vec![column.as_str()],
            Self::AnyOf(pairs) => pairs.iter().map(|(column, _)| column.as_str()).collect(),
        }
    }

    /// Whether a row satisfies this filter.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let column_equals = |column: &str, value: &str| {
            row.get(column).and_then(value_text).as_deref() == Some(value)
        };

        match self {
            Self::Eq { column, value } => column_equals(column, value),
            Self::AnyOf(pairs) => pairs.iter().any(|(column, value)| column_equals(column, value)),
        }
    }
}

/// Page window over the `id`-ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: u64,
    pub limit: u64,
}

/// A read query against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: &'static str,
    pub embeds: Vec<Embed>,
    pub filters: Vec<Filter>,
    pub range: Option<Range>,
    /// Report the total number of matching rows, ignoring `range`.
    pub count: bool,
}

impl Select {
    /// Select all columns of `table`.
    #[must_use]
    pub const fn all(table: &'static str) -> Self {
        Self {
            table,
            embeds: Vec::new(),
            filters: Vec::new(),
            range: None,
            count: false,
        }
    }

    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub const fn range(mut self, offset: u64, limit: u64) -> Self {
        self.range = Some(Range { offset, limit });
        self
    }

    #[must_use]
    pub const fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Check every table, column and alias name used by the query.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidIdentifier` for the first bad name.
    pub fn validate(&self) -> Result<(), BackendError> {
        fn validate_embeds(embeds: &[Embed]) -> Result<(), BackendError> {
            for embed in embeds {
                validate_identifier(embed.alias)?;
                validate_identifier(embed.table)?;
                validate_identifier(embed.foreign_key)?;
                validate_embeds(&embed.embeds)?;
            }
            Ok(())
        }

        validate_identifier(self.table)?;
        for filter in &self.filters {
            for column in filter.columns() {
                validate_identifier(column)?;
            }
        }
        validate_embeds(&self.embeds)
    }
}

/// Result of a [`Select`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub rows: Vec<Row>,
    /// Total matching rows when the query asked for a count.
    pub total: Option<u64>,
}

/// Table-level operations the storefront needs from a relational store.
pub trait DataStore: Send + Sync {
    /// Run a read query.
    fn select(&self, query: &Select) -> impl Future<Output = Result<Rows, BackendError>> + Send;

    /// Insert one row and return it as stored.
    fn insert(
        &self,
        table: &'static str,
        row: Row,
    ) -> impl Future<Output = Result<Row, BackendError>> + Send;

    /// Update the row with the given `id`, returning it, or `None` if absent.
    fn update(
        &self,
        table: &'static str,
        id: &str,
        patch: Row,
    ) -> impl Future<Output = Result<Option<Row>, BackendError>> + Send;

    /// Delete the row with the given `id`; `false` if nothing was deleted.
    fn delete(
        &self,
        table: &'static str,
        id: &str,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Cheap connectivity check.
    fn ping(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// The data store selected at startup.
#[derive(Debug, Clone)]
pub enum Backend {
    Postgrest(PostgrestStore),
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Backend {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgrest(_) => "postgrest",
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl DataStore for Backend {
    async fn select(&self, query: &Select) -> Result<Rows, BackendError> {
        match self {
            Self::Postgrest(store) => store.select(query).await,
            Self::Postgres(store) => store.select(query).await,
            Self::Memory(store) => store.select(query).await,
        }
    }

    async fn insert(&self, table: &'static str, row: Row) -> Result<Row, BackendError> {
        match self {
            Self::Postgrest(store) => store.insert(table, row).await,
            Self::Postgres(store) => store.insert(table, row).await,
            Self::Memory(store) => store.insert(table, row).await,
        }
    }

    async fn update(
        &self,
        table: &'static str,
        id: &str,
        patch: Row,
    ) -> Result<Option<Row>, BackendError> {
        match self {
            Self::Postgrest(store) => store.update(table, id, patch).await,
            Self::Postgres(store) => store.update(table, id, patch).await,
            Self::Memory(store) => store.update(table, id, patch).await,
        }
    }

    async fn delete(&self, table: &'static str, id: &str) -> Result<bool, BackendError> {
        match self {
            Self::Postgrest(store) => store.delete(table, id).await,
            Self::Postgres(store) => store.delete(table, id).await,
            Self::Memory(store) => store.delete(table, id).await,
        }
    }

    async fn ping(&self) -> Result<(), BackendError> {
        match self {
            Self::Postgrest(store) => store.ping().await,
            Self::Postgres(store) => store.ping().await,
            Self::Memory(store) => store.ping().await,
        }
    }
}

/// Check that `name` is a plain lower-case SQL identifier.
///
/// # Errors
///
/// Returns `BackendError::InvalidIdentifier` otherwise.
pub fn validate_identifier(name: &str) -> Result<(), BackendError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LENGTH {
        Ok(())
    } else {
        Err(BackendError::InvalidIdentifier(name.to_owned()))
    }
}

/// Text form of a scalar JSON value, as used for key and filter comparisons.
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Deserialize a nullable column, mapping `null` to the type's default.
///
/// # Errors
///
/// Propagates the inner deserializer's error for non-null values.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Order two keys numerically when both are integers, textually otherwise.
#[must_use]
pub fn compare_key_text(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
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
    fn test_validate_identifier() {
        assert!(validate_identifier("product_variants").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("iso_2").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("Products").is_err());
        assert!(validate_identifier("id; drop table products").is_err());
        assert!(validate_identifier("status\"").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_filter_matches_text_form() {
        let product = row(json!({"id": 7, "handle": "gauze", "status": "published"}));

        assert!(Filter::eq("id", "7").matches(&product));
        assert!(Filter::eq("status", "published").matches(&product));
        assert!(!Filter::eq("status", "draft").matches(&product));
        assert!(!Filter::eq("missing", "x").matches(&product));

        let id_or_handle = Filter::AnyOf(vec![
            ("id".to_owned(), "gauze".to_owned()),
            ("handle".to_owned(), "gauze".to_owned()),
        ]);
        assert!(id_or_handle.matches(&product));
    }

    #[test]
    fn test_select_validate_checks_filters_and_embeds() {
        let ok = Select::all("products")
            .embed(Embed::new("variants", "product_variants", "product_id"))
            .filter(Filter::eq("status", "published"));
        assert!(ok.validate().is_ok());

        let bad_filter = Select::all("products").filter(Filter::eq("status = 1 --", "x"));
        assert!(matches!(
            bad_filter.validate(),
            Err(BackendError::InvalidIdentifier(_))
        ));

        let bad_embed = Select::all("regions")
            .embed(Embed::new("countries", "countries", "region_id").with(Embed::new(
                "Bad",
                "x",
                "y",
            )));
        assert!(bad_embed.validate().is_err());
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("abc")).unwrap(), "abc");
        assert_eq!(value_text(&json!(12)).unwrap(), "12");
        assert_eq!(value_text(&json!(true)).unwrap(), "true");
        assert!(value_text(&Value::Null).is_none());
        assert!(value_text(&json!([1])).is_none());
    }

    #[test]
    fn test_compare_key_text() {
        assert_eq!(compare_key_text("9", "10"), Ordering::Less);
        assert_eq!(compare_key_text("price_b", "price_a"), Ordering::Greater);
        assert_eq!(compare_key_text("10", "10"), Ordering::Equal);
    }
}
