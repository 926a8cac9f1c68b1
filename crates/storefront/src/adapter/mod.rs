//! Store routing adapter.
//!
//! Maps `/store/{resource}[/{id}]` plus a method onto data store operations
//! and reshapes rows into the nested documents storefront UI code expects.
//!
//! # Dispatch
//!
//! - `products`, `regions`, `carts` - dedicated handlers with embedded
//!   relations (variants and prices, countries, line items)
//! - every other catalog resource - generic table operations
//! - anything else - [`AdapterError::UnsupportedOperation`]
//!
//! # Example
//!
//! ```rust,ignore
//! let adapter = Adapter::new(backend);
//! let products = adapter
//!     .fetch(StoreMethod::Get, "/store/products", &FetchOptions::default().with_query("limit", "6"))
//!     .await?;
//! ```

mod carts;
mod generic;
mod products;
mod regions;
pub mod request;
pub mod resource;

pub use products::{Product, Variant, calculated_price};
pub use regions::RegionDocument;
pub use request::{Page, StoreMethod, StoreRequest};
pub use resource::{CATALOG, Resource, TableResource, pluralize};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kruuse_core::CurrencyCode;
use moka::future::Cache;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::backend::{BackendError, DataStore, Filter, Row, Select, validate_identifier};

/// How long a region's currency is remembered for price selection.
const CURRENCY_TTL: Duration = Duration::from_secs(300);

/// Errors surfaced by the adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A single-item lookup matched nothing.
    #[error("{0}")]
    NotFound(String),

    /// The path, resource or method has no mapping.
    #[error("{0}")]
    UnsupportedOperation(String),

    /// Query parameters or body are malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The data store failed; its message is carried through.
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    /// A response document could not be encoded.
    #[error("failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl AdapterError {
    /// Stable error kind for response bodies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Backend(_) => "backend_failure",
            Self::Encoding(_) => "internal_error",
        }
    }
}

/// Query parameters and body accompanying a store request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl FetchOptions {
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The body as a row to write, with every column name checked.
    ///
    /// A missing body is an empty row.
    fn body_row(&self) -> Result<Row, AdapterError> {
        let row = match &self.body {
            None | Some(Value::Null) => Row::new(),
            Some(Value::Object(row)) => row.clone(),
            Some(_) => {
                return Err(AdapterError::InvalidRequest(
                    "request body must be a JSON object".to_owned(),
                ));
            }
        };
        for column in row.keys() {
            validate_identifier(column).map_err(|_| {
                AdapterError::InvalidRequest(format!("invalid field name {column:?}"))
            })?;
        }
        Ok(row)
    }
}

/// Routing adapter over a data store.
///
/// Cheaply cloneable; clones share the store and the currency cache.
pub struct Adapter<S> {
    inner: Arc<AdapterInner<S>>,
}

struct AdapterInner<S> {
    store: S,
    currencies: Cache<String, Option<CurrencyCode>>,
}

impl<S> Clone for Adapter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Adapter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("store", &self.inner.store)
            .field("cached_currencies", &self.inner.currencies.entry_count())
            .finish()
    }
}

impl<S: DataStore> Adapter<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        let currencies = Cache::builder()
            .max_capacity(256)
            .time_to_live(CURRENCY_TTL)
            .build();

        Self {
            inner: Arc::new(AdapterInner { store, currencies }),
        }
    }

    /// The underlying data store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Handle one store request.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError` when the path is unmapped, the request is
    /// malformed, a single item does not exist, or the store fails.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn fetch(
        &self,
        method: StoreMethod,
        path: &str,
        options: &FetchOptions,
    ) -> Result<Value, AdapterError> {
        let request = StoreRequest::parse(method, path)?;

        let result = match request.resource {
            Resource::Products => self.products(&request, options).await,
            Resource::Regions => self.regions(&request).await,
            Resource::Carts => self.carts(&request, options).await,
            Resource::Table(entry) => self.generic(entry, &request, options).await,
        };

        match &result {
            Err(err @ (AdapterError::Backend(_) | AdapterError::Encoding(_))) => {
                warn!(error = %err, "Store request failed");
            }
            Err(err) => debug!(error = %err, "Store request rejected"),
            Ok(_) => debug!("Store request served"),
        }
        result
    }

    /// Currency of the region with the given id, if it exists.
    async fn region_currency(
        &self,
        region_id: Option<&str>,
    ) -> Result<Option<CurrencyCode>, AdapterError> {
        let Some(region_id) = region_id else {
            return Ok(None);
        };

        if let Some(currency) = self.inner.currencies.get(region_id).await {
            debug!(region_id, "Cache hit for region currency");
            return Ok(currency);
        }

        let query = Select::all("regions")
            .filter(Filter::eq("id", region_id))
            .range(0, 1);
        let result = self.store().select(&query).await?;
        let currency = result
            .rows
            .first()
            .and_then(|row| row.get("currency_code"))
            .and_then(Value::as_str)
            .and_then(|code| CurrencyCode::parse(code).ok());

        self.inner
            .currencies
            .insert(region_id.to_owned(), currency.clone())
            .await;

        Ok(currency)
    }
}

/// Serialize a response document.
fn to_document(value: &impl Serialize) -> Result<Value, AdapterError> {
    Ok(serde_json::to_value(value)?)
}

fn unsupported(request: &StoreRequest) -> AdapterError {
    AdapterError::UnsupportedOperation(format!(
        "{} /store/{}{} is not supported",
        request.method,
        request.resource,
        if request.id.is_some() { "/{id}" } else { "" }
    ))
}
