//! Hosted data store client (PostgREST interface).
//!
//! Translates [`Select`] descriptors into REST queries:
//!
//! ```text
//! GET {url}/rest/v1/products
//!     ?select=*,variants:product_variants(*,prices(*))
//!     &status=eq.published
//!     &order=id.asc&limit=12&offset=0
//! Prefer: count=exact      -> Content-Range: 0-11/57
//! ```
//!
//! Writes use `Prefer: return=representation` so the stored row comes back.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, Response};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{BackendError, DataStore, Embed, Filter, Row, Rows, Select};
use crate::config::SupabaseConfig;

/// Path of the REST interface below the project URL.
const REST_PATH: &str = "rest/v1/";

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";

/// Client for the hosted store's REST interface.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct PostgrestStore {
    inner: Arc<PostgrestStoreInner>,
}

struct PostgrestStoreInner {
    client: reqwest::Client,
    base: Url,
}

impl fmt::Debug for PostgrestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestStore")
            .field("base", &self.inner.base.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Error body returned by the REST interface.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    details: Option<String>,
}

impl PostgrestStore {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project URL is invalid, the key cannot be sent
    /// as a header, or the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, BackendError> {
        let base = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))
            .and_then(|url| url.join(REST_PATH))
            .map_err(|e| BackendError::InvalidResponse(format!("invalid store URL: {e}")))?;

        let key = config.anon_key.expose_secret();
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(key)
            .map_err(|e| BackendError::InvalidResponse(format!("invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| BackendError::InvalidResponse(format!("invalid API key format: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(PostgrestStoreInner { client, base }),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        super::validate_identifier(table)?;
        self.inner
            .base
            .join(table)
            .map_err(|e| BackendError::InvalidResponse(format!("invalid table URL: {e}")))
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.inner.client.request(method, url)
    }

    /// Fail on non-success statuses, passing the store's message through.
    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| match (e.message, e.details) {
                (Some(message), Some(details)) => Some(format!("{message} ({details})")),
                (Some(message), None) => Some(message),
                (None, details) => details,
            })
            .unwrap_or_else(|| body.chars().take(200).collect());

        tracing::warn!(status = %status, message = %message, "Data store request failed");

        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn rows(response: Response) -> Result<Vec<Row>, BackendError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            BackendError::InvalidResponse(format!(
                "expected a JSON array of rows: {e}; body: {}",
                text.chars().take(200).collect::<String>()
            ))
        })
    }
}

impl DataStore for PostgrestStore {
    #[instrument(skip(self, query), fields(table = query.table))]
    async fn select(&self, query: &Select) -> Result<Rows, BackendError> {
        query.validate()?;

        let mut url = self.table_url(query.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &select_clause(&query.embeds));
            for filter in &query.filters {
                let (key, value) = filter_param(filter);
                pairs.append_pair(&key, &value);
            }
            pairs.append_pair("order", "id.asc");
            if let Some(range) = query.range {
                pairs.append_pair("limit", &range.limit.to_string());
                pairs.append_pair("offset", &range.offset.to_string());
            }
        }

        let mut request = self.request(Method::GET, url);
        if query.count {
            request = request.header(PREFER, COUNT_EXACT);
        }

        let response = Self::check(request.send().await?).await?;
        let total = if query.count {
            let content_range = response
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            content_range.as_deref().and_then(parse_content_range_total)
        } else {
            None
        };

        let rows = Self::rows(response).await?;
        debug!(rows = rows.len(), total = ?total, "Select complete");

        Ok(Rows { rows, total })
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: &'static str, row: Row) -> Result<Row, BackendError> {
        let url = self.table_url(table)?;
        let response = self
            .request(Method::POST, url)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&row)
            .send()
            .await?;

        Self::rows(Self::check(response).await?)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                BackendError::InvalidResponse(format!("insert into {table} returned no row"))
            })
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: &'static str,
        id: &str,
        patch: Row,
    ) -> Result<Option<Row>, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        let response = self
            .request(Method::PATCH, url)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&patch)
            .send()
            .await?;

        Ok(Self::rows(Self::check(response).await?)
            .await?
            .into_iter()
            .next())
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &'static str, id: &str) -> Result<bool, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        let response = self
            .request(Method::DELETE, url)
            .header(PREFER, RETURN_REPRESENTATION)
            .send()
            .await?;

        Ok(!Self::rows(Self::check(response).await?).await?.is_empty())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .request(Method::GET, self.inner.base.clone())
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

/// Build the `select` parameter, e.g. `*,variants:product_variants(*,prices(*))`.
fn select_clause(embeds: &[Embed]) -> String {
    let mut clause = String::from("*");
    for embed in embeds {
        clause.push(',');
        if embed.alias != embed.table {
            clause.push_str(embed.alias);
            clause.push(':');
        }
        clause.push_str(embed.table);
        clause.push('(');
        clause.push_str(&select_clause(&embed.embeds));
        clause.push(')');
    }
    clause
}

/// Translate a filter into a query parameter.
fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq { column, value } => (column.clone(), format!("eq.{value}")),
        Filter::AnyOf(pairs) => {
            let conditions = pairs
                .iter()
                .map(|(column, value)| format!("{column}.eq.{}", quote_value(value)))
                .collect::<Vec<_>>()
                .join(",");
            ("or".to_owned(), format!("({conditions})"))
        }
    }
}

/// Quote a value inside an `or=(...)` list so reserved characters survive.
fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Total from a `Content-Range` header such as `0-11/57` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
