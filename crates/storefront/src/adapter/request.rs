//! Parsing of store paths, methods and pagination parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use super::AdapterError;
use super::resource::Resource;

/// Prefix every adapter path must start with.
pub const STORE_PREFIX: &str = "/store/";

/// Query parameters that never become row filters.
pub const RESERVED_PARAMS: &[&str] = &["limit", "offset", "fields", "expand", "order"];

/// Operations the adapter can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl StoreMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for StoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreMethod {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(AdapterError::UnsupportedOperation(format!(
                "method {other} is not supported"
            ))),
        }
    }
}

impl TryFrom<&Method> for StoreMethod {
    type Error = AdapterError;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// A parsed `/store/{resource}[/{id}]` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    pub resource: Resource,
    pub id: Option<String>,
    pub method: StoreMethod,
}

impl StoreRequest {
    /// Split a store path into resource and optional id.
    ///
    /// A trailing slash is ignored. Paths outside `/store/`, with more than
    /// two segments, or naming a resource missing from the catalog are
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::UnsupportedOperation` for any path that does
    /// not map to a catalog resource.
    pub fn parse(method: StoreMethod, path: &str) -> Result<Self, AdapterError> {
        let unsupported =
            || AdapterError::UnsupportedOperation(format!("unsupported path: {path}"));

        let rest = path.strip_prefix(STORE_PREFIX).ok_or_else(unsupported)?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let mut segments = rest.split('/');
        let resource = segments
            .next()
            .filter(|segment| !segment.is_empty())
            .and_then(Resource::from_path)
            .ok_or_else(unsupported)?;
        let id = match segments.next() {
            None => None,
            Some("") => return Err(unsupported()),
            Some(id) => Some(id.to_owned()),
        };
        if segments.next().is_some() {
            return Err(unsupported());
        }

        Ok(Self {
            resource,
            id,
            method,
        })
    }
}

/// Page window requested through `limit` and `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    /// Read `limit` and `offset` from query parameters.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::InvalidRequest` unless `limit` is an integer of
    /// at least 1 and `offset` a non-negative integer.
    pub fn from_query(
        query: &BTreeMap<String, String>,
        default_limit: u64,
    ) -> Result<Self, AdapterError> {
        let limit = match query.get("limit") {
            None => default_limit,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|limit| *limit >= 1)
                .ok_or_else(|| {
                    AdapterError::InvalidRequest(format!(
                        "limit must be a positive integer (got {raw:?})"
                    ))
                })?,
        };
        let offset = match query.get("offset") {
            None => 0,
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AdapterError::InvalidRequest(format!(
                    "offset must be a non-negative integer (got {raw:?})"
                ))
            })?,
        };

        Ok(Self { offset, limit })
    }
}
