//! Country hints carried by an inbound request.

use axum::http::HeaderMap;
use kruuse_core::CountryCode;

/// Geo-IP country headers set by edge proxies, in priority order.
pub const GEO_HEADERS: &[&str] = &["x-vercel-ip-country", "cf-ipcountry"];

/// Candidate country codes for a request. Values that are not valid ISO-2
/// codes are dropped while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryHints {
    /// First path segment, e.g. `cl` in `/cl/store`.
    pub path: Option<CountryCode>,
    /// Geo header values, in [`GEO_HEADERS`] order.
    pub geo: Vec<CountryCode>,
}

impl CountryHints {
    /// Collect hints from a request path and headers.
    #[must_use]
    pub fn from_request(path: &str, headers: &HeaderMap) -> Self {
        let geo = GEO_HEADERS
            .iter()
            .filter_map(|name| headers.get(*name))
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| CountryCode::parse(value).ok())
            .collect();

        Self {
            path: path_country(path),
            geo,
        }
    }
}

/// The first path segment, if it looks like a country code.
#[must_use]
pub fn path_country(path: &str) -> Option<CountryCode> {
    let segment = path.trim_start_matches('/').split('/').next()?;
    CountryCode::parse(segment).ok()
}
