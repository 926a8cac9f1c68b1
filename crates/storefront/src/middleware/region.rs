//! Region redirect middleware.
//!
//! Page requests without a known country segment are redirected to the same
//! path under the resolved country, e.g. `/store?q=gauze` becomes
//! `/cl/store?q=gauze`. API, asset and diagnostic paths bypass resolution.
//!
//! Resolution failures never fail the request: the error is logged and the
//! request continues without a redirect.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::region::{Clock, CountryHints, RegionCache, RegionSource, ResolutionError};
use crate::state::AppState;

/// Path prefixes that never go through region resolution.
pub const BYPASS_PREFIXES: &[&str] = &[
    "/api",
    "/_next/",
    "/static/",
    "/assets/",
    "/images/",
    "/health",
    "/favicon.ico",
    "/test",
];

/// Outcome of region resolution for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionDecision {
    /// Serve the request as-is.
    Continue,
    /// Redirect to this location with `307 Temporary Redirect`.
    Redirect(String),
}

/// Whether `path` skips region resolution entirely.
#[must_use]
pub fn bypasses_resolution(path: &str) -> bool {
    BYPASS_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) || path.contains('.')
}

/// Decide whether a request needs a region redirect.
///
/// # Errors
///
/// Returns `ResolutionError` if the region map cannot be populated. Callers
/// are expected to continue without a redirect in that case.
pub async fn decide<S, C>(
    cache: &RegionCache<S, C>,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<RegionDecision, ResolutionError>
where
    S: RegionSource,
    C: Clock,
{
    let path = uri.path();
    if bypasses_resolution(path) {
        return Ok(RegionDecision::Continue);
    }

    let hints = CountryHints::from_request(path, headers);
    let map = cache.region_map().await?;
    if hints.path.as_ref().is_some_and(|code| map.contains(code)) {
        return Ok(RegionDecision::Continue);
    }

    let code = map
        .resolve(&hints, cache.default_region())
        .ok_or(ResolutionError::NoRegions)?;

    let rest = if path == "/" { "" } else { path };
    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    Ok(RegionDecision::Redirect(format!("/{code}{rest}{query}")))
}

/// Redirect page requests to their region-prefixed path.
pub async fn region_redirect_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let decision = decide(state.regions(), request.uri(), request.headers()).await;
    match decision {
        Ok(RegionDecision::Continue) => next.run(request).await,
        Ok(RegionDecision::Redirect(location)) => {
            debug!(from = %request.uri(), to = %location, "Redirecting to region path");
            Redirect::temporary(&location).into_response()
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %request.uri().path(),
                "Region resolution failed, continuing without redirect"
            );
            next.run(request).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use kruuse_core::CountryCode;
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryStore;
    use crate::config::RegionConfig;
    use crate::region::SystemClock;

    async fn cache(default: &str) -> RegionCache<MemoryStore> {
        let store = MemoryStore::new();
        store
            .seed(
                "regions",
                [
                    json!({"id": "reg_cl", "name": "Chile", "currency_code": "clp", "tax_rate": 19}),
                    json!({"id": "reg_us", "name": "United States", "currency_code": "usd", "tax_rate": 0}),
                ],
            )
            .await;
        store
            .seed(
                "countries",
                [
                    json!({"id": 1, "iso_2": "cl", "region_id": "reg_cl"}),
                    json!({"id": 2, "iso_2": "us", "region_id": "reg_us"}),
                ],
            )
            .await;
        let config = RegionConfig::new(CountryCode::parse(default).unwrap());
        RegionCache::new(store, SystemClock, &config)
    }

    fn geo(code: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-vercel-ip-country", HeaderValue::from_str(code).unwrap());
        headers
    }

    #[test]
    fn test_bypass_paths() {
        for path in [
            "/api/store/products",
            "/_next/static/chunk.js",
            "/health/ready",
            "/favicon.ico",
            "/images/logo",
            "/test-adapter",
            "/robots.txt",
        ] {
            assert!(bypasses_resolution(path), "{path}");
        }

        for path in ["/", "/store", "/cl/products/gauze"] {
            assert!(!bypasses_resolution(path), "{path}");
        }
    }

    #[tokio::test]
    async fn test_geo_header_redirect() {
        let cache = cache("cl").await;
        let uri: Uri = "/".parse().unwrap();

        let decision = decide(&cache, &uri, &geo("US")).await.unwrap();
        assert_eq!(decision, RegionDecision::Redirect("/us".to_owned()));
    }

    #[tokio::test]
    async fn test_known_country_segment_continues() {
        let cache = cache("cl").await;
        let uri: Uri = "/cl/store".parse().unwrap();

        let decision = decide(&cache, &uri, &geo("US")).await.unwrap();
        assert_eq!(decision, RegionDecision::Continue);
    }

    #[tokio::test]
    async fn test_redirect_preserves_path_and_query() {
        let cache = cache("cl").await;
        let uri: Uri = "/store?q=gauze&page=2".parse().unwrap();

        let decision = decide(&cache, &uri, &HeaderMap::new()).await.unwrap();
        assert_eq!(
            decision,
            RegionDecision::Redirect("/cl/store?q=gauze&page=2".to_owned())
        );
    }

    #[tokio::test]
    async fn test_unknown_segment_is_prefixed() {
        let cache = cache("cl").await;
        let uri: Uri = "/xx/store".parse().unwrap();

        let decision = decide(&cache, &uri, &geo("de")).await.unwrap();
        assert_eq!(decision, RegionDecision::Redirect("/cl/xx/store".to_owned()));
    }

    #[tokio::test]
    async fn test_missing_default_uses_first_code() {
        let cache = cache("de").await;
        let uri: Uri = "/".parse().unwrap();

        let decision = decide(&cache, &uri, &HeaderMap::new()).await.unwrap();
        assert_eq!(decision, RegionDecision::Redirect("/cl".to_owned()));
    }

    #[tokio::test]
    async fn test_resolution_failure_is_an_error() {
        let config = RegionConfig::new(CountryCode::parse("cl").unwrap());
        let cache = RegionCache::new(MemoryStore::new(), SystemClock, &config);
        let uri: Uri = "/".parse().unwrap();

        let err = decide(&cache, &uri, &HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, ResolutionError::NoRegions));

        // Bypassed paths never touch the cache
        let uri: Uri = "/api/store/regions".parse().unwrap();
        let decision = decide(&cache, &uri, &HeaderMap::new()).await.unwrap();
        assert_eq!(decision, RegionDecision::Continue);
    }
}
