//! Request correlation ids.
//!
//! An `x-request-id` from an upstream proxy is reused when it is short and
//! printable; otherwise a UUID v4 is generated. The id is recorded on the
//! current span, tagged on the Sentry scope, exposed to handlers as a
//! [`RequestId`] extension, and echoed on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_UPSTREAM_ID_LEN: usize = 128;

/// Correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

fn upstream_id(value: &HeaderValue) -> Option<String> {
    let id = value.to_str().ok()?.trim();
    let usable = !id.is_empty()
        && id.len() <= MAX_UPSTREAM_ID_LEN
        && id.chars().all(|c| c.is_ascii_graphic());
    usable.then(|| id.to_owned())
}

/// Ensure every request carries a request id.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(upstream_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_accepted() {
        let value = HeaderValue::from_static("cf-7f3a9c");
        assert_eq!(upstream_id(&value).as_deref(), Some("cf-7f3a9c"));
    }

    #[test]
    fn test_upstream_id_rejected() {
        assert!(upstream_id(&HeaderValue::from_static("")).is_none());
        assert!(upstream_id(&HeaderValue::from_static("two words")).is_none());

        let long = "a".repeat(MAX_UPSTREAM_ID_LEN + 1);
        assert!(upstream_id(&HeaderValue::from_str(&long).unwrap()).is_none());
    }
}
