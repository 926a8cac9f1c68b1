//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding to the client. All route handlers should return
//! `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::adapter::AdapterError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store request failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Stable error kind for the JSON body.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Adapter(err) => err.kind(),
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "invalid_request",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Adapter(AdapterError::NotFound(_) | AdapterError::UnsupportedOperation(_))
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Adapter(AdapterError::InvalidRequest(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Adapter(AdapterError::Backend(_)) => StatusCode::BAD_GATEWAY,
            Self::Adapter(AdapterError::Encoding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Adapter(AdapterError::Backend(_) | AdapterError::Encoding(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose backend details to clients
        let message = match &self {
            Self::Adapter(AdapterError::Backend(_)) => "Data store error".to_string(),
            Self::Adapter(AdapterError::Encoding(_)) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = json!({
            "type": self.kind(),
            "message": message,
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;
    use crate::backend::BackendError;

    fn encoding_error() -> serde_json::Error {
        serde_json::from_str::<Value>("{").unwrap_err()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("region xx".to_string());
        assert_eq!(err.to_string(), "Not found: region xx");

        let err = AppError::from(AdapterError::InvalidRequest("limit".to_string()));
        assert_eq!(err.to_string(), "invalid request: limit");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AdapterError::NotFound("p".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AdapterError::UnsupportedOperation("x".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AdapterError::InvalidRequest("x".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                AdapterError::Backend(BackendError::InvalidResponse("x".to_string())).into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AdapterError::Encoding(encoding_error()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_backend_details_are_hidden() {
        let err = AppError::from(AdapterError::Backend(BackendError::Api {
            status: 500,
            message: "relation \"secret_table\" does not exist".to_string(),
        }));

        let body = body_json(err.into_response()).await;
        assert_eq!(body["type"], "backend_failure");
        assert_eq!(body["message"], "Data store error");
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let err = AppError::from(AdapterError::NotFound("product gauze not found".to_string()));

        let body = body_json(err.into_response()).await;
        assert_eq!(body["type"], "not_found");
        assert_eq!(body["message"], "product gauze not found");
    }

    #[tokio::test]
    async fn test_encoding_failure_is_internal() {
        let err = AppError::from(AdapterError::Encoding(encoding_error()));

        let body = body_json(err.into_response()).await;
        assert_eq!(body["type"], "internal_error");
        assert_eq!(body["message"], "Internal server error");
    }
}
