//! Diagnostic endpoints for checking a deployment against its data store.

use axum::{Json, extract::State};

use crate::adapter::AdapterError;
use crate::error::Result;
use crate::services::{AdapterReport, StoreProbe, adapter_report, probe_store};
use crate::state::AppState;

/// Run the adapter smoke checks. Always `200`; failures are in the report.
pub async fn adapter(State(state): State<AppState>) -> Json<AdapterReport> {
    Json(adapter_report(state.adapter()).await)
}

/// Read raw products and regions from the data store.
pub async fn data_store(State(state): State<AppState>) -> Result<Json<StoreProbe>> {
    let probe = probe_store(state.backend())
        .await
        .map_err(AdapterError::from)?;
    Ok(Json(probe))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::routes::tests::{body_json, get, test_app};

    #[tokio::test]
    async fn test_adapter_report_routes() {
        let (app, _) = test_app().await;

        for uri in ["/api/test-adapter", "/test"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["success"], true);
            assert_eq!(body["summary"]["total"], 4);
        }
    }

    #[tokio::test]
    async fn test_adapter_report_with_store_down() {
        let (app, store) = test_app().await;
        store.set_unavailable(true);

        let response = app.oneshot(get("/api/test-adapter")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["summary"]["failed"], 4);
    }

    #[tokio::test]
    async fn test_data_store_probe() {
        let (app, store) = test_app().await;

        let response = app.clone().oneshot(get("/api/test-supabase")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["products"], 3);
        assert_eq!(body["regions"], 2);

        store.set_unavailable(true);
        let response = app.oneshot(get("/api/test-supabase")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
