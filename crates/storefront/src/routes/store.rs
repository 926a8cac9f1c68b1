//! Store API handler.
//!
//! Forwards `/api/store/{*path}` to the routing adapter as
//! `/store/{path}`, passing query parameters and an optional JSON body.

use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::Method,
};
use serde_json::Value;

use crate::adapter::{FetchOptions, StoreMethod};
use crate::error::{AppError, Result};
use crate::state::AppState;

fn parse_body(bytes: &Bytes) -> Result<Option<Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
}

/// Handle any store request.
pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>> {
    let method = StoreMethod::try_from(&method)?;
    let options = FetchOptions {
        query,
        body: parse_body(&body)?,
    };

    let document = state
        .adapter()
        .fetch(method, &format!("/store/{path}"), &options)
        .await?;

    Ok(Json(document))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::tests::{body_json, get, test_app};

    fn send(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_product_list_over_http() {
        let (app, _) = test_app().await;

        let response = app
            .oneshot(get("/api/store/products?limit=1&region_id=reg_cl"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["limit"], 1);
        let product = &body["products"][0];
        assert_eq!(product["status"], "published");
        let price = &product["variants"][0]["calculated_price"];
        assert_eq!(price["currency_code"], "CLP");
        assert_eq!(price["calculated_amount"].as_f64(), Some(1990.0));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (app, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(get("/api/store/products/scalpel"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["type"], "not_found");

        let response = app
            .clone()
            .oneshot(get("/api/store/widgets"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["type"], "unsupported_operation");

        let response = app
            .clone()
            .oneshot(get("/api/store/collections?limit=0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/api/store/carts")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generic_writes_over_http() {
        let (app, store) = test_app().await;

        let response = app
            .clone()
            .oneshot(send(
                "POST",
                "/api/store/return-reasons",
                &json!({"id": "rr_1", "value": "damaged", "label": "Damaged"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["return_reason"]["label"], "Damaged");

        let response = app
            .oneshot(send("DELETE", "/api/store/return-reasons/rr_1", &Value::Null))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["deleted"], true);
        assert!(store.rows("return_reasons").await.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_bad_gateway() {
        let (app, store) = test_app().await;
        store.set_unavailable(true);

        let response = app.oneshot(get("/api/store/regions")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["message"], "Data store error");
    }
}
