//! Store API documents over HTTP against a mocked data store.

use kruuse_integration_tests::{TEST_ANON_KEY, TestContext, fixtures, table_path};
use reqwest::StatusCode;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_product_list_document() {
    let ctx = TestContext::start().await;
    Mock::given(method("GET"))
        .and(path(table_path("products")))
        .and(query_param("select", "*,variants:product_variants(*,prices(*))"))
        .and(query_param("status", "eq.published"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "0"))
        .and(header("Prefer", "count=exact"))
        .and(header("Authorization", format!("Bearer {TEST_ANON_KEY}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-1/5")
                .set_body_json(fixtures::products()),
        )
        .expect(1)
        .mount(&ctx.store)
        .await;

    let response = ctx.get("/api/store/products?limit=2").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["count"], 5);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["limit"], 2);

    let products = body["products"].as_array().expect("products array");
    assert_eq!(products.len(), 2);
    assert!(products.iter().all(|p| p["status"] == "published"));

    // Without a region the lowest price id wins
    let price = &products[0]["variants"][0]["calculated_price"];
    assert_eq!(price["currency_code"], "USD");
    assert_eq!(price["calculated_amount"].as_f64(), Some(3.0));
    assert_eq!(price["original_amount"].as_f64(), Some(3.0));
    assert_eq!(products[1]["variants"], json!([]));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let ctx = TestContext::start().await;
    Mock::given(method("GET"))
        .and(path(table_path("products")))
        .and(query_param("or", r#"(id.eq."scalpel",handle.eq."scalpel")"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.store)
        .await;

    let response = ctx.get("/api/store/products/scalpel").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["type"], "not_found");
}

#[tokio::test]
async fn test_generic_list_uses_plural_key() {
    let ctx = TestContext::start().await;
    Mock::given(method("GET"))
        .and(path(table_path("product_categories")))
        .and(query_param("handle", "eq.surgery"))
        .and(query_param("limit", "20"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-0/1")
                .set_body_json(json!([{"id": "pcat_2", "handle": "surgery"}])),
        )
        .mount(&ctx.store)
        .await;

    let response = ctx.get("/api/store/product-categories?handle=surgery").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["count"], 1);
    assert_eq!(body["product_categories"][0]["id"], "pcat_2");
}

#[tokio::test]
async fn test_region_document_shape() {
    let ctx = TestContext::start().await;
    ctx.mount_regions(fixtures::regions()).await;

    let response = ctx.get("/api/store/regions").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    let regions = body["regions"].as_array().expect("regions array");
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0]["countries"][0]["iso_2"], "cl");
    assert_eq!(regions[0]["payment_providers"], json!([]));
    assert_eq!(regions[1]["tax_rate"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn test_store_error_is_bad_gateway() {
    let ctx = TestContext::start().await;
    Mock::given(method("GET"))
        .and(path(table_path("collections")))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"message": "relation \"collections\" does not exist"})),
        )
        .mount(&ctx.store)
        .await;

    let response = ctx.get("/api/store/collections").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["type"], "backend_failure");
    assert_eq!(body["message"], "Data store error");
}

#[tokio::test]
async fn test_cart_creation_round_trip() {
    let ctx = TestContext::start().await;
    Mock::given(method("POST"))
        .and(path(table_path("carts")))
        .and(header("Prefer", "return=representation"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([{"id": "cart_1", "region_id": "reg_cl"}])),
        )
        .expect(1)
        .mount(&ctx.store)
        .await;

    let response = ctx
        .client
        .post(ctx.url("/api/store/carts"))
        .json(&json!({"region_id": "reg_cl"}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["cart"]["id"], "cart_1");
    assert_eq!(body["cart"]["items"], json!([]));
}

#[tokio::test]
async fn test_readiness_pings_store() {
    let ctx = TestContext::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&ctx.store)
        .await;

    let response = ctx.get("/health/ready").await;

    assert_eq!(response.status(), StatusCode::OK);
}
