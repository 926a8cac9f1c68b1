//! End-to-end test harness for the Kruuse storefront.
//!
//! [`TestContext::start`] serves the full storefront router on an ephemeral
//! port, backed by the REST data store client pointed at a `wiremock`
//! server. Tests mount the store responses they need and drive the
//! storefront over real HTTP.
//!
//! ```rust,ignore
//! let ctx = TestContext::start().await;
//! ctx.mount_regions(fixtures::regions()).await;
//! let response = ctx.get("/").await;
//! ```

use std::time::Duration;

use kruuse_core::CountryCode;
use kruuse_storefront::backend::{Backend, PostgrestStore};
use kruuse_storefront::config::{RegionConfig, SupabaseConfig};
use kruuse_storefront::routes;
use kruuse_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::Value;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// API key the storefront sends to the mocked store.
pub const TEST_ANON_KEY: &str = "integration-test-anon-key";

/// Path of a table below the mocked store.
#[must_use]
pub fn table_path(table: &str) -> String {
    format!("/rest/v1/{table}")
}

/// A running storefront wired to a mocked data store.
pub struct TestContext {
    pub store: MockServer,
    pub client: reqwest::Client,
    base_url: String,
}

impl TestContext {
    /// Start a mock store and a storefront with `cl` as default region.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be bound or the client cannot be built.
    pub async fn start() -> Self {
        let store = MockServer::start().await;

        let supabase = SupabaseConfig {
            url: store.uri(),
            anon_key: SecretString::from(TEST_ANON_KEY),
            timeout: Duration::from_secs(2),
        };
        let backend = Backend::Postgrest(PostgrestStore::new(&supabase).expect("store client"));
        let region = RegionConfig::new(CountryCode::parse("cl").expect("valid country code"));
        let app = routes::app(AppState::new(backend, &region));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("storefront server");
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("HTTP client");

        Self {
            store,
            client,
            base_url: format!("http://{addr}"),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET` a storefront path without following redirects.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("storefront request")
    }

    /// Serve `regions` for the region cache's `regions` + `countries` read.
    pub async fn mount_regions(&self, regions: Value) {
        self.mount_regions_response(ResponseTemplate::new(200).set_body_json(regions), None)
            .await;
    }

    /// Serve an arbitrary response for the region read, optionally
    /// expecting an exact number of calls.
    pub async fn mount_regions_response(&self, response: ResponseTemplate, expected: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(table_path("regions")))
            .and(query_param("select", "*,countries(*)"))
            .and(header("apikey", TEST_ANON_KEY))
            .respond_with(response);

        match expected {
            Some(calls) => mock.expect(calls).mount(&self.store).await,
            None => mock.mount(&self.store).await,
        }
    }
}

/// Store fixtures shaped like the hosted REST interface's responses.
pub mod fixtures {
    use serde_json::{Value, json};

    /// Chile and United States regions with their countries.
    #[must_use]
    pub fn regions() -> Value {
        json!([
            {
                "id": "reg_cl",
                "name": "Chile",
                "currency_code": "clp",
                "tax_rate": 19,
                "countries": [{"id": 1, "iso_2": "cl", "name": "Chile", "region_id": "reg_cl"}]
            },
            {
                "id": "reg_us",
                "name": "United States",
                "currency_code": "usd",
                "tax_rate": 0,
                "countries": [{"id": 2, "iso_2": "us", "name": "United States", "region_id": "reg_us"}]
            }
        ])
    }

    /// Two published products; the first has a variant priced in two currencies.
    #[must_use]
    pub fn products() -> Value {
        json!([
            {
                "id": "prod_1",
                "handle": "gauze",
                "title": "Sterile gauze",
                "status": "published",
                "variants": [{
                    "id": "var_1",
                    "product_id": "prod_1",
                    "sku": "GZ-10",
                    "inventory_quantity": 40,
                    "prices": [
                        {"id": "price_2", "variant_id": "var_1", "amount": 1990, "currency_code": "clp"},
                        {"id": "price_1", "variant_id": "var_1", "amount": 3, "currency_code": "usd"}
                    ]
                }]
            },
            {
                "id": "prod_2",
                "handle": "bandage",
                "title": "Elastic bandage",
                "status": "published",
                "variants": []
            }
        ])
    }
}
