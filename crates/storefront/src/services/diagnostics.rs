//! Adapter diagnostics.
//!
//! [`adapter_report`] runs a fixed set of list requests through the routing
//! adapter and records, per check, the number of rows returned or the error.
//! [`probe_store`] bypasses the adapter and reads the raw tables.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::adapter::{Adapter, FetchOptions, StoreMethod};
use crate::backend::{BackendError, DataStore, Embed, Row, Select};

/// Adapter name reported in diagnostics.
pub const ADAPTER_NAME: &str = "Generic store adapter";

/// `(label, path, response key)` for each adapter check.
const CHECKS: &[(&str, &str, &str)] = &[
    ("Collections", "/store/collections", "collections"),
    ("Product Categories", "/store/product-categories", "product_categories"),
    ("Products (special)", "/store/products", "products"),
    ("Regions (special)", "/store/regions", "regions"),
];

/// Result of one adapter check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub test: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Outcome of all adapter checks.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterReport {
    pub success: bool,
    pub adapter: &'static str,
    pub tests: Vec<CheckOutcome>,
    pub summary: Summary,
}

impl AdapterReport {
    fn from_outcomes(tests: Vec<CheckOutcome>) -> Self {
        let passed = tests.iter().filter(|t| t.success).count();
        let summary = Summary {
            total: tests.len(),
            passed,
            failed: tests.len() - passed,
        };

        Self {
            success: summary.failed == 0,
            adapter: ADAPTER_NAME,
            tests,
            summary,
        }
    }
}

/// Run every adapter check. Individual failures are recorded, not returned.
#[instrument(skip_all)]
pub async fn adapter_report<S: DataStore>(adapter: &Adapter<S>) -> AdapterReport {
    let mut tests = Vec::with_capacity(CHECKS.len());

    for &(test, path, key) in CHECKS {
        let outcome = match adapter
            .fetch(StoreMethod::Get, path, &FetchOptions::default())
            .await
        {
            Ok(document) => CheckOutcome {
                test,
                success: true,
                count: Some(document[key].as_array().map_or(0, Vec::len)),
                error: None,
            },
            Err(e) => {
                warn!(check = test, error = %e, "Adapter check failed");
                CheckOutcome {
                    test,
                    success: false,
                    count: None,
                    error: Some(e.to_string()),
                }
            }
        };
        tests.push(outcome);
    }

    let report = AdapterReport::from_outcomes(tests);
    info!(
        passed = report.summary.passed,
        failed = report.summary.failed,
        "Adapter diagnostics complete"
    );
    report
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeData {
    pub products: Vec<Value>,
    pub regions: Vec<Value>,
}

/// Raw table reads: a few products and every region with its countries.
#[derive(Debug, Clone, Serialize)]
pub struct StoreProbe {
    pub success: bool,
    pub products: usize,
    pub regions: usize,
    pub data: ProbeData,
}

fn values(rows: Vec<Row>) -> Vec<Value> {
    rows.into_iter().map(Value::Object).collect()
}

/// Read the raw `products` and `regions` tables.
///
/// # Errors
///
/// Returns the first `BackendError` encountered.
#[instrument(skip_all)]
pub async fn probe_store<S: DataStore>(store: &S) -> Result<StoreProbe, BackendError> {
    let products = store
        .select(&Select::all("products").range(0, 3))
        .await?
        .rows;
    let regions = store
        .select(&Select::all("regions").embed(Embed::new("countries", "countries", "region_id")))
        .await?
        .rows;

    Ok(StoreProbe {
        success: true,
        products: products.len(),
        regions: regions.len(),
        data: ProbeData {
            products: values(products),
            regions: values(regions),
        },
    })
}
