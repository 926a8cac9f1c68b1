//! Region handlers.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::{Adapter, AdapterError, StoreMethod, StoreRequest, to_document, unsupported};
use crate::backend::{DataStore, Filter};
use crate::region::Region;

/// A region as returned to storefront clients.
///
/// Provider lists are always empty; payment and fulfillment are not
/// configured through the data store.
#[derive(Debug, Clone, Serialize)]
pub struct RegionDocument {
    #[serde(flatten)]
    pub region: Region,
    pub payment_providers: Vec<Value>,
    pub fulfillment_providers: Vec<Value>,
}

impl From<Region> for RegionDocument {
    fn from(mut region: Region) -> Self {
        region.fields.remove("payment_providers");
        region.fields.remove("fulfillment_providers");
        Self {
            region,
            payment_providers: Vec::new(),
            fulfillment_providers: Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct RegionList {
    regions: Vec<RegionDocument>,
}

#[derive(Serialize)]
struct RegionResponse {
    region: RegionDocument,
}

impl<S: DataStore> Adapter<S> {
    pub(super) async fn regions(&self, request: &StoreRequest) -> Result<Value, AdapterError> {
        if request.method != StoreMethod::Get {
            return Err(unsupported(request));
        }

        match &request.id {
            None => self.list_regions().await,
            Some(id) => self.region(id).await,
        }
    }

    async fn list_regions(&self) -> Result<Value, AdapterError> {
        let result = self.store().select(&Region::select()).await?;

        let regions = result
            .rows
            .into_iter()
            .filter_map(|row| match Region::from_row(row) {
                Ok(region) => Some(RegionDocument::from(region)),
                Err(e) => {
                    warn!(error = %e, "Dropping invalid region from list");
                    None
                }
            })
            .collect();

        to_document(&RegionList { regions })
    }

    async fn region(&self, id: &str) -> Result<Value, AdapterError> {
        let query = Region::select().filter(Filter::eq("id", id)).range(0, 1);
        let result = self.store().select(&query).await?;

        let row = result
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::NotFound(format!("region {id} not found")))?;
        let region = Region::from_row(row)?;

        to_document(&RegionResponse {
            region: region.into(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapter::FetchOptions;
    use crate::adapter::tests::seeded_store;
    use crate::backend::MemoryStore;

    #[tokio::test]
    async fn test_list_regions_shape() {
        let adapter = Adapter::new(seeded_store().await);

        let response = adapter
            .fetch(StoreMethod::Get, "/store/regions", &FetchOptions::default())
            .await
            .unwrap();

        let regions = response["regions"].as_array().unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0]["id"], "reg_cl");
        assert_eq!(regions[0]["name"], "Chile");
        assert_eq!(regions[0]["payment_providers"], json!([]));
        assert_eq!(regions[0]["fulfillment_providers"], json!([]));
        assert_eq!(regions[0]["countries"][0]["iso_2"], "cl");
        assert_eq!(regions[1]["currency_code"], "USD");
    }

    #[tokio::test]
    async fn test_list_regions_drops_corrupt_and_dedupes_countries() {
        let store = MemoryStore::new();
        store
            .seed(
                "regions",
                [
                    json!({"id": "reg_eu", "currency_code": "eur", "tax_rate": 21}),
                    json!({"id": "reg_bad", "currency_code": "eur", "tax_rate": -5}),
                ],
            )
            .await;
        store
            .seed(
                "countries",
                [
                    json!({"id": 1, "iso_2": "ES", "region_id": "reg_eu"}),
                    json!({"id": 2, "iso_2": "es", "region_id": "reg_eu"}),
                    json!({"id": 3, "iso_2": "fr", "region_id": "reg_eu"}),
                ],
            )
            .await;
        let adapter = Adapter::new(store);

        let response = adapter
            .fetch(StoreMethod::Get, "/store/regions", &FetchOptions::default())
            .await
            .unwrap();

        let regions = response["regions"].as_array().unwrap();
        assert_eq!(regions.len(), 1);
        assert!(regions[0]["tax_rate"].as_f64().unwrap() >= 0.0);
        let codes: Vec<&str> = regions[0]["countries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["iso_2"].as_str().unwrap())
            .collect();
        assert_eq!(codes, ["es", "fr"]);

        let err = adapter
            .fetch(StoreMethod::Get, "/store/regions/reg_bad", &FetchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "backend_failure");
    }

    #[tokio::test]
    async fn test_integer_keys_keep_their_json_type() {
        let store = MemoryStore::new();
        store
            .seed("regions", [json!({"id": 7, "currency_code": "clp", "tax_rate": 19})])
            .await;
        store
            .seed("countries", [json!({"id": 1, "iso_2": "cl", "region_id": 7})])
            .await;
        let adapter = Adapter::new(store);

        let response = adapter
            .fetch(StoreMethod::Get, "/store/regions", &FetchOptions::default())
            .await
            .unwrap();
        let region = &response["regions"][0];
        assert_eq!(region["id"], json!(7));
        assert_eq!(region["countries"][0]["id"], json!(1));
        assert_eq!(region["countries"][0]["region_id"], json!(7));

        let response = adapter
            .fetch(StoreMethod::Get, "/store/regions/7", &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(response["region"]["id"], json!(7));
    }

    #[tokio::test]
    async fn test_single_region() {
        let adapter = Adapter::new(seeded_store().await);

        let response = adapter
            .fetch(StoreMethod::Get, "/store/regions/reg_us", &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(response["region"]["id"], "reg_us");
        assert_eq!(response["region"]["countries"][0]["iso_2"], "us");

        let err = adapter
            .fetch(StoreMethod::Get, "/store/regions/reg_xx", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(_)));
    }
}
