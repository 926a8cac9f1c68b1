//! Cart handlers.
//!
//! Carts support creation, retrieval with line items, and updates through
//! `POST /store/carts/{id}`. Nothing else is exposed.

use serde_json::{Map, Value};

use super::{Adapter, AdapterError, FetchOptions, StoreMethod, StoreRequest, unsupported};
use crate::backend::{DataStore, Embed, Filter, Row, Select};

fn cart_document(cart: Row) -> Value {
    let mut document = Map::new();
    document.insert("cart".to_owned(), Value::Object(cart));
    Value::Object(document)
}

impl<S: DataStore> Adapter<S> {
    pub(super) async fn carts(
        &self,
        request: &StoreRequest,
        options: &FetchOptions,
    ) -> Result<Value, AdapterError> {
        match (request.method, request.id.as_deref()) {
            (StoreMethod::Post, None) => self.create_cart(options).await,
            (StoreMethod::Get, Some(id)) => self.cart(id).await,
            (StoreMethod::Post, Some(id)) => self.update_cart(id, options).await,
            _ => Err(unsupported(request)),
        }
    }

    async fn create_cart(&self, options: &FetchOptions) -> Result<Value, AdapterError> {
        let row = options.body_row()?;
        let mut cart = self.store().insert("carts", row).await?;
        cart.entry("items").or_insert_with(|| Value::Array(Vec::new()));
        Ok(cart_document(cart))
    }

    async fn cart(&self, id: &str) -> Result<Value, AdapterError> {
        let query = Select::all("carts")
            .embed(Embed::new("items", "line_items", "cart_id"))
            .filter(Filter::eq("id", id))
            .range(0, 1);

        let cart = self
            .store()
            .select(&query)
            .await?
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::NotFound(format!("cart {id} not found")))?;

        Ok(cart_document(cart))
    }

    async fn update_cart(&self, id: &str, options: &FetchOptions) -> Result<Value, AdapterError> {
        let mut patch = options.body_row()?;
        patch.remove("items");

        self.store()
            .update("carts", id, patch)
            .await?
            .ok_or_else(|| AdapterError::NotFound(format!("cart {id} not found")))?;

        self.cart(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryStore;

    #[tokio::test]
    async fn test_create_fetch_and_update_cart() {
        let store = MemoryStore::new();
        let adapter = Adapter::new(store.clone());

        let created = adapter
            .fetch(
                StoreMethod::Post,
                "/store/carts",
                &FetchOptions::default().with_body(json!({"region_id": "reg_cl"})),
            )
            .await
            .unwrap();
        assert_eq!(created["cart"]["region_id"], "reg_cl");
        assert_eq!(created["cart"]["items"], json!([]));
        let id = created["cart"]["id"].as_str().unwrap().to_owned();

        store
            .seed(
                "line_items",
                [json!({"id": "li_1", "cart_id": id, "variant_id": "var_1", "quantity": 2})],
            )
            .await;

        let fetched = adapter
            .fetch(
                StoreMethod::Get,
                &format!("/store/carts/{id}"),
                &FetchOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(fetched["cart"]["items"][0]["quantity"], 2);

        let updated = adapter
            .fetch(
                StoreMethod::Post,
                &format!("/store/carts/{id}"),
                &FetchOptions::default().with_body(json!({"email": "vet@kruuse.cl"})),
            )
            .await
            .unwrap();
        assert_eq!(updated["cart"]["email"], "vet@kruuse.cl");
        assert_eq!(updated["cart"]["region_id"], "reg_cl");
        assert_eq!(updated["cart"]["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_errors() {
        let adapter = Adapter::new(MemoryStore::new());

        let err = adapter
            .fetch(StoreMethod::Get, "/store/carts/cart_missing", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(_)));

        let err = adapter
            .fetch(StoreMethod::Get, "/store/carts", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedOperation(_)));

        let err = adapter
            .fetch(StoreMethod::Delete, "/store/carts/cart_1", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedOperation(_)));
    }
}
