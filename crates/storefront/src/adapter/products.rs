//! Product handlers and the calculated price view.

use kruuse_core::{CalculatedPrice, CurrencyCode, PriceId, ProductId, ProductStatus, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{
    Adapter, AdapterError, FetchOptions, Page, StoreMethod, StoreRequest, to_document, unsupported,
};
use crate::backend::{
    BackendError, DataStore, Embed, Filter, Row, Select, compare_key_text, null_as_default,
};

/// Default page size for product lists.
pub const PRODUCT_PAGE_SIZE: u64 = 12;

/// A published product with its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub status: ProductStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<Variant>,
    #[serde(flatten)]
    pub fields: Row,
}

/// A purchasable variant. `calculated_price` is derived on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inventory_quantity: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prices: Vec<Row>,
    #[serde(skip_deserializing)]
    pub calculated_price: Option<CalculatedPrice>,
    #[serde(flatten)]
    pub fields: Row,
}

/// The columns of a price row that feed the calculated price.
#[derive(Debug, Deserialize)]
struct PriceRow {
    id: PriceId,
    amount: Decimal,
    currency_code: CurrencyCode,
}

#[derive(Serialize)]
struct ProductList {
    products: Vec<Product>,
    count: u64,
    offset: u64,
    limit: u64,
}

#[derive(Serialize)]
struct ProductResponse {
    product: Product,
}

impl Product {
    /// Parse a product row with embedded variants and prices, and attach
    /// each variant's calculated price.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::DataCorruption` if the row is not a product.
    pub fn from_row(row: Row, preferred: Option<&CurrencyCode>) -> Result<Self, BackendError> {
        let mut product: Self = serde_json::from_value(Value::Object(row))
            .map_err(|e| BackendError::DataCorruption(format!("malformed product: {e}")))?;

        for variant in &mut product.variants {
            variant.fields.remove("calculated_price");
            variant.calculated_price = Some(calculated_price(&variant.prices, preferred));
        }
        Ok(product)
    }
}

/// Derive the calculated price view from a variant's price rows.
///
/// Prices in the `preferred` currency win when there are any; among the
/// candidates the row with the lowest id is used. Without usable prices the
/// view is zero in the fallback currency. Rows that cannot be read as a
/// price are skipped.
#[must_use]
pub fn calculated_price(prices: &[Row], preferred: Option<&CurrencyCode>) -> CalculatedPrice {
    let candidates: Vec<PriceRow> = prices
        .iter()
        .filter_map(
            |row| match serde_json::from_value::<PriceRow>(Value::Object(row.clone())) {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!(error = %e, price_id = ?row.get("id"), "Skipping unreadable price row");
                    None
                }
            },
        )
        .collect();

    let lowest_id = |a: &&PriceRow, b: &&PriceRow| compare_key_text(a.id.as_str(), b.id.as_str());
    let chosen = preferred
        .and_then(|currency| {
            candidates
                .iter()
                .filter(|price| &price.currency_code == currency)
                .min_by(lowest_id)
        })
        .or_else(|| candidates.iter().min_by(lowest_id));

    chosen.map_or_else(CalculatedPrice::unpriced, |price| {
        CalculatedPrice::from_source(
            Some(price.id.clone()),
            price.amount,
            price.currency_code.clone(),
        )
    })
}

fn variants_embed() -> Embed {
    Embed::new("variants", "product_variants", "product_id")
        .with(Embed::new("prices", "prices", "variant_id"))
}

fn options_embed() -> Embed {
    Embed::new("options", "product_options", "product_id")
        .with(Embed::new("values", "product_option_values", "option_id"))
}

impl<S: DataStore> Adapter<S> {
    pub(super) async fn products(
        &self,
        request: &StoreRequest,
        options: &FetchOptions,
    ) -> Result<Value, AdapterError> {
        if request.method != StoreMethod::Get {
            return Err(unsupported(request));
        }

        let preferred = self
            .region_currency(options.query.get("region_id").map(String::as_str))
            .await?;

        match &request.id {
            None => self.list_products(options, preferred.as_ref()).await,
            Some(id_or_handle) => self.product(id_or_handle, preferred.as_ref()).await,
        }
    }

    async fn list_products(
        &self,
        options: &FetchOptions,
        preferred: Option<&CurrencyCode>,
    ) -> Result<Value, AdapterError> {
        let page = Page::from_query(&options.query, PRODUCT_PAGE_SIZE)?;
        let query = Select::all("products")
            .embed(variants_embed())
            .filter(Filter::eq("status", ProductStatus::Published.as_str()))
            .range(page.offset, page.limit)
            .with_count();

        let result = self.store().select(&query).await?;
        let fetched = u64::try_from(result.rows.len()).unwrap_or(u64::MAX);

        let products = result
            .rows
            .into_iter()
            .map(|row| Product::from_row(row, preferred))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|product| {
                let visible = product.status.is_visible();
                if !visible {
                    warn!(
                        product_id = %product.id,
                        status = %product.status,
                        "Dropping unpublished product"
                    );
                }
                visible
            })
            .collect();

        to_document(&ProductList {
            products,
            count: result.total.unwrap_or(page.offset + fetched),
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn product(
        &self,
        id_or_handle: &str,
        preferred: Option<&CurrencyCode>,
    ) -> Result<Value, AdapterError> {
        let query = Select::all("products")
            .embed(variants_embed())
            .embed(options_embed())
            .filter(Filter::AnyOf(vec![
                ("id".to_owned(), id_or_handle.to_owned()),
                ("handle".to_owned(), id_or_handle.to_owned()),
            ]))
            .filter(Filter::eq("status", ProductStatus::Published.as_str()))
            .range(0, 1);

        let result = self.store().select(&query).await?;
        let product = result
            .rows
            .into_iter()
            .next()
            .map(|row| Product::from_row(row, preferred))
            .transpose()?
            .filter(|product| product.status.is_visible())
            .ok_or_else(|| AdapterError::NotFound(format!("product {id_or_handle} not found")))?;

        to_document(&ProductResponse { product })
    }
}
