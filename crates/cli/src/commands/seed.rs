//! Seed the data store from a YAML file.
//!
//! ```yaml
//! regions:
//!   - id: reg_cl
//!     name: Chile
//!     currency_code: clp
//!     tax_rate: 19
//!     countries:
//!       - { id: ctry_cl, iso_2: cl, name: Chile }
//! products:
//!   - id: prod_gauze
//!     handle: gauze
//!     title: Sterile gauze
//!     status: published
//!     variants:
//!       - id: var_gauze_10
//!         sku: GZ-10
//!         inventory_quantity: 40
//!         prices:
//!           - { id: price_gauze_clp, amount: 1990, currency_code: clp }
//! tables:
//!   product_categories:
//!     - { id: pcat_surgery, name: Surgery, handle: surgery }
//! ```
//!
//! Nested rows get their parent key (`region_id`, `product_id`,
//! `variant_id`) filled in. Rows are written through the configured data
//! store, so the same file seeds the hosted store and a direct database.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use kruuse_storefront::adapter::CATALOG;
use kruuse_storefront::backend::{BackendError, DataStore, Row, value_text};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("{table} row is missing a string id")]
    MissingId { table: &'static str },

    #[error("unknown table {0:?}")]
    UnknownTable(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub regions: Vec<RegionSeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
    /// Rows for plain catalog tables, keyed by table name.
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Row>>,
}

#[derive(Debug, Deserialize)]
pub struct RegionSeed {
    #[serde(default)]
    pub countries: Vec<Row>,
    #[serde(flatten)]
    pub fields: Row,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    #[serde(default)]
    pub variants: Vec<VariantSeed>,
    #[serde(flatten)]
    pub fields: Row,
}

#[derive(Debug, Deserialize)]
pub struct VariantSeed {
    #[serde(default)]
    pub prices: Vec<Row>,
    #[serde(flatten)]
    pub fields: Row,
}

/// Rows written per table.
pub type SeedSummary = BTreeMap<&'static str, usize>;

struct Seeder<'a, S> {
    store: &'a S,
    summary: SeedSummary,
}

impl<S: DataStore> Seeder<'_, S> {
    /// Insert `row` and return its id.
    async fn insert(&mut self, table: &'static str, row: Row) -> Result<String, SeedError> {
        let row = self.store.insert(table, row).await?;
        *self.summary.entry(table).or_default() += 1;

        row.get("id")
            .and_then(value_text)
            .ok_or(SeedError::MissingId { table })
    }

    async fn insert_children(
        &mut self,
        table: &'static str,
        parent_key: &str,
        parent_id: &str,
        rows: Vec<Row>,
    ) -> Result<Vec<String>, SeedError> {
        let mut ids = Vec::with_capacity(rows.len());
        for mut row in rows {
            row.insert(parent_key.to_owned(), Value::String(parent_id.to_owned()));
            ids.push(self.insert(table, row).await?);
        }
        Ok(ids)
    }
}

fn catalog_table(name: &str) -> Result<&'static str, SeedError> {
    CATALOG
        .iter()
        .find(|entry| entry.table == name)
        .map(|entry| entry.table)
        .ok_or_else(|| SeedError::UnknownTable(name.to_owned()))
}

/// Write every row of `file` to `store`, parents before children.
///
/// # Errors
///
/// Returns `SeedError` on the first failed write or unknown table. Rows
/// written before the failure are kept.
pub async fn apply<S: DataStore>(store: &S, file: SeedFile) -> Result<SeedSummary, SeedError> {
    let mut seeder = Seeder {
        store,
        summary: SeedSummary::new(),
    };

    // Validate generic table names before writing anything
    let tables = file
        .tables
        .into_iter()
        .map(|(name, rows)| catalog_table(&name).map(|table| (table, rows)))
        .collect::<Result<Vec<_>, _>>()?;

    for region in file.regions {
        let region_id = seeder.insert("regions", region.fields).await?;
        seeder
            .insert_children("countries", "region_id", &region_id, region.countries)
            .await?;
    }

    for product in file.products {
        let product_id = seeder.insert("products", product.fields).await?;
        for variant in product.variants {
            let mut row = variant.fields;
            row.insert("product_id".to_owned(), Value::String(product_id.clone()));
            let variant_id = seeder.insert("product_variants", row).await?;
            seeder
                .insert_children("prices", "variant_id", &variant_id, variant.prices)
                .await?;
        }
    }

    for (table, rows) in tables {
        for row in rows {
            seeder.insert(table, row).await?;
        }
    }

    Ok(seeder.summary)
}

/// Seed the configured data store from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, configuration is
/// invalid, or a write fails.
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    let (_, backend) = super::connect().await?;
    let summary = apply(&backend, file).await?;

    info!("Seeding complete!");
    for (table, count) in &summary {
        info!("  {table}: {count}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kruuse_storefront::backend::MemoryStore;

    use super::*;

    const CATALOG_YAML: &str = r"
regions:
  - id: reg_cl
    name: Chile
    currency_code: clp
    tax_rate: 19
    countries:
      - { id: ctry_cl, iso_2: cl, name: Chile }
products:
  - id: prod_gauze
    handle: gauze
    title: Sterile gauze
    status: published
    variants:
      - id: var_gauze_10
        sku: GZ-10
        inventory_quantity: 40
        prices:
          - { id: price_gauze_clp, amount: 1990, currency_code: clp }
tables:
  product_categories:
    - { id: pcat_surgery, name: Surgery, handle: surgery }
";

    #[tokio::test]
    async fn test_apply_links_children() {
        let store = MemoryStore::new();
        let file: SeedFile = serde_yaml::from_str(CATALOG_YAML).unwrap();

        let summary = apply(&store, file).await.unwrap();

        assert_eq!(summary["regions"], 1);
        assert_eq!(summary["prices"], 1);
        assert_eq!(summary["product_categories"], 1);

        let countries = store.rows("countries").await;
        assert_eq!(countries[0]["region_id"], "reg_cl");
        let prices = store.rows("prices").await;
        assert_eq!(prices[0]["variant_id"], "var_gauze_10");
        let variants = store.rows("product_variants").await;
        assert_eq!(variants[0]["product_id"], "prod_gauze");
    }

    #[tokio::test]
    async fn test_unknown_table_writes_nothing() {
        let store = MemoryStore::new();
        let file: SeedFile = serde_yaml::from_str(
            "regions:\n  - { id: reg_cl, currency_code: clp }\ntables:\n  users: [{ id: u1 }]\n",
        )
        .unwrap();

        let err = apply(&store, file).await.unwrap_err();

        assert!(matches!(err, SeedError::UnknownTable(name) if name == "users"));
        assert!(store.rows("regions").await.is_empty());
    }

    #[tokio::test]
    async fn test_generated_ids_are_propagated() {
        let store = MemoryStore::new();
        let file: SeedFile = serde_yaml::from_str(
            "regions:\n  - currency_code: usd\n    countries: [{ iso_2: us }]\n",
        )
        .unwrap();

        apply(&store, file).await.unwrap();

        let region_id = store.rows("regions").await[0]["id"].clone();
        assert_eq!(store.rows("countries").await[0]["region_id"], region_id);
    }
}
