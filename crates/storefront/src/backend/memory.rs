//! In-process data store.
//!
//! Tables are plain vectors of JSON rows behind a `tokio` lock. Embeds,
//! filters, ordering and counting follow the same rules as the SQL-backed
//! stores, so adapter behavior can be exercised without a database. Unknown
//! tables read as empty.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BackendError, DataStore, Embed, Row, Rows, Select, compare_key_text, value_text};

/// In-memory tables keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table. Non-object values are ignored.
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_owned()).or_default();
        entries.extend(rows.into_iter().filter_map(|value| match value {
            Value::Object(row) => Some(row),
            _ => None,
        }));
    }

    /// Snapshot of a table's rows, in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every operation fail as if the store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                message: "store unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

impl DataStore for MemoryStore {
    async fn select(&self, query: &Select) -> Result<Rows, BackendError> {
        self.check_available()?;
        query.validate()?;

        let tables = self.tables.read().await;
        let mut matching: Vec<&Row> = tables
            .get(query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| f.matches(row)))
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by(|a, b| compare_keys(a.get("id"), b.get("id")));

        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let (skip, take) = query.range.map_or((0, usize::MAX), |range| {
            (
                usize::try_from(range.offset).unwrap_or(usize::MAX),
                usize::try_from(range.limit).unwrap_or(usize::MAX),
            )
        });

        let rows = matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| embed_children(&tables, row, &query.embeds))
            .collect();

        Ok(Rows {
            rows,
            total: query.count.then_some(total),
        })
    }

    async fn insert(&self, table: &'static str, mut row: Row) -> Result<Row, BackendError> {
        self.check_available()?;
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

        let mut tables = self.tables.write().await;
        tables.entry(table.to_owned()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &'static str,
        id: &str,
        patch: Row,
    ) -> Result<Option<Row>, BackendError> {
        self.check_available()?;

        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row).as_deref() == Some(id)))
        else {
            return Ok(None);
        };

        for (column, value) in patch {
            if column != "id" {
                row.insert(column, value);
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: &'static str, id: &str) -> Result<bool, BackendError> {
        self.check_available()?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|row| row_id(row).as_deref() != Some(id));
        Ok(rows.len() < before)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.check_available()
    }
}

fn row_id(row: &Row) -> Option<String> {
    row.get("id").and_then(value_text)
}

/// Copy `row` and attach each embed's child rows, recursively.
fn embed_children(tables: &HashMap<String, Vec<Row>>, row: &Row, embeds: &[Embed]) -> Row {
    let mut document = row.clone();
    let parent_id = row_id(row);

    for embed in embeds {
        let mut children: Vec<&Row> = match (&parent_id, tables.get(embed.table)) {
            (Some(parent_id), Some(rows)) => rows
                .iter()
                .filter(|child| {
                    child.get(embed.foreign_key).and_then(value_text).as_ref() == Some(parent_id)
                })
                .collect(),
            _ => Vec::new(),
        };
        children.sort_by(|a, b| compare_keys(a.get("id"), b.get("id")));

        let nested = children
            .into_iter()
            .map(|child| Value::Object(embed_children(tables, child, &embed.embeds)))
            .collect();
        document.insert(embed.alias.to_owned(), Value::Array(nested));
    }

    document
}

/// Order `id` values like the SQL stores do. Missing keys sort last.
fn compare_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(value_text), b.and_then(value_text)) {
        (Some(a), Some(b)) => compare_key_text(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
