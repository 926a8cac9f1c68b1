//! Generic table operations for catalog resources without a dedicated
//! handler.
//!
//! | method | path | response |
//! |--------|------|----------|
//! | `GET` | `/store/{resource}` | `{ <plural>: [...], count, offset, limit }` |
//! | `GET` | `/store/{resource}/{id}` | `{ <singular>: row }` |
//! | `POST` | `/store/{resource}` | `{ <singular>: row }` |
//! | `POST`, `PUT`, `PATCH` | `/store/{resource}/{id}` | `{ <singular>: row }` |
//! | `DELETE` | `/store/{resource}/{id}` | `{ id, object, deleted: true }` |

use serde_json::{Map, Value};

use super::request::RESERVED_PARAMS;
use super::{
    Adapter, AdapterError, FetchOptions, Page, StoreMethod, StoreRequest, TableResource, unsupported,
};
use crate::backend::{DataStore, Filter, Row, Select, validate_identifier};

/// Default page size for generic lists.
pub const GENERIC_PAGE_SIZE: u64 = 20;

fn keyed(key: &str, value: Value) -> Value {
    let mut document = Map::new();
    document.insert(key.to_owned(), value);
    Value::Object(document)
}

/// Equality filters from every non-reserved query parameter.
fn list_filters(options: &FetchOptions) -> Result<Vec<Filter>, AdapterError> {
    options
        .query
        .iter()
        .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
        .map(|(key, value)| {
            validate_identifier(key)
                .map(|()| Filter::eq(key.as_str(), value.as_str()))
                .map_err(|_| {
                    AdapterError::InvalidRequest(format!("invalid filter parameter {key:?}"))
                })
        })
        .collect()
}

impl<S: DataStore> Adapter<S> {
    pub(super) async fn generic(
        &self,
        entry: &'static TableResource,
        request: &StoreRequest,
        options: &FetchOptions,
    ) -> Result<Value, AdapterError> {
        match (request.method, request.id.as_deref()) {
            (StoreMethod::Get, None) => self.list_rows(entry, options).await,
            (StoreMethod::Get, Some(id)) => self.get_row(entry, id).await,
            (StoreMethod::Post, None) => self.insert_row(entry, options).await,
            (StoreMethod::Post | StoreMethod::Put | StoreMethod::Patch, Some(id)) => {
                self.update_row(entry, id, options).await
            }
            (StoreMethod::Delete, Some(id)) => self.delete_row(entry, id).await,
            _ => Err(unsupported(request)),
        }
    }

    async fn list_rows(
        &self,
        entry: &'static TableResource,
        options: &FetchOptions,
    ) -> Result<Value, AdapterError> {
        let page = Page::from_query(&options.query, GENERIC_PAGE_SIZE)?;
        let mut query = Select::all(entry.table)
            .range(page.offset, page.limit)
            .with_count();
        for filter in list_filters(options)? {
            query = query.filter(filter);
        }

        let result = self.store().select(&query).await?;
        let fetched = u64::try_from(result.rows.len()).unwrap_or(u64::MAX);
        let count = result.total.unwrap_or(page.offset + fetched);

        let mut document = Map::new();
        document.insert(
            entry.plural(),
            Value::Array(result.rows.into_iter().map(Value::Object).collect()),
        );
        document.insert("count".to_owned(), count.into());
        document.insert("offset".to_owned(), page.offset.into());
        document.insert("limit".to_owned(), page.limit.into());
        Ok(Value::Object(document))
    }

    async fn get_row(
        &self,
        entry: &'static TableResource,
        id: &str,
    ) -> Result<Value, AdapterError> {
        let query = Select::all(entry.table)
            .filter(Filter::eq("id", id))
            .range(0, 1);

        let row = self
            .store()
            .select(&query)
            .await?
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| not_found(entry, id))?;

        Ok(keyed(entry.singular, Value::Object(row)))
    }

    async fn insert_row(
        &self,
        entry: &'static TableResource,
        options: &FetchOptions,
    ) -> Result<Value, AdapterError> {
        let row = self.store().insert(entry.table, options.body_row()?).await?;
        Ok(keyed(entry.singular, Value::Object(row)))
    }

    async fn update_row(
        &self,
        entry: &'static TableResource,
        id: &str,
        options: &FetchOptions,
    ) -> Result<Value, AdapterError> {
        let row: Row = self
            .store()
            .update(entry.table, id, options.body_row()?)
            .await?
            .ok_or_else(|| not_found(entry, id))?;

        Ok(keyed(entry.singular, Value::Object(row)))
    }

    async fn delete_row(
        &self,
        entry: &'static TableResource,
        id: &str,
    ) -> Result<Value, AdapterError> {
        if !self.store().delete(entry.table, id).await? {
            return Err(not_found(entry, id));
        }

        let mut document = Map::new();
        document.insert("id".to_owned(), Value::String(id.to_owned()));
        document.insert("object".to_owned(), Value::String(entry.singular.to_owned()));
        document.insert("deleted".to_owned(), Value::Bool(true));
        Ok(Value::Object(document))
    }
}

fn not_found(entry: &TableResource, id: &str) -> AdapterError {
    AdapterError::NotFound(format!("{} {id} not found", entry.singular))
}
