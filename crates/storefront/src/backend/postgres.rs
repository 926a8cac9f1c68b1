//! Direct `PostgreSQL` backend.
//!
//! Produces the same nested documents as the REST interface by building them
//! in SQL: every row becomes `to_jsonb(row)`, and each embed is merged in as a
//! `jsonb_agg` sub-select over the child table.
//!
//! Table and column names can't be bound as parameters, so every identifier
//! is validated with [`validate_identifier`] and double-quoted before it is
//! written into the query text. Values are always bound.

use serde_json::Value;
use sqlx::postgres::Postgres;
use sqlx::{PgPool, QueryBuilder, Row as _};
use tracing::instrument;

use super::{BackendError, DataStore, Embed, Filter, Row, Rows, Select, validate_identifier};

/// Data store backed by a `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DataStore for PgStore {
    #[instrument(skip(self, query), fields(table = query.table))]
    async fn select(&self, query: &Select) -> Result<Rows, BackendError> {
        query.validate()?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        push_document(&mut builder, "t0", &query.embeds, 0);
        builder.push(" AS document FROM ");
        builder.push(quote_ident(query.table));
        builder.push(" t0");
        push_filters(&mut builder, &query.filters);
        builder.push(" ORDER BY t0.id");
        if let Some(range) = query.range {
            builder.push(" LIMIT ");
            builder.push_bind(to_i64(range.limit));
            builder.push(" OFFSET ");
            builder.push_bind(to_i64(range.offset));
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.try_get::<Value, _>("document").map_err(BackendError::from))
            .map(|document| document.and_then(into_row))
            .collect::<Result<Vec<_>, _>>()?;

        let total = if query.count {
            let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
            builder.push(quote_ident(query.table));
            builder.push(" t0");
            push_filters(&mut builder, &query.filters);
            let count = builder
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await?;
            Some(u64::try_from(count).unwrap_or_default())
        } else {
            None
        };

        Ok(Rows { rows, total })
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: &'static str, row: Row) -> Result<Row, BackendError> {
        validate_identifier(table)?;
        let columns = quoted_columns(row.keys().map(String::as_str))?;

        let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO ");
        builder.push(quote_ident(table));
        builder.push(" AS target");
        if columns.is_empty() {
            builder.push(" DEFAULT VALUES");
        } else {
            let list = columns.join(", ");
            builder.push(format!(" ({list}) SELECT {list} FROM jsonb_populate_record(NULL::"));
            builder.push(quote_ident(table));
            builder.push(", ");
            builder.push_bind(Value::Object(row));
            builder.push(")");
        }
        builder.push(" RETURNING to_jsonb(target) AS document");

        let document = builder
            .build_query_scalar::<Value>()
            .fetch_one(&self.pool)
            .await?;
        into_row(document)
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: &'static str,
        id: &str,
        patch: Row,
    ) -> Result<Option<Row>, BackendError> {
        validate_identifier(table)?;
        let columns = quoted_columns(patch.keys().map(String::as_str).filter(|c| *c != "id"))?;

        if columns.is_empty() {
            let existing = self
                .select(&Select::all(table).filter(Filter::eq("id", id)))
                .await?;
            return Ok(existing.rows.into_iter().next());
        }

        let assignments = columns
            .iter()
            .map(|column| format!("{column} = patch.{column}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE ");
        builder.push(quote_ident(table));
        builder.push(format!(" AS target SET {assignments} FROM jsonb_populate_record(NULL::"));
        builder.push(quote_ident(table));
        builder.push(", ");
        builder.push_bind(Value::Object(patch));
        builder.push(") AS patch WHERE target.id::text = ");
        builder.push_bind(id.to_owned());
        builder.push(" RETURNING to_jsonb(target) AS document");

        let document = builder
            .build_query_scalar::<Value>()
            .fetch_optional(&self.pool)
            .await?;
        document.map(into_row).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &'static str, id: &str) -> Result<bool, BackendError> {
        validate_identifier(table)?;

        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM ");
        builder.push(quote_ident(table));
        builder.push(" WHERE id::text = ");
        builder.push_bind(id.to_owned());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Push `to_jsonb(alias) || jsonb_build_object('embed', (...), ...)`.
fn push_document(
    builder: &mut QueryBuilder<'_, Postgres>,
    alias: &str,
    embeds: &[Embed],
    depth: usize,
) {
    builder.push(format!("to_jsonb({alias})"));
    if embeds.is_empty() {
        return;
    }

    let child = format!("t{}", depth + 1);
    builder.push(" || jsonb_build_object(");
    for (i, embed) in embeds.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(format!("'{}', COALESCE((SELECT jsonb_agg(", embed.alias));
        push_document(builder, &child, &embed.embeds, depth + 1);
        builder.push(format!(
            " ORDER BY {child}.id) FROM {table} {child} \
             WHERE {child}.{fk} = {alias}.id), '[]'::jsonb)",
            table = quote_ident(embed.table),
            fk = quote_ident(embed.foreign_key),
        ));
    }
    builder.push(")");
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::Eq { column, value } => {
                builder.push(format!("t0.{}::text = ", quote_ident(column)));
                builder.push_bind(value.clone());
            }
            Filter::AnyOf(pairs) => {
                builder.push("(");
                for (j, (column, value)) in pairs.iter().enumerate() {
                    if j > 0 {
                        builder.push(" OR ");
                    }
                    builder.push(format!("t0.{}::text = ", quote_ident(column)));
                    builder.push_bind(value.clone());
                }
                builder.push(")");
            }
        }
    }
}

fn quoted_columns<'a>(columns: impl Iterator<Item = &'a str>) -> Result<Vec<String>, BackendError> {
    columns
        .map(|column| validate_identifier(column).map(|()| quote_ident(column)))
        .collect()
}

fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn into_row(document: Value) -> Result<Row, BackendError> {
    match document {
        Value::Object(row) => Ok(row),
        other => Err(BackendError::InvalidResponse(format!(
            "expected a JSON object row, got {other}"
        ))),
    }
}
