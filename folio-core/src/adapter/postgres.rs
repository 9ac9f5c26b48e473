//! PostgreSQL table adapter
//!
//! Queries a single table (or view) with optional equality filters. Sort
//! orders become `ORDER BY` columns and the page window becomes
//! `LIMIT`/`OFFSET`; all values are bound, identifiers are quoted.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::BackendAdapter;
use crate::query::{OrderTuple, PageWindow, Record};

/// A value bound into a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgBind {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for PgBind {
    fn from(value: &str) -> Self {
        PgBind::Text(value.to_string())
    }
}

impl From<String> for PgBind {
    fn from(value: String) -> Self {
        PgBind::Text(value)
    }
}

impl From<i64> for PgBind {
    fn from(value: i64) -> Self {
        PgBind::Int(value)
    }
}

impl From<i32> for PgBind {
    fn from(value: i32) -> Self {
        PgBind::Int(i64::from(value))
    }
}

impl From<bool> for PgBind {
    fn from(value: bool) -> Self {
        PgBind::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PgFilter {
    column: String,
    value: PgBind,
}

/// Description of a `SELECT` against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgTableQuery {
    table: String,
    columns: Vec<String>,
    filters: Vec<PgFilter>,
    order_by: Vec<OrderTuple>,
    limit: Option<u64>,
    offset: u64,
}

impl PgTableQuery {
    /// `table` may be schema qualified, e.g. `library.books`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Columns to select; all columns when never called.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add `column = value`. Filters are joined with `AND`.
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<PgBind>) -> Self {
        self.filters.push(PgFilter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Replace the ordering.
    pub fn order_by(mut self, orders: Vec<OrderTuple>) -> Self {
        self.order_by = orders;
        self
    }

    pub fn window(mut self, window: PageWindow) -> Self {
        self.limit = window.limit;
        self.offset = window.offset;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn orders(&self) -> &[OrderTuple] {
        &self.order_by
    }

    pub fn page_window(&self) -> PageWindow {
        PageWindow {
            offset: self.offset,
            limit: self.limit,
        }
    }

    /// SQL of the page query, with `$n` placeholders.
    pub fn to_select_sql(&self) -> String {
        self.select_builder().sql().to_string()
    }

    /// SQL of the count query, with `$n` placeholders.
    pub fn to_count_sql(&self) -> String {
        self.count_builder().sql().to_string()
    }

    fn select_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        self.push_columns(&mut builder);
        builder.push(" FROM ");
        builder.push(quote_ident(&self.table));
        self.push_filters(&mut builder);

        for (idx, order) in self.order_by.iter().enumerate() {
            builder.push(if idx == 0 { " ORDER BY " } else { ", " });
            builder.push(quote_ident(&order.field));
            builder.push(" ");
            builder.push(order.direction.as_sql());
        }

        if let Some(limit) = self.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if self.offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(i64::try_from(self.offset).unwrap_or(i64::MAX));
        }
        builder
    }

    /// Ordering and windowing do not affect the count and are left out.
    fn count_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM (SELECT 1 FROM ");
        builder.push(quote_ident(&self.table));
        self.push_filters(&mut builder);
        builder.push(") AS folio_count");
        builder
    }

    fn push_columns(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        if self.columns.is_empty() {
            builder.push("*");
            return;
        }
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            builder.push(quote_ident(column));
        }
    }

    fn push_filters(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        for (idx, filter) in self.filters.iter().enumerate() {
            builder.push(if idx == 0 { " WHERE " } else { " AND " });
            builder.push(quote_ident(&filter.column));
            builder.push(" = ");
            match &filter.value {
                PgBind::Text(value) => builder.push_bind(value.clone()),
                PgBind::Int(value) => builder.push_bind(*value),
                PgBind::Bool(value) => builder.push_bind(*value),
            };
        }
    }
}

/// Quote each dot-separated part of an identifier.
fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// [`BackendAdapter`] for rows of one Postgres table decoded into `R`.
pub struct PgTableAdapter<R> {
    pool: PgPool,
    primary_key: Option<String>,
    attributes: Vec<String>,
    _record: PhantomData<fn() -> R>,
}

impl<R> std::fmt::Debug for PgTableAdapter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTableAdapter")
            .field("primary_key", &self.primary_key)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl<R> PgTableAdapter<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            primary_key: None,
            attributes: Vec::new(),
            _record: PhantomData,
        }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn with_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Read column names and the primary key of `table` from the catalog.
    ///
    /// Only a single-column primary key is picked up; use
    /// [`KeySelector::Fields`](crate::provider::KeySelector::Fields) for
    /// composite keys.
    pub async fn introspect(pool: PgPool, table: &str) -> Result<Self, sqlx::Error> {
        let (schema, name) = match table.rsplit_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, table),
        };

        let attributes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = COALESCE($1, current_schema())
              AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&pool)
        .await?;

        let primary_key = sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.attname::text
            FROM pg_index i
            JOIN pg_attribute a
              ON a.attrelid = i.indrelid
             AND a.attnum = ANY(i.indkey)
            WHERE i.indrelid = $1::regclass
              AND i.indisprimary
            "#,
        )
        .bind(quote_ident(table))
        .fetch_all(&pool)
        .await?;

        debug!(
            table,
            columns = attributes.len(),
            primary_key = ?primary_key,
            "introspected table"
        );

        let primary_key = match primary_key.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };

        Ok(Self {
            pool,
            primary_key,
            attributes,
            _record: PhantomData,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl<R> BackendAdapter for PgTableAdapter<R>
where
    R: for<'r> FromRow<'r, PgRow> + Record + Clone + Send + Sync + Unpin + 'static,
{
    type Query = PgTableQuery;
    type Record = R;
    type Error = sqlx::Error;

    async fn find_page(&self, query: &PgTableQuery) -> Result<Vec<R>, sqlx::Error> {
        let mut builder = query.select_builder();
        debug!(sql = builder.sql(), "fetching page");
        builder.build_query_as::<R>().fetch_all(&self.pool).await
    }

    async fn count(&self, query: &PgTableQuery) -> Result<u64, sqlx::Error> {
        let mut builder = query.count_builder();
        debug!(sql = builder.sql(), "counting rows");
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn apply_sort(&self, query: PgTableQuery, orders: &[OrderTuple]) -> PgTableQuery {
        query.order_by(orders.to_vec())
    }

    fn apply_pagination(&self, query: PgTableQuery, window: PageWindow) -> PgTableQuery {
        query.window(window)
    }

    fn primary_key_field(&self) -> Option<String> {
        self.primary_key.clone()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.clone()
    }
}
