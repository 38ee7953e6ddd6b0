use super::backend::{Backend, BoundQuery, RowCursor};
use crate::core::{AqlError, Row, Value};
use async_trait::async_trait;
use futures::StreamExt;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use std::sync::Arc;

/// Rows buffered between the fetch task and the cursor consumer.
const CURSOR_BUFFER: usize = 64;

/// Postgres backend on a shared `sqlx` pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, AqlError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to connect to database");
                e
            })?;
        tracing::info!(max_connections, "database pool ready");
        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Integer(i) => query.bind(*i),
            Value::Real(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Boolean(b) => query.bind(*b),
            Value::Date(d) => query.bind(*d),
            Value::Timestamp(t) => query.bind(*t),
        };
    }
    query
}

fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, AqlError> {
    let value = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(|v| Value::Integer(v.into())),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(|v| Value::Integer(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::Integer),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx)?.map(|v| Value::Real(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Value::Real),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(idx)?
            .and_then(|d| d.to_f64())
            .map(Value::Real),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Boolean),
        "DATE" => row.try_get::<Option<chrono::NaiveDate>, _>(idx)?.map(Value::Date),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)?
            .map(Value::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|t| Value::Timestamp(t.and_utc())),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(|u| Value::Text(u.to_string())),
        _ => row.try_get::<Option<String>, _>(idx)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn convert_row(row: &PgRow, columns: &mut Option<Arc<[String]>>) -> Result<Row, AqlError> {
    let names = columns
        .get_or_insert_with(|| row.columns().iter().map(|c| c.name().to_string()).collect());
    let values = row
        .columns()
        .iter()
        .map(|c| decode_value(row, c.ordinal(), c.type_info().name()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(Arc::clone(names), values))
}

#[async_trait]
impl Backend for PgBackend {
    async fn execute(&self, query: &BoundQuery) -> Result<u64, AqlError> {
        let result = bind_params(sqlx::query(&query.sql), &query.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, query: &BoundQuery) -> Result<RowCursor, AqlError> {
        let (tx, mut cursor) = RowCursor::channel(CURSOR_BUFFER);
        let pool = self.pool.clone();
        let query = query.clone();

        tokio::spawn(async move {
            let mut columns = None;
            let mut stream = bind_params(sqlx::query(&query.sql), &query.params).fetch(&pool);
            while let Some(item) = stream.next().await {
                let row = item
                    .map_err(AqlError::from)
                    .and_then(|r| convert_row(&r, &mut columns));
                let failed = row.is_err();
                if tx.send(row).await.is_err() || failed {
                    break;
                }
            }
        });

        cursor.prime().await?;
        Ok(cursor)
    }

    async fn query_row(&self, query: &BoundQuery) -> Result<Option<Row>, AqlError> {
        let row = bind_params(sqlx::query(&query.sql), &query.params)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| convert_row(&r, &mut None)).transpose()
    }
}
