//! PostgreSQL implementation of the pool and connection traits
//!
//! Wraps a sqlx `PgPool`. Parameters are bound positionally from
//! [`SqlValue`]s and result columns are decoded back into [`SqlValue`]s
//! based on their PostgreSQL type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo};
use uuid::Uuid;

use crate::connection::{Connection, ConnectionPool, Row, RowSet, SqlValue};
use crate::error::{DatabaseError, DbResult};

/// [`ConnectionPool`] backed by a sqlx `PgPool`
#[derive(Debug, Clone)]
pub struct PgConnectionPool {
    pool: PgPool,
}

impl PgConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionPool for PgConnectionPool {
    async fn acquire(&self) -> DbResult<Box<dyn Connection>> {
        let connection = self.pool.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed => DatabaseError::PoolUnavailable("pool closed".to_string()),
            other => DatabaseError::PoolUnavailable(other.to_string()),
        })?;
        Ok(Box::new(PgPooledConnection { inner: connection }))
    }

    fn release(&self, connection: Box<dyn Connection>) {
        // PoolConnection returns itself to the pool on drop
        drop(connection);
    }
}

/// A connection checked out of a `PgPool`
pub struct PgPooledConnection {
    inner: PoolConnection<Postgres>,
}

fn returns_rows(statement: &str) -> bool {
    let mut words = statement.split_whitespace();
    let leading = words.next().unwrap_or_default();
    leading.eq_ignore_ascii_case("SELECT")
        || leading.eq_ignore_ascii_case("WITH")
        || words.any(|word| word.eq_ignore_ascii_case("RETURNING"))
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(value) => query.bind(*value),
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Decimal(value) => query.bind(*value),
            SqlValue::Uuid(value) => query.bind(*value),
            SqlValue::Timestamp(value) => query.bind(*value),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> DbResult<Row> {
    let mut columns = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let value = match column.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(SqlValue::Bool),
            "INT2" => row.try_get::<Option<i16>, _>(index)?.map(|v| SqlValue::Int(v.into())),
            "INT4" => row.try_get::<Option<i32>, _>(index)?.map(|v| SqlValue::Int(v.into())),
            "INT8" => row.try_get::<Option<i64>, _>(index)?.map(SqlValue::Int),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(index)?.map(SqlValue::Text)
            }
            "NUMERIC" => row.try_get::<Option<Decimal>, _>(index)?.map(SqlValue::Decimal),
            "UUID" => row.try_get::<Option<Uuid>, _>(index)?.map(SqlValue::Uuid),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(index)?
                .map(SqlValue::Timestamp),
            other => {
                return Err(DatabaseError::SerializationError(format!(
                    "unsupported column type {} for '{}'",
                    other,
                    column.name()
                )))
            }
        };
        columns.push((column.name().to_string(), value.unwrap_or(SqlValue::Null)));
    }

    Ok(Row::new(columns))
}

#[async_trait]
impl Connection for PgPooledConnection {
    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> DbResult<RowSet> {
        let query = bind_all(sqlx::query(statement), params);

        if returns_rows(statement) {
            let rows = query
                .fetch_all(&mut *self.inner)
                .await
                .map_err(|e| DatabaseError::from(&e))?;
            let rows = rows.iter().map(decode_row).collect::<DbResult<Vec<_>>>()?;
            Ok(RowSet::from_rows(rows))
        } else {
            let result = query
                .execute(&mut *self.inner)
                .await
                .map_err(|e| DatabaseError::from(&e))?;
            Ok(RowSet::affected(result.rows_affected()))
        }
    }

    fn terminate(self: Box<Self>) {
        // Detached connections are closed on drop and replaced in the pool
        drop(self.inner.detach());
    }
}
