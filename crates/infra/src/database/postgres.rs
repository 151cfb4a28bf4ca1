//! Postgres adapter on top of an `sqlx::PgPool`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | DatabaseError |
//! |------------|----------------------|---------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (other) | any other | `Query` |
//! | PoolClosed | N/A | `PoolClosed` |
//! | PoolTimedOut / Io / Tls / Configuration | N/A | `Connection` |
//! | Other | N/A | `Query` |
//!
//! ## Column Conversion
//!
//! Result columns are converted by their Postgres type name. Types outside
//! the [`SqlValue`] model are reported as a `Query` error naming the column.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as _, PgPool, Postgres, Row as _, TypeInfo as _, ValueRef as _};
use tracing::instrument;
use uuid::Uuid;

use super::Database;
use crate::config::DatabaseConfig;
use crate::error::DatabaseError;
use crate::row::Rows;
use crate::value::{SqlType, SqlValue};

/// Postgres-backed [`Database`].
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: Arc<PgPool>,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool sized and bounded by `config`.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        config
            .validate()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    #[instrument(skip(self, params), fields(param_count = params.len()), err)]
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("execute", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, params), fields(param_count = params.len()), err)]
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Rows, DatabaseError> {
        let pg_rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query", e))?;

        let columns: Vec<String> = pg_rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(pg_rows.len());
        for row in &pg_rows {
            rows.push(convert_row(row)?);
        }

        Ok(Rows::new(columns, rows))
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::TypedNull(ty) => bind_null(query, *ty),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Uuid(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
            SqlValue::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        };
    }
    query
}

/// Bind a NULL typed after the `Option` it came from, so Postgres accepts it
/// for non-text columns.
fn bind_null<'q>(
    query: Query<'q, Postgres, PgArguments>,
    ty: SqlType,
) -> Query<'q, Postgres, PgArguments> {
    match ty {
        SqlType::Bool => query.bind(None::<bool>),
        SqlType::Int => query.bind(None::<i64>),
        SqlType::Float => query.bind(None::<f64>),
        SqlType::Text => query.bind(None::<String>),
        SqlType::Uuid => query.bind(None::<Uuid>),
        SqlType::Timestamp => query.bind(None::<DateTime<Utc>>),
        SqlType::Json => query.bind(None::<sqlx::types::Json<JsonValue>>),
    }
}

fn convert_row(row: &PgRow) -> Result<Vec<SqlValue>, DatabaseError> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let decode_err =
            |e: sqlx::Error| DatabaseError::query("decode", format!("column {}: {e}", column.name()));

        let raw = row.try_get_raw(idx).map_err(decode_err)?;
        if raw.is_null() {
            values.push(SqlValue::Null);
            continue;
        }

        let value = match column.type_info().name() {
            "BOOL" => SqlValue::Bool(row.try_get(idx).map_err(decode_err)?),
            "INT2" => SqlValue::Int(row.try_get::<i16, _>(idx).map_err(decode_err)?.into()),
            "INT4" => SqlValue::Int(row.try_get::<i32, _>(idx).map_err(decode_err)?.into()),
            "INT8" => SqlValue::Int(row.try_get(idx).map_err(decode_err)?),
            "FLOAT4" => SqlValue::Float(row.try_get::<f32, _>(idx).map_err(decode_err)?.into()),
            "FLOAT8" => SqlValue::Float(row.try_get(idx).map_err(decode_err)?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
                SqlValue::Text(row.try_get(idx).map_err(decode_err)?)
            }
            "UUID" => SqlValue::Uuid(row.try_get(idx).map_err(decode_err)?),
            "TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get(idx).map_err(decode_err)?),
            "TIMESTAMP" => SqlValue::Timestamp(
                row.try_get::<chrono::NaiveDateTime, _>(idx)
                    .map_err(decode_err)?
                    .and_utc(),
            ),
            "JSON" | "JSONB" => SqlValue::Json(row.try_get(idx).map_err(decode_err)?),
            other => {
                return Err(DatabaseError::query(
                    "decode",
                    format!("column {}: unsupported type {other}", column.name()),
                ));
            }
        };
        values.push(value);
    }
    Ok(values)
}

/// Map SQLx errors to `DatabaseError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DatabaseError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("23505") => DatabaseError::unique_violation(operation, msg),
                _ => DatabaseError::query(operation, msg),
            }
        }
        sqlx::Error::PoolTimedOut => DatabaseError::Connection(format!(
            "timed out acquiring a connection in {operation}"
        )),
        sqlx::Error::PoolClosed => DatabaseError::PoolClosed(operation.to_string()),
        sqlx::Error::Io(e) => DatabaseError::Connection(format!("{operation}: {e}")),
        sqlx::Error::Tls(e) => DatabaseError::Connection(format!("{operation}: {e}")),
        sqlx::Error::Configuration(e) => DatabaseError::Connection(format!("{operation}: {e}")),
        other => DatabaseError::query(operation, other.to_string()),
    }
}
