//! Database collaborator boundary.
//!
//! Mappers never talk to a driver directly; they hand SQL text and positional
//! parameters to a [`Database`]. Two adapters ship with the crate:
//! [`PgDatabase`] (sqlx/Postgres) and [`InMemoryDatabase`] (tests/dev).

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::row::Rows;
use crate::value::SqlValue;

pub use in_memory::{InMemoryDatabase, TableStats};
pub use postgres::PgDatabase;

/// Executes SQL with `$1, $2, …` positional parameters.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a mutating statement; returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError>;

    /// Run a query; returns a cursor over the result set.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Rows, DatabaseError>;
}

#[async_trait]
impl<D> Database for Arc<D>
where
    D: Database + ?Sized,
{
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        (**self).execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Rows, DatabaseError> {
        (**self).query(sql, params).await
    }
}
