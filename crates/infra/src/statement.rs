//! Bound statements and ad hoc statement sources.

use std::fmt;
use std::sync::Arc;

use tracing::instrument;

use crate::context::ExecContext;
use crate::database::Database;
use crate::error::DatabaseError;
use crate::row::Rows;
use crate::value::SqlValue;

/// Caller-supplied SQL plus its parameters, used by `Mapper::find_many`.
pub trait StatementSource: Send + Sync {
    fn sql(&self) -> &str;
    fn parameters(&self) -> &[SqlValue];
}

/// A one-off query built in place.
///
/// ```
/// use ghostmap_infra::{AdHocQuery, StatementSource};
///
/// let q = AdHocQuery::new("SELECT ID, NAME FROM PARTY WHERE NAME = $1").bind("Ada");
/// assert_eq!(q.parameters().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AdHocQuery {
    sql: String,
    params: Vec<SqlValue>,
}

impl AdHocQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl StatementSource for AdHocQuery {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn parameters(&self) -> &[SqlValue] {
        &self.params
    }
}

/// SQL template plus an append-only, ordered parameter list.
///
/// Parameters are positional: the n-th `append` fills `$n`. Matching the
/// template's placeholders is the binder's job.
#[derive(Clone)]
pub struct BoundStatement {
    db: Arc<dyn Database>,
    sql: Arc<str>,
    params: Vec<SqlValue>,
}

impl BoundStatement {
    pub fn new(db: Arc<dyn Database>, sql: impl Into<Arc<str>>) -> Self {
        Self {
            db,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn from_source(db: Arc<dyn Database>, source: &dyn StatementSource) -> Self {
        Self {
            db,
            sql: Arc::from(source.sql()),
            params: source.parameters().to_vec(),
        }
    }

    pub fn append(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[SqlValue] {
        &self.params
    }

    /// Run as a mutating statement; returns rows affected.
    #[instrument(skip(self, ctx), fields(sql = %self.sql, params = self.params.len()), err)]
    pub async fn execute(&self, ctx: &ExecContext) -> Result<u64, DatabaseError> {
        ctx.run("execute", self.db.execute(&self.sql, &self.params))
            .await
    }

    /// Run as a query; returns the row cursor.
    #[instrument(skip(self, ctx), fields(sql = %self.sql, params = self.params.len()), err)]
    pub async fn execute_query(&self, ctx: &ExecContext) -> Result<Rows, DatabaseError> {
        ctx.run("query", self.db.query(&self.sql, &self.params))
            .await
    }
}

impl fmt::Debug for BoundStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundStatement")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryDatabase;
    use std::time::Duration;

    fn db() -> Arc<InMemoryDatabase> {
        let db = InMemoryDatabase::new();
        db.create_table("GADGET", &["ID", "NAME"]);
        Arc::new(db)
    }

    #[tokio::test]
    async fn parameters_bind_in_append_order() {
        let db = db();
        let mut insert = BoundStatement::new(
            db.clone(),
            "INSERT INTO GADGET (ID, NAME) VALUES ($1, $2);",
        );
        insert.append("stringIdValue").append("nameValue");
        assert_eq!(
            insert.parameters(),
            &[SqlValue::from("stringIdValue"), SqlValue::from("nameValue")]
        );
        assert_eq!(insert.execute(&ExecContext::background()).await.unwrap(), 1);

        let query = AdHocQuery::new("SELECT NAME FROM GADGET WHERE ID = $1").bind("stringIdValue");
        let mut rows = BoundStatement::from_source(db, &query)
            .execute_query(&ExecContext::background())
            .await
            .unwrap();
        assert_eq!(rows.next().unwrap().get::<String>(0).unwrap(), "nameValue");
    }

    #[tokio::test]
    async fn slow_database_times_out() {
        let db = InMemoryDatabase::new().with_latency(Duration::from_millis(200));
        db.create_table("GADGET", &["ID", "NAME"]);

        let mut stmt = BoundStatement::new(Arc::new(db), "SELECT ID FROM GADGET WHERE ID = $1");
        stmt.append("x");
        let err = stmt
            .execute_query(&ExecContext::with_timeout(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
