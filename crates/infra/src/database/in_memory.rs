//! In-memory [`Database`] for tests and local development.
//!
//! Understands the single-table statement shapes that entity mappers emit:
//!
//! ```text
//! SELECT <cols|*> FROM t [WHERE c = $n [AND c = $m ...]] [ORDER BY c [ASC|DESC]]
//! INSERT INTO t (c1, c2, ...) VALUES ($1, $2, ...)
//! UPDATE t SET c1 = $n, ... WHERE c = $m [AND ...]
//! DELETE FROM t [WHERE c = $n [AND ...]]
//! ```
//!
//! Keywords, table and column names are case-insensitive. The first column of
//! a table is its primary key. Every statement is counted per table, which is
//! what tests use to assert how often a mapper reached the database.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use super::Database;
use crate::error::DatabaseError;
use crate::row::Rows;
use crate::value::SqlValue;

lazy_static::lazy_static! {
    static ref SELECT_RE: Regex = Regex::new(
        r"(?is)^\s*SELECT\s+(?P<cols>.+?)\s+FROM\s+(?P<table>\w+)(?:\s+WHERE\s+(?P<filter>.+?))?(?:\s+ORDER\s+BY\s+(?P<order>\w+)(?:\s+(?P<dir>ASC|DESC))?)?\s*;?\s*$"
    ).unwrap();
    static ref INSERT_RE: Regex = Regex::new(
        r"(?is)^\s*INSERT\s+INTO\s+(?P<table>\w+)\s*\((?P<cols>[^)]*)\)\s*VALUES\s*\((?P<vals>[^)]*)\)\s*;?\s*$"
    ).unwrap();
    static ref UPDATE_RE: Regex = Regex::new(
        r"(?is)^\s*UPDATE\s+(?P<table>\w+)\s+SET\s+(?P<sets>.+?)\s+WHERE\s+(?P<filter>.+?)\s*;?\s*$"
    ).unwrap();
    static ref DELETE_RE: Regex = Regex::new(
        r"(?is)^\s*DELETE\s+FROM\s+(?P<table>\w+)(?:\s+WHERE\s+(?P<filter>.+?))?\s*;?\s*$"
    ).unwrap();
    static ref CONDITION_RE: Regex = Regex::new(r"^\s*(?P<col>\w+)\s*=\s*\$(?P<idx>\d+)\s*$").unwrap();
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"^\s*\$(?P<idx>\d+)\s*$").unwrap();
    static ref AND_RE: Regex = Regex::new(r"(?i)\s+AND\s+").unwrap();
}

/// Per-table statement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    /// INSERT / UPDATE / DELETE statements received.
    pub executes: u64,
    /// SELECT statements received.
    pub queries: u64,
}

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl Table {
    fn column_index(&self, table: &str, name: &str) -> Result<usize, DatabaseError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                DatabaseError::query(
                    "resolve",
                    format!("column \"{name}\" of relation \"{table}\" does not exist"),
                )
            })
    }

    /// Resolve `col = $n` conditions into (column index, bound value) pairs.
    fn bind_filter(
        &self,
        table: &str,
        filter: &[Assignment],
        params: &[SqlValue],
    ) -> Result<Vec<(usize, SqlValue)>, DatabaseError> {
        filter
            .iter()
            .map(|a| Ok((self.column_index(table, &a.column)?, param(params, a.param)?)))
            .collect()
    }
}

fn row_matches(row: &[SqlValue], filter: &[(usize, SqlValue)]) -> bool {
    filter.iter().all(|(idx, value)| row.get(*idx) == Some(value))
}

/// `column = $param` (1-based placeholder number).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment {
    column: String,
    param: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    Select {
        table: String,
        projection: Option<Vec<String>>,
        filter: Vec<Assignment>,
        order: Option<(String, bool)>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        params: Vec<usize>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        filter: Vec<Assignment>,
    },
    Delete {
        table: String,
        filter: Vec<Assignment>,
    },
}

impl Statement {
    fn table(&self) -> &str {
        match self {
            Statement::Select { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }

    fn is_query(&self) -> bool {
        matches!(self, Statement::Select { .. })
    }
}

fn parse(sql: &str) -> Result<Statement, DatabaseError> {
    if let Some(caps) = SELECT_RE.captures(sql) {
        let cols = caps["cols"].trim();
        let projection = if cols == "*" {
            None
        } else {
            Some(identifiers(cols, sql)?)
        };
        return Ok(Statement::Select {
            table: caps["table"].to_ascii_uppercase(),
            projection,
            filter: conditions(caps.name("filter").map(|m| m.as_str()), sql)?,
            order: caps.name("order").map(|m| {
                let desc = caps
                    .name("dir")
                    .is_some_and(|d| d.as_str().eq_ignore_ascii_case("DESC"));
                (m.as_str().to_string(), desc)
            }),
        });
    }

    if let Some(caps) = INSERT_RE.captures(sql) {
        let columns = identifiers(&caps["cols"], sql)?;
        let params = caps["vals"]
            .split(',')
            .map(|v| placeholder(v, sql))
            .collect::<Result<Vec<_>, _>>()?;
        if columns.len() != params.len() {
            return Err(DatabaseError::query(
                "parse",
                format!("INSERT has {} columns but {} values", columns.len(), params.len()),
            ));
        }
        return Ok(Statement::Insert {
            table: caps["table"].to_ascii_uppercase(),
            columns,
            params,
        });
    }

    if let Some(caps) = UPDATE_RE.captures(sql) {
        let assignments = caps["sets"]
            .split(',')
            .map(|s| condition(s, sql))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Statement::Update {
            table: caps["table"].to_ascii_uppercase(),
            assignments,
            filter: conditions(Some(&caps["filter"]), sql)?,
        });
    }

    if let Some(caps) = DELETE_RE.captures(sql) {
        return Ok(Statement::Delete {
            table: caps["table"].to_ascii_uppercase(),
            filter: conditions(caps.name("filter").map(|m| m.as_str()), sql)?,
        });
    }

    Err(DatabaseError::unsupported(sql.trim()))
}

fn identifiers(list: &str, sql: &str) -> Result<Vec<String>, DatabaseError> {
    list.split(',')
        .map(|c| {
            let c = c.trim();
            if !c.is_empty() && c.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
                Ok(c.to_string())
            } else {
                Err(DatabaseError::unsupported(sql.trim()))
            }
        })
        .collect()
}

fn conditions(filter: Option<&str>, sql: &str) -> Result<Vec<Assignment>, DatabaseError> {
    match filter {
        None => Ok(Vec::new()),
        Some(f) => AND_RE.split(f).map(|c| condition(c, sql)).collect(),
    }
}

fn condition(text: &str, sql: &str) -> Result<Assignment, DatabaseError> {
    let caps = CONDITION_RE
        .captures(text)
        .ok_or_else(|| DatabaseError::unsupported(sql.trim()))?;
    Ok(Assignment {
        column: caps["col"].to_string(),
        param: parse_index(&caps["idx"], sql)?,
    })
}

fn placeholder(text: &str, sql: &str) -> Result<usize, DatabaseError> {
    let caps = PLACEHOLDER_RE
        .captures(text)
        .ok_or_else(|| DatabaseError::unsupported(sql.trim()))?;
    parse_index(&caps["idx"], sql)
}

fn parse_index(raw: &str, sql: &str) -> Result<usize, DatabaseError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(DatabaseError::unsupported(sql.trim())),
    }
}

fn param(params: &[SqlValue], n: usize) -> Result<SqlValue, DatabaseError> {
    params
        .get(n - 1)
        .cloned()
        .map(SqlValue::untyped)
        .ok_or_else(|| DatabaseError::query("bind", format!("no value supplied for ${n}")))
}

fn compare(a: &SqlValue, b: &SqlValue) -> Ordering {
    match (a, b) {
        (SqlValue::Null, SqlValue::Null) => Ordering::Equal,
        (SqlValue::Null, _) => Ordering::Less,
        (_, SqlValue::Null) => Ordering::Greater,
        (SqlValue::Bool(x), SqlValue::Bool(y)) => x.cmp(y),
        (SqlValue::Int(x), SqlValue::Int(y)) => x.cmp(y),
        (SqlValue::Float(x), SqlValue::Float(y)) => x.total_cmp(y),
        (SqlValue::Text(x), SqlValue::Text(y)) => x.cmp(y),
        (SqlValue::Uuid(x), SqlValue::Uuid(y)) => x.cmp(y),
        (SqlValue::Timestamp(x), SqlValue::Timestamp(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn missing_table(operation: &str, table: &str) -> DatabaseError {
    DatabaseError::query(operation, format!("relation \"{table}\" does not exist"))
}

/// In-memory database.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: RwLock<HashMap<String, Table>>,
    stats: Mutex<HashMap<String, TableStats>>,
    fail_next: Mutex<Option<DatabaseError>>,
    latency: Option<Duration>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every statement by `latency` before it touches any table.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Create (or reset) a table. The first column is the primary key.
    pub fn create_table(&self, name: &str, columns: &[&str]) {
        let table = Table {
            columns: columns.iter().map(|c| c.to_ascii_uppercase()).collect(),
            rows: Vec::new(),
        };
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_uppercase(), table);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table.to_ascii_uppercase())
            .map_or(0, |t| t.rows.len())
    }

    /// Make the next statement (of any kind) fail with `err`.
    pub fn fail_next(&self, err: DatabaseError) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    pub fn stats(&self, table: &str) -> TableStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table.to_ascii_uppercase())
            .copied()
            .unwrap_or_default()
    }

    pub fn total_stats(&self) -> TableStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .fold(TableStats::default(), |acc, s| TableStats {
                executes: acc.executes + s.executes,
                queries: acc.queries + s.queries,
            })
    }

    pub fn reset_stats(&self) {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Count, delay, then consume any injected failure.
    async fn admit(&self, statement: &Statement) -> Result<(), DatabaseError> {
        {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = stats.entry(statement.table().to_string()).or_default();
            if statement.is_query() {
                entry.queries += 1;
            } else {
                entry.executes += 1;
            }
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match injected {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply(&self, statement: Statement, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DatabaseError::query("execute", "lock poisoned"))?;

        match statement {
            Statement::Insert {
                table: name,
                columns,
                params: placeholders,
            } => {
                let table = tables
                    .get_mut(&name)
                    .ok_or_else(|| missing_table("insert", &name))?;
                let mut row = vec![SqlValue::Null; table.columns.len()];
                for (column, n) in columns.iter().zip(placeholders) {
                    row[table.column_index(&name, column)?] = param(params, n)?;
                }
                if let Some(key) = row.first() {
                    if table.rows.iter().any(|r| r.first() == Some(key)) {
                        return Err(DatabaseError::unique_violation(
                            "insert",
                            format!("duplicate key value {key} violates primary key of \"{name}\""),
                        ));
                    }
                }
                table.rows.push(row);
                Ok(1)
            }
            Statement::Update {
                table: name,
                assignments,
                filter,
            } => {
                let table = tables
                    .get_mut(&name)
                    .ok_or_else(|| missing_table("update", &name))?;
                let filter = table.bind_filter(&name, &filter, params)?;
                let updates = table.bind_filter(&name, &assignments, params)?;
                let mut affected = 0;
                for row in table.rows.iter_mut().filter(|r| row_matches(r, &filter)) {
                    for (idx, value) in &updates {
                        row[*idx] = value.clone();
                    }
                    affected += 1;
                }
                Ok(affected)
            }
            Statement::Delete {
                table: name,
                filter,
            } => {
                let table = tables
                    .get_mut(&name)
                    .ok_or_else(|| missing_table("delete", &name))?;
                let filter = table.bind_filter(&name, &filter, params)?;
                let before = table.rows.len();
                table.rows.retain(|r| !row_matches(r, &filter));
                Ok((before - table.rows.len()) as u64)
            }
            Statement::Select { .. } => Err(DatabaseError::unsupported(
                "SELECT passed to execute; use query",
            )),
        }
    }

    fn select(&self, statement: Statement, params: &[SqlValue]) -> Result<Rows, DatabaseError> {
        let Statement::Select {
            table: name,
            projection,
            filter,
            order,
        } = statement
        else {
            return Err(DatabaseError::unsupported("only SELECT can be queried"));
        };

        let tables = self
            .tables
            .read()
            .map_err(|_| DatabaseError::query("query", "lock poisoned"))?;
        let table = tables
            .get(&name)
            .ok_or_else(|| missing_table("query", &name))?;

        let filter = table.bind_filter(&name, &filter, params)?;
        let (columns, indices) = match projection {
            None => (table.columns.clone(), (0..table.columns.len()).collect()),
            Some(cols) => {
                let indices = cols
                    .iter()
                    .map(|c| table.column_index(&name, c))
                    .collect::<Result<Vec<_>, _>>()?;
                (cols, indices)
            }
        };

        let mut selected: Vec<&Vec<SqlValue>> =
            table.rows.iter().filter(|r| row_matches(r, &filter)).collect();
        if let Some((column, desc)) = order {
            let idx = table.column_index(&name, &column)?;
            selected.sort_by(|a, b| {
                let ord = compare(&a[idx], &b[idx]);
                if desc { ord.reverse() } else { ord }
            });
        }

        let rows = selected
            .into_iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Ok(Rows::new(columns, rows))
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        let statement = parse(sql)?;
        if statement.is_query() {
            return Err(DatabaseError::unsupported(
                "SELECT passed to execute; use query",
            ));
        }
        self.admit(&statement).await?;
        self.apply(statement, params)
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Rows, DatabaseError> {
        let statement = parse(sql)?;
        if !statement.is_query() {
            return Err(DatabaseError::unsupported(
                "only SELECT statements return rows",
            ));
        }
        self.admit(&statement).await?;
        self.select(statement, params)
    }
}
