//! Rows and the cursor returned by [`crate::Database::query`].

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::DecodeError;
use crate::value::{FromSqlValue, SqlValue};

/// One result row. Column names are shared by every row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Raw value at a zero-based column position.
    pub fn value(&self, index: usize) -> Result<&SqlValue, DecodeError> {
        self.values.get(index).ok_or(DecodeError::ColumnOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Typed scan of the column at `index`.
    pub fn get<T: FromSqlValue>(&self, index: usize) -> Result<T, DecodeError> {
        let value = self.value(index)?;
        T::from_sql_value(value).ok_or_else(|| DecodeError::TypeMismatch {
            column: self.column_label(index),
            expected: core::any::type_name::<T>(),
            found: value.type_name(),
        })
    }

    /// Typed scan by column name (case-insensitive).
    pub fn get_by_name<T: FromSqlValue>(&self, name: &str) -> Result<T, DecodeError> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| DecodeError::UnknownColumn(name.to_string()))?;
        self.get(index)
    }

    fn column_label(&self, index: usize) -> String {
        self.columns
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("#{index}"))
    }
}

/// Forward-only cursor over a result set.
///
/// Adapters materialize results before returning, so driver errors surface
/// from `query` itself and advancing the cursor cannot fail.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    columns: Arc<[String]>,
    rows: VecDeque<Row>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows.len(), Some(self.rows.len()))
    }
}

impl ExactSizeIterator for Rows {}
