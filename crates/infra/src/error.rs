//! Error types for the persistence runtime.
//!
//! One enum per boundary: the database collaborator ([`DatabaseError`]), the
//! binders ([`BindError`]), row decoding ([`DecodeError`]) and registry lookup
//! ([`RegistryError`]). [`MapperError`] is what mapper and registry operations
//! return; it wraps the others and keeps them as its source.

use std::time::Duration;

use ghostmap_core::StateError;
use thiserror::Error;

/// Failure reported by a [`crate::Database`] (or raised while waiting on one).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("database error in {operation}: {message}")]
    Query { operation: String, message: String },

    /// Unique/primary key violation (`23505` on Postgres).
    #[error("unique constraint violated in {operation}: {message}")]
    UniqueViolation { operation: String, message: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("connection pool closed in {0}")]
    PoolClosed(String),

    #[error("connection failed: {0}")]
    Connection(String),

    /// Statement shape not understood by the adapter.
    #[error("unsupported statement: {0}")]
    Unsupported(String),
}

impl DatabaseError {
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn unique_violation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UniqueViolation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn unsupported(sql: impl Into<String>) -> Self {
        Self::Unsupported(sql.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A binder could not produce a parameter from the object.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The field cannot be read in the object's current lifecycle state.
    #[error("{entity}.{field} is not available for binding")]
    Unavailable {
        entity: &'static str,
        field: &'static str,
        #[source]
        source: StateError,
    },

    #[error("{entity}.{field}: {message}")]
    InvalidValue {
        entity: &'static str,
        field: &'static str,
        message: String,
    },
}

impl BindError {
    pub fn unavailable(entity: &'static str, field: &'static str, source: StateError) -> Self {
        Self::Unavailable {
            entity,
            field,
            source,
        }
    }
}

/// A row could not be turned into (or applied to) an entity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("column index {index} out of range ({len} columns)")]
    ColumnOutOfRange { index: usize, len: usize },

    #[error("no column named {0}")]
    UnknownColumn(String),

    /// A find/load statement produced more than one row for a single identity.
    #[error("{entity}: expected exactly one row, found {found}")]
    UnexpectedRowCount { entity: &'static str, found: usize },

    #[error("{entity}: {message}")]
    Invalid {
        entity: &'static str,
        message: String,
    },
}

impl DecodeError {
    pub fn invalid(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            entity,
            message: message.into(),
        }
    }
}

/// Registry lookup failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no mapper registered for {type_name}")]
    NotRegistered { type_name: &'static str },

    /// The mapper registered under `tag` does not map the requested type.
    #[error("mapper registered for {tag} does not map {requested}")]
    TypeMismatch {
        tag: &'static str,
        requested: &'static str,
    },
}

/// Error returned by mapper, registry and hydration operations.
#[derive(Debug, Error, Clone)]
pub enum MapperError {
    #[error("bind failed: {0}")]
    Bind(#[from] BindError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl MapperError {
    pub fn not_found(entity: &'static str, id: &impl core::fmt::Debug) -> Self {
        Self::NotFound {
            entity,
            id: format!("{id:?}"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Database(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostmap_core::LoadStatus;
    use std::error::Error as _;

    #[test]
    fn bind_error_keeps_state_error_as_source() {
        let err = MapperError::from(BindError::unavailable(
            "Party",
            "name",
            StateError::NotLoaded {
                entity: "Party",
                status: LoadStatus::Ghost,
            },
        ));

        let bind = err.source().unwrap();
        let state = bind.source().unwrap();
        assert!(state.to_string().contains("GHOST"));
    }

    #[test]
    fn not_found_renders_debug_id() {
        let err = MapperError::not_found("Party", &"p-1".to_string());
        assert_eq!(err.to_string(), "Party with id \"p-1\" not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn timeout_is_detected_through_the_wrapper() {
        let err = MapperError::from(DatabaseError::timeout("query", Duration::from_millis(5)));
        assert!(err.is_timeout());
    }
}
