//! Domain error model.

use thiserror::Error;

use crate::ghost::LoadStatus;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// malformed identifiers). Storage concerns belong in `ghostmap-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Ghost-lifecycle precondition violation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// A transition was requested from a state that does not allow it.
    #[error("illegal lifecycle transition {from} -> {to}")]
    InvalidTransition { from: LoadStatus, to: LoadStatus },

    /// Hydration was requested for an object that is not a ghost.
    #[error("object is not a ghost (status: {status})")]
    NotAGhost { status: LoadStatus },

    /// A lazily loaded field was read (or written) before the object was resolved.
    #[error("{entity}: field accessed before the object was loaded (status: {status})")]
    NotLoaded {
        entity: &'static str,
        status: LoadStatus,
    },
}
