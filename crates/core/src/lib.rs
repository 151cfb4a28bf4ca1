//! `ghostmap-core`: domain-side capability contracts for the persistence runtime.
//!
//! This crate contains **pure domain** primitives (no storage, no SQL). Entities
//! implement these traits; `ghostmap-infra` consumes them.

pub mod entity;
pub mod error;
pub mod ghost;
pub mod id;
pub mod type_tag;

pub use entity::{DomainObject, Entity};
pub use error::{DomainError, StateError};
pub use ghost::{Ghost, Lifecycle, LoadStatus, LoadingGuard};
pub use type_tag::{Registrable, TypeTag};
