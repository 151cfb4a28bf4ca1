//! Infrastructure layer: data mappers, identity maps, registries and database adapters.
//!
//! The moving parts, leaves first:
//!
//! - [`value`] / [`row`]: the SQL value model and the row cursor returned by queries.
//! - [`database`]: the `Database` collaborator trait plus Postgres and in-memory adapters.
//! - [`statement`]: bound statements (template + positional parameters) and ad hoc queries.
//! - [`mapper`]: the generic `Mapper<T>` with its identity map and entity codec contract.
//! - [`registry`]: per-identity-type registries and the directory that owns them.
//! - [`hydrate`]: explicit ghost resolution through the directory.

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod hydrate;
pub mod mapper;
pub mod registry;
pub mod row;
pub mod statement;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, DatabaseConfig, MapperSettings};
pub use context::ExecContext;
pub use database::{Database, InMemoryDatabase, PgDatabase};
pub use error::{BindError, DatabaseError, DecodeError, MapperError, RegistryError};
pub use hydrate::Resolve;
pub use mapper::{EntityCodec, IdentityMap, Mapper, Statements};
pub use registry::{Registry, RegistryDirectory};
pub use row::{Row, Rows};
pub use statement::{AdHocQuery, BoundStatement, StatementSource};
pub use value::{FromSqlValue, SqlKey, SqlType, SqlTyped, SqlValue};
