//! Explicit ghost hydration.
//!
//! Domain objects hold no reference to their mapper. A caller that needs the
//! fields of a possibly-ghost object resolves it through the directory first:
//!
//! ```ignore
//! let party = mapper.find(&ctx, &id).await?;   // may be a ghost
//! party.resolve(&directory).await?;            // one query, then LOADED
//! let name = party.name()?;
//! ```

use async_trait::async_trait;
use ghostmap_core::{DomainObject, LoadStatus};

use crate::error::MapperError;
use crate::registry::RegistryDirectory;
use crate::value::SqlKey;

#[async_trait]
pub trait Resolve {
    /// Load the object if it is a ghost; no-op once loaded.
    ///
    /// An object that is mid-load elsewhere yields `StateError::NotAGhost`.
    async fn resolve(&self, directory: &RegistryDirectory) -> Result<(), MapperError>;
}

#[async_trait]
impl<T> Resolve for T
where
    T: DomainObject,
    T::Id: SqlKey,
{
    async fn resolve(&self, directory: &RegistryDirectory) -> Result<(), MapperError> {
        match self.load_status() {
            LoadStatus::Loaded => Ok(()),
            LoadStatus::Ghost | LoadStatus::Loading => directory.load(self).await,
        }
    }
}
