//! Directory of registries, one per identity type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use ghostmap_core::DomainObject;

use super::Registry;
use crate::error::{MapperError, RegistryError};
use crate::mapper::Mapper;
use crate::value::SqlKey;

/// Owns one [`Registry<K>`] per identity type `K`.
///
/// Built once at startup and passed by reference to whatever needs to
/// dispatch by type (including [`crate::Resolve`]). Each registry is created
/// on first use, exactly once, under the directory's write lock.
#[derive(Debug, Default)]
pub struct RegistryDirectory {
    registries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl RegistryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry for identity type `K`, created if absent.
    pub fn registry<K: SqlKey>(&self) -> Arc<Registry<K>> {
        let key = TypeId::of::<K>();

        let existing = self
            .registries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(erased) = existing {
            return downcast(erased);
        }

        let mut registries = self
            .registries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let erased = registries
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(key = core::any::type_name::<K>(), "registry created");
                Arc::new(Registry::<K>::new()) as Arc<dyn Any + Send + Sync>
            })
            .clone();
        downcast(erased)
    }

    /// Register a mapper in the registry for its identity type.
    pub fn register<T>(&self, mapper: Arc<Mapper<T>>) -> bool
    where
        T: DomainObject,
        T::Id: SqlKey,
    {
        self.registry::<T::Id>().register(mapper)
    }

    pub fn mapper<T>(&self) -> Result<Arc<Mapper<T>>, RegistryError>
    where
        T: DomainObject,
        T::Id: SqlKey,
    {
        self.registry::<T::Id>().mapper::<T>()
    }

    /// Hydrate a ghost via `Registry<T::Id>`.
    pub async fn load<T>(&self, obj: &T) -> Result<(), MapperError>
    where
        T: DomainObject,
        T::Id: SqlKey,
    {
        let registry = self.registry::<T::Id>();
        registry.load(obj).await
    }

    /// Number of identity types with a registry.
    pub fn len(&self) -> usize {
        self.registries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<K: SqlKey>(erased: Arc<dyn Any + Send + Sync>) -> Arc<Registry<K>> {
    match erased.downcast::<Registry<K>>() {
        Ok(registry) => registry,
        // Entries are keyed by `TypeId::of::<K>()` and only ever hold `Registry<K>`.
        Err(_) => unreachable!("registry slot for {} holds another type", core::any::type_name::<K>()),
    }
}
