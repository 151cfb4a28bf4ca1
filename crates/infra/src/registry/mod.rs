//! Type-indexed mapper registry.
//!
//! A [`Registry<K>`] holds the mappers of every entity type whose identity
//! type is `K`, keyed by the entity's [`TypeTag`]. Lookups downcast the stored
//! mapper back to `Mapper<T>`; the registry never inspects objects beyond
//! their type tag.

pub mod directory;

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use ghostmap_core::{DomainObject, TypeTag};
use tracing::debug;

use crate::error::{MapperError, RegistryError};
use crate::mapper::Mapper;
use crate::value::SqlKey;

pub use directory::RegistryDirectory;

type ErasedMapper = Arc<dyn Any + Send + Sync>;

/// Mappers for all entity types keyed by `K`.
pub struct Registry<K> {
    mappers: RwLock<HashMap<TypeTag, ErasedMapper>>,
    _key: PhantomData<fn() -> K>,
}

impl<K> Default for Registry<K> {
    fn default() -> Self {
        Self {
            mappers: RwLock::new(HashMap::new()),
            _key: PhantomData,
        }
    }
}

impl<K> Registry<K>
where
    K: SqlKey,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mapper` under its entity's type tag.
    ///
    /// The first registration for a type wins; later ones are ignored and
    /// reported as `false`.
    pub fn register<T>(&self, mapper: Arc<Mapper<T>>) -> bool
    where
        T: DomainObject<Id = K>,
    {
        let tag = mapper.type_tag();
        let mut mappers = self.mappers.write().unwrap_or_else(PoisonError::into_inner);
        if mappers.contains_key(&tag) {
            debug!(entity = tag.name(), "mapper already registered; ignoring");
            return false;
        }
        mappers.insert(tag, mapper);
        debug!(entity = tag.name(), "mapper registered");
        true
    }

    /// The mapper registered under `tag`, typed as `Mapper<T>`.
    pub fn mapper_for<T>(&self, tag: TypeTag) -> Result<Arc<Mapper<T>>, RegistryError>
    where
        T: DomainObject<Id = K>,
    {
        let erased = self
            .mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tag)
            .cloned()
            .ok_or(RegistryError::NotRegistered {
                type_name: tag.name(),
            })?;

        erased
            .downcast::<Mapper<T>>()
            .map_err(|_| RegistryError::TypeMismatch {
                tag: tag.name(),
                requested: core::any::type_name::<T>(),
            })
    }

    /// Shorthand for `mapper_for::<T>(TypeTag::of::<T>())`.
    pub fn mapper<T>(&self) -> Result<Arc<Mapper<T>>, RegistryError>
    where
        T: DomainObject<Id = K>,
    {
        self.mapper_for(TypeTag::of::<T>())
    }

    /// Hydrate a ghost through the mapper registered for its runtime type.
    pub async fn load<T>(&self, obj: &T) -> Result<(), MapperError>
    where
        T: DomainObject<Id = K>,
    {
        let mapper = self.mapper_for::<T>(obj.type_tag())?;
        mapper.load(obj).await
    }

    pub fn contains(&self, tag: TypeTag) -> bool {
        self.mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn registered_types(&self) -> Vec<TypeTag> {
        self.mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

impl<K> std::fmt::Debug for Registry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mappers = self.mappers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Registry")
            .field("key", &core::any::type_name::<K>())
            .field("types", &mappers.keys().map(TypeTag::name).collect::<Vec<_>>())
            .finish()
    }
}
