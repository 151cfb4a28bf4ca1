//! Identity map: at most one live instance per identity.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identity-keyed cache of shared instances, owned by one mapper.
///
/// Never evicts on its own; entries leave only through [`IdentityMap::remove`].
/// The lock is never held across an `.await`, and a poisoned lock is recovered
/// since every critical section leaves the map consistent.
#[derive(Debug)]
pub struct IdentityMap<K, T> {
    entries: RwLock<HashMap<K, Arc<T>>>,
}

impl<K, T> Default for IdentityMap<K, T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, T> IdentityMap<K, T>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &K) -> Option<Arc<T>> {
        self.read().get(id).cloned()
    }

    /// Insert or replace.
    pub fn insert(&self, id: K, value: Arc<T>) {
        self.write().insert(id, value);
    }

    /// Insert unless an instance is already registered; returns whichever
    /// instance ends up in the map.
    pub fn insert_if_absent(&self, id: K, value: Arc<T>) -> Arc<T> {
        Arc::clone(self.write().entry(id).or_insert(value))
    }

    pub fn remove(&self, id: &K) -> Option<Arc<T>> {
        self.write().remove(id)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, Arc<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, Arc<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
