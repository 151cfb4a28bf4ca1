//! Entity trait: identity + continuity across state changes.

use crate::ghost::Ghost;
use crate::type_tag::Registrable;

/// Entity marker + minimal interface (the identity capability).
pub trait Entity {
    /// Strongly-typed entity identifier.
    ///
    /// Identities are compared, hashed and moved between tasks by the identity map.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Returns the entity identifier. Immutable after creation.
    fn id(&self) -> &Self::Id;
}

/// Everything a mapper needs from a persisted object: identity, a runtime type
/// tag and a ghost lifecycle.
///
/// Blanket-implemented; entities implement the three capabilities separately.
pub trait DomainObject: Entity + Registrable + Ghost + Send + Sync + 'static {}

impl<T> DomainObject for T where T: Entity + Registrable + Ghost + Send + Sync + 'static {}
