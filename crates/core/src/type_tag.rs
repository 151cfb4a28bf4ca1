//! Runtime type tags for registry dispatch.

use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Runtime identity of a domain type: its `TypeId` plus a readable name for
/// diagnostics. Equality and hashing use the `TypeId` only.
#[derive(Debug, Copy, Clone)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `ghostmap_parties::party::Party`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of [`TypeTag::name`].
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Registrable capability: exposes the object's runtime type tag.
pub trait Registrable: 'static {
    fn type_tag(&self) -> TypeTag {
        TypeTag::of::<Self>()
    }
}
