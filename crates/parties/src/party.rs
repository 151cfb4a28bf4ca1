use core::fmt;
use core::str::FromStr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use ghostmap_core::{DomainError, Entity, Ghost, Lifecycle, Registrable, StateError};

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

impl FromStr for PartyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(PartyKind::Customer),
            "supplier" => Ok(PartyKind::Supplier),
            other => Err(DomainError::validation(format!("unknown party kind '{other}'"))),
        }
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyStatus {
    Active,
    Suspended,
}

impl PartyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyStatus::Active => "active",
            PartyStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for PartyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PartyStatus::Active),
            "suspended" => Ok(PartyStatus::Suspended),
            other => Err(DomainError::validation(format!("unknown party status '{other}'"))),
        }
    }
}

/// Contact information for a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartyDetails {
    pub(crate) kind: PartyKind,
    pub(crate) name: String,
    pub(crate) contact: ContactInfo,
    pub(crate) status: PartyStatus,
}

impl Default for PartyDetails {
    fn default() -> Self {
        Self {
            kind: PartyKind::Customer,
            name: String::new(),
            contact: ContactInfo::default(),
            status: PartyStatus::Active,
        }
    }
}

/// A customer or supplier.
///
/// Parties are loaded lazily: a ghost carries only its id, and every other
/// accessor returns `StateError::NotLoaded` until the party is resolved.
#[derive(Debug)]
pub struct Party {
    id: String,
    details: RwLock<PartyDetails>,
    lifecycle: Lifecycle,
}

impl Party {
    pub fn new(id: impl Into<String>, kind: PartyKind, name: impl Into<String>) -> Self {
        Self::loaded(
            id.into(),
            PartyDetails {
                kind,
                name: name.into(),
                ..PartyDetails::default()
            },
        )
    }

    /// An id-only instance awaiting hydration.
    pub fn ghost(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            details: RwLock::new(PartyDetails::default()),
            lifecycle: Lifecycle::ghost(),
        }
    }

    pub(crate) fn loaded(id: String, details: PartyDetails) -> Self {
        Self {
            id,
            details: RwLock::new(details),
            lifecycle: Lifecycle::loaded(),
        }
    }

    pub fn with_contact(self, contact: ContactInfo) -> Self {
        self.write().contact = contact;
        self
    }

    pub fn kind(&self) -> Result<PartyKind, StateError> {
        Ok(self.details()?.kind)
    }

    pub fn name(&self) -> Result<String, StateError> {
        Ok(self.details()?.name.clone())
    }

    pub fn contact(&self) -> Result<ContactInfo, StateError> {
        Ok(self.details()?.contact.clone())
    }

    pub fn status(&self) -> Result<PartyStatus, StateError> {
        Ok(self.details()?.status)
    }

    /// Invariant helper: suspended parties cannot transact.
    pub fn can_transact(&self) -> Result<bool, StateError> {
        Ok(self.status()? == PartyStatus::Active)
    }

    pub fn rename(&self, name: impl Into<String>) -> Result<(), StateError> {
        self.details_mut()?.name = name.into();
        Ok(())
    }

    pub fn update_contact(&self, contact: ContactInfo) -> Result<(), StateError> {
        self.details_mut()?.contact = contact;
        Ok(())
    }

    pub fn suspend(&self) -> Result<(), StateError> {
        self.details_mut()?.status = PartyStatus::Suspended;
        Ok(())
    }

    pub fn activate(&self) -> Result<(), StateError> {
        self.details_mut()?.status = PartyStatus::Active;
        Ok(())
    }

    /// Snapshot of every persisted field; used by the binders.
    pub(crate) fn snapshot(&self) -> Result<PartyDetails, StateError> {
        Ok(self.details()?.clone())
    }

    /// Overwrite the fields during a load (the party is LOADING, not yet LOADED).
    pub(crate) fn fill(&self, details: PartyDetails) {
        *self.write() = details;
    }

    fn details(&self) -> Result<RwLockReadGuard<'_, PartyDetails>, StateError> {
        self.ensure_loaded()?;
        Ok(self.details.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn details_mut(&self) -> Result<RwLockWriteGuard<'_, PartyDetails>, StateError> {
        self.ensure_loaded()?;
        Ok(self.write())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PartyDetails> {
        self.details.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_loaded(&self) -> Result<(), StateError> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(StateError::NotLoaded {
                entity: "Party",
                status: self.load_status(),
            })
        }
    }
}

impl Entity for Party {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Registrable for Party {}

impl Ghost for Party {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostmap_core::LoadStatus;

    #[test]
    fn new_party_is_loaded_and_active() {
        let party = Party::new("p-1", PartyKind::Supplier, "Acme");
        assert!(party.is_loaded());
        assert_eq!(party.kind().unwrap(), PartyKind::Supplier);
        assert_eq!(party.name().unwrap(), "Acme");
        assert!(party.can_transact().unwrap());
    }

    #[test]
    fn ghost_fields_are_unavailable() {
        let party = Party::ghost("p-1");
        assert_eq!(party.id(), "p-1");
        assert_eq!(
            party.name().unwrap_err(),
            StateError::NotLoaded {
                entity: "Party",
                status: LoadStatus::Ghost,
            }
        );
        assert!(party.rename("x").is_err());
    }

    #[test]
    fn suspended_party_cannot_transact() {
        let party = Party::new("p-1", PartyKind::Customer, "Acme");
        party.suspend().unwrap();
        assert!(!party.can_transact().unwrap());
        party.activate().unwrap();
        assert!(party.can_transact().unwrap());
    }

    #[test]
    fn enum_text_round_trips() {
        for kind in [PartyKind::Customer, PartyKind::Supplier] {
            assert_eq!(kind.as_str().parse::<PartyKind>().unwrap(), kind);
        }
        assert!("partner".parse::<PartyKind>().is_err());
        assert_eq!("suspended".parse::<PartyStatus>().unwrap(), PartyStatus::Suspended);
    }
}
