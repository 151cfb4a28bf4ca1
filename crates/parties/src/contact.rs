use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use ghostmap_core::{Entity, Ghost, Lifecycle, Registrable};
use ghostmap_infra::{FromSqlValue, SqlType, SqlTyped, SqlValue};

ghostmap_core::uuid_id!(
    /// Identifier of a contact.
    ContactId
);

impl From<ContactId> for SqlValue {
    fn from(value: ContactId) -> Self {
        SqlValue::Uuid(value.into())
    }
}

impl SqlTyped for ContactId {
    const SQL_TYPE: SqlType = SqlType::Uuid;
}

impl FromSqlValue for ContactId {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        uuid::Uuid::from_sql_value(value).map(ContactId::from_uuid)
    }
}

/// A phone contact attached to a party.
#[derive(Debug)]
pub struct Contact {
    id: ContactId,
    party_id: String,
    phone: RwLock<String>,
    created_at: DateTime<Utc>,
    lifecycle: Lifecycle,
}

impl Contact {
    pub fn new(party_id: impl Into<String>, phone: impl Into<String>) -> Self {
        Self::restore(ContactId::new(), party_id.into(), phone.into(), Utc::now())
    }

    pub(crate) fn restore(
        id: ContactId,
        party_id: String,
        phone: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            party_id,
            phone: RwLock::new(phone),
            created_at,
            lifecycle: Lifecycle::loaded(),
        }
    }

    pub fn party_id(&self) -> &str {
        &self.party_id
    }

    pub fn phone(&self) -> String {
        self.phone
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn change_phone(&self, phone: impl Into<String>) {
        *self.phone.write().unwrap_or_else(PoisonError::into_inner) = phone.into();
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Contact {
    type Id = ContactId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Registrable for Contact {}

impl Ghost for Contact {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}
