//! SQL templates, row codecs and mapper wiring for the parties module.
//!
//! Every template uses positional `$n` placeholders with the identity column
//! first, which is the shape both `PgDatabase` and `InMemoryDatabase` accept.

use std::sync::Arc;

use ghostmap_core::{DomainError, Entity, StateError};
use ghostmap_infra::{
    BindError, BoundStatement, Database, DatabaseConfig, DecodeError, EntityCodec,
    InMemoryDatabase, Mapper, MapperSettings, Row, Statements,
};

use crate::contact::{Contact, ContactId};
use crate::group::PartyGroup;
use crate::party::{ContactInfo, Party, PartyDetails};

pub mod party {
    pub const TABLE: &str = "PARTY";
    pub const COLUMNS: &[&str] = &["ID", "KIND", "NAME", "EMAIL", "PHONE", "STATUS"];
    pub const FIND: &str = "SELECT ID, KIND, NAME, EMAIL, PHONE, STATUS FROM PARTY WHERE ID = $1;";
    pub const INSERT: &str = "INSERT INTO PARTY (ID, KIND, NAME, EMAIL, PHONE, STATUS) VALUES ($1, $2, $3, $4, $5, $6);";
    pub const UPDATE: &str = "UPDATE PARTY SET KIND = $2, NAME = $3, EMAIL = $4, PHONE = $5, STATUS = $6 WHERE ID = $1";
    pub const REMOVE: &str = "DELETE FROM PARTY WHERE ID = $1;";
    pub const DDL: &str = "CREATE TABLE IF NOT EXISTS PARTY (ID TEXT PRIMARY KEY, KIND TEXT NOT NULL, NAME TEXT NOT NULL, EMAIL TEXT, PHONE TEXT, STATUS TEXT NOT NULL)";
}

pub mod party_group {
    pub const TABLE: &str = "PARTY_GROUP";
    pub const COLUMNS: &[&str] = &["ID", "TITLE"];
    pub const FIND: &str = "SELECT ID, TITLE FROM PARTY_GROUP WHERE ID = $1;";
    pub const INSERT: &str = "INSERT INTO PARTY_GROUP (ID, TITLE) VALUES ($1, $2);";
    pub const UPDATE: &str = "UPDATE PARTY_GROUP SET TITLE = $2 WHERE ID = $1";
    pub const REMOVE: &str = "DELETE FROM PARTY_GROUP WHERE ID = $1;";
    pub const DDL: &str =
        "CREATE TABLE IF NOT EXISTS PARTY_GROUP (ID TEXT PRIMARY KEY, TITLE TEXT NOT NULL)";
}

pub mod contact {
    pub const TABLE: &str = "CONTACT";
    pub const COLUMNS: &[&str] = &["ID", "PARTY_ID", "PHONE", "CREATED_AT"];
    pub const FIND: &str = "SELECT ID, PARTY_ID, PHONE, CREATED_AT FROM CONTACT WHERE ID = $1;";
    pub const INSERT: &str = "INSERT INTO CONTACT (ID, PARTY_ID, PHONE, CREATED_AT) VALUES ($1, $2, $3, $4);";
    pub const UPDATE: &str = "UPDATE CONTACT SET PHONE = $2 WHERE ID = $1";
    pub const REMOVE: &str = "DELETE FROM CONTACT WHERE ID = $1;";
    pub const DDL: &str = "CREATE TABLE IF NOT EXISTS CONTACT (ID UUID PRIMARY KEY, PARTY_ID TEXT NOT NULL, PHONE TEXT NOT NULL, CREATED_AT TIMESTAMPTZ NOT NULL)";
}

fn invalid(entity: &'static str, err: DomainError) -> DecodeError {
    DecodeError::invalid(entity, err.to_string())
}

fn unavailable(field: &'static str) -> impl FnOnce(StateError) -> BindError {
    move |e| BindError::unavailable("Party", field, e)
}

/// Row codec for [`Party`] (columns as in [`party::FIND`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct PartyCodec;

impl PartyCodec {
    fn details(row: &Row) -> Result<PartyDetails, DecodeError> {
        Ok(PartyDetails {
            kind: row
                .get::<String>(1)?
                .parse()
                .map_err(|e| invalid("Party", e))?,
            name: row.get(2)?,
            contact: ContactInfo {
                email: row.get(3)?,
                phone: row.get(4)?,
            },
            status: row
                .get::<String>(5)?
                .parse()
                .map_err(|e| invalid("Party", e))?,
        })
    }

    fn bind(obj: &Party, stmt: &mut BoundStatement) -> Result<(), BindError> {
        let details = obj.snapshot().map_err(unavailable("details"))?;
        stmt.append(obj.id().as_str())
            .append(details.kind.as_str())
            .append(details.name)
            .append(details.contact.email)
            .append(details.contact.phone)
            .append(details.status.as_str());
        Ok(())
    }
}

impl EntityCodec<Party> for PartyCodec {
    fn decode(&self, row: &Row) -> Result<Party, DecodeError> {
        Ok(Party::loaded(row.get(0)?, Self::details(row)?))
    }

    fn bind_insert(&self, obj: &Party, stmt: &mut BoundStatement) -> Result<(), BindError> {
        Self::bind(obj, stmt)
    }

    fn bind_update(&self, obj: &Party, stmt: &mut BoundStatement) -> Result<(), BindError> {
        Self::bind(obj, stmt)
    }

    fn populate(&self, obj: &Party, row: &Row) -> Result<(), DecodeError> {
        obj.fill(Self::details(row)?);
        Ok(())
    }

    fn ghost(&self, id: &String) -> Option<Party> {
        Some(Party::ghost(id.clone()))
    }
}

/// Row codec for [`PartyGroup`] (columns as in [`party_group::FIND`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct PartyGroupCodec;

impl EntityCodec<PartyGroup> for PartyGroupCodec {
    fn decode(&self, row: &Row) -> Result<PartyGroup, DecodeError> {
        Ok(PartyGroup::new(row.get::<String>(0)?, row.get::<String>(1)?))
    }

    fn bind_insert(&self, obj: &PartyGroup, stmt: &mut BoundStatement) -> Result<(), BindError> {
        stmt.append(obj.id().as_str()).append(obj.title());
        Ok(())
    }

    fn bind_update(&self, obj: &PartyGroup, stmt: &mut BoundStatement) -> Result<(), BindError> {
        self.bind_insert(obj, stmt)
    }

    fn populate(&self, obj: &PartyGroup, row: &Row) -> Result<(), DecodeError> {
        obj.retitle(row.get::<String>(1)?);
        Ok(())
    }
}

/// Row codec for [`Contact`] (columns as in [`contact::FIND`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactCodec;

impl EntityCodec<Contact> for ContactCodec {
    fn decode(&self, row: &Row) -> Result<Contact, DecodeError> {
        Ok(Contact::restore(
            row.get::<ContactId>(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
        ))
    }

    fn bind_insert(&self, obj: &Contact, stmt: &mut BoundStatement) -> Result<(), BindError> {
        stmt.append(*obj.id())
            .append(obj.party_id())
            .append(obj.phone())
            .append(obj.created_at());
        Ok(())
    }

    fn bind_update(&self, obj: &Contact, stmt: &mut BoundStatement) -> Result<(), BindError> {
        stmt.append(*obj.id()).append(obj.phone());
        Ok(())
    }

    fn populate(&self, obj: &Contact, row: &Row) -> Result<(), DecodeError> {
        obj.change_phone(row.get::<String>(2)?);
        Ok(())
    }
}

/// Lazily loading mapper for parties.
pub fn party_mapper(db: Arc<dyn Database>, config: &DatabaseConfig) -> Mapper<Party> {
    Mapper::new(
        db,
        Statements::new(party::FIND, party::INSERT, party::UPDATE, party::REMOVE),
        PartyCodec,
        MapperSettings::from_config(config).with_lazy_loading(true),
    )
}

pub fn party_group_mapper(db: Arc<dyn Database>, config: &DatabaseConfig) -> Mapper<PartyGroup> {
    Mapper::new(
        db,
        Statements::new(
            party_group::FIND,
            party_group::INSERT,
            party_group::UPDATE,
            party_group::REMOVE,
        ),
        PartyGroupCodec,
        MapperSettings::from_config(config),
    )
}

pub fn contact_mapper(db: Arc<dyn Database>, config: &DatabaseConfig) -> Mapper<Contact> {
    Mapper::new(
        db,
        Statements::new(contact::FIND, contact::INSERT, contact::UPDATE, contact::REMOVE),
        ContactCodec,
        MapperSettings::from_config(config),
    )
}

/// Build every parties mapper and register it in `directory`.
pub fn register_all(
    directory: &ghostmap_infra::RegistryDirectory,
    db: Arc<dyn Database>,
    config: &DatabaseConfig,
) {
    directory.register(Arc::new(party_mapper(Arc::clone(&db), config)));
    directory.register(Arc::new(party_group_mapper(Arc::clone(&db), config)));
    directory.register(Arc::new(contact_mapper(db, config)));
}

/// Create the parties tables in an in-memory database.
pub fn install_schema(db: &InMemoryDatabase) {
    db.create_table(party::TABLE, party::COLUMNS);
    db.create_table(party_group::TABLE, party_group::COLUMNS);
    db.create_table(contact::TABLE, contact::COLUMNS);
}

/// DDL for the parties tables on Postgres.
pub const POSTGRES_SCHEMA: &[&str] = &[party::DDL, party_group::DDL, contact::DDL];

#[cfg(test)]
mod tests {
    use super::*;
    use ghostmap_core::Ghost;
    use ghostmap_infra::{Rows, SqlType, SqlValue};

    fn party_row(kind: &str) -> Row {
        Rows::new(
            party::COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![vec![
                SqlValue::from("p-1"),
                SqlValue::from(kind),
                SqlValue::from("Acme"),
                SqlValue::Null,
                SqlValue::from("555-0100"),
                SqlValue::from("active"),
            ]],
        )
        .next()
        .unwrap()
    }

    #[test]
    fn party_row_decodes_with_nullable_contact() {
        let party = PartyCodec.decode(&party_row("supplier")).unwrap();
        assert!(party.is_loaded());
        assert_eq!(
            party.contact().unwrap(),
            ContactInfo {
                email: None,
                phone: Some("555-0100".into()),
            }
        );
    }

    #[test]
    fn unknown_kind_is_a_decode_error() {
        let err = PartyCodec.decode(&party_row("partner")).unwrap_err();
        assert!(matches!(err, DecodeError::Invalid { entity: "Party", .. }));
    }

    #[test]
    fn binding_a_ghost_party_fails() {
        let db: Arc<dyn Database> = Arc::new(InMemoryDatabase::new());
        let mut stmt = BoundStatement::new(db, party::INSERT);
        let err = PartyCodec
            .bind_insert(&Party::ghost("p-1"), &mut stmt)
            .unwrap_err();
        assert!(matches!(err, BindError::Unavailable { entity: "Party", .. }));
        assert!(stmt.parameters().is_empty());
    }

    #[test]
    fn insert_binds_columns_in_placeholder_order() {
        let db: Arc<dyn Database> = Arc::new(InMemoryDatabase::new());
        let mut stmt = BoundStatement::new(db, party::INSERT);
        PartyCodec
            .bind_insert(&Party::new("p-1", crate::PartyKind::Customer, "Acme"), &mut stmt)
            .unwrap();
        assert_eq!(
            stmt.parameters(),
            &[
                SqlValue::from("p-1"),
                SqlValue::from("customer"),
                SqlValue::from("Acme"),
                SqlValue::TypedNull(SqlType::Text),
                SqlValue::TypedNull(SqlType::Text),
                SqlValue::from("active"),
            ]
        );
    }
}
