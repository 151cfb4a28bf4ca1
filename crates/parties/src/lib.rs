//! Parties domain module: example entities persisted through `ghostmap-infra`.
//!
//! - [`Party`]: a customer or supplier, loaded lazily (ghost first, fields on resolve).
//! - [`PartyGroup`]: a named grouping of parties, always loaded eagerly.
//! - [`Contact`]: a phone contact keyed by a UUID, showing a second identity type.
//!
//! The [`mapping`] module holds the SQL templates, row codecs and mapper
//! wiring for all three.

pub mod contact;
pub mod group;
pub mod mapping;
pub mod party;

pub use contact::{Contact, ContactId};
pub use group::PartyGroup;
pub use mapping::{
    ContactCodec, PartyCodec, PartyGroupCodec, contact_mapper, install_schema, party_group_mapper,
    party_mapper, register_all,
};
pub use party::{ContactInfo, Party, PartyKind, PartyStatus};
