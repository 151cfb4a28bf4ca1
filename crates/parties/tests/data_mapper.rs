//! Eager mappers against the in-memory database.

use std::sync::Arc;

use ghostmap_core::{Entity, Ghost};
use ghostmap_infra::{
    AdHocQuery, Database, DatabaseConfig, DatabaseError, ExecContext, InMemoryDatabase,
    MapperError,
};
use ghostmap_parties::{Contact, PartyGroup, contact_mapper, install_schema, party_group_mapper};

fn setup() -> Arc<InMemoryDatabase> {
    ghostmap_observability::init_for_tests();
    let db = Arc::new(InMemoryDatabase::new());
    install_schema(&db);
    db
}

fn ctx() -> ExecContext {
    ExecContext::background()
}

#[tokio::test]
async fn insert_then_find_returns_the_inserted_instance() {
    let db = setup();
    let mapper = party_group_mapper(db.clone(), &DatabaseConfig::default());

    let group = Arc::new(PartyGroup::new("stringIdValue", "nameValue"));
    let id = mapper.insert(&ctx(), &group).await.unwrap();
    assert_eq!(id, "stringIdValue");

    let found = mapper.find(&ctx(), &id).await.unwrap();
    assert!(Arc::ptr_eq(&found, &group));
    assert_eq!(found.title(), "nameValue");
    assert_eq!(db.row_count("PARTY_GROUP"), 1);
}

#[tokio::test]
async fn fresh_mapper_reads_the_row_back() {
    let db = setup();
    let writer = party_group_mapper(db.clone(), &DatabaseConfig::default());
    writer
        .insert(&ctx(), &Arc::new(PartyGroup::new("stringIdValue", "nameValue")))
        .await
        .unwrap();

    let reader = party_group_mapper(db.clone(), &DatabaseConfig::default());
    let first = reader.find(&ctx(), &"stringIdValue".to_string()).await.unwrap();
    let second = reader.find(&ctx(), &"stringIdValue".to_string()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.is_loaded());
    assert_eq!(first.title(), "nameValue");
    assert_eq!(db.stats("PARTY_GROUP").queries, 1);
}

#[tokio::test]
async fn update_is_visible_to_later_finds() {
    let db = setup();
    let mapper = party_group_mapper(db.clone(), &DatabaseConfig::default());
    let group = Arc::new(PartyGroup::new("stringIdValue", "nameValue"));
    mapper.insert(&ctx(), &group).await.unwrap();

    group.retitle("newRandomName");
    mapper.update(&ctx(), &group).await.unwrap();

    let reader = party_group_mapper(db.clone(), &DatabaseConfig::default());
    let found = reader.find(&ctx(), &"stringIdValue".to_string()).await.unwrap();
    assert_eq!(found.title(), "newRandomName");
}

#[tokio::test]
async fn remove_then_find_is_not_found() {
    let db = setup();
    let mapper = party_group_mapper(db.clone(), &DatabaseConfig::default());
    let group = Arc::new(PartyGroup::new("stringIdValue", "nameValue"));
    mapper.insert(&ctx(), &group).await.unwrap();

    mapper.remove(&ctx(), group.id()).await.unwrap();

    let err = mapper.find(&ctx(), group.id()).await.unwrap_err();
    assert!(
        matches!(err, MapperError::NotFound { entity: "PartyGroup", ref id } if id == "\"stringIdValue\"")
    );
    assert_eq!(db.row_count("PARTY_GROUP"), 0);
}

#[tokio::test]
async fn duplicate_insert_is_a_database_error_and_keeps_the_original() {
    let db = setup();
    let mapper = party_group_mapper(db.clone(), &DatabaseConfig::default());
    let original = Arc::new(PartyGroup::new("g-1", "Wholesale"));
    mapper.insert(&ctx(), &original).await.unwrap();

    let duplicate = Arc::new(PartyGroup::new("g-1", "Retail"));
    let err = mapper.insert(&ctx(), &duplicate).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::Database(DatabaseError::UniqueViolation { .. })
    ));

    let found = mapper.find(&ctx(), &"g-1".to_string()).await.unwrap();
    assert!(Arc::ptr_eq(&found, &original));
}

#[tokio::test]
async fn find_many_collapses_cached_rows_in_cursor_order() {
    let db = setup();
    for (id, title) in [("g-1", "Bronze"), ("g-2", "Silver"), ("g-3", "Gold")] {
        db.execute(
            "INSERT INTO PARTY_GROUP (ID, TITLE) VALUES ($1, $2)",
            &[id.into(), title.into()],
        )
        .await
        .unwrap();
    }
    let mapper = party_group_mapper(db.clone(), &DatabaseConfig::default());
    let silver = mapper.find(&ctx(), &"g-2".to_string()).await.unwrap();

    let query = AdHocQuery::new("SELECT ID, TITLE FROM PARTY_GROUP ORDER BY TITLE");
    let groups = mapper.find_many(&ctx(), &query).await.unwrap();

    let titles: Vec<String> = groups.iter().map(|g| g.title()).collect();
    assert_eq!(titles, vec!["Bronze", "Gold", "Silver"]);
    assert!(Arc::ptr_eq(&groups[2], &silver));

    let again = mapper.find_many(&ctx(), &query).await.unwrap();
    assert!(groups.iter().zip(&again).all(|(a, b)| Arc::ptr_eq(a, b)));
}

#[tokio::test]
async fn find_many_with_parameters() {
    let db = setup();
    let mapper = contact_mapper(db.clone(), &DatabaseConfig::default());
    for (party, phone) in [("p-1", "555-0100"), ("p-2", "555-0101"), ("p-1", "555-0102")] {
        mapper
            .insert(&ctx(), &Arc::new(Contact::new(party, phone)))
            .await
            .unwrap();
    }

    let query = AdHocQuery::new(
        "SELECT ID, PARTY_ID, PHONE, CREATED_AT FROM CONTACT WHERE PARTY_ID = $1 ORDER BY PHONE",
    )
    .bind("p-1");
    let contacts = mapper.find_many(&ctx(), &query).await.unwrap();

    let phones: Vec<String> = contacts.iter().map(|c| c.phone()).collect();
    assert_eq!(phones, vec!["555-0100", "555-0102"]);
}

#[tokio::test]
async fn uuid_keyed_contact_round_trips() {
    let db = setup();
    let writer = contact_mapper(db.clone(), &DatabaseConfig::default());
    let contact = Arc::new(Contact::new("p-1", "555-0100"));
    let id = writer.insert(&ctx(), &contact).await.unwrap();

    let reader = contact_mapper(db.clone(), &DatabaseConfig::default());
    let found = reader.find(&ctx(), &id).await.unwrap();
    assert_eq!(found.id(), contact.id());
    assert_eq!(found.party_id(), "p-1");
    assert_eq!(found.created_at(), contact.created_at());

    contact.change_phone("555-0199");
    writer.update(&ctx(), &contact).await.unwrap();

    let fresh = contact_mapper(db, &DatabaseConfig::default());
    assert_eq!(fresh.find(&ctx(), &id).await.unwrap().phone(), "555-0199");
}
