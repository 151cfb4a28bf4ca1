//! Shared fixtures for unit tests: a small lazily loadable entity and its codec.

use std::sync::{Arc, PoisonError, RwLock};

use ghostmap_core::{Entity, Ghost, Lifecycle, Registrable, StateError};

use crate::config::MapperSettings;
use crate::database::{Database, InMemoryDatabase};
use crate::error::{BindError, DecodeError};
use crate::mapper::{EntityCodec, Mapper, Statements};
use crate::row::Row;
use crate::statement::BoundStatement;

pub const FIND: &str = "SELECT ID, NAME FROM WIDGET WHERE ID = $1;";
pub const INSERT: &str = "INSERT INTO WIDGET (ID, NAME) VALUES ($1, $2);";
pub const UPDATE: &str = "UPDATE WIDGET SET NAME = $2 WHERE ID = $1";
pub const REMOVE: &str = "DELETE FROM WIDGET WHERE ID = $1;";

#[derive(Debug)]
pub struct Widget {
    id: String,
    name: RwLock<String>,
    lifecycle: Lifecycle,
}

impl Widget {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: RwLock::new(name.to_string()),
            lifecycle: Lifecycle::loaded(),
        }
    }

    pub fn ghost(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: RwLock::new(String::new()),
            lifecycle: Lifecycle::ghost(),
        }
    }

    pub fn name(&self) -> Result<String, StateError> {
        if !self.is_loaded() {
            return Err(StateError::NotLoaded {
                entity: "Widget",
                status: self.load_status(),
            });
        }
        Ok(self.name.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    pub fn rename(&self, name: &str) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name.to_string();
    }
}

impl Entity for Widget {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }
}

impl Registrable for Widget {}

impl Ghost for Widget {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

pub struct WidgetCodec;

impl EntityCodec<Widget> for WidgetCodec {
    fn decode(&self, row: &Row) -> Result<Widget, DecodeError> {
        Ok(Widget::new(&row.get::<String>(0)?, &row.get::<String>(1)?))
    }

    fn bind_insert(&self, obj: &Widget, stmt: &mut BoundStatement) -> Result<(), BindError> {
        let name = obj
            .name()
            .map_err(|e| BindError::unavailable("Widget", "name", e))?;
        stmt.append(obj.id.as_str()).append(name);
        Ok(())
    }

    fn bind_update(&self, obj: &Widget, stmt: &mut BoundStatement) -> Result<(), BindError> {
        self.bind_insert(obj, stmt)
    }

    fn populate(&self, obj: &Widget, row: &Row) -> Result<(), DecodeError> {
        obj.rename(&row.get::<String>(1)?);
        Ok(())
    }

    fn ghost(&self, id: &String) -> Option<Widget> {
        Some(Widget::ghost(id))
    }
}

pub fn database() -> Arc<InMemoryDatabase> {
    let db = InMemoryDatabase::new();
    db.create_table("WIDGET", &["ID", "NAME"]);
    Arc::new(db)
}

pub fn statements() -> Statements {
    Statements::new(FIND, INSERT, UPDATE, REMOVE)
}

pub fn mapper(db: Arc<InMemoryDatabase>, settings: MapperSettings) -> Mapper<Widget> {
    let db: Arc<dyn Database> = db;
    Mapper::new(db, statements(), WidgetCodec, settings)
}
