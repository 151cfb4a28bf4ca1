//! Generic data mapper.
//!
//! A [`Mapper<T>`] moves one entity type between the database and memory. It
//! owns the entity's SQL templates ([`Statements`]), its row codec
//! ([`EntityCodec`]) and an [`IdentityMap`] guaranteeing that every `find` of
//! the same identity yields the same `Arc<T>`.
//!
//! Writes are write-through: the statement is bound, executed, and only then is
//! the identity map updated. A failed bind or execute leaves the map untouched.

pub mod identity_map;

use std::fmt;
use std::sync::Arc;

use ghostmap_core::{DomainObject, LoadStatus, StateError, TypeTag};
use tracing::{debug, instrument};

use crate::config::MapperSettings;
use crate::context::ExecContext;
use crate::database::Database;
use crate::error::{BindError, DecodeError, MapperError};
use crate::row::{Row, Rows};
use crate::statement::{BoundStatement, StatementSource};
use crate::value::SqlKey;

pub use identity_map::IdentityMap;

/// SQL templates for one entity table.
///
/// `find` and `remove` take the identity as `$1`; `find` selects the identity
/// column first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statements {
    pub find: Arc<str>,
    pub insert: Arc<str>,
    pub update: Arc<str>,
    pub remove: Arc<str>,
}

impl Statements {
    pub fn new(
        find: impl Into<Arc<str>>,
        insert: impl Into<Arc<str>>,
        update: impl Into<Arc<str>>,
        remove: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            find: find.into(),
            insert: insert.into(),
            update: update.into(),
            remove: remove.into(),
        }
    }
}

/// Per-entity conversion between objects and rows.
///
/// Implementations are normally generated alongside the entity.
pub trait EntityCodec<T: DomainObject>: Send + Sync + 'static {
    /// Build a fully loaded object from a complete row (identity in column 0).
    fn decode(&self, row: &Row) -> Result<T, DecodeError>;

    /// Append the insert template's parameters, in placeholder order.
    fn bind_insert(&self, obj: &T, stmt: &mut BoundStatement) -> Result<(), BindError>;

    /// Append the update template's parameters, in placeholder order.
    fn bind_update(&self, obj: &T, stmt: &mut BoundStatement) -> Result<(), BindError>;

    /// Fill the non-identity fields of an existing (loading) object.
    fn populate(&self, obj: &T, row: &Row) -> Result<(), DecodeError>;

    /// A field-less instance carrying only `id`, for lazy loading.
    ///
    /// Entities without deferred loading keep the default.
    fn ghost(&self, _id: &T::Id) -> Option<T> {
        None
    }
}

/// Data mapper for entity type `T`.
pub struct Mapper<T>
where
    T: DomainObject,
{
    db: Arc<dyn Database>,
    statements: Statements,
    codec: Box<dyn EntityCodec<T>>,
    settings: MapperSettings,
    identity_map: IdentityMap<T::Id, T>,
}

impl<T> Mapper<T>
where
    T: DomainObject,
    T::Id: SqlKey,
{
    pub fn new(
        db: Arc<dyn Database>,
        statements: Statements,
        codec: impl EntityCodec<T>,
        settings: MapperSettings,
    ) -> Self {
        Self {
            db,
            statements,
            codec: Box::new(codec),
            settings,
            identity_map: IdentityMap::new(),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    pub fn lazy_loading(&self) -> bool {
        self.settings.lazy_loading
    }

    pub fn is_cached(&self, id: &T::Id) -> bool {
        self.identity_map.contains(id)
    }

    pub fn cached_len(&self) -> usize {
        self.identity_map.len()
    }

    /// Persist a new object and register it under its identity.
    #[instrument(skip(self, ctx, obj), fields(entity = entity_name::<T>(), id = ?obj.id()), err)]
    pub async fn insert(&self, ctx: &ExecContext, obj: &Arc<T>) -> Result<T::Id, MapperError> {
        let mut stmt = self.statement(&self.statements.insert);
        self.codec.bind_insert(obj, &mut stmt)?;
        stmt.execute(&self.context(ctx)).await?;

        let id = obj.id().clone();
        self.identity_map.insert(id.clone(), Arc::clone(obj));
        Ok(id)
    }

    /// Write the object's current fields and (re-)register it.
    #[instrument(skip(self, ctx, obj), fields(entity = entity_name::<T>(), id = ?obj.id()), err)]
    pub async fn update(&self, ctx: &ExecContext, obj: &Arc<T>) -> Result<(), MapperError> {
        let mut stmt = self.statement(&self.statements.update);
        self.codec.bind_update(obj, &mut stmt)?;
        stmt.execute(&self.context(ctx)).await?;

        self.identity_map.insert(obj.id().clone(), Arc::clone(obj));
        Ok(())
    }

    /// Delete by identity and evict it, whether or not a row was affected.
    #[instrument(skip(self, ctx), fields(entity = entity_name::<T>()), err)]
    pub async fn remove(&self, ctx: &ExecContext, id: &T::Id) -> Result<(), MapperError> {
        let mut stmt = self.statement(&self.statements.remove);
        stmt.append(id.clone());
        let affected = stmt.execute(&self.context(ctx)).await?;

        self.identity_map.remove(id);
        debug!(affected, "evicted");
        Ok(())
    }

    /// Look up one object by identity.
    ///
    /// Order: identity map, then (lazy mappers) a fresh ghost, then the database.
    #[instrument(skip(self, ctx), fields(entity = entity_name::<T>()), err)]
    pub async fn find(&self, ctx: &ExecContext, id: &T::Id) -> Result<Arc<T>, MapperError> {
        if let Some(hit) = self.identity_map.get(id) {
            debug!("identity map hit");
            return Ok(hit);
        }

        if self.settings.lazy_loading {
            if let Some(ghost) = self.codec.ghost(id) {
                debug!("ghost created");
                return Ok(self.identity_map.insert_if_absent(id.clone(), Arc::new(ghost)));
            }
        }

        let mut stmt = self.statement(&self.statements.find);
        stmt.append(id.clone());
        let rows = stmt.execute_query(&self.context(ctx)).await?;
        let row = self.exactly_one(rows, id)?;
        self.resolve_row(&row)
    }

    /// Run caller-supplied SQL and map every row, reusing cached instances.
    ///
    /// Column 0 of each row must be the identity. Cursor order is preserved;
    /// repeated identities come back as the same instance.
    #[instrument(skip(self, ctx, source), fields(entity = entity_name::<T>(), sql = source.sql()), err)]
    pub async fn find_many(
        &self,
        ctx: &ExecContext,
        source: &dyn StatementSource,
    ) -> Result<Vec<Arc<T>>, MapperError> {
        let stmt = BoundStatement::from_source(Arc::clone(&self.db), source);
        let rows = stmt.execute_query(&self.context(ctx)).await?;

        let mut found = Vec::with_capacity(rows.len());
        for row in rows {
            found.push(self.resolve_row(&row)?);
        }
        Ok(found)
    }

    /// Hydrate a ghost in place, bounded by the configured load timeout.
    pub async fn load(&self, obj: &T) -> Result<(), MapperError> {
        self.load_with(&ExecContext::with_timeout(self.settings.load_timeout), obj)
            .await
    }

    /// Hydrate a ghost in place: GHOST -> LOADING -> LOADED.
    ///
    /// On failure (or if the future is dropped) the object goes back to GHOST.
    #[instrument(skip(self, ctx, obj), fields(entity = entity_name::<T>(), id = ?obj.id()), err)]
    pub async fn load_with(&self, ctx: &ExecContext, obj: &T) -> Result<(), MapperError> {
        let status = obj.load_status();
        if status != LoadStatus::Ghost {
            return Err(StateError::NotAGhost { status }.into());
        }

        let loading = obj.lifecycle().begin_loading()?;

        let mut stmt = self.statement(&self.statements.find);
        stmt.append(obj.id().clone());
        let rows = stmt.execute_query(ctx).await?;
        let row = self.exactly_one(rows, obj.id())?;
        self.codec.populate(obj, &row)?;

        loading.finish()?;
        debug!("loaded");
        Ok(())
    }

    fn statement(&self, sql: &Arc<str>) -> BoundStatement {
        BoundStatement::new(Arc::clone(&self.db), Arc::clone(sql))
    }

    fn context(&self, ctx: &ExecContext) -> ExecContext {
        ctx.or_timeout(self.settings.statement_timeout)
    }

    fn exactly_one(&self, mut rows: Rows, id: &T::Id) -> Result<Row, MapperError> {
        let row = rows
            .next()
            .ok_or_else(|| MapperError::not_found(entity_name::<T>(), id))?;
        let extra = rows.count();
        if extra > 0 {
            return Err(DecodeError::UnexpectedRowCount {
                entity: entity_name::<T>(),
                found: extra + 1,
            }
            .into());
        }
        Ok(row)
    }

    /// Cached instance for the row's identity, or a freshly decoded one.
    fn resolve_row(&self, row: &Row) -> Result<Arc<T>, MapperError> {
        let id: T::Id = row.get(0)?;
        if let Some(hit) = self.identity_map.get(&id) {
            return Ok(hit);
        }
        let decoded = Arc::new(self.codec.decode(row)?);
        Ok(self.identity_map.insert_if_absent(id, decoded))
    }
}

impl<T> fmt::Debug for Mapper<T>
where
    T: DomainObject,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("entity", &entity_name::<T>())
            .field("statements", &self.statements)
            .field("settings", &self.settings)
            .field("cached", &self.identity_map.len())
            .finish_non_exhaustive()
    }
}

fn entity_name<T: 'static>() -> &'static str {
    TypeTag::of::<T>().short_name()
}
