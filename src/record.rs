//! Finder and persistence operations, blanket-implemented for every
//! entity.

use crate::connection::Row;
use crate::db::Db;
use crate::delete::DeleteBuilder;
use crate::entity::{Entity, attributes};
use crate::error::{Error, Result};
use crate::expr::{AttrValue, Clause};
use crate::insert::InsertBuilder;
use crate::query::Criteria;
use crate::select::SelectBuilder;
use crate::update::UpdateBuilder;
use crate::validate::{ValidationReport, validate};
use crate::value::Value;

/// Builds an entity from a result row: matching columns are coerced into
/// their fields, unknown row columns are ignored, the entity is marked
/// persisted and a change-tracking snapshot is captured when the type
/// tracks changes.
pub(crate) fn hydrate<E: Entity>(row: &Row) -> Result<E> {
    let meta = E::meta();
    let mut entity = E::default();
    for (name, value) in row.iter() {
        if meta.has_column(name) {
            entity.set_attribute(name, value.clone())?;
        }
    }
    entity.state_mut().is_new = false;
    if meta.track_changes {
        entity.state_mut().snapshot = attributes(&entity)?;
    }
    entity.reset_associations();
    Ok(entity)
}

/// The active-record surface: finders, aggregate queries, bulk writes and
/// the save cycle. Blanket-implemented for every [`Entity`]; never
/// implemented by hand.
pub trait Record: Entity {
    /// A select builder over this type's table.
    fn select() -> SelectBuilder<Self> {
        SelectBuilder::new()
    }

    /// Loads the row with the given primary key value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no row matches.
    fn find(db: &Db, id: i64) -> Result<Self> {
        let pk = Self::meta().primary_key.first().copied().ok_or_else(|| {
            Error::metadata(format!("no primary key declared on '{}'", Self::meta().table))
        })?;
        Self::select().filter((pk, id)).fetch_first(db)?.ok_or_else(|| {
            Error::not_found(format!(
                "object with id {id} of type {} not found",
                std::any::type_name::<Self>(),
            ))
        })
    }

    /// Loads every row matching the criteria, ordered by the primary key.
    /// Use [`select`](Record::select) for a custom ordering.
    ///
    /// # Errors
    ///
    /// Propagates connection, statement and hydration failures.
    fn find_all(db: &Db, criteria: impl Into<Criteria>) -> Result<Vec<Self>> {
        let mut query = Self::select().filter(criteria);
        if let Some(pk) = Self::meta().primary_key.first() {
            query = query.order_by(*pk);
        }
        query.fetch(db)
    }

    /// Loads the first row matching the criteria, if any.
    ///
    /// # Errors
    ///
    /// Propagates connection, statement and hydration failures.
    fn find_first(db: &Db, criteria: impl Into<Criteria>) -> Result<Option<Self>> {
        Self::select().filter(criteria).fetch_first(db)
    }

    /// Loads the first row whose attribute matches, if any. The value may
    /// be a plain value or a [`Filter`](crate::Filter).
    ///
    /// # Errors
    ///
    /// Propagates connection, statement and hydration failures.
    fn find_first_by_attribute(
        db: &Db,
        attribute: &str,
        value: impl Into<AttrValue>,
    ) -> Result<Option<Self>> {
        Self::find_first(db, (attribute.to_string(), value.into()))
    }

    /// Loads the first row matching every clause, if any.
    ///
    /// # Errors
    ///
    /// Propagates connection, statement and hydration failures.
    fn find_first_by_attributes(db: &Db, clauses: Vec<Clause>) -> Result<Option<Self>> {
        Self::find_first(db, clauses)
    }

    /// Runs a complete hand-written query and hydrates its rows.
    ///
    /// # Errors
    ///
    /// Propagates connection, statement and hydration failures.
    fn find_all_by_sql(db: &Db, sql: &str) -> Result<Vec<Self>> {
        let conn = db.connection::<Self>()?;
        tracing::debug!(table = %Self::meta().table, sql = %sql, "select");
        conn.query(sql)?.iter().map(hydrate).collect()
    }

    /// Counts the rows matching the criteria.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    fn count(db: &Db, criteria: impl Into<Criteria>) -> Result<u64> {
        Self::select().filter(criteria).count(db)
    }

    /// True when at least one row matches the criteria.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    fn exists(db: &Db, criteria: impl Into<Criteria>) -> Result<bool> {
        Self::select().filter(criteria).exists(db)
    }

    /// Updates every matching row with the given assignments, returning
    /// the affected-row count. No assignments, no statement.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    fn update_all(
        db: &Db,
        assignments: Vec<(&str, Value)>,
        criteria: impl Into<Criteria>,
    ) -> Result<u64> {
        let mut builder = UpdateBuilder::<Self>::new().filter(criteria);
        for (column, value) in assignments {
            builder = builder.set(column, value);
        }
        builder.execute(db)
    }

    /// Deletes every matching row, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    fn delete_all(db: &Db, criteria: impl Into<Criteria>) -> Result<u64> {
        DeleteBuilder::<Self>::new().filter(criteria).execute(db)
    }

    /// Validates and writes the entity, then cascades touched
    /// associations.
    ///
    /// A transient entity is inserted with its set columns, receives the
    /// auto-generated key when the type has an auto-increment column, and
    /// becomes persisted. A persisted entity is updated with the diff
    /// against its loaded snapshot when the type tracks changes, or with
    /// every set column otherwise; an empty diff produces no statement at
    /// all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with the full report when a
    /// validator fails, and propagates statement failures.
    fn save(&mut self, db: &Db) -> Result<()> {
        self.save_with(db, true)
    }

    /// The save cycle with validation optionally skipped.
    ///
    /// # Errors
    ///
    /// As [`Record::save`].
    fn save_with(&mut self, db: &Db, validating: bool) -> Result<()> {
        if validating {
            let report = validate(self);
            if !report.is_empty() {
                return Err(Error::Validation(report));
            }
        }
        let meta = Self::meta();
        if self.is_new() {
            InsertBuilder::from_entity(self)?.execute(db)?;
            if let Some(column) = meta.auto_increment() {
                if self.attribute(column)?.is_none() {
                    let id = db.connection::<Self>()?.last_insert_id()?;
                    self.set_attribute(column, Value::Int(id))?;
                }
            }
            self.state_mut().is_new = false;
        } else {
            let current = attributes(self)?;
            let changed: Vec<(&'static str, Value)> = if meta.track_changes {
                current
                    .into_iter()
                    .filter(|(column, value)| {
                        self.state().snapshot_value(column) != Some(value)
                    })
                    .collect()
            } else {
                current
            };
            if !changed.is_empty() {
                let mut builder = UpdateBuilder::<Self>::new().filter(self.key_criteria()?);
                for (column, value) in changed {
                    builder = builder.set(column, value);
                }
                builder.execute(db)?;
            }
        }
        if meta.track_changes {
            self.state_mut().snapshot = attributes(self)?;
        }
        self.save_associations(db)
    }

    /// Deletes the entity's row. A transient entity is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    fn remove(&self, db: &Db) -> Result<()> {
        if self.is_new() {
            return Ok(());
        }
        DeleteBuilder::<Self>::new().filter(self.key_criteria()?).execute(db)?;
        Ok(())
    }

    /// The WHERE clauses pinning this entity's row: one equality per
    /// primary key column. Prefers snapshot values, so a key edit still
    /// addresses the originally loaded row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when the type declares no primary key
    /// or a key column is unset.
    fn key_criteria(&self) -> Result<Vec<Clause>> {
        let meta = Self::meta();
        if meta.primary_key.is_empty() {
            return Err(Error::metadata(format!("no primary key declared on '{}'", meta.table)));
        }
        let mut clauses = Vec::with_capacity(meta.primary_key.len());
        for column in &meta.primary_key {
            let value = self
                .state()
                .snapshot_value(column)
                .cloned()
                .map(Ok)
                .or_else(|| self.attribute(column).transpose())
                .transpose()?
                .ok_or_else(|| {
                    Error::metadata(format!("primary key '{column}' is not set on '{}'", meta.table))
                })?;
            clauses.push(Clause::Attr((*column).to_string(), AttrValue::Value(value)));
        }
        Ok(clauses)
    }

    /// True when every applicable validator passes.
    fn is_valid(&self) -> bool {
        validate(self).is_empty()
    }

    /// The full validation report.
    fn errors(&self) -> ValidationReport {
        validate(self)
    }
}

impl<E: Entity> Record for E {}
