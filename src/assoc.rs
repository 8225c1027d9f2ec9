//! Lazy association cells and their load and cascade logic.
//!
//! Each cell starts untouched, loads once on first access and caches the
//! result until [`reset`](BelongsTo::reset). Cascading writes only happen
//! for cells that were touched, so loading an entity and saving it back
//! never generates association statements.

use std::collections::BTreeSet;

use crate::db::Db;
use crate::entity::{Entity, primary_key_value};
use crate::error::{Error, Result};
use crate::expr::Filter;
use crate::meta::AssociationMeta;
use crate::record::Record;
use crate::select::SelectBuilder;
use crate::value::Value;

fn owner_int(owner: Option<&Value>) -> Result<Option<i64>> {
    match owner {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_int().map(Some),
    }
}

/// The parent side of a one-to-many: this entity's row carries the
/// foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct BelongsTo<T> {
    loaded: Option<T>,
}

impl<T> Default for BelongsTo<T> {
    fn default() -> Self {
        Self { loaded: None }
    }
}

impl<T: Entity> BelongsTo<T> {
    /// Returns the cell to the untouched state.
    pub fn reset(&mut self) {
        self.loaded = None;
    }

    /// Replaces the cached parent.
    pub fn set(&mut self, related: T) {
        self.loaded = Some(related);
    }

    /// The cached parent, when loaded.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.loaded.as_ref()
    }

    /// Loads the parent through the foreign key value, caching it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the foreign key is unset or NULL,
    /// or when no parent row exists.
    pub fn load(&mut self, db: &Db, fk_value: Option<Value>) -> Result<&T> {
        match &mut self.loaded {
            Some(related) => Ok(related),
            slot @ None => {
                let id = owner_int(fk_value.as_ref())?.ok_or_else(|| {
                    Error::not_found(format!(
                        "no reference to load a {} from",
                        std::any::type_name::<T>(),
                    ))
                })?;
                Ok(slot.insert(T::find(db, id)?))
            }
        }
    }
}

/// The single-child side: at most one related row carries a foreign key
/// back to this entity.
#[derive(Debug, Clone, PartialEq)]
pub struct HasOne<T> {
    loaded: Option<Option<T>>,
}

impl<T> Default for HasOne<T> {
    fn default() -> Self {
        Self { loaded: None }
    }
}

impl<T: Entity> HasOne<T> {
    /// Returns the cell to the untouched state.
    pub fn reset(&mut self) {
        self.loaded = None;
    }

    /// Replaces the cached child. `None` marks the child for deletion on
    /// the next cascade.
    pub fn set(&mut self, related: Option<T>) {
        self.loaded = Some(related);
    }

    /// The cached child, when loaded.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.loaded.as_ref().and_then(Option::as_ref)
    }

    /// Loads the child row, caching the result. A transient owner or a
    /// missing row yields `None`, or a default instance when the
    /// association is configured that way.
    ///
    /// # Errors
    ///
    /// Propagates connection and hydration failures.
    pub fn load(
        &mut self,
        db: &Db,
        assoc: &AssociationMeta,
        owner: Option<Value>,
        transient: bool,
    ) -> Result<Option<&T>> {
        match &mut self.loaded {
            Some(related) => Ok(related.as_ref()),
            slot @ None => {
                let found = match owner_int(owner.as_ref())? {
                    Some(id) if !transient => {
                        T::find_first_by_attribute(db, &assoc.foreign_key, id)?
                    }
                    _ => None,
                };
                let cached = match found {
                    Some(related) => Some(related),
                    None if assoc.default_instance => Some(T::default()),
                    None => None,
                };
                Ok(slot.insert(cached).as_ref())
            }
        }
    }

    /// Cascades the cell: an untouched cell is skipped, a cleared cell
    /// deletes the child row, a set child gets the owner's key and is
    /// saved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the owner has no key yet, and
    /// propagates statement failures.
    pub fn save(&mut self, db: &Db, assoc: &AssociationMeta, owner: Option<&Value>) -> Result<()> {
        let Some(cell) = &mut self.loaded else {
            return Ok(());
        };
        let owner_id = owner_int(owner)?.ok_or_else(|| {
            Error::configuration("cannot cascade an association from an unsaved owner")
        })?;
        match cell {
            Some(related) => {
                related.set_attribute(&assoc.foreign_key, Value::Int(owner_id))?;
                related.save(db)?;
            }
            None => {
                T::delete_all(db, (assoc.foreign_key.clone(), owner_id))?;
            }
        }
        Ok(())
    }
}

/// The collection side of a one-to-many.
#[derive(Debug, Clone, PartialEq)]
pub struct HasMany<T> {
    loaded: Option<Vec<T>>,
}

impl<T> Default for HasMany<T> {
    fn default() -> Self {
        Self { loaded: None }
    }
}

impl<T: Entity> HasMany<T> {
    /// Returns the cell to the untouched state.
    pub fn reset(&mut self) {
        self.loaded = None;
    }

    /// Replaces the cached collection.
    pub fn set(&mut self, related: Vec<T>) {
        self.loaded = Some(related);
    }

    /// The cached collection, when loaded.
    #[must_use]
    pub fn get(&self) -> Option<&[T]> {
        self.loaded.as_deref()
    }

    /// Loads the collection ordered by the association's `order_by`,
    /// caching it. A transient owner yields an empty collection.
    ///
    /// # Errors
    ///
    /// Propagates connection and hydration failures.
    pub fn load(
        &mut self,
        db: &Db,
        assoc: &AssociationMeta,
        owner: Option<Value>,
        transient: bool,
    ) -> Result<&[T]> {
        match &mut self.loaded {
            Some(related) => Ok(related),
            slot @ None => {
                let related = match owner_int(owner.as_ref())? {
                    Some(id) if !transient => SelectBuilder::<T>::new()
                        .filter((assoc.foreign_key.clone(), Filter::eq(id)))
                        .order_by(assoc.order_by)
                        .fetch(db)?,
                    _ => Vec::new(),
                };
                Ok(slot.insert(related))
            }
        }
    }
}

/// A symmetric association through a link table.
#[derive(Debug, Clone, PartialEq)]
pub struct ManyToMany<T> {
    loaded: Option<Vec<T>>,
}

impl<T> Default for ManyToMany<T> {
    fn default() -> Self {
        Self { loaded: None }
    }
}

impl<T: Entity> ManyToMany<T> {
    /// Returns the cell to the untouched state.
    pub fn reset(&mut self) {
        self.loaded = None;
    }

    /// Replaces the cached collection; the next cascade reconciles the
    /// link table against it.
    pub fn set(&mut self, related: Vec<T>) {
        self.loaded = Some(related);
    }

    /// The cached collection, when loaded.
    #[must_use]
    pub fn get(&self) -> Option<&[T]> {
        self.loaded.as_deref()
    }

    fn related_fk(assoc: &AssociationMeta) -> String {
        assoc
            .related_foreign_key
            .map_or_else(|| format!("{}_id", T::meta().table), ToString::to_string)
    }

    /// Loads the linked rows through the link table, caching them. A
    /// transient owner yields an empty collection.
    ///
    /// # Errors
    ///
    /// Propagates connection and hydration failures.
    pub fn load(
        &mut self,
        db: &Db,
        owner_table: &str,
        assoc: &AssociationMeta,
        owner: Option<Value>,
        transient: bool,
    ) -> Result<&[T]> {
        match &mut self.loaded {
            Some(related) => Ok(related),
            slot @ None => {
                let related = match owner_int(owner.as_ref())? {
                    Some(id) if !transient => {
                        let conn = db.connection::<T>()?;
                        let dialect = conn.dialect();
                        let related_meta = T::meta();
                        let link =
                            dialect.quote_identifier(&assoc.link_table_name(owner_table, &related_meta.table));
                        let table = dialect.quote_identifier(&related_meta.table);
                        let related_fk = dialect.quote_identifier(&Self::related_fk(assoc));
                        let owner_fk = dialect.quote_identifier(&assoc.foreign_key);
                        let pk = related_meta.primary_key.first().copied().unwrap_or("id");
                        let pk = dialect.quote_identifier(pk);
                        SelectBuilder::<T>::new()
                            .join(format!("INNER JOIN {link} ON {link}.{related_fk} = {table}.{pk}"))
                            .filter(format!("{link}.{owner_fk} = {id}"))
                            .order_by(assoc.order_by)
                            .fetch(db)?
                    }
                    _ => Vec::new(),
                };
                Ok(slot.insert(related))
            }
        }
    }

    /// Reconciles the link table against the cached collection: transient
    /// members are saved first, missing links inserted and dropped links
    /// deleted. Links that exist on both sides are left alone. Member rows
    /// write through their own connection, link rows through the owner's.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the owner has no key yet, and
    /// propagates statement failures.
    pub fn save<O: Entity>(
        &mut self,
        db: &Db,
        assoc: &AssociationMeta,
        owner: Option<&Value>,
    ) -> Result<()> {
        let Some(members) = &mut self.loaded else {
            return Ok(());
        };
        let owner_id = owner_int(owner)?.ok_or_else(|| {
            Error::configuration("cannot cascade an association from an unsaved owner")
        })?;
        let mut desired = Vec::with_capacity(members.len());
        for member in members.iter_mut() {
            if member.is_new() {
                member.save(db)?;
            }
            let id = primary_key_value(member)?
                .ok_or_else(|| Error::configuration("linked entity has no key after save"))?
                .as_int()?;
            if !desired.contains(&id) {
                desired.push(id);
            }
        }

        let conn = db.connection::<O>()?;
        let dialect = conn.dialect();
        let link =
            dialect.quote_identifier(&assoc.link_table_name(&O::meta().table, &T::meta().table));
        let owner_fk = dialect.quote_identifier(&assoc.foreign_key);
        let related_fk = dialect.quote_identifier(&Self::related_fk(assoc));

        let select = format!("SELECT {related_fk} FROM {link} WHERE {owner_fk} = {owner_id}");
        tracing::debug!(sql = %select, "loading existing links");
        let existing: BTreeSet<i64> = conn
            .query(&select)?
            .iter()
            .filter_map(|row| row.first().and_then(|v| v.as_int().ok()))
            .collect();

        let added: Vec<i64> = desired.iter().copied().filter(|id| !existing.contains(id)).collect();
        if !added.is_empty() {
            let tuples: Vec<String> =
                added.iter().map(|id| format!("({owner_id},{id})")).collect();
            let insert = format!(
                "INSERT INTO {link} ({owner_fk},{related_fk}) VALUES {}",
                tuples.join(","),
            );
            tracing::debug!(sql = %insert, "linking added rows");
            conn.execute(&insert)?;
        }

        let removed: Vec<String> = existing
            .iter()
            .filter(|id| !desired.contains(id))
            .map(ToString::to_string)
            .collect();
        if !removed.is_empty() {
            let delete = format!(
                "DELETE FROM {link} WHERE {owner_fk} = {owner_id} AND {related_fk} IN ({})",
                removed.join(", "),
            );
            tracing::debug!(sql = %delete, "unlinking removed rows");
            conn.execute(&delete)?;
        }
        Ok(())
    }
}
