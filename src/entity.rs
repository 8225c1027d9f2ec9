//! The entity contract and the `entity!` declaration macro.

use crate::db::Db;
use crate::error::Result;
use crate::meta::EntityMeta;
use crate::value::Value;

/// An optional column slot.
///
/// Unset is distinct from NULL: an unset field is simply absent from
/// INSERT column lists and change diffs. `T` may itself be an `Option` for
/// nullable columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    value: Option<T>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Field<T> {
    /// A set field.
    pub fn new(value: impl Into<T>) -> Self {
        Self { value: Some(value.into()) }
    }

    /// True when a value has been assigned.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// The value, if set.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Assigns a value.
    pub fn set(&mut self, value: impl Into<T>) {
        self.value = Some(value.into());
    }

    /// Returns the field to the unset state.
    pub fn clear(&mut self) {
        self.value = None;
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self { value: Some(value) }
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Self { value: Some(value.to_string()) }
    }
}

/// Persistence bookkeeping carried by every entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    /// True until the first successful save or hydration.
    pub is_new: bool,
    /// Column values as last loaded or saved; the baseline change
    /// tracking diffs against. Empty when tracking is off.
    pub snapshot: Vec<(&'static str, Value)>,
}

impl Default for EntityState {
    fn default() -> Self {
        Self { is_new: true, snapshot: Vec::new() }
    }
}

impl EntityState {
    /// The snapshot value of a column, if captured.
    #[must_use]
    pub fn snapshot_value(&self, column: &str) -> Option<&Value> {
        self.snapshot.iter().find(|(name, _)| *name == column).map(|(_, v)| v)
    }
}

/// The contract every persistable type fulfils.
///
/// Implementations come from the [`entity!`](crate::entity!) macro; the
/// finder and save operations live on the blanket
/// [`Record`](crate::Record) extension.
pub trait Entity: Default + Sized + 'static {
    /// The type's metadata, built once.
    fn meta() -> &'static EntityMeta<Self>;

    /// Reads a column by name. `Ok(None)` means the field is unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`](crate::Error::Metadata) for an unknown
    /// column.
    fn attribute(&self, name: &str) -> Result<Option<Value>>;

    /// Writes a column by name, coercing the value to the field type.
    /// A NULL value is held by nullable field types and unsets the rest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`](crate::Error::Metadata) for an unknown
    /// column and [`Error::InvalidValue`](crate::Error::InvalidValue) when
    /// the value cannot be coerced.
    fn set_attribute(&mut self, name: &str, value: Value) -> Result<()>;

    /// Persistence bookkeeping.
    fn state(&self) -> &EntityState;

    /// Mutable persistence bookkeeping.
    fn state_mut(&mut self) -> &mut EntityState;

    /// Returns every association cell to the untouched state. Called
    /// after hydration so stale cells never leak across loads.
    fn reset_associations(&mut self);

    /// Writes touched association cells back to the database. Called by
    /// `save` after the row itself is written.
    ///
    /// # Errors
    ///
    /// Propagates failures from the cascaded statements.
    fn save_associations(&mut self, db: &Db) -> Result<()>;

    /// True until the entity has a database row.
    fn is_new(&self) -> bool {
        self.state().is_new
    }
}

/// Every set column of the entity, in declaration order.
///
/// # Errors
///
/// Propagates attribute read failures.
pub fn attributes<E: Entity>(entity: &E) -> Result<Vec<(&'static str, Value)>> {
    let mut out = Vec::new();
    for column in &E::meta().columns {
        if let Some(value) = entity.attribute(column.name)? {
            out.push((column.name, value));
        }
    }
    Ok(out)
}

/// The value of the first primary key column. `None` when the column is
/// unset or the type declares no primary key.
///
/// # Errors
///
/// Propagates attribute read failures.
pub fn primary_key_value<E: Entity>(entity: &E) -> Result<Option<Value>> {
    match E::meta().primary_key.first() {
        Some(pk) => entity.attribute(pk),
        None => Ok(None),
    }
}

/// Declares an entity: a struct whose `Field` members are columns and
/// whose association cells wire up lazy loading, together with the
/// [`Entity`](crate::Entity) implementation and per-association accessor
/// methods.
///
/// ```ignore
/// entity! {
///     #[derive(Debug, Clone, Default)]
///     pub struct User {
///         pub id: Field<i64>,
///         pub name: Field<String>,
///         pub orders: HasMany<Order>,
///     }
///     config {
///         track_changes;
///         validators = [Validator::required("name")];
///     }
/// }
/// ```
///
/// The `config { .. }` block is optional. It accepts, in any order:
/// `table = "name";`, `primary_key = [col, ..];`,
/// `auto_increment = col;`, `auto_increment = none;`, `track_changes;`,
/// `associations = [assoc("field")..., ..];` and
/// `validators = [Validator::..., ..];`.
///
/// Column fields use the `Field<T>` type by that bare name; association
/// fields use `BelongsTo<T>`, `HasOne<T>`, `HasMany<T>` or
/// `ManyToMany<T>`. Other fields are carried on the struct untouched. A
/// `state: EntityState` field is injected.
#[macro_export]
macro_rules! entity {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $($fields:tt)*
        }
        $(config { $($config:tt)* })?
    ) => {
        $(#[$attr])*
        $vis struct $name {
            $($fields)*
            /// Persistence bookkeeping.
            pub state: $crate::EntityState,
        }

        impl $crate::Entity for $name {
            fn meta() -> &'static $crate::EntityMeta<Self> {
                static META: ::std::sync::LazyLock<$crate::EntityMeta<$name>> =
                    ::std::sync::LazyLock::new(|| {
                        let builder = $crate::MetaBuilder::<$name>::new(stringify!($name));
                        $(let builder = $crate::entity!(@config builder, $($config)*);)?
                        let builder = $crate::entity!(@declare builder, $($fields)*);
                        builder.build()
                    });
                &META
            }

            fn attribute(&self, name: &str) -> $crate::Result<Option<$crate::Value>> {
                $crate::entity!(@get self, name, $($fields)*)
            }

            fn set_attribute(
                &mut self,
                name: &str,
                value: $crate::Value,
            ) -> $crate::Result<()> {
                $crate::entity!(@set self, name, value, $($fields)*)
            }

            fn state(&self) -> &$crate::EntityState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut $crate::EntityState {
                &mut self.state
            }

            fn reset_associations(&mut self) {
                $crate::entity!(@reset self, $($fields)*)
            }

            fn save_associations(&mut self, db: &$crate::Db) -> $crate::Result<()> {
                let owner = $crate::entity::primary_key_value(&*self)?;
                $crate::entity!(@save self, db, owner, $($fields)*)
            }
        }

        impl $name {
            $crate::entity!(@accessors $($fields)*);
        }
    };

    // -- config block ------------------------------------------------------

    (@config $b:expr, ) => { $b };
    (@config $b:expr, table = $t:expr; $($rest:tt)*) => {
        $crate::entity!(@config $b.table($t), $($rest)*)
    };
    (@config $b:expr, primary_key = [$($pk:ident),* $(,)?]; $($rest:tt)*) => {
        $crate::entity!(@config $b.primary_key(&[$(stringify!($pk)),*]), $($rest)*)
    };
    (@config $b:expr, auto_increment = none; $($rest:tt)*) => {
        $crate::entity!(@config $b.no_auto_increment(), $($rest)*)
    };
    (@config $b:expr, auto_increment = $col:ident; $($rest:tt)*) => {
        $crate::entity!(@config $b.auto_increment(stringify!($col)), $($rest)*)
    };
    (@config $b:expr, track_changes; $($rest:tt)*) => {
        $crate::entity!(@config $b.track_changes(), $($rest)*)
    };
    (@config $b:expr, associations = [$($cfg:expr),* $(,)?]; $($rest:tt)*) => {
        $crate::entity!(@config $b $(.configure($cfg))*, $($rest)*)
    };
    (@config $b:expr, validators = [$($v:expr),* $(,)?]; $($rest:tt)*) => {
        $crate::entity!(@config $b $(.validator($v))*, $($rest)*)
    };

    // -- metadata declaration from fields ----------------------------------

    (@declare $b:expr, ) => { $b };
    (@declare $b:expr, $(#[$a:meta])* $v:vis $f:ident : Field<$t:ty>, $($rest:tt)*) => {
        $crate::entity!(@declare $b.column(stringify!($f)), $($rest)*)
    };
    (@declare $b:expr, $(#[$a:meta])* $v:vis $f:ident : BelongsTo<$t:ty>, $($rest:tt)*) => {
        $crate::entity!(
            @declare $b.association($crate::AssocKind::BelongsTo, stringify!($f)),
            $($rest)*
        )
    };
    (@declare $b:expr, $(#[$a:meta])* $v:vis $f:ident : HasOne<$t:ty>, $($rest:tt)*) => {
        $crate::entity!(
            @declare $b.association($crate::AssocKind::HasOne, stringify!($f)),
            $($rest)*
        )
    };
    (@declare $b:expr, $(#[$a:meta])* $v:vis $f:ident : HasMany<$t:ty>, $($rest:tt)*) => {
        $crate::entity!(
            @declare $b.association($crate::AssocKind::HasMany, stringify!($f)),
            $($rest)*
        )
    };
    (@declare $b:expr, $(#[$a:meta])* $v:vis $f:ident : ManyToMany<$t:ty>, $($rest:tt)*) => {
        $crate::entity!(
            @declare $b.association($crate::AssocKind::ManyToMany, stringify!($f)),
            $($rest)*
        )
    };
    (@declare $b:expr, $(#[$a:meta])* $v:vis $f:ident : $t:ty, $($rest:tt)*) => {
        $crate::entity!(@declare $b, $($rest)*)
    };

    // -- attribute reads ---------------------------------------------------

    (@get $s:expr, $n:expr, ) => {
        Err($crate::Error::metadata(format!(
            "unknown column '{}' on '{}'",
            $n,
            Self::meta().table,
        )))
    };
    (@get $s:expr, $n:expr, $(#[$a:meta])* $v:vis $f:ident : Field<$t:ty>, $($rest:tt)*) => {
        if $n == stringify!($f) {
            Ok($s.$f.get().map($crate::ColumnValue::to_value))
        } else {
            $crate::entity!(@get $s, $n, $($rest)*)
        }
    };
    (@get $s:expr, $n:expr, $(#[$a:meta])* $v:vis $f:ident : $t:ty, $($rest:tt)*) => {
        $crate::entity!(@get $s, $n, $($rest)*)
    };

    // -- attribute writes --------------------------------------------------

    (@set $s:expr, $n:expr, $val:expr, ) => {
        Err($crate::Error::metadata(format!(
            "unknown column '{}' on '{}'",
            $n,
            Self::meta().table,
        )))
    };
    (@set $s:expr, $n:expr, $val:expr, $(#[$a:meta])* $v:vis $f:ident : Field<$t:ty>, $($rest:tt)*) => {
        if $n == stringify!($f) {
            if $val.is_null() {
                // Nullable field types hold the NULL; anything else goes
                // back to the unset state.
                match <$t as $crate::ColumnValue>::from_value($val) {
                    Ok(parsed) => $s.$f.set(parsed),
                    Err(_) => $s.$f.clear(),
                }
            } else {
                $s.$f.set(<$t as $crate::ColumnValue>::from_value($val)?);
            }
            Ok(())
        } else {
            $crate::entity!(@set $s, $n, $val, $($rest)*)
        }
    };
    (@set $s:expr, $n:expr, $val:expr, $(#[$a:meta])* $v:vis $f:ident : $t:ty, $($rest:tt)*) => {
        $crate::entity!(@set $s, $n, $val, $($rest)*)
    };

    // -- association cell resets -------------------------------------------

    (@reset $s:expr, ) => { () };
    (@reset $s:expr, $(#[$a:meta])* $v:vis $f:ident : BelongsTo<$t:ty>, $($rest:tt)*) => {{
        $s.$f.reset();
        $crate::entity!(@reset $s, $($rest)*)
    }};
    (@reset $s:expr, $(#[$a:meta])* $v:vis $f:ident : HasOne<$t:ty>, $($rest:tt)*) => {{
        $s.$f.reset();
        $crate::entity!(@reset $s, $($rest)*)
    }};
    (@reset $s:expr, $(#[$a:meta])* $v:vis $f:ident : HasMany<$t:ty>, $($rest:tt)*) => {{
        $s.$f.reset();
        $crate::entity!(@reset $s, $($rest)*)
    }};
    (@reset $s:expr, $(#[$a:meta])* $v:vis $f:ident : ManyToMany<$t:ty>, $($rest:tt)*) => {{
        $s.$f.reset();
        $crate::entity!(@reset $s, $($rest)*)
    }};
    (@reset $s:expr, $(#[$a:meta])* $v:vis $f:ident : $t:ty, $($rest:tt)*) => {
        $crate::entity!(@reset $s, $($rest)*)
    };

    // -- association cascades ----------------------------------------------

    (@save $s:expr, $db:expr, $owner:expr, ) => { Ok(()) };
    (@save $s:expr, $db:expr, $owner:expr, $(#[$a:meta])* $v:vis $f:ident : HasOne<$t:ty>, $($rest:tt)*) => {{
        $s.$f.save($db, Self::meta().association(stringify!($f))?, $owner.as_ref())?;
        $crate::entity!(@save $s, $db, $owner, $($rest)*)
    }};
    (@save $s:expr, $db:expr, $owner:expr, $(#[$a:meta])* $v:vis $f:ident : ManyToMany<$t:ty>, $($rest:tt)*) => {{
        $s.$f.save::<Self>(
            $db,
            Self::meta().association(stringify!($f))?,
            $owner.as_ref(),
        )?;
        $crate::entity!(@save $s, $db, $owner, $($rest)*)
    }};
    (@save $s:expr, $db:expr, $owner:expr, $(#[$a:meta])* $v:vis $f:ident : $t:ty, $($rest:tt)*) => {
        $crate::entity!(@save $s, $db, $owner, $($rest)*)
    };

    // -- lazy accessor methods ---------------------------------------------

    (@accessors ) => {};
    (@accessors $(#[$a:meta])* $v:vis $f:ident : BelongsTo<$t:ty>, $($rest:tt)*) => {
        /// Loads the associated parent, caching it on first access.
        $v fn $f(&mut self, db: &$crate::Db) -> $crate::Result<&$t> {
            let fk = &<Self as $crate::Entity>::meta().association(stringify!($f))?.foreign_key;
            let fk_value = <Self as $crate::Entity>::attribute(self, fk)?;
            self.$f.load(db, fk_value)
        }
        $crate::entity!(@accessors $($rest)*);
    };
    (@accessors $(#[$a:meta])* $v:vis $f:ident : HasOne<$t:ty>, $($rest:tt)*) => {
        /// Loads the associated child row, caching it on first access.
        $v fn $f(&mut self, db: &$crate::Db) -> $crate::Result<Option<&$t>> {
            let assoc = <Self as $crate::Entity>::meta().association(stringify!($f))?;
            let owner = $crate::entity::primary_key_value(&*self)?;
            let transient = <Self as $crate::Entity>::is_new(self);
            self.$f.load(db, assoc, owner, transient)
        }
        $crate::entity!(@accessors $($rest)*);
    };
    (@accessors $(#[$a:meta])* $v:vis $f:ident : HasMany<$t:ty>, $($rest:tt)*) => {
        /// Loads the associated collection, caching it on first access.
        $v fn $f(&mut self, db: &$crate::Db) -> $crate::Result<&[$t]> {
            let assoc = <Self as $crate::Entity>::meta().association(stringify!($f))?;
            let owner = $crate::entity::primary_key_value(&*self)?;
            let transient = <Self as $crate::Entity>::is_new(self);
            self.$f.load(db, assoc, owner, transient)
        }
        $crate::entity!(@accessors $($rest)*);
    };
    (@accessors $(#[$a:meta])* $v:vis $f:ident : ManyToMany<$t:ty>, $($rest:tt)*) => {
        /// Loads the linked collection, caching it on first access.
        $v fn $f(&mut self, db: &$crate::Db) -> $crate::Result<&[$t]> {
            let meta = <Self as $crate::Entity>::meta();
            let assoc = meta.association(stringify!($f))?;
            let owner = $crate::entity::primary_key_value(&*self)?;
            let transient = <Self as $crate::Entity>::is_new(self);
            self.$f.load(db, &meta.table, assoc, owner, transient)
        }
        $crate::entity!(@accessors $($rest)*);
    };
    (@accessors $(#[$a:meta])* $v:vis $f:ident : $t:ty, $($rest:tt)*) => {
        $crate::entity!(@accessors $($rest)*);
    };
}
