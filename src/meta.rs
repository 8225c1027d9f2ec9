//! Per-entity metadata: table, columns, key, associations and validators.

use crate::error::{Error, Result};
use crate::validate::Validator;

/// One declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name, identical to the field name.
    pub name: &'static str,
    /// `Some(true)` marks this column the auto-increment target,
    /// `Some(false)` on any column disables auto-increment entirely,
    /// `None` leaves the decision to the fallback rule.
    pub auto_increment: Option<bool>,
}

/// The four association kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocKind {
    /// This entity holds the foreign key to one parent row.
    BelongsTo,
    /// At most one child row holds a foreign key back to this entity.
    HasOne,
    /// Many child rows hold a foreign key back to this entity.
    HasMany,
    /// A symmetric link table joins this entity to the related one.
    ManyToMany,
}

/// How the link table of a many-to-many association is named.
#[derive(Clone, Copy)]
pub enum LinkTable {
    /// A fixed name.
    Name(&'static str),
    /// Computed when metadata is built; used when the name depends on
    /// another entity's table.
    Computed(fn() -> String),
}

impl std::fmt::Debug for LinkTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// One declared association, with every default already resolved.
#[derive(Debug, Clone)]
pub struct AssociationMeta {
    /// The field name on the declaring struct.
    pub field: &'static str,
    /// Kind of the association.
    pub kind: AssocKind,
    /// Foreign key column. Defaults to `{field}_id` for belongs-to and
    /// `{owner_table}_id` for the other kinds.
    pub foreign_key: String,
    /// For many-to-many: the link-table column referencing the related
    /// entity. Defaults to its table name suffixed `_id`, resolved lazily
    /// by the association loader.
    pub related_foreign_key: Option<&'static str>,
    /// ORDER BY applied when loading collections.
    pub order_by: &'static str,
    /// For many-to-many: the link table, when overridden.
    pub link_table: Option<LinkTable>,
    /// Has-one only: when true, a missing row loads as a default instance
    /// instead of `None`.
    pub default_instance: bool,
}

impl AssociationMeta {
    /// The link table name, or the default built from the two table names
    /// joined `_` in lexicographic order.
    #[must_use]
    pub fn link_table_name(&self, owner_table: &str, related_table: &str) -> String {
        match self.link_table {
            Some(LinkTable::Name(name)) => name.to_string(),
            Some(LinkTable::Computed(f)) => f(),
            None => {
                let (a, b) = if owner_table <= related_table {
                    (owner_table, related_table)
                } else {
                    (related_table, owner_table)
                };
                format!("{a}_{b}")
            }
        }
    }
}

/// Configuration overrides for one association, applied before defaults
/// are resolved. Built with [`assoc`].
#[derive(Debug, Clone)]
pub struct AssocConfig {
    field: &'static str,
    foreign_key: Option<&'static str>,
    related_foreign_key: Option<&'static str>,
    order_by: Option<&'static str>,
    link_table: Option<LinkTable>,
    default_instance: bool,
}

/// Starts an override block for the association declared on `field`.
#[must_use]
pub fn assoc(field: &'static str) -> AssocConfig {
    AssocConfig {
        field,
        foreign_key: None,
        related_foreign_key: None,
        order_by: None,
        link_table: None,
        default_instance: false,
    }
}

impl AssocConfig {
    /// Overrides the foreign key column.
    #[must_use]
    pub const fn foreign_key(mut self, column: &'static str) -> Self {
        self.foreign_key = Some(column);
        self
    }

    /// Overrides the related-side foreign key column (many-to-many).
    #[must_use]
    pub const fn related_foreign_key(mut self, column: &'static str) -> Self {
        self.related_foreign_key = Some(column);
        self
    }

    /// Overrides the collection ordering.
    #[must_use]
    pub const fn order_by(mut self, order: &'static str) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Overrides the link table name (many-to-many).
    #[must_use]
    pub const fn link_table(mut self, name: &'static str) -> Self {
        self.link_table = Some(LinkTable::Name(name));
        self
    }

    /// Overrides the link table with a name computed at metadata build
    /// time (many-to-many).
    #[must_use]
    pub const fn link_table_with(mut self, f: fn() -> String) -> Self {
        self.link_table = Some(LinkTable::Computed(f));
        self
    }

    /// Has-one only: load a default instance instead of `None` when no row
    /// matches.
    #[must_use]
    pub const fn default_instance(mut self) -> Self {
        self.default_instance = true;
        self
    }
}

/// The complete metadata of one entity type, built once and kept in a
/// per-type static.
pub struct EntityMeta<E> {
    /// Table name.
    pub table: String,
    /// Declared columns in declaration order.
    pub columns: Vec<ColumnMeta>,
    /// Primary key columns.
    pub primary_key: Vec<&'static str>,
    /// Declared associations in declaration order.
    pub associations: Vec<AssociationMeta>,
    /// Validators in declaration order.
    pub validators: Vec<Validator<E>>,
    /// When false, `save` always writes every column instead of a diff.
    pub track_changes: bool,
}

impl<E> std::fmt::Debug for EntityMeta<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMeta")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("associations", &self.associations)
            .field("validators", &self.validators.len())
            .field("track_changes", &self.track_changes)
            .finish()
    }
}

impl<E> EntityMeta<E> {
    /// True when a column of that name is declared.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Looks up a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when the column is not declared.
    pub fn column(&self, name: &str) -> Result<&ColumnMeta> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::metadata(format!("unknown column '{name}' on '{}'", self.table)))
    }

    /// Looks up an association by field name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when no association is declared on that
    /// field.
    pub fn association(&self, field: &str) -> Result<&AssociationMeta> {
        self.associations.iter().find(|a| a.field == field).ok_or_else(|| {
            Error::metadata(format!("unknown association '{field}' on '{}'", self.table))
        })
    }

    /// The auto-increment column, resolved by the declaration rules: an
    /// explicitly flagged column wins, an explicit disable yields `None`,
    /// otherwise a column literally named `id` is assumed.
    #[must_use]
    pub fn auto_increment(&self) -> Option<&'static str> {
        if let Some(flagged) = self.columns.iter().find(|c| c.auto_increment == Some(true)) {
            return Some(flagged.name);
        }
        if self.columns.iter().any(|c| c.auto_increment == Some(false)) {
            return None;
        }
        self.columns.iter().find(|c| c.name == "id").map(|c| c.name)
    }
}

/// Chainable builder assembling an [`EntityMeta`]. Driven by the
/// `entity!` macro; usable directly for hand-written entities.
pub struct MetaBuilder<E> {
    type_name: &'static str,
    table: Option<String>,
    columns: Vec<ColumnMeta>,
    primary_key: Vec<&'static str>,
    auto_increment: Option<Option<&'static str>>,
    associations: Vec<(AssocKind, &'static str)>,
    configs: Vec<AssocConfig>,
    validators: Vec<Validator<E>>,
    track_changes: bool,
}

impl<E> MetaBuilder<E> {
    /// Starts a builder for the named type. The simple type name (module
    /// path stripped) seeds the default table name.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
            auto_increment: None,
            associations: Vec::new(),
            configs: Vec::new(),
            validators: Vec::new(),
            track_changes: false,
        }
    }

    /// Sets the table name, overriding the derived default.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the primary key columns.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&'static str]) -> Self {
        self.primary_key = columns.to_vec();
        self
    }

    /// Flags a column as the auto-increment target.
    #[must_use]
    pub const fn auto_increment(mut self, column: &'static str) -> Self {
        self.auto_increment = Some(Some(column));
        self
    }

    /// Disables auto-increment handling entirely.
    #[must_use]
    pub const fn no_auto_increment(mut self) -> Self {
        self.auto_increment = Some(None);
        self
    }

    /// Enables change tracking: `save` on a persisted entity writes only
    /// the columns whose values differ from the loaded snapshot.
    #[must_use]
    pub const fn track_changes(mut self) -> Self {
        self.track_changes = true;
        self
    }

    /// Declares a column.
    #[must_use]
    pub fn column(mut self, name: &'static str) -> Self {
        self.columns.push(ColumnMeta { name, auto_increment: None });
        self
    }

    /// Declares an association.
    #[must_use]
    pub fn association(mut self, kind: AssocKind, field: &'static str) -> Self {
        self.associations.push((kind, field));
        self
    }

    /// Attaches configuration overrides to a declared association.
    #[must_use]
    pub fn configure(mut self, config: AssocConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Appends a validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator<E>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Resolves defaults and produces the final metadata.
    #[must_use]
    pub fn build(mut self) -> EntityMeta<E> {
        let table = self.table.take().unwrap_or_else(|| table_name(self.type_name));
        match self.auto_increment {
            Some(Some(target)) => {
                for column in &mut self.columns {
                    column.auto_increment = Some(column.name == target);
                }
            }
            Some(None) => {
                for column in &mut self.columns {
                    column.auto_increment = Some(false);
                }
            }
            None => {}
        }
        if self.primary_key.is_empty() && self.columns.iter().any(|c| c.name == "id") {
            self.primary_key = vec!["id"];
        }
        let mut associations = Vec::with_capacity(self.associations.len());
        for (kind, field) in self.associations {
            let config = self.configs.iter().find(|c| c.field == field);
            let foreign_key = config.and_then(|c| c.foreign_key).map_or_else(
                || match kind {
                    AssocKind::BelongsTo => format!("{field}_id"),
                    AssocKind::HasOne | AssocKind::HasMany | AssocKind::ManyToMany => {
                        format!("{table}_id")
                    }
                },
                ToString::to_string,
            );
            associations.push(AssociationMeta {
                field,
                kind,
                foreign_key,
                related_foreign_key: config.and_then(|c| c.related_foreign_key),
                order_by: config.and_then(|c| c.order_by).unwrap_or("id"),
                link_table: config.and_then(|c| c.link_table),
                default_instance: config.is_some_and(|c| c.default_instance),
            });
        }
        EntityMeta {
            table,
            columns: self.columns,
            primary_key: self.primary_key,
            associations,
            validators: self.validators,
            track_changes: self.track_changes,
        }
    }
}

/// Derives a table name from a type name: any module path is stripped and
/// the simple name is snake-cased.
#[must_use]
pub fn table_name(type_name: &str) -> String {
    let simple = type_name.rsplit("::").next().unwrap_or(type_name);
    snake_case(simple)
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
