//! Active-record style object-relational mapping over a pluggable
//! connection contract.
//!
//! Entities are declared with the [`entity!`] macro: `Field` members
//! become columns, association cells wire up lazy loading, and metadata
//! (table name, primary key, validators) is resolved once per type.
//! Statements are rendered as complete SQL text from an expression tree
//! and handed to a [`Connection`] implementation; the crate never talks
//! to a driver itself.
//!
//! ```ignore
//! use lariat::{Db, Field, Filter, HasMany, Record, Validator, entity};
//!
//! entity! {
//!     #[derive(Debug, Clone, Default)]
//!     pub struct User {
//!         pub id: Field<i64>,
//!         pub name: Field<String>,
//!         pub orders: HasMany<Order>,
//!     }
//!     config {
//!         track_changes;
//!         validators = [Validator::required("name")];
//!     }
//! }
//!
//! fn demo(db: &Db) -> lariat::Result<()> {
//!     let mut user = User::find(db, 1)?;
//!     user.name.set("Ada");
//!     user.save(db)?;
//!     let admins = User::find_all(db, ("role", Filter::r#in(vec!["admin", "staff"])))?;
//!     Ok(())
//! }
//! ```

pub mod assoc;
pub mod connection;
pub mod db;
pub mod delete;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod expr;
pub mod insert;
pub mod meta;
pub mod query;
pub mod record;
pub mod select;
pub mod update;
pub mod validate;
pub mod value;

pub use assoc::{BelongsTo, HasMany, HasOne, ManyToMany};
pub use connection::{Connection, Row};
pub use db::{ConnectionProvider, Db};
pub use delete::DeleteBuilder;
pub use dialect::Dialect;
pub use entity::{Entity, EntityState, Field, attributes, primary_key_value};
pub use error::{Error, Result};
pub use expr::{AttrValue, BoolOp, Clause, CompareOp, Expr, Filter};
pub use insert::InsertBuilder;
pub use meta::{
    AssocConfig, AssocKind, AssociationMeta, ColumnMeta, EntityMeta, LinkTable, MetaBuilder, assoc,
    table_name,
};
pub use query::Criteria;
pub use record::Record;
pub use select::SelectBuilder;
pub use update::UpdateBuilder;
pub use validate::{Message, ValidationContext, ValidationReport, Validator, validate};
pub use value::{ColumnValue, Value};
