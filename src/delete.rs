//! Typed DELETE builder.

use std::marker::PhantomData;

use crate::db::Db;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::Result;
use crate::query::{Criteria, query_part};

/// Builds and runs DELETE statements for one entity type. Without a
/// condition the statement deletes every row, so callers filter
/// deliberately.
#[derive(Debug, Clone)]
pub struct DeleteBuilder<E> {
    criteria: Criteria,
    _marker: PhantomData<E>,
}

impl<E> Default for DeleteBuilder<E> {
    fn default() -> Self {
        Self { criteria: Criteria::None, _marker: PhantomData }
    }
}

impl<E: Entity> DeleteBuilder<E> {
    /// An unconstrained delete of the entity's table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WHERE condition, replacing any previous one.
    #[must_use]
    pub fn filter(mut self, criteria: impl Into<Criteria>) -> Self {
        self.criteria = criteria.into();
        self
    }

    /// Renders the statement without touching a connection.
    ///
    /// # Errors
    ///
    /// Propagates criteria rendering failures.
    pub fn build(&self, dialect: Dialect) -> Result<String> {
        let table = dialect.quote_identifier(&E::meta().table);
        let where_sql = self.criteria.render(dialect)?;
        Ok(format!("DELETE FROM {table}{}", query_part("WHERE", &where_sql)))
    }

    /// Runs the delete, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    pub fn execute(&self, db: &Db) -> Result<u64> {
        let conn = db.connection::<E>()?;
        let sql = self.build(conn.dialect())?;
        tracing::debug!(table = %E::meta().table, sql = %sql, "delete");
        conn.execute(&sql)
    }
}
