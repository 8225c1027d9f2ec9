//! Typed UPDATE builder.

use std::marker::PhantomData;

use crate::db::Db;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::Result;
use crate::query::{Criteria, query_part};
use crate::value::Value;

/// Builds and runs UPDATE statements for one entity type.
///
/// An update with no assignments is a no-op: `execute` returns zero
/// without touching the connection.
#[derive(Debug, Clone)]
pub struct UpdateBuilder<E> {
    assignments: Vec<(String, Value)>,
    criteria: Criteria,
    _marker: PhantomData<E>,
}

impl<E> Default for UpdateBuilder<E> {
    fn default() -> Self {
        Self { assignments: Vec::new(), criteria: Criteria::None, _marker: PhantomData }
    }
}

impl<E: Entity> UpdateBuilder<E> {
    /// An empty update of the entity's table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column assignment.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Sets the WHERE condition, replacing any previous one.
    #[must_use]
    pub fn filter(mut self, criteria: impl Into<Criteria>) -> Self {
        self.criteria = criteria.into();
        self
    }

    /// Renders the statement, or `None` when there is nothing to assign.
    ///
    /// # Errors
    ///
    /// Propagates criteria and value rendering failures.
    pub fn build(&self, dialect: Dialect) -> Result<Option<String>> {
        if self.assignments.is_empty() {
            return Ok(None);
        }
        let table = dialect.quote_identifier(&E::meta().table);
        let assignments = self
            .assignments
            .iter()
            .map(|(column, value)| {
                Ok(format!("{} = {}", dialect.quote_identifier(column), value.render(dialect)?))
            })
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let where_sql = self.criteria.render(dialect)?;
        Ok(Some(format!("UPDATE {table} SET {assignments}{}", query_part("WHERE", &where_sql))))
    }

    /// Runs the update, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    pub fn execute(&self, db: &Db) -> Result<u64> {
        if self.assignments.is_empty() {
            return Ok(0);
        }
        let conn = db.connection::<E>()?;
        let Some(sql) = self.build(conn.dialect())? else {
            return Ok(0);
        };
        tracing::debug!(table = %E::meta().table, sql = %sql, "update");
        conn.execute(&sql)
    }
}
