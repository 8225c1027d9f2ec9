//! Typed INSERT builder.

use std::marker::PhantomData;

use crate::db::Db;
use crate::dialect::Dialect;
use crate::entity::{Entity, attributes};
use crate::error::Result;
use crate::value::Value;

/// Builds and runs INSERT statements for one entity type.
#[derive(Debug, Clone)]
pub struct InsertBuilder<E> {
    values: Vec<(String, Value)>,
    ignore: bool,
    replace: bool,
    on_duplicate: Option<String>,
    _marker: PhantomData<E>,
}

impl<E> Default for InsertBuilder<E> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            ignore: false,
            replace: false,
            on_duplicate: None,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> InsertBuilder<E> {
    /// An empty insert into the entity's table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An insert carrying every set column of the entity.
    ///
    /// # Errors
    ///
    /// Propagates attribute read failures.
    pub fn from_entity(entity: &E) -> Result<Self> {
        let mut builder = Self::new();
        for (column, value) in attributes(entity)? {
            builder.values.push((column.to_string(), value));
        }
        Ok(builder)
    }

    /// Appends a column value.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Renders `INSERT IGNORE`, suppressing duplicate-key failures.
    #[must_use]
    pub const fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Renders `REPLACE INTO` instead of `INSERT INTO`.
    #[must_use]
    pub const fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Appends an `ON DUPLICATE KEY UPDATE` clause, passed through
    /// verbatim.
    #[must_use]
    pub fn on_duplicate_key_update(mut self, assignments: impl Into<String>) -> Self {
        self.on_duplicate = Some(assignments.into());
        self
    }

    /// Renders the statement without touching a connection. An insert
    /// with no values renders the empty-row form `() VALUES ()`.
    ///
    /// # Errors
    ///
    /// Propagates value rendering failures.
    pub fn build(&self, dialect: Dialect) -> Result<String> {
        let table = dialect.quote_identifier(&E::meta().table);
        let columns = self
            .values
            .iter()
            .map(|(column, _)| dialect.quote_identifier(column))
            .collect::<Vec<_>>()
            .join(",");
        let rendered = self
            .values
            .iter()
            .map(|(_, value)| value.render(dialect))
            .collect::<Result<Vec<_>>>()?
            .join(",");
        let verb = if self.replace {
            "REPLACE"
        } else if self.ignore {
            "INSERT IGNORE"
        } else {
            "INSERT"
        };
        let mut sql = format!("{verb} INTO {table} ({columns}) VALUES ({rendered})");
        if let Some(assignments) = &self.on_duplicate {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(assignments);
        }
        Ok(sql)
    }

    /// Runs the insert, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures.
    pub fn execute(&self, db: &Db) -> Result<u64> {
        let conn = db.connection::<E>()?;
        let sql = self.build(conn.dialect())?;
        tracing::debug!(table = %E::meta().table, sql = %sql, "insert");
        conn.execute(&sql)
    }
}
