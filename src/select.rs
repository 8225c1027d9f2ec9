//! Typed SELECT builder.

use std::marker::PhantomData;

use crate::db::Db;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::Result;
use crate::query::{Criteria, build_select};
use crate::record::hydrate;

/// Builds and runs SELECT statements for one entity type.
///
/// Configuration order does not matter; the rendered clause order is
/// always `SELECT .. FROM .. [joins] [WHERE ..] [ORDER BY ..] [LIMIT ..]
/// [OFFSET ..]` with absent parts omitted entirely.
#[derive(Debug, Clone)]
pub struct SelectBuilder<E> {
    criteria: Criteria,
    order: String,
    limit: Option<u64>,
    offset: Option<u64>,
    select: String,
    joins: Vec<String>,
    _marker: PhantomData<E>,
}

impl<E> Default for SelectBuilder<E> {
    fn default() -> Self {
        Self {
            criteria: Criteria::None,
            order: String::new(),
            limit: None,
            offset: None,
            select: "*".to_string(),
            joins: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> SelectBuilder<E> {
    /// An unconstrained select over the entity's table.
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

    /// Sets the ORDER BY clause, passed through verbatim.
    #[must_use]
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    /// Caps the result set.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips leading rows. Only rendered together with its keyword.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Replaces the `*` projection.
    #[must_use]
    pub fn select(mut self, projection: impl Into<String>) -> Self {
        self.select = projection.into();
        self
    }

    /// Appends a join fragment, emitted verbatim after the table. With at
    /// least one join a `*` projection narrows to the entity's own
    /// columns.
    #[must_use]
    pub fn join(mut self, join: impl Into<String>) -> Self {
        self.joins.push(join.into());
        self
    }

    /// Renders the statement without touching a connection.
    ///
    /// # Errors
    ///
    /// Propagates criteria rendering failures.
    pub fn build(&self, dialect: Dialect) -> Result<String> {
        build_select(
            dialect,
            &E::meta().table,
            &self.criteria,
            &self.order,
            self.limit,
            self.offset,
            &self.select,
            &self.joins,
        )
    }

    /// Runs the select and hydrates every row.
    ///
    /// # Errors
    ///
    /// Propagates connection, statement and hydration failures.
    pub fn fetch(&self, db: &Db) -> Result<Vec<E>> {
        let conn = db.connection::<E>()?;
        let sql = self.build(conn.dialect())?;
        tracing::debug!(table = %E::meta().table, sql = %sql, "select");
        conn.query(&sql)?.iter().map(hydrate).collect()
    }

    /// Runs the select capped at one row.
    ///
    /// # Errors
    ///
    /// Propagates connection, statement and hydration failures.
    pub fn fetch_first(self, db: &Db) -> Result<Option<E>> {
        Ok(self.limit(1).fetch(db)?.into_iter().next())
    }

    /// Runs the select as `COUNT(*)`, ignoring any projection, order,
    /// limit and offset.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures, and fails on a
    /// non-numeric driver reply.
    pub fn count(&self, db: &Db) -> Result<u64> {
        let conn = db.connection::<E>()?;
        let sql = build_select(
            conn.dialect(),
            &E::meta().table,
            &self.criteria,
            "",
            None,
            None,
            "COUNT(*)",
            &self.joins,
        )?;
        tracing::debug!(table = %E::meta().table, sql = %sql, "count");
        let rows = conn.query(&sql)?;
        let count = rows
            .first()
            .and_then(crate::connection::Row::first)
            .ok_or_else(|| crate::error::Error::invalid_value("empty COUNT(*) reply"))?
            .as_int()?;
        u64::try_from(count)
            .map_err(|_| crate::error::Error::invalid_value(format!("negative count {count}")))
    }

    /// Runs the select wrapped in `SELECT EXISTS(..)`.
    ///
    /// # Errors
    ///
    /// Propagates connection and statement failures, and fails on a
    /// non-numeric driver reply.
    pub fn exists(&self, db: &Db) -> Result<bool> {
        let conn = db.connection::<E>()?;
        let inner = self.build(conn.dialect())?;
        let sql = format!("SELECT EXISTS({inner})");
        tracing::debug!(table = %E::meta().table, sql = %sql, "exists");
        let rows = conn.query(&sql)?;
        let flag = rows
            .first()
            .and_then(crate::connection::Row::first)
            .ok_or_else(|| crate::error::Error::invalid_value("empty EXISTS reply"))?
            .as_int()?;
        Ok(flag != 0)
    }
}
