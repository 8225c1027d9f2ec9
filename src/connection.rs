//! The driver contract: what a database backend must provide.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::value::Value;

/// A live database connection.
///
/// The crate renders complete SQL text and hands it to this trait; it never
/// prepares statements or binds parameters itself. Implementations wrap
/// whatever driver is in use and surface failures as opaque
/// [`Error::Connection`](crate::Error::Connection) values via `anyhow`.
pub trait Connection {
    /// The SQL dialect this connection speaks.
    fn dialect(&self) -> Dialect;

    /// Runs a statement that returns no rows, yielding the affected-row
    /// count.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure as an opaque connection error.
    fn execute(&self, sql: &str) -> Result<u64>;

    /// Runs a query and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure as an opaque connection error.
    fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// The auto-generated id of the most recent INSERT on this connection.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure as an opaque connection error.
    fn last_insert_id(&self) -> Result<i64>;

    /// Quotes a string literal per this connection's dialect.
    fn quote(&self, raw: &str) -> String {
        self.dialect().quote_str(raw)
    }

    /// Quotes an identifier path per this connection's dialect.
    fn quote_identifier(&self, path: &str) -> String {
        self.dialect().quote_identifier(path)
    }
}

/// One result row: named columns in driver order.
///
/// Many drivers return every column as text; the typed coercion to field
/// types happens later, during hydration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// An empty row.
    #[must_use]
    pub const fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Appends a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Looks a column up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The value of the first column, if any. Used for scalar queries such
    /// as counts.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, v)| v)
    }

    /// Iterates columns in driver order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self { columns: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect() }
    }
}
