//! Dialect-specific quoting rules.
//!
//! A [`Dialect`] is the rendering context for the expression tree: it
//! supplies the identifier quote character and string-literal escaping.
//! Expressions hold no dialect themselves; one is injected at render time
//! by whoever holds the connection.

/// Database dialect family, as reported by a connection.
///
/// Only the quoting contract matters at this layer; driver quirks beyond
/// identifier and literal quoting are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// MySQL family: backtick-quoted identifiers.
    #[default]
    MySql,
    /// PostgreSQL family: double-quoted identifiers.
    Postgres,
}

impl Dialect {
    /// The identifier quoting character for this dialect.
    #[must_use]
    pub const fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Postgres => '"',
        }
    }

    /// Quotes an identifier, per-segment for dot-qualified paths:
    /// `table.column` becomes `` `table`.`column` ``.
    #[must_use]
    pub fn quote_identifier(self, identifier: &str) -> String {
        let q = self.quote_char();
        identifier
            .split('.')
            .map(|segment| format!("{q}{segment}{q}"))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a string as a SQL literal, escaping embedded quotes.
    #[must_use]
    pub fn quote_str(self, value: &str) -> String {
        let escaped = match self {
            Self::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
            Self::Postgres => value.replace('\'', "''"),
        };
        format!("'{escaped}'")
    }
}
