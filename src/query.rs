//! Criteria normalization and SELECT statement assembly.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::expr::{Clause, Expr};

/// A WHERE condition in any of the accepted shapes.
///
/// Finder methods take `impl Into<Criteria>`, so callers can pass raw SQL
/// text, a prepared [`Expr`] tree, or a list of attribute clauses that is
/// conjoined with `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Criteria {
    /// No condition; the clause is omitted entirely.
    #[default]
    None,
    /// Verbatim SQL text.
    Raw(String),
    /// A prepared expression tree.
    Expr(Expr),
    /// Attribute clauses, conjoined with `AND`.
    Clauses(Vec<Clause>),
}

impl Criteria {
    /// Renders the condition, or an empty string when there is none.
    ///
    /// # Errors
    ///
    /// Propagates rendering failures from the underlying expression.
    pub fn render(&self, dialect: Dialect) -> Result<String> {
        match self {
            Self::None => Ok(String::new()),
            Self::Raw(sql) => Ok(sql.clone()),
            Self::Expr(expr) => expr.render(dialect),
            Self::Clauses(clauses) => {
                if clauses.is_empty() {
                    Ok(String::new())
                } else {
                    Expr::and(clauses.clone()).render(dialect)
                }
            }
        }
    }
}

impl From<&str> for Criteria {
    fn from(sql: &str) -> Self {
        if sql.is_empty() { Self::None } else { Self::Raw(sql.to_string()) }
    }
}

impl From<String> for Criteria {
    fn from(sql: String) -> Self {
        if sql.is_empty() { Self::None } else { Self::Raw(sql) }
    }
}

impl From<Expr> for Criteria {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

impl From<Clause> for Criteria {
    fn from(clause: Clause) -> Self {
        Self::Clauses(vec![clause])
    }
}

impl<S: Into<String>, T: Into<crate::expr::AttrValue>> From<(S, T)> for Criteria {
    fn from(clause: (S, T)) -> Self {
        Self::Clauses(vec![clause.into()])
    }
}

impl From<Vec<Clause>> for Criteria {
    fn from(clauses: Vec<Clause>) -> Self {
        Self::Clauses(clauses)
    }
}

/// Formats an optional statement part: empty input yields an empty string,
/// otherwise the part is prefixed with its keyword and a leading space.
/// An empty prefix still gets the leading space (used for join fragments).
pub(crate) fn query_part(prefix: &str, part: &str) -> String {
    if part.is_empty() {
        String::new()
    } else if prefix.is_empty() {
        format!(" {part}")
    } else {
        format!(" {prefix} {part}")
    }
}

/// Assembles a complete SELECT statement. Absent parts are omitted with no
/// leftover whitespace; the clause order is fixed regardless of the order
/// configuration happened in.
pub(crate) fn build_select(
    dialect: Dialect,
    table: &str,
    criteria: &Criteria,
    order: &str,
    limit: Option<u64>,
    offset: Option<u64>,
    select: &str,
    joins: &[String],
) -> Result<String> {
    let quoted_table = dialect.quote_identifier(table);
    // With joins in play a bare `*` would pull in the joined columns too.
    let projection = if select == "*" && !joins.is_empty() {
        format!("{quoted_table}.*")
    } else {
        select.to_string()
    };
    let join_sql = joins.iter().map(|j| query_part("", j)).collect::<String>();
    let where_sql = criteria.render(dialect)?;
    let limit_sql = limit.map(|n| n.to_string()).unwrap_or_default();
    let offset_sql = offset.map(|n| n.to_string()).unwrap_or_default();
    Ok(format!(
        "SELECT {projection} FROM {quoted_table}{join_sql}{}{}{}{}",
        query_part("WHERE", &where_sql),
        query_part("ORDER BY", order),
        query_part("LIMIT", &limit_sql),
        query_part("OFFSET", &offset_sql),
    ))
}
