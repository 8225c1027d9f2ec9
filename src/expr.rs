//! The SQL expression tree and its condition-building conveniences.

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::Value;

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=` (rendered `IS` against a NULL literal).
    Eq,
    /// `<>` (rendered `IS NOT` against a NULL literal).
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl CompareOp {
    const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// `AND`, rendered without surrounding parentheses.
    And,
    /// `OR`, self-parenthesizing.
    Or,
    /// `XOR`, self-parenthesizing.
    Xor,
}

impl BoolOp {
    const fn sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
            Self::Xor => " XOR ",
        }
    }
}

/// A node of the SQL expression tree.
///
/// Trees are built through the constructor helpers ([`Expr::ident`],
/// [`Expr::and`], [`Filter`] and friends) and rendered to dialect-specific
/// text with [`Expr::render`]. Rendering never touches a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or table reference, quoted per dialect segment by segment.
    Identifier(String),
    /// A literal value.
    Value(Value),
    /// A binary comparison.
    Compare {
        /// Operator.
        op: CompareOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `lhs IN (values...)`.
    In {
        /// Tested operand.
        lhs: Box<Expr>,
        /// Candidate values; must be non-empty.
        values: Vec<Expr>,
    },
    /// `lhs NOT IN (values...)`.
    NotIn {
        /// Tested operand.
        lhs: Box<Expr>,
        /// Excluded values; must be non-empty.
        values: Vec<Expr>,
    },
    /// `lhs BETWEEN low AND high`.
    Between {
        /// Tested operand.
        lhs: Box<Expr>,
        /// Inclusive lower bound.
        low: Box<Expr>,
        /// Inclusive upper bound.
        high: Box<Expr>,
    },
    /// Logical negation, rendered `NOT <inner>`.
    Not(Box<Expr>),
    /// A connective over two or more operands.
    Bool {
        /// Connective.
        op: BoolOp,
        /// Operands; must be non-empty.
        exprs: Vec<Expr>,
    },
    /// Verbatim SQL text, emitted unchanged and unescaped.
    Raw(String),
}

impl Expr {
    /// An identifier node. Dotted paths quote each segment.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// A literal value node.
    pub fn val(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// A raw SQL fragment, passed through as written.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// The SQL `NOW()` function.
    #[must_use]
    pub fn now() -> Self {
        Self::raw("NOW()")
    }

    /// Negates an expression.
    #[must_use]
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }

    /// Conjoins clauses with `AND`.
    #[must_use]
    pub fn and(clauses: Vec<Clause>) -> Self {
        Self::connect(BoolOp::And, clauses)
    }

    /// Disjoins clauses with `OR`. The rendered group is parenthesized.
    #[must_use]
    pub fn or(clauses: Vec<Clause>) -> Self {
        Self::connect(BoolOp::Or, clauses)
    }

    /// Connects clauses with `XOR`. The rendered group is parenthesized.
    #[must_use]
    pub fn xor(clauses: Vec<Clause>) -> Self {
        Self::connect(BoolOp::Xor, clauses)
    }

    fn connect(op: BoolOp, clauses: Vec<Clause>) -> Self {
        Self::Bool { op, exprs: clauses.into_iter().map(Clause::into_expr).collect() }
    }

    /// Builds the condition for a single attribute from a plain value or a
    /// [`Filter`]. A list value becomes `IN`, everything else `=`.
    pub fn for_attribute(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let ident = Self::ident(attribute);
        match value.into() {
            AttrValue::Value(Value::List(items)) => Filter::In(items).into_expr(ident),
            AttrValue::Value(v) => Filter::Eq(v).into_expr(ident),
            AttrValue::Filter(f) => f.into_expr(ident),
        }
    }

    /// Renders the tree as SQL text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for an empty `IN` list, an empty
    /// connective, or an unrenderable literal.
    pub fn render(&self, dialect: Dialect) -> Result<String> {
        match self {
            Self::Identifier(name) => Ok(dialect.quote_identifier(name)),
            Self::Value(value) => value.render(dialect),
            Self::Compare { op, lhs, rhs } => {
                let operator = match (op, rhs.as_ref()) {
                    (CompareOp::Eq, Self::Value(Value::Null)) => "IS",
                    (CompareOp::Ne, Self::Value(Value::Null)) => "IS NOT",
                    _ => op.sql(),
                };
                Ok(format!("{} {operator} {}", lhs.render(dialect)?, rhs.render(dialect)?))
            }
            Self::In { lhs, values } => Self::render_in(dialect, "IN", lhs, values),
            Self::NotIn { lhs, values } => Self::render_in(dialect, "NOT IN", lhs, values),
            Self::Between { lhs, low, high } => Ok(format!(
                "{} BETWEEN {} AND {}",
                lhs.render(dialect)?,
                low.render(dialect)?,
                high.render(dialect)?
            )),
            Self::Not(inner) => Ok(format!("NOT {}", inner.render(dialect)?)),
            Self::Bool { op, exprs } => {
                if exprs.is_empty() {
                    return Err(Error::invalid_value("boolean group with no operands"));
                }
                let parts =
                    exprs.iter().map(|e| e.render(dialect)).collect::<Result<Vec<_>>>()?;
                let joined = parts.join(op.sql());
                match op {
                    BoolOp::And => Ok(joined),
                    BoolOp::Or | BoolOp::Xor => Ok(format!("({joined})")),
                }
            }
            Self::Raw(sql) => Ok(sql.clone()),
        }
    }

    fn render_in(dialect: Dialect, keyword: &str, lhs: &Self, values: &[Self]) -> Result<String> {
        if values.is_empty() {
            return Err(Error::invalid_value(format!("{keyword} with an empty value list")));
        }
        let rendered =
            values.iter().map(|v| v.render(dialect)).collect::<Result<Vec<_>>>()?;
        Ok(format!("{} {keyword} ({})", lhs.render(dialect)?, rendered.join(", ")))
    }
}

/// A per-attribute matching rule, applied to an identifier to produce a
/// comparison node.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Equality (NULL-aware).
    Eq(Value),
    /// Inequality (NULL-aware).
    Ne(Value),
    /// Strictly greater.
    Gt(Value),
    /// Greater or equal.
    Ge(Value),
    /// Strictly less.
    Lt(Value),
    /// Less or equal.
    Le(Value),
    /// Membership.
    In(Vec<Value>),
    /// Non-membership.
    NotIn(Vec<Value>),
    /// Inclusive range.
    Between(Value, Value),
}

impl Filter {
    /// Equality filter.
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::Eq(value.into())
    }

    /// Inequality filter.
    pub fn ne(value: impl Into<Value>) -> Self {
        Self::Ne(value.into())
    }

    /// Greater-than filter.
    pub fn gt(value: impl Into<Value>) -> Self {
        Self::Gt(value.into())
    }

    /// Greater-or-equal filter.
    pub fn ge(value: impl Into<Value>) -> Self {
        Self::Ge(value.into())
    }

    /// Less-than filter.
    pub fn lt(value: impl Into<Value>) -> Self {
        Self::Lt(value.into())
    }

    /// Less-or-equal filter.
    pub fn le(value: impl Into<Value>) -> Self {
        Self::Le(value.into())
    }

    /// Membership filter.
    pub fn r#in<T: Into<Value>>(values: Vec<T>) -> Self {
        Self::In(values.into_iter().map(Into::into).collect())
    }

    /// Non-membership filter.
    pub fn not_in<T: Into<Value>>(values: Vec<T>) -> Self {
        Self::NotIn(values.into_iter().map(Into::into).collect())
    }

    /// Inclusive range filter.
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::Between(low.into(), high.into())
    }

    /// Applies the filter to an identifier, producing the comparison node.
    #[must_use]
    pub fn into_expr(self, ident: Expr) -> Expr {
        let lhs = Box::new(ident);
        let (op, value) = match self {
            Self::Eq(v) => (CompareOp::Eq, v),
            Self::Ne(v) => (CompareOp::Ne, v),
            Self::Gt(v) => (CompareOp::Gt, v),
            Self::Ge(v) => (CompareOp::Ge, v),
            Self::Lt(v) => (CompareOp::Lt, v),
            Self::Le(v) => (CompareOp::Le, v),
            Self::In(values) => {
                return Expr::In { lhs, values: values.into_iter().map(Expr::Value).collect() };
            }
            Self::NotIn(values) => {
                return Expr::NotIn { lhs, values: values.into_iter().map(Expr::Value).collect() };
            }
            Self::Between(low, high) => {
                return Expr::Between {
                    lhs,
                    low: Box::new(Expr::Value(low)),
                    high: Box::new(Expr::Value(high)),
                };
            }
        };
        Expr::Compare { op, lhs, rhs: Box::new(Expr::Value(value)) }
    }
}

/// The right-hand side of an attribute clause: a plain value or a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Matched by equality (lists by membership).
    Value(Value),
    /// Matched by the filter's own operator.
    Filter(Filter),
}

impl From<Filter> for AttrValue {
    fn from(f: Filter) -> Self {
        Self::Filter(f)
    }
}

impl From<Value> for AttrValue {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Expr> for AttrValue {
    fn from(e: Expr) -> Self {
        Self::Value(Value::Expr(Box::new(e)))
    }
}

// Concrete conversions; a blanket `impl<T: Into<Value>>` would collide with
// the Filter conversion above.
macro_rules! attr_value_from {
    ($($t:ty),* $(,)?) => {$(
        impl From<$t> for AttrValue {
            fn from(v: $t) -> Self {
                Self::Value(v.into())
            }
        }
    )*};
}

attr_value_from!(
    bool,
    i32,
    i64,
    u32,
    f64,
    &str,
    String,
    chrono::NaiveDateTime,
    Vec<i32>,
    Vec<i64>,
    Vec<&str>,
    Vec<String>,
    Vec<Value>,
);

/// One element of a criteria list.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// An attribute matched against a value or filter.
    Attr(String, AttrValue),
    /// A pre-built expression.
    Expr(Expr),
    /// A raw SQL fragment.
    Raw(String),
}

impl Clause {
    /// Lowers the clause to an expression node.
    #[must_use]
    pub fn into_expr(self) -> Expr {
        match self {
            Self::Attr(attribute, value) => Expr::for_attribute(attribute, value),
            Self::Expr(expr) => expr,
            Self::Raw(sql) => Expr::Raw(sql),
        }
    }
}

impl From<Expr> for Clause {
    fn from(e: Expr) -> Self {
        Self::Expr(e)
    }
}

impl<S: Into<String>, T: Into<AttrValue>> From<(S, T)> for Clause {
    fn from((attribute, value): (S, T)) -> Self {
        Self::Attr(attribute.into(), value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &Expr) -> String {
        expr.render(Dialect::MySql).unwrap()
    }

    #[test]
    fn equality_against_null_uses_is() {
        let e = Expr::for_attribute("role", Value::Null);
        assert_eq!(render(&e), "`role` IS NULL");
        let e = Filter::ne(Value::Null).into_expr(Expr::ident("role"));
        assert_eq!(render(&e), "`role` IS NOT NULL");
    }

    #[test]
    fn comparison_operators_render() {
        assert_eq!(render(&Filter::gt(18).into_expr(Expr::ident("age"))), "`age` > 18");
        assert_eq!(render(&Filter::le(5).into_expr(Expr::ident("age"))), "`age` <= 5");
        assert_eq!(render(&Filter::ne("x").into_expr(Expr::ident("name"))), "`name` <> 'x'");
    }

    #[test]
    fn in_lists_render_and_reject_empty() {
        let e = Filter::r#in(vec!["Smith", "Jones"]).into_expr(Expr::ident("name"));
        assert_eq!(render(&e), "`name` IN ('Smith', 'Jones')");
        let empty = Filter::In(vec![]).into_expr(Expr::ident("name"));
        assert!(empty.render(Dialect::MySql).is_err());
    }

    #[test]
    fn list_values_normalize_to_in() {
        let e = Expr::for_attribute("id", vec![1i64, 2, 3]);
        assert_eq!(render(&e), "`id` IN (1, 2, 3)");
    }

    #[test]
    fn between_renders_inclusive_bounds() {
        let e = Filter::between(1, 10).into_expr(Expr::ident("id"));
        assert_eq!(render(&e), "`id` BETWEEN 1 AND 10");
    }

    #[test]
    fn and_is_bare_while_or_parenthesizes() {
        let and = Expr::and(vec![("a", 1i64).into(), ("b", 2i64).into()]);
        assert_eq!(render(&and), "`a` = 1 AND `b` = 2");
        let or = Expr::or(vec![("a", 1i64).into(), ("b", 2i64).into()]);
        assert_eq!(render(&or), "(`a` = 1 OR `b` = 2)");
        let xor = Expr::xor(vec![("a", 1i64).into(), ("b", 2i64).into()]);
        assert_eq!(render(&xor), "(`a` = 1 XOR `b` = 2)");
    }

    #[test]
    fn nested_groups_compose() {
        let e = Expr::and(vec![
            ("enabled", true).into(),
            Expr::or(vec![("role", "admin").into(), ("role", "staff").into()]).into(),
        ]);
        assert_eq!(render(&e), "`enabled` = 1 AND (`role` = 'admin' OR `role` = 'staff')");
    }

    #[test]
    fn not_and_raw_render() {
        let e = Expr::not(Expr::for_attribute("enabled", true));
        assert_eq!(render(&e), "NOT `enabled` = 1");
        let e = Expr::for_attribute("created_at", Expr::now());
        assert_eq!(render(&e), "`created_at` = NOW()");
    }

    #[test]
    fn postgres_quotes_with_double_quotes() {
        let e = Expr::for_attribute("name", "O'Hara");
        assert_eq!(e.render(Dialect::Postgres).unwrap(), "\"name\" = 'O''Hara'");
    }
}
