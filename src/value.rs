//! Typed values exchanged between entities, expressions and the driver.

use chrono::{NaiveDate, NaiveDateTime};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::expr::Expr;

/// A typed scalar (or near-scalar) value.
///
/// `Value` is both the driver-native row value and the literal leaf of the
/// expression tree. It is a closed sum: rendering matches exhaustively, so
/// every representable value has a defined SQL spelling.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean, rendered as `0`/`1`.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text, rendered as a dialect-escaped quoted literal.
    Str(String),
    /// Date and time, rendered quoted as `YYYY-MM-DD HH:MM:SS`.
    DateTime(NaiveDateTime),
    /// Enum with an integer backing value, rendered bare.
    IntEnum(i64),
    /// Enum with a string backing value, rendered quoted.
    StrEnum(String),
    /// Enum without a backing value, rendered as its quoted symbolic name.
    UnitEnum(String),
    /// List of values. As a column value it serializes to JSON text; as a
    /// finder criterion it normalizes to an `IN` list.
    List(Vec<Value>),
    /// A nested expression, rendered recursively. Lets raw SQL such as
    /// `NOW()` appear wherever a value is expected.
    Expr(Box<Expr>),
}

impl Value {
    /// Renders the value as SQL literal text using the dialect's quoting
    /// rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when the value has no literal
    /// spelling (a non-finite float, or a list containing an expression).
    pub fn render(&self, dialect: Dialect) -> Result<String> {
        match self {
            Self::Null => Ok("NULL".to_string()),
            Self::Bool(b) => Ok(i32::from(*b).to_string()),
            Self::Int(i) | Self::IntEnum(i) => Ok(i.to_string()),
            Self::Float(f) => {
                if f.is_finite() {
                    Ok(f.to_string())
                } else {
                    Err(Error::invalid_value(format!("non-finite float {f}")))
                }
            }
            Self::Str(s) | Self::StrEnum(s) | Self::UnitEnum(s) => Ok(dialect.quote_str(s)),
            Self::DateTime(dt) => Ok(dialect.quote_str(&dt.format("%Y-%m-%d %H:%M:%S").to_string())),
            Self::List(values) => {
                let json = to_json(values)?;
                Ok(dialect.quote_str(&json.to_string()))
            }
            Self::Expr(expr) => expr.render(dialect),
        }
    }

    /// True when the value is the NULL literal.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// "Emptiness" as the validator engine sees it: NULL, `false`, zero,
    /// the empty string and the empty list are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) => true,
            Self::Int(i) | Self::IntEnum(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Str(s) | Self::StrEnum(s) | Self::UnitEnum(s) => s.is_empty(),
            Self::List(values) => values.is_empty(),
            Self::Bool(true) | Self::DateTime(_) | Self::Expr(_) => false,
        }
    }

    /// Extracts an integer, accepting driver values that arrive as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when the value is not integral.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(i) | Self::IntEnum(i) => Ok(*i),
            Self::Str(s) => s
                .parse()
                .map_err(|_| Error::invalid_value(format!("expected integer, got '{s}'"))),
            other => Err(Error::invalid_value(format!("expected integer, got {other:?}"))),
        }
    }
}

fn to_json(values: &[Value]) -> Result<serde_json::Value> {
    let items = values.iter().map(json_item).collect::<Result<Vec<_>>>()?;
    Ok(serde_json::Value::Array(items))
}

fn json_item(value: &Value) -> Result<serde_json::Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(i) | Value::IntEnum(i) => Ok(serde_json::Value::from(*i)),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| Error::invalid_value(format!("non-finite float {f}"))),
        Value::Str(s) | Value::StrEnum(s) | Value::UnitEnum(s) => {
            Ok(serde_json::Value::String(s.clone()))
        }
        Value::DateTime(dt) => {
            Ok(serde_json::Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
        }
        Value::List(values) => to_json(values),
        Value::Expr(_) => Err(Error::invalid_value("expressions cannot be JSON-encoded")),
    }
}

fn from_json(value: serde_json::Value) -> Result<Value> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => n.as_i64().map(Value::Int).map_or_else(
            || {
                n.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| Error::invalid_value(format!("unrepresentable number {n}")))
            },
            Ok,
        ),
        serde_json::Value::String(s) => Ok(Value::Str(s)),
        serde_json::Value::Array(items) => {
            Ok(Value::List(items.into_iter().map(from_json).collect::<Result<_>>()?))
        }
        serde_json::Value::Object(_) => {
            Err(Error::invalid_value("JSON objects are not column values"))
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<Expr> for Value {
    fn from(v: Expr) -> Self {
        Self::Expr(Box::new(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Conversion between a column's declared Rust type and [`Value`].
///
/// Implemented for the standard scalar types; user types (enums, value
/// objects) implement it to take part in hydration and rendering. The
/// `from_value` direction performs the driver-to-field coercion described
/// by the hydration rules: invalid backing values are hard failures, never
/// silent nulls.
pub trait ColumnValue: Sized {
    /// Converts the field value into a [`Value`].
    fn to_value(&self) -> Value;

    /// Coerces a driver-native [`Value`] into the field type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when the value cannot represent the
    /// field type.
    fn from_value(value: Value) -> Result<Self>;
}

impl ColumnValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Ok(other.as_int()? != 0),
        }
    }
}

impl ColumnValue for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        value.as_int()
    }
}

impl ColumnValue for i32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        let i = value.as_int()?;
        Self::try_from(i).map_err(|_| Error::invalid_value(format!("{i} out of range for i32")))
    }
}

impl ColumnValue for u32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        let i = value.as_int()?;
        Self::try_from(i).map_err(|_| Error::invalid_value(format!("{i} out of range for u32")))
    }
}

impl ColumnValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => {
                let f = i as Self;
                Ok(f)
            }
            Value::Str(s) => s
                .parse()
                .map_err(|_| Error::invalid_value(format!("expected float, got '{s}'"))),
            other => Err(Error::invalid_value(format!("expected float, got {other:?}"))),
        }
    }
}

impl ColumnValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) | Value::StrEnum(s) | Value::UnitEnum(s) => Ok(s),
            Value::Int(i) => Ok(i.to_string()),
            other => Err(Error::invalid_value(format!("expected string, got {other:?}"))),
        }
    }
}

impl ColumnValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            Value::Str(s) => parse_datetime(&s),
            other => Err(Error::invalid_value(format!("expected datetime, got {other:?}"))),
        }
    }
}

impl ColumnValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Str(self.format("%Y-%m-%d").to_string())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Str(s) => parse_datetime(&s).map(|dt| dt.date()),
            other => Err(Error::invalid_value(format!("expected date, got {other:?}"))),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ColumnValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ColumnValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::List(items) => items,
            Value::Str(s) => {
                let json: serde_json::Value = serde_json::from_str(&s)
                    .map_err(|e| Error::invalid_value(format!("malformed JSON list: {e}")))?;
                match from_json(json)? {
                    Value::List(items) => items,
                    other => {
                        return Err(Error::invalid_value(format!("expected list, got {other:?}")));
                    }
                }
            }
            other => return Err(Error::invalid_value(format!("expected list, got {other:?}"))),
        };
        items.into_iter().map(T::from_value).collect()
    }
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(parsed);
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    Err(Error::invalid_value(format!(
        "unsupported datetime '{raw}'; expected \"%Y-%m-%d %H:%M:%S\" or \"%Y-%m-%d\""
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_scalars() {
        let d = Dialect::MySql;
        assert_eq!(Value::Null.render(d).unwrap(), "NULL");
        assert_eq!(Value::Bool(true).render(d).unwrap(), "1");
        assert_eq!(Value::Bool(false).render(d).unwrap(), "0");
        assert_eq!(Value::Int(42).render(d).unwrap(), "42");
        assert_eq!(Value::Float(2.5).render(d).unwrap(), "2.5");
        assert_eq!(Value::Str("John".into()).render(d).unwrap(), "'John'");
    }

    #[test]
    fn renders_datetime_canonical() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(12, 14, 7)
            .unwrap();
        assert_eq!(Value::DateTime(dt).render(Dialect::MySql).unwrap(), "'2024-01-02 12:14:07'");
    }

    #[test]
    fn renders_enums_by_backing() {
        let d = Dialect::MySql;
        assert_eq!(Value::IntEnum(404).render(d).unwrap(), "404");
        assert_eq!(Value::StrEnum("D".into()).render(d).unwrap(), "'D'");
        assert_eq!(Value::UnitEnum("on".into()).render(d).unwrap(), "'on'");
    }

    #[test]
    fn renders_list_as_json_literal() {
        let v = Value::List(vec![Value::Int(1), Value::Str("a".into())]);
        assert_eq!(v.render(Dialect::MySql).unwrap(), "'[1,\"a\"]'");
    }

    #[test]
    fn list_round_trips_through_json_text() {
        let decoded = Vec::<i64>::from_value(Value::Str("[1,2,3]".into())).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn coerces_driver_strings() {
        assert_eq!(i64::from_value(Value::Str("100".into())).unwrap(), 100);
        assert!(bool::from_value(Value::Int(1)).unwrap());
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
    }

    #[test]
    fn rejects_malformed_datetime() {
        assert!(NaiveDateTime::from_value(Value::Str("invalid".into())).is_err());
    }
}
