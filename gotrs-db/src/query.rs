//! # Query Module
//!
//! Output types of the SQL renderers: [`RenderedQuery`] pairs statement text
//! with its positional arguments, [`Value`] is a bindable argument and
//! [`Condition`] an equality predicate used by the UPDATE / DELETE / SELECT
//! renderers.
//!
//! The sqlx `Any` driver only encodes booleans, integers, floats, text and
//! bytes. Date/time, UUID and JSON values are therefore bound in their text
//! form; renderers that need it cast the placeholder back to the column type
//! (see [`Value::text_bound_type`]).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::Arguments;
use sqlx::any::AnyArguments;
use uuid::Uuid;

use crate::schema::LogicalType;

// ============================================================================
// Values
// ============================================================================

/// A positional statement argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    /// A JSON document, already serialized.
    Json(String),
}

impl Value {
    pub fn json(document: impl Into<String>) -> Self {
        Value::Json(document.into())
    }

    /// Column type a placeholder must be cast to when the value travels as
    /// text. `None` for values the `Any` driver encodes natively.
    pub fn text_bound_type(&self) -> Option<LogicalType> {
        match self {
            Value::Timestamp(_) => Some(LogicalType::Timestamp),
            Value::Date(_) => Some(LogicalType::Date),
            Value::Time(_) => Some(LogicalType::Time),
            Value::Uuid(_) => Some(LogicalType::Uuid),
            Value::Json(_) => Some(LogicalType::Json),
            _ => None,
        }
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

macro_rules! impl_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.naive_utc())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// `column = value`, ANDed with the other conditions of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub value: Value,
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { column: column.into(), value: value.into() }
    }
}

// ============================================================================
// Rendered Queries
// ============================================================================

/// Statement text plus the arguments for its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

impl RenderedQuery {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self { sql: sql.into(), args }
    }

    /// A statement without arguments (DDL).
    pub fn statement(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Counts `?` and `$n` placeholders outside of quoted literals and identifiers.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }
}

pub(crate) fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '?' => count += 1,
            '$' if chars.peek().is_some_and(|n| n.is_ascii_digit()) => {
                while chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                    chars.next();
                }
                count += 1;
            }
            _ => {}
        }
    }

    count
}

/// Binds `args` in order into sqlx arguments for the `Any` driver.
pub(crate) fn bind_arguments<'q>(args: &[Value]) -> Result<AnyArguments<'q>, sqlx::Error> {
    let mut bound = AnyArguments::default();
    for arg in args {
        let result = match arg {
            Value::Null => bound.add(Option::<String>::None),
            Value::Bool(v) => bound.add(*v),
            Value::Int(v) => bound.add(*v),
            Value::Float(v) => bound.add(*v),
            Value::Text(v) | Value::Json(v) => bound.add(v.clone()),
            Value::Bytes(v) => bound.add(v.clone()),
            Value::Timestamp(v) => bound.add(v.format(TIMESTAMP_FORMAT).to_string()),
            Value::Date(v) => bound.add(v.format(DATE_FORMAT).to_string()),
            Value::Time(v) => bound.add(v.format(TIME_FORMAT).to_string()),
            Value::Uuid(v) => bound.add(v.hyphenated().to_string()),
        };
        result.map_err(sqlx::Error::Encode)?;
    }
    Ok(bound)
}
