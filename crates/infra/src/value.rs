//! SQL value model shared by statements, rows and database adapters.

use core::fmt;
use core::hash::Hash;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Column type of a non-null value.
///
/// Carried by [`SqlValue::TypedNull`] so drivers that type their parameters
/// can send a NULL of the right type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bool,
    Int,
    Float,
    Text,
    Uuid,
    Timestamp,
    Json,
}

/// A single bound parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL of unknown type (e.g. a column left out of an INSERT).
    Null,
    /// NULL bound from an `Option` whose inner type is known.
    TypedNull(SqlType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(JsonValue),
}

impl SqlValue {
    /// Short name of the variant, used in decode errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null | SqlValue::TypedNull(_) => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Json(_) => "json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null | SqlValue::TypedNull(_))
    }

    /// Drop the type hint from a NULL; other values are returned unchanged.
    pub fn untyped(self) -> Self {
        match self {
            SqlValue::TypedNull(_) => SqlValue::Null,
            other => other,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null | SqlValue::TypedNull(_) => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "'{v}'"),
            SqlValue::Uuid(v) => write!(f, "'{v}'"),
            SqlValue::Timestamp(v) => write!(f, "'{}'", v.to_rfc3339()),
            SqlValue::Json(v) => write!(f, "'{v}'"),
        }
    }
}

/// Rust types with a fixed column type.
pub trait SqlTyped {
    const SQL_TYPE: SqlType;
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for SqlValue {
                fn from(value: $t) -> Self {
                    SqlValue::$variant(value.into())
                }
            }

            impl SqlTyped for $t {
                const SQL_TYPE: SqlType = SqlType::$variant;
            }
        )*
    };
}

impl_from!(
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    JsonValue => Json,
);

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl SqlTyped for &String {
    const SQL_TYPE: SqlType = SqlType::Text;
}

impl<T: Into<SqlValue> + SqlTyped> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::TypedNull(T::SQL_TYPE), Into::into)
    }
}

/// Typed conversion out of a column value.
///
/// Returns `None` when the value has an incompatible type; [`crate::Row::get`]
/// turns that into a `DecodeError::TypeMismatch` naming the column.
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: &SqlValue) -> Option<Self>;
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Float(v) => Some(*v),
            SqlValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromSqlValue for Uuid {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Uuid(v) => Some(*v),
            SqlValue::Text(v) => Uuid::parse_str(v).ok(),
            _ => None,
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSqlValue for JsonValue {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }
        T::from_sql_value(value).map(Some)
    }
}

/// Identity types a mapper can key on: bindable as a parameter and readable
/// back from the identity column.
pub trait SqlKey:
    Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static + Into<SqlValue> + FromSqlValue
{
}

impl<K> SqlKey for K where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static + Into<SqlValue> + FromSqlValue
{
}
