//! Conversion of backend rows into JSON objects.
//!
//! Each column is sorted into a [`TypeCategory`] by the type name the driver
//! reports, then decoded by the backend module below. A value that cannot be
//! decoded becomes `null` instead of failing the whole query.

use crate::models::{DatabaseType, Row as JsonRow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value as JsonValue};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo, ValueRef};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Json,
    Binary,
    Text,
}

/// Classify a driver type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC affinity stores integers or floats
        if db == DatabaseType::SQLite {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }
    if lower == "interval" {
        return TypeCategory::Text;
    }
    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }
    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }
    if lower.contains("date") || lower.contains("time") {
        return TypeCategory::Temporal;
    }
    TypeCategory::Text
}

// Raw wrappers read the textual wire representation of a value. The raw
// query path uses the text protocol on MySQL and PostgreSQL, so this works
// for any column type the typed decoders do not cover.

/// Exact DECIMAL/NUMERIC value as the database printed it.
#[derive(Debug)]
pub struct RawDecimal(pub String);

/// Textual value of a column of any type.
#[derive(Debug)]
pub struct RawText(pub String);

macro_rules! impl_raw_decode {
    ($wrapper:ident, $db:ty, $type_info:ty, $value_ref:ident, |$ty:ident| $compatible:expr) => {
        impl Type<$db> for $wrapper {
            fn type_info() -> $type_info {
                <String as Type<$db>>::type_info()
            }

            fn compatible($ty: &$type_info) -> bool {
                $compatible
            }
        }

        impl<'r> Decode<'r, $db> for $wrapper {
            fn decode(value: $value_ref<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as Decode<$db>>::decode(value)?;
                Ok($wrapper(s.to_string()))
            }
        }
    };
}

impl_raw_decode!(RawDecimal, sqlx::MySql, MySqlTypeInfo, MySqlValueRef, |ty| {
    let name = ty.name().to_lowercase();
    name.contains("decimal") || name.contains("numeric")
});
impl_raw_decode!(RawDecimal, sqlx::Postgres, PgTypeInfo, PgValueRef, |ty| {
    let name = ty.name().to_lowercase();
    name.contains("numeric") || name.contains("decimal")
});
impl_raw_decode!(RawText, sqlx::MySql, MySqlTypeInfo, MySqlValueRef, |_ty| true);
impl_raw_decode!(RawText, sqlx::Postgres, PgTypeInfo, PgValueRef, |_ty| true);

/// Encode binary data as UTF-8 text when valid, base64 otherwise.
pub fn binary_value(bytes: &[u8]) -> JsonValue {
    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Float as a JSON number; NaN and infinities become strings.
pub fn float_value(v: f64) -> JsonValue {
    Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Try to decode column `idx` as `T`.
///
/// Returns `None` when the column is not compatible with `T`, so callers can
/// chain fallbacks. A SQL `NULL` decodes to `Some(JsonValue::Null)`.
fn decode_as<'r, R, T>(
    row: &'r R,
    idx: usize,
    into_json: impl FnOnce(T) -> JsonValue,
) -> Option<JsonValue>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => Some(into_json(v)),
        Ok(None) => Some(JsonValue::Null),
        Err(_) => None,
    }
}

fn text(v: String) -> JsonValue {
    JsonValue::String(v)
}

fn display<T: ToString>(v: T) -> JsonValue {
    JsonValue::String(v.to_string())
}

/// Converts a database row into a JSON object keyed by column name.
pub trait RowToJson {
    fn column_names(&self) -> Vec<String>;
    fn to_json_row(&self) -> JsonRow;
}

macro_rules! impl_row_to_json {
    ($row:ty, $db:expr, $decoder:path) => {
        impl RowToJson for $row {
            fn column_names(&self) -> Vec<String> {
                self.columns().iter().map(|c| c.name().to_string()).collect()
            }

            fn to_json_row(&self) -> JsonRow {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let category = categorize_type(col.type_info().name(), $db);
                        (col.name().to_string(), $decoder(self, idx, category))
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_json!(MySqlRow, DatabaseType::MySQL, mysql::decode_column);
impl_row_to_json!(PgRow, DatabaseType::PostgreSQL, postgres::decode_column);
impl_row_to_json!(SqliteRow, DatabaseType::SQLite, sqlite::decode_column);

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        let typed = match category {
            TypeCategory::Integer => decode_as::<_, i64>(row, idx, JsonValue::from)
                .or_else(|| decode_as::<_, u64>(row, idx, JsonValue::from)),
            TypeCategory::Float => decode_as::<_, f64>(row, idx, float_value)
                .or_else(|| decode_as::<_, f32>(row, idx, |v| float_value(v as f64))),
            TypeCategory::Decimal => decode_as::<_, RawDecimal>(row, idx, |v| text(v.0)),
            TypeCategory::Boolean => decode_as::<_, bool>(row, idx, JsonValue::Bool),
            TypeCategory::Temporal => decode_as::<_, NaiveDateTime>(row, idx, display)
                .or_else(|| decode_as::<_, DateTime<Utc>>(row, idx, |v| text(v.to_rfc3339())))
                .or_else(|| decode_as::<_, NaiveDate>(row, idx, display))
                .or_else(|| decode_as::<_, NaiveTime>(row, idx, display)),
            TypeCategory::Json => decode_as::<_, JsonValue>(row, idx, |v| v),
            TypeCategory::Binary => decode_as::<_, Vec<u8>>(row, idx, |v| binary_value(&v)),
            TypeCategory::Text => decode_as::<_, String>(row, idx, text),
        };
        typed
            .or_else(|| decode_as::<_, RawText>(row, idx, |v| text(v.0)))
            .unwrap_or(JsonValue::Null)
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        let typed = match category {
            TypeCategory::Integer => decode_as::<_, i32>(row, idx, JsonValue::from)
                .or_else(|| decode_as::<_, i64>(row, idx, JsonValue::from))
                .or_else(|| decode_as::<_, i16>(row, idx, JsonValue::from)),
            TypeCategory::Float => decode_as::<_, f64>(row, idx, float_value)
                .or_else(|| decode_as::<_, f32>(row, idx, |v| float_value(v as f64))),
            TypeCategory::Decimal => decode_as::<_, RawDecimal>(row, idx, |v| text(v.0)),
            TypeCategory::Boolean => decode_as::<_, bool>(row, idx, JsonValue::Bool),
            TypeCategory::Temporal => decode_as::<_, DateTime<Utc>>(row, idx, |v| {
                text(v.to_rfc3339())
            })
            .or_else(|| decode_as::<_, NaiveDateTime>(row, idx, display))
            .or_else(|| decode_as::<_, NaiveDate>(row, idx, display))
            .or_else(|| decode_as::<_, NaiveTime>(row, idx, display)),
            TypeCategory::Json => decode_as::<_, JsonValue>(row, idx, |v| v),
            TypeCategory::Binary => decode_as::<_, Vec<u8>>(row, idx, |v| binary_value(&v)),
            TypeCategory::Text => decode_as::<_, String>(row, idx, text),
        };
        typed
            .or_else(|| decode_as::<_, RawText>(row, idx, |v| text(v.0)))
            .unwrap_or(JsonValue::Null)
    }
}

mod sqlite {
    use super::*;

    /// SQLite types values, not columns, so the storage class of the value
    /// decides and the declared category only refines it.
    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> JsonValue {
        let storage = match row.try_get_raw(idx) {
            Ok(value) if value.is_null() => return JsonValue::Null,
            Ok(value) => value.type_info().name().to_uppercase(),
            Err(_) => return JsonValue::Null,
        };

        let decoded = match storage.as_str() {
            "INTEGER" if category == TypeCategory::Boolean => {
                decode_as::<_, i64>(row, idx, |v| JsonValue::Bool(v != 0))
            }
            "INTEGER" => decode_as::<_, i64>(row, idx, JsonValue::from),
            "REAL" => decode_as::<_, f64>(row, idx, float_value),
            "BLOB" => decode_as::<_, Vec<u8>>(row, idx, |v| binary_value(&v)),
            _ => decode_as::<_, String>(row, idx, |v| {
                if category == TypeCategory::Json {
                    if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                        return json;
                    }
                }
                text(v)
            }),
        };
        decoded.unwrap_or(JsonValue::Null)
    }
}
