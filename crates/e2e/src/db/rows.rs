//! Binding JSON parameters and decoding rows into JSON objects
//!
//! Decoding mirrors what the Node drivers hand back: decimals and enums as
//! strings, arrays as arrays, timestamps as strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, MySql, Postgres, Row, ValueRef};
use tracing::debug;
use uuid::Uuid;

/// One result row keyed by column name
pub type DbRow = Map<String, Value>;

macro_rules! bind_json {
    ($query:expr, $value:expr) => {
        match $value {
            Value::Null => $query.bind(None::<String>),
            Value::Bool(b) => $query.bind(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => $query.bind(i),
                (None, Some(f)) => $query.bind(f),
                (None, None) => $query.bind(n.to_string()),
            },
            Value::String(s) => $query.bind(s.clone()),
            other => $query.bind(Json(other.clone())),
        }
    };
}

/// Try each decoder in turn; the first compatible type wins
macro_rules! decode_column {
    ($row:expr, $idx:expr, $($ty:ty => $conv:expr),+ $(,)?) => {{
        let mut decoded = None;
        $(
            if decoded.is_none() {
                if let Ok(value) = $row.try_get::<Option<$ty>, _>($idx) {
                    decoded = Some(value.map($conv).unwrap_or(Value::Null));
                }
            }
        )+
        decoded
    }};
}

/// Postgres has no implicit text → uuid cast for bound parameters, so
/// UUID-shaped strings are sent as `uuid`. Compare text columns with `$1::text`.
pub fn uuid_param(value: &str) -> Option<Uuid> {
    if value.len() != 36 {
        return None;
    }
    Uuid::parse_str(value).ok()
}

pub fn bind_pg<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    if let Some(id) = value.as_str().and_then(uuid_param) {
        return query.bind(id);
    }
    bind_json!(query, value)
}

pub fn bind_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    bind_json!(query, value)
}

/// Decimals keep their scale and are returned as strings
pub fn decimal_to_json(value: Decimal) -> Value {
    Value::String(value.to_string())
}

/// Binary columns in Postgres hex notation (`\x0a1b`)
pub fn bytes_to_json(bytes: Vec<u8>) -> Value {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    Value::String(out)
}

pub fn array_to_json<T>(items: Vec<T>, convert: impl Fn(T) -> Value) -> Value {
    Value::Array(items.into_iter().map(convert).collect())
}

pub fn pg_row_to_json(row: &PgRow) -> DbRow {
    let mut out = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let is_null = row.try_get_raw(idx).map(|raw| raw.is_null()).unwrap_or(true);
        let value = if is_null {
            Value::Null
        } else {
            decode_column!(row, idx,
                i64 => Value::from,
                i32 => Value::from,
                i16 => Value::from,
                f64 => Value::from,
                f32 => |f: f32| Value::from(f as f64),
                Decimal => decimal_to_json,
                bool => Value::Bool,
                String => Value::String,
                Value => |v: Value| v,
                DateTime<Utc> => |t: DateTime<Utc>| Value::String(t.to_rfc3339()),
                NaiveDateTime => |t: NaiveDateTime| Value::String(t.to_string()),
                NaiveDate => |d: NaiveDate| Value::String(d.to_string()),
                NaiveTime => |t: NaiveTime| Value::String(t.to_string()),
                Uuid => |u: Uuid| Value::String(u.to_string()),
                Vec<u8> => bytes_to_json,
                Vec<i64> => |v: Vec<i64>| array_to_json(v, Value::from),
                Vec<i32> => |v: Vec<i32>| array_to_json(v, Value::from),
                Vec<i16> => |v: Vec<i16>| array_to_json(v, Value::from),
                Vec<f64> => |v: Vec<f64>| array_to_json(v, Value::from),
                Vec<bool> => |v: Vec<bool>| array_to_json(v, Value::Bool),
                Vec<String> => |v: Vec<String>| array_to_json(v, Value::String),
                Vec<Decimal> => |v: Vec<Decimal>| array_to_json(v, decimal_to_json),
                Vec<Uuid> => |v: Vec<Uuid>| array_to_json(v, |u| Value::String(u.to_string())),
            )
            // enums, citext and other text-encoded types
            .or_else(|| row.try_get_unchecked::<String, _>(idx).ok().map(Value::String))
            .unwrap_or_else(|| undecodable(column.name()))
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

pub fn mysql_row_to_json(row: &MySqlRow) -> DbRow {
    let mut out = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let is_null = row.try_get_raw(idx).map(|raw| raw.is_null()).unwrap_or(true);
        let value = if is_null {
            Value::Null
        } else {
            decode_column!(row, idx,
                i64 => Value::from,
                u64 => Value::from,
                f64 => Value::from,
                f32 => |f: f32| Value::from(f as f64),
                Decimal => decimal_to_json,
                bool => Value::Bool,
                String => Value::String,
                Value => |v: Value| v,
                DateTime<Utc> => |t: DateTime<Utc>| Value::String(t.to_rfc3339()),
                NaiveDateTime => |t: NaiveDateTime| Value::String(t.to_string()),
                NaiveDate => |d: NaiveDate| Value::String(d.to_string()),
                NaiveTime => |t: NaiveTime| Value::String(t.to_string()),
                Vec<u8> => bytes_to_json,
            )
            // ENUM and SET
            .or_else(|| row.try_get_unchecked::<String, _>(idx).ok().map(Value::String))
            .unwrap_or_else(|| undecodable(column.name()))
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

fn undecodable(column: &str) -> Value {
    debug!("Column {} has an unsupported type; returning null", column);
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case("12.50", "12.50" ; "scale kept")]
    #[test_case("-0.001", "-0.001" ; "negative fraction")]
    #[test_case("99999999999999999999", "99999999999999999999" ; "beyond i64")]
    fn test_decimal_is_a_string(raw: &str, expected: &str) {
        let decimal = Decimal::from_str(raw).unwrap();
        assert_eq!(decimal_to_json(decimal), json!(expected));
    }

    #[test]
    fn test_bytes_use_hex_notation() {
        assert_eq!(bytes_to_json(vec![0x00, 0x0a, 0xff]), json!("\\x000aff"));
        assert_eq!(bytes_to_json(Vec::new()), json!("\\x"));
    }

    #[test]
    fn test_arrays_keep_element_types() {
        assert_eq!(array_to_json(vec![1i32, 2, 3], Value::from), json!([1, 2, 3]));
        assert_eq!(
            array_to_json(vec!["a".to_string(), "b".to_string()], Value::String),
            json!(["a", "b"])
        );
        assert_eq!(
            array_to_json(
                vec![Decimal::from_str("1.10").unwrap()],
                decimal_to_json
            ),
            json!(["1.10"])
        );
        assert_eq!(array_to_json(Vec::<bool>::new(), Value::Bool), json!([]));
    }

    #[test_case("5f0c6b4e-3d2a-4c1b-9e8f-7a6b5c4d3e2f", true ; "hyphenated")]
    #[test_case("5F0C6B4E-3D2A-4C1B-9E8F-7A6B5C4D3E2F", true ; "upper case")]
    #[test_case("5f0c6b4e3d2a4c1b9e8f7a6b5c4d3e2f", false ; "simple form stays text")]
    #[test_case("tester@gmail.com", false ; "plain text")]
    #[test_case("", false ; "empty")]
    fn test_uuid_shaped_params(raw: &str, is_uuid: bool) {
        assert_eq!(uuid_param(raw).is_some(), is_uuid);
    }
}
