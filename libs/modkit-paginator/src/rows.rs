//! Typed keys and helpers over hydrated JSON rows.

use std::collections::{HashMap, HashSet};

use sea_orm::{FromQueryResult, JsonValue, QueryResult, Value};
use uuid::Uuid;

use crate::error::{PaginatorError, Result};
use crate::model::KeyType;

/// A decoded key value. Compared by value and re-bound with its own type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Integer(i64),
    Text(String),
    Uuid(Uuid),
}

impl KeyValue {
    /// Read `column` of a result row as a key of type `key_type`.
    /// `NULL` yields `None`.
    pub fn decode(row: &QueryResult, column: &str, key_type: KeyType) -> Result<Option<Self>> {
        Ok(match key_type {
            // Postgres refuses to widen `int4` on decode.
            KeyType::Integer => row
                .try_get::<Option<i64>>("", column)
                .or_else(|_| {
                    row.try_get::<Option<i32>>("", column)
                        .map(|v| v.map(i64::from))
                })?
                .map(Self::Integer),
            KeyType::Text => row.try_get::<Option<String>>("", column)?.map(Self::Text),
            KeyType::Uuid => row.try_get::<Option<Uuid>>("", column)?.map(Self::Uuid),
        })
    }

    /// Interpret an already hydrated JSON value as a key of type `key_type`.
    /// `null` yields `None`.
    pub fn from_json(value: &JsonValue, key_type: KeyType) -> Result<Option<Self>> {
        let unsupported = || PaginatorError::Decode(format!("unsupported key {value}"));
        if value.is_null() {
            return Ok(None);
        }
        let key = match key_type {
            KeyType::Integer => match value {
                JsonValue::Number(n) => n.as_i64().map(Self::Integer),
                JsonValue::String(s) => s.parse().ok().map(Self::Integer),
                _ => None,
            },
            KeyType::Text => match value {
                JsonValue::String(s) => Some(Self::Text(s.clone())),
                JsonValue::Number(n) => Some(Self::Text(n.to_string())),
                _ => None,
            },
            KeyType::Uuid => match value {
                JsonValue::String(s) => Uuid::parse_str(s).ok().map(Self::Uuid),
                // SQLite hands back blob-stored uuids as a byte array.
                JsonValue::Array(bytes) => bytes
                    .iter()
                    .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .and_then(|bytes| Uuid::from_slice(&bytes).ok())
                    .map(Self::Uuid),
                _ => None,
            },
        };
        key.map(Some).ok_or_else(unsupported)
    }

    /// Bindable value with the key's storage type.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Text(s) => Value::from(s.clone()),
            Self::Uuid(u) => Value::from(*u),
        }
    }
}

/// A result row decoded as JSON, tagged with the typed value of `key_column`.
pub fn keyed_row(
    row: &QueryResult,
    key_column: &str,
    key_type: KeyType,
) -> Result<(Option<KeyValue>, JsonValue)> {
    let key = KeyValue::decode(row, key_column, key_type)?;
    let json = JsonValue::from_query_result(row, "")?;
    Ok((key, json))
}

/// Distinct non-null keys found under `column` across `rows`, in first-seen order.
pub fn column_keys<'r, I>(rows: I, column: &str, key_type: KeyType) -> Result<Vec<KeyValue>>
where
    I: IntoIterator<Item = &'r JsonValue>,
{
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for value in rows.into_iter().filter_map(|r| r.get(column)) {
        if let Some(key) = KeyValue::from_json(value, key_type)?
            && seen.insert(key.clone())
        {
            keys.push(key);
        }
    }
    Ok(keys)
}

/// Set `name` on an object row; non-object rows are left untouched.
pub fn attach(row: &mut JsonValue, name: &str, value: JsonValue) {
    if let Some(object) = row.as_object_mut() {
        object.insert(name.to_owned(), value);
    }
}

/// Keep the first row per key and order the result like `keys`.
///
/// Rows whose key is not in `keys` are dropped.
pub fn dedup_in_key_order(
    rows: Vec<(KeyValue, JsonValue)>,
    keys: &[KeyValue],
) -> Vec<(KeyValue, JsonValue)> {
    let mut by_key: HashMap<KeyValue, JsonValue> = HashMap::with_capacity(keys.len());
    for (key, row) in rows {
        by_key.entry(key).or_insert(row);
    }
    keys.iter()
        .filter_map(|k| by_key.remove_entry(k))
        .collect()
}
