//! Data access gateway
//!
//! The query layer hands over a rendered [`SqlQuery`] and gets back plain
//! [`Record`]s. A pooled connection is acquired for exactly one statement and
//! goes back to the pool when it drops, whichever way the call returns.

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;

use crate::error::GatewayResult;

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Integer(value)
    }
}

/// Parameterized statement: SQL text with `?` placeholders plus the values
/// for them, left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlQuery {
    pub text: String,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Append raw SQL text. Only ever called with text built from schema
    /// constants, never caller input.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.text.push_str(sql);
        self
    }

    /// Append a placeholder and its bound value
    pub fn push_bind(&mut self, param: impl Into<SqlParam>) -> &mut Self {
        self.text.push('?');
        self.params.push(param.into());
        self
    }

    /// Append pre-rendered SQL together with its parameters
    pub fn push_fragment(&mut self, sql: &str, params: Vec<SqlParam>) -> &mut Self {
        self.text.push_str(sql);
        self.params.extend(params);
        self
    }
}

/// One result row: column name to JSON value, in select-list order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Numeric view of a field; NULL, missing and non-numeric read as 0.
    pub fn number(&self, key: &str) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Read-only statement execution against the analytical store
#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn fetch_records(&self, query: &SqlQuery) -> GatewayResult<Vec<Record>>;
}

/// [`DataGateway`] over a SQLite pool
#[derive(Clone, Debug)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataGateway for SqliteGateway {
    async fn fetch_records(&self, query: &SqlQuery) -> GatewayResult<Vec<Record>> {
        debug!(sql = %query.text, params = query.params.len(), "executing query");

        // Returned to the pool on drop, on every path out of this function.
        let mut conn = self.pool.acquire().await?;

        let mut statement = sqlx::query(&query.text);
        for param in &query.params {
            statement = match param {
                SqlParam::Text(s) => statement.bind(s.clone()),
                SqlParam::Integer(i) => statement.bind(*i),
                SqlParam::Real(f) => statement.bind(*f),
            };
        }

        let rows = statement.fetch_all(&mut *conn).await?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &SqliteRow) -> GatewayResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.insert(column.name(), decode_value(row, idx)?);
    }
    Ok(record)
}

fn decode_value(row: &SqliteRow, idx: usize) -> GatewayResult<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    // Storage class of the value itself, not the declared column type
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" | "NUMERIC" => Value::from(row.try_get_unchecked::<f64, _>(idx)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get_unchecked(idx)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}
