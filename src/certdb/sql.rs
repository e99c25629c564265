use chrono::{DateTime, NaiveDateTime, Utc};

use super::errors::{StoreError, StoreResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A bound parameter or a decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Backends without a native timestamp type store this as
    /// [`format_timestamp`] text.
    Timestamp(DateTime<Utc>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row, columns in `SELECT` order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRow {
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    fn value(&self, idx: usize) -> StoreResult<&SqlValue> {
        self.values
            .get(idx)
            .ok_or_else(|| StoreError::Decode(format!("no column at index {idx}")))
    }

    pub fn text(&self, idx: usize) -> StoreResult<String> {
        match self.value(idx)? {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Blob(b) => String::from_utf8(b.clone())
                .map_err(|e| StoreError::Decode(format!("column {idx}: {e}"))),
            SqlValue::Null => Ok(String::new()),
            other => Err(StoreError::Decode(format!(
                "column {idx}: expected text, got {other:?}"
            ))),
        }
    }

    pub fn integer(&self, idx: usize) -> StoreResult<i64> {
        match self.value(idx)? {
            SqlValue::Integer(i) => Ok(*i),
            SqlValue::Null => Ok(0),
            other => Err(StoreError::Decode(format!(
                "column {idx}: expected integer, got {other:?}"
            ))),
        }
    }

    pub fn optional_timestamp(&self, idx: usize) -> StoreResult<Option<DateTime<Utc>>> {
        match self.value(idx)? {
            SqlValue::Null => Ok(None),
            SqlValue::Timestamp(t) => Ok(Some(*t)),
            SqlValue::Text(s) if s.is_empty() => Ok(None),
            SqlValue::Text(s) => parse_timestamp(s).map(Some),
            other => Err(StoreError::Decode(format!(
                "column {idx}: expected timestamp, got {other:?}"
            ))),
        }
    }

    pub fn timestamp(&self, idx: usize) -> StoreResult<DateTime<Utc>> {
        self.optional_timestamp(idx)?
            .ok_or_else(|| StoreError::Decode(format!("column {idx}: timestamp is NULL")))
    }
}

/// Generic SQL access used by the record store.
///
/// Statements use positional `?` placeholders and touch only the
/// `certificates` and `ocsp_responses` relations. Implementations must report
/// the engine's own rows-affected count from [`Database::execute`]; the store
/// relies on it to tell a silent no-op from a successful write.
pub trait Database: Send + Sync {
    /// Run a write statement and return the number of rows it affected.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> StoreResult<u64>;

    /// Run a read statement and return every row it produced.
    fn query(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<SqlRow>>;
}

/// Render a timestamp the way it is stored: UTC, comparable as text against
/// SQL `CURRENT_TIMESTAMP`.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the store's own format (with or without
/// fractional seconds) and RFC 3339.
pub fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("invalid timestamp {s:?}: {e}")))
}
