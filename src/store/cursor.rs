use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use std::fmt;

use crate::error::LoadError;

/// A value bound to a placeholder or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StoreValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StoreValue::Integer(v) => Some(*v),
            StoreValue::Real(v) => Some(*v as i64),
            StoreValue::Text(s) => s.parse().ok(),
            StoreValue::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreValue::Null => write!(f, "NULL"),
            StoreValue::Integer(v) => write!(f, "{}", v),
            StoreValue::Real(v) => write!(f, "{}", v),
            StoreValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        StoreValue::Integer(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        StoreValue::Text(v.to_string())
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        StoreValue::Text(v)
    }
}

impl From<ValueRef<'_>> for StoreValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null | ValueRef::Blob(_) => StoreValue::Null,
            ValueRef::Integer(v) => StoreValue::Integer(v),
            ValueRef::Real(v) => StoreValue::Real(v),
            ValueRef::Text(bytes) => StoreValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl ToSql for StoreValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            StoreValue::Null => ToSqlOutput::Owned(Value::Null),
            StoreValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            StoreValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            StoreValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Forward-only view over the rows a query produced.
///
/// A cursor starts before the first row; `move_to_next` must be called before
/// reading. The underlying resources are released when the cursor is dropped.
pub trait RowCursor: Send {
    /// Total number of rows, independent of the current position.
    fn count(&self) -> usize;

    fn move_to_next(&mut self) -> bool;

    /// Position of `name` in the projection. A missing column is a caller bug
    /// and is reported as invalid arguments.
    fn column_index(&self, name: &str) -> Result<usize, LoadError>;

    fn value(&self, index: usize) -> Result<&StoreValue, LoadError>;

    fn get_i64(&self, index: usize) -> Result<Option<i64>, LoadError> {
        Ok(self.value(index)?.as_i64())
    }

    fn get_string(&self, index: usize) -> Result<Option<String>, LoadError> {
        Ok(match self.value(index)? {
            StoreValue::Null => None,
            StoreValue::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    fn move_to_first(&mut self) -> bool;
}

/// Cursor over rows that were fully read while the store connection was held.
#[derive(Debug)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<StoreValue>>,
    position: Option<usize>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<StoreValue>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
        }
    }
}

impl RowCursor for RowSet {
    fn count(&self) -> usize {
        self.rows.len()
    }

    fn move_to_next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    fn move_to_first(&mut self) -> bool {
        self.position = None;
        self.move_to_next()
    }

    fn column_index(&self, name: &str) -> Result<usize, LoadError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| LoadError::invalid_arguments(format!("column '{}' does not exist", name)))
    }

    fn value(&self, index: usize) -> Result<&StoreValue, LoadError> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| LoadError::invalid_arguments("cursor is not positioned on a row"))?;

        row.get(index).ok_or_else(|| {
            LoadError::invalid_arguments(format!("column index {} is out of range", index))
        })
    }
}

impl Drop for RowSet {
    fn drop(&mut self) {
        tracing::trace!("Released cursor over {} rows", self.rows.len());
    }
}
