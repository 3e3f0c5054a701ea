use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::date::LocalDate;
use crate::error::StorageError;

/// A single SQL parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
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

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<LocalDate> for Value {
    fn from(v: LocalDate) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Result of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub last_insert_id: i64,
    pub changes: usize,
}

/// One result row, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    fn require(&self, column: &str) -> Result<&Value, StorageError> {
        self.get(column)
            .ok_or_else(|| StorageError::MissingColumn(column.to_string()))
    }

    pub fn opt_i64(&self, column: &str) -> Result<Option<i64>, StorageError> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(*i)),
            _ => Err(mismatch(column, "an integer")),
        }
    }

    pub fn i64(&self, column: &str) -> Result<i64, StorageError> {
        self.opt_i64(column)?
            .ok_or_else(|| mismatch(column, "a non-null integer"))
    }

    /// Non-negative integer column; negative or oversized values read as a mismatch.
    pub fn opt_u32(&self, column: &str) -> Result<Option<u32>, StorageError> {
        self.opt_i64(column)?
            .map(|v| u32::try_from(v).map_err(|_| mismatch(column, "a non-negative integer")))
            .transpose()
    }

    pub fn bool(&self, column: &str) -> Result<bool, StorageError> {
        Ok(self.i64(column)? != 0)
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>, StorageError> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            _ => Err(mismatch(column, "text")),
        }
    }

    pub fn text(&self, column: &str) -> Result<String, StorageError> {
        self.opt_text(column)?
            .ok_or_else(|| mismatch(column, "non-null text"))
    }

    pub fn date(&self, column: &str) -> Result<LocalDate, StorageError> {
        self.text(column)?
            .parse()
            .map_err(|_| mismatch(column, "a YYYY-MM-DD date"))
    }
}

fn mismatch(column: &str, expected: &'static str) -> StorageError {
    StorageError::TypeMismatch {
        column: column.to_string(),
        expected,
    }
}

/// Record read/write interface the core runs against.
///
/// The SQLite [`Database`](crate::db::Database) is the shipped implementation;
/// anything that can serialize access to the `habits` and `habit_completions`
/// tables can stand in for it.
pub trait Storage {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Execution, StorageError>;

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError>;

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StorageError> {
        Ok(self.query_all(sql, params)?.into_iter().next())
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Execution, StorageError> {
        (**self).execute(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        (**self).query_all(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StorageError> {
        (**self).query_one(sql, params)
    }
}
