//! Shared fixtures for unit tests.

use crate::date::LocalDate;
use crate::db::Database;
use crate::error::StorageError;
use crate::storage::{Execution, Row, Storage, Value};

/// Storage whose every call fails, for exercising the sentinel contract.
pub(crate) struct FailingStorage;

impl Storage for FailingStorage {
    fn execute(&self, _sql: &str, _params: &[Value]) -> Result<Execution, StorageError> {
        Err(StorageError::Backend("disk unplugged".to_string()))
    }

    fn query_all(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>, StorageError> {
        Err(StorageError::Backend("disk unplugged".to_string()))
    }
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> LocalDate {
    LocalDate::from_ymd(y, m, d).unwrap()
}

/// Insert a bare binary habit row and return its id.
pub(crate) fn seed_habit(db: &Database, name: &str) -> i64 {
    db.execute(
        "INSERT INTO habits (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
        &[name.into(), date(2024, 1, 1).start_of_day_timestamp().into()],
    )
    .unwrap()
    .last_insert_id
}
