//! Error kinds surfaced by the core.
//!
//! Internally everything returns [`CoreError`]; the sentinel adapters on the
//! ledger and tracker log and swallow [`StorageError`]s at the boundary.

use thiserror::Error;

use crate::date::LocalDate;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Column '{0}' missing from result row")]
    MissingColumn(String),

    #[error("Column '{column}' is not {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("Storage unavailable: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Habit name must not be empty")]
    EmptyName,

    #[error("Icon must be at most {max} characters")]
    IconTooLong { max: usize },

    #[error("Count goals need a target count greater than 0")]
    MissingTargetCount,

    #[error("Time goals need a target time greater than 0 minutes")]
    MissingTargetTime,

    #[error("Invalid reminder time '{0}'. Use HH:MM")]
    InvalidReminderTime(String),

    #[error("Unknown goal type '{0}'. Use binary, count, or time")]
    UnknownGoalType(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Habit {0} not found")]
    NotFound(i64),

    #[error("Habit {habit_id} did not exist yet on {date}")]
    BeforeCreation { habit_id: i64, date: LocalDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Validation,
    NotFound,
    BeforeCreation,
}

impl CoreError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Storage(_) => ErrorKind::Storage,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::BeforeCreation { .. } => ErrorKind::BeforeCreation,
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(StorageError::Sqlite(err))
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
