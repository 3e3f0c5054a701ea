pub mod date;
pub mod db;
pub mod error;
pub mod habits;
pub mod ledger;
pub mod models;
pub mod stats;
pub mod storage;
pub mod streak;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use date::LocalDate;
pub use error::{CoreError, ErrorKind, StorageError, ValidationError};
pub use tracker::{HabitBoard, HabitTracker};
