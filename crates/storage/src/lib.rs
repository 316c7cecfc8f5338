//! Storage Layer
//!
//! Persists air quality readings behind the `ReadingStore` trait, with a
//! SQLite implementation for deployments and an in-memory one for tests
//! and throwaway runs.

mod model;
mod query;
mod repository;
mod sqlite;

pub use model::{NewReading, PollutionPeak, StoredReading};
pub use query::{most_polluted, NO_READING_MESSAGE};
pub use repository::{MemoryRepository, ReadingStore};
pub use sqlite::SqliteRepository;

#[cfg(any(test, feature = "testing"))]
pub use repository::MockReadingStore;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}
