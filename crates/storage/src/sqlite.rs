//! SQLite Repository

use crate::model::{NewReading, StoredReading};
use crate::repository::ReadingStore;
use crate::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS air_quality (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location TEXT NOT NULL,
    aqius INTEGER NOT NULL,
    iq_air_date_time TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

const CREATE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_air_quality_location_aqius
    ON air_quality (location, aqius DESC)";

/// Repository backed by a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (creating if needed) the database at `url` and ensure the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        info!("Opening SQLite repository at {}", url);

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let repo = Self::from_pool(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    /// Wrap an existing pool; the caller is responsible for `migrate`
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the readings table and its lookup index
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        debug!("SQLite schema ready");
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_reading(row: &SqliteRow) -> Result<StoredReading, StorageError> {
    Ok(StoredReading {
        id: row.try_get("id")?,
        location: row.try_get("location")?,
        aqius: row.try_get("aqius")?,
        iq_air_date_time: row.try_get::<DateTime<Utc>, _>("iq_air_date_time")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl ReadingStore for SqliteRepository {
    async fn insert(&self, reading: NewReading) -> Result<StoredReading, StorageError> {
        let (aqius, iq_air_date_time) = reading.validate()?;
        let created_at = Utc::now().trunc_subsecs(3);

        let result = sqlx::query(
            "INSERT INTO air_quality (location, aqius, iq_air_date_time, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(reading.location.as_str())
        .bind(aqius)
        .bind(iq_air_date_time)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Inserted reading with ID {}", id);

        Ok(StoredReading {
            id,
            location: reading.location,
            aqius,
            iq_air_date_time,
            created_at,
        })
    }

    async fn highest_aqius(&self, location: &str) -> Result<Option<StoredReading>, StorageError> {
        let row = sqlx::query(
            "SELECT id, location, aqius, iq_air_date_time, created_at
             FROM air_quality
             WHERE location = ?
             ORDER BY aqius DESC
             LIMIT 1",
        )
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_reading).transpose()
    }

    async fn count(&self, location: &str) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM air_quality WHERE location = ?")
            .bind(location)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn memory_repo() -> SqliteRepository {
        // A single connection keeps every query on the same in-memory database
        SqliteRepository::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_highest() {
        let repo = memory_repo().await;
        let low_ts = Utc.with_ymd_and_hms(2023, 4, 1, 8, 0, 0).unwrap();
        let high_ts = Utc.with_ymd_and_hms(2023, 4, 1, 9, 0, 0).unwrap();

        repo.insert(NewReading::new("Paris", 30, low_ts)).await.unwrap();
        let high = repo.insert(NewReading::new("Paris", 80, high_ts)).await.unwrap();
        repo.insert(NewReading::new("Berlin", 120, low_ts)).await.unwrap();

        let top = repo.highest_aqius("Paris").await.unwrap().unwrap();
        assert_eq!(top.id, high.id);
        assert_eq!(top.aqius, 80);
        assert_eq!(top.iq_air_date_time, high_ts);
        assert_eq!(top.created_at, high.created_at);
        assert_eq!(repo.count("Paris").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_location() {
        let repo = memory_repo().await;
        assert!(repo.highest_aqius("Paris").await.unwrap().is_none());
        assert_eq!(repo.count("Paris").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_reading_not_written() {
        let repo = memory_repo().await;
        let reading = NewReading {
            location: "Test".to_string(),
            aqius: Some(50),
            iq_air_date_time: None,
        };

        let err = repo.insert(reading).await.unwrap_err();
        assert_eq!(err, StorageError::MissingField("iqAirDateTime"));
        assert_eq!(repo.count("Test").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let repo = memory_repo().await;
        let ts = Utc.with_ymd_and_hms(2023, 4, 1, 8, 0, 0).unwrap();

        let a = repo.insert(NewReading::new("Paris", 55, ts)).await.unwrap();
        let b = repo.insert(NewReading::new("Paris", 55, ts)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(repo.count("Paris").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_database_error() {
        let repo = memory_repo().await;
        repo.close().await;

        let ts = Utc.with_ymd_and_hms(2023, 4, 1, 8, 0, 0).unwrap();
        let err = repo.insert(NewReading::new("Paris", 10, ts)).await.unwrap_err();
        assert!(matches!(err, StorageError::DatabaseError(_)));
    }
}
