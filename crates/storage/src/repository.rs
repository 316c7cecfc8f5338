//! Repository Implementation

use crate::model::{NewReading, StoredReading};
use crate::StorageError;
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use std::sync::Mutex;
use tracing::{debug, info};

/// Persistent collection of readings
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Validate and append a reading; the store assigns `id` and `created_at`
    async fn insert(&self, reading: NewReading) -> Result<StoredReading, StorageError>;

    /// The reading with the highest `aqius` for a location, if any
    async fn highest_aqius(&self, location: &str) -> Result<Option<StoredReading>, StorageError>;

    /// Number of readings stored for a location
    async fn count(&self, location: &str) -> Result<u64, StorageError>;
}

/// Repository for data access (in-memory implementation)
pub struct MemoryRepository {
    /// Reading records in insertion order
    readings: Mutex<Vec<StoredReading>>,
    /// Next reading ID
    next_id: Mutex<i64>,
}

impl MemoryRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            readings: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }

    /// Total number of readings across all locations
    pub fn len(&self) -> usize {
        self.readings.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut readings) = self.readings.lock() {
            readings.clear();
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingStore for MemoryRepository {
    async fn insert(&self, reading: NewReading) -> Result<StoredReading, StorageError> {
        let (aqius, iq_air_date_time) = reading.validate()?;

        let mut readings = self.readings.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;
        let mut id = self.next_id.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;

        let record = StoredReading {
            id: *id,
            location: reading.location,
            aqius,
            iq_air_date_time,
            created_at: Utc::now().trunc_subsecs(3),
        };
        *id += 1;

        readings.push(record.clone());
        debug!("Inserted reading with ID {}", record.id);

        Ok(record)
    }

    async fn highest_aqius(&self, location: &str) -> Result<Option<StoredReading>, StorageError> {
        let readings = self.readings.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;

        Ok(readings
            .iter()
            .filter(|r| r.location == location)
            .max_by_key(|r| r.aqius)
            .cloned())
    }

    async fn count(&self, location: &str) -> Result<u64, StorageError> {
        let readings = self.readings.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;

        Ok(readings.iter().filter(|r| r.location == location).count() as u64)
    }
}
