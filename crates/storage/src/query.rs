//! Read-side Queries

use crate::model::PollutionPeak;
use crate::repository::ReadingStore;
use crate::StorageError;
use tracing::debug;

/// Returned while the recorder has not yet produced a reading
pub const NO_READING_MESSAGE: &str = "No Air quality index has been saved. Try again in 1 minute";

/// Timestamps of the highest-`aqius` reading stored for `location`.
///
/// Ties are resolved by whatever order the store yields.
pub async fn most_polluted(
    store: &dyn ReadingStore,
    location: &str,
) -> Result<PollutionPeak, StorageError> {
    let reading = store
        .highest_aqius(location)
        .await?
        .ok_or_else(|| StorageError::NotFound(NO_READING_MESSAGE.to_string()))?;

    debug!(location, aqius = reading.aqius, "Most polluted reading found");
    Ok(PollutionPeak::from(&reading))
}
