//! Recorder Implementation

use chrono::{DateTime, Utc};
use iqair::{PollutionSource, UpstreamError};
use std::sync::Arc;
use std::time::Duration;
use storage::{NewReading, ReadingStore, StorageError, StoredReading};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// The location sampled on every tick
#[derive(Debug, Clone, PartialEq)]
pub struct FixedLocation {
    /// Label stored with each reading
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for FixedLocation {
    fn default() -> Self {
        Self {
            label: "Paris".to_string(),
            latitude: 48.856613,
            longitude: 2.352222,
        }
    }
}

/// Configuration for the recorder
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Time between ticks (default: one minute)
    pub interval: Duration,
    /// Location fetched on each tick
    pub location: FixedLocation,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            location: FixedLocation::default(),
        }
    }
}

/// Why a single tick produced no reading
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Upstream fetch failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Invalid data format received: missing {0}")]
    InvalidPayload(&'static str),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

impl RecordError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream_error",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Persistence(_) => "persistence_error",
        }
    }
}

/// Fetch-and-persist job for one fixed location
pub struct Recorder {
    source: Arc<dyn PollutionSource>,
    store: Arc<dyn ReadingStore>,
    config: RecorderConfig,
}

impl Recorder {
    /// Create a new recorder
    pub fn new(
        source: Arc<dyn PollutionSource>,
        store: Arc<dyn ReadingStore>,
        config: RecorderConfig,
    ) -> Self {
        info!(
            location = %config.location.label,
            interval_secs = config.interval.as_secs(),
            "Recorder created"
        );
        Self {
            source,
            store,
            config,
        }
    }

    /// Write a reading. Incomplete readings are rejected before the store
    /// is touched.
    pub async fn persist(&self, reading: NewReading) -> Result<StoredReading, StorageError> {
        reading.validate()?;
        self.store.insert(reading).await
    }

    /// Fetch the fixed location once and persist `{aqius, ts}`
    pub async fn on_tick(&self) -> Result<StoredReading, RecordError> {
        let location = &self.config.location;
        let raw = self
            .source
            .fetch(location.latitude, location.longitude)
            .await?;

        if raw.pollution().is_none() {
            return Err(RecordError::InvalidPayload("data.current.pollution"));
        }
        debug!(location = %location.label, data = %raw.data(), "Tick data received");

        let iq_air_date_time = match raw.timestamp().map(DateTime::parse_from_rfc3339) {
            Some(Ok(ts)) => Some(ts.with_timezone(&Utc)),
            Some(Err(e)) => {
                warn!("Unparseable provider timestamp: {}", e);
                None
            }
            None => None,
        };

        let reading = NewReading {
            location: location.label.clone(),
            aqius: raw.aqius(),
            iq_air_date_time,
        };
        Ok(self.persist(reading).await?)
    }

    /// Run one tick, logging the outcome instead of returning it
    pub async fn tick(&self) {
        match self.on_tick().await {
            Ok(reading) => {
                metrics::counter!("airquality_ticks_total", "outcome" => "success").increment(1);
                info!(
                    id = reading.id,
                    location = %reading.location,
                    aqius = reading.aqius,
                    "Saved air quality reading"
                );
            }
            Err(e) => {
                metrics::counter!("airquality_ticks_total", "outcome" => e.kind()).increment(1);
                error!("Error in recorder tick: {}", e);
            }
        }
    }

    /// Start the timer. The first tick fires one interval from now; each
    /// tick runs in its own task, so a slow tick does not delay the next.
    ///
    /// Dropping the returned handle stops the timer as well.
    pub fn spawn(self: Arc<Self>) -> RecorderHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = self.config.interval;

        let task = tokio::spawn(async move {
            info!("Starting recorder (interval: {:?})", period);
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let recorder = Arc::clone(&self);
                        tokio::spawn(async move { recorder.tick().await });
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            info!("Recorder stopped");
        });

        RecorderHandle { stop_tx, task }
    }
}

/// Handle to a running recorder timer
pub struct RecorderHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RecorderHandle {
    /// Stop the timer and wait for its loop to exit.
    ///
    /// Ticks already in flight are left to finish on their own.
    pub async fn stop(self) {
        info!("Stopping recorder");
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Recorder task ended abnormally: {}", e);
        }
    }

    /// Check if the timer loop is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
