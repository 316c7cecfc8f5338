//! Air Quality Recorder
//!
//! Fetches the reading for one fixed location on a timer and appends it to
//! the reading store. Failures are logged and never retried; the next tick
//! starts fresh.

mod recorder;

pub use recorder::{FixedLocation, RecordError, Recorder, RecorderConfig, RecorderHandle};
