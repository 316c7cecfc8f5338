//! Coordinate Validator for Range Checking

use crate::error::{ValidationError, Violations};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Latitude valid range (degrees)
    pub latitude_range: (f64, f64),
    /// Longitude valid range (degrees)
    pub longitude_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            latitude_range: (-90.0, 90.0),
            longitude_range: (-180.0, 180.0),
        }
    }
}

/// A validated coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Validator for raw coordinate query parameters
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 {
            Err(ValidationError::BelowMinimum {
                field,
                min: range.0,
            })
        } else if value > range.1 {
            Err(ValidationError::AboveMaximum {
                field,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Coerce a required raw parameter to a finite number
    pub fn parse_number(
        &self,
        field: &'static str,
        raw: Option<&str>,
    ) -> Result<f64, ValidationError> {
        let raw = raw.ok_or(ValidationError::Required { field })?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ValidationError::NotANumber { field }),
        }
    }

    /// Coerce and range-check one parameter
    pub fn check_field(
        &self,
        field: &'static str,
        raw: Option<&str>,
        range: (f64, f64),
    ) -> Result<f64, ValidationError> {
        let value = self.parse_number(field, raw)?;
        self.validate_range(field, value, range)?;
        Ok(value)
    }

    /// Validate latitude/longitude query parameters.
    ///
    /// Every parameter is checked; the error carries all violations.
    pub fn validate_coordinates(
        &self,
        latitude: Option<&str>,
        longitude: Option<&str>,
    ) -> Result<Coordinates, Violations> {
        let mut violations = Violations::new();

        let latitude = self
            .check_field("latitude", latitude, self.config.latitude_range)
            .map_err(|e| violations.push(e))
            .ok();
        let longitude = self
            .check_field("longitude", longitude, self.config.longitude_range)
            .map_err(|e| violations.push(e))
            .ok();

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates {
                latitude,
                longitude,
            }),
            _ => {
                debug!("Rejected coordinates: {}", violations);
                Err(violations)
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
