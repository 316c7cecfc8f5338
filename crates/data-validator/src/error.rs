//! Validation Error Types

use std::fmt;
use thiserror::Error;

/// A single violated constraint on a request parameter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Parameter absent from the request
    #[error("\"{field}\" is required")]
    Required { field: &'static str },

    /// Parameter present but not coercible to a finite number
    #[error("\"{field}\" must be a number")]
    NotANumber { field: &'static str },

    /// Value below the allowed minimum
    #[error("\"{field}\" must be greater than or equal to {min}")]
    BelowMinimum { field: &'static str, min: f64 },

    /// Value above the allowed maximum
    #[error("\"{field}\" must be less than or equal to {max}")]
    AboveMaximum { field: &'static str, max: f64 },
}

impl ValidationError {
    /// Name of the offending parameter
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::NotANumber { field }
            | Self::BelowMinimum { field, .. }
            | Self::AboveMaximum { field, .. } => field,
        }
    }
}

/// Every constraint a request violated, in parameter order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Violations(Vec<ValidationError>);

impl Violations {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

impl From<Vec<ValidationError>> for Violations {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}
