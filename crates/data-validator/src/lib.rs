//! Request Validation
//!
//! Coerces raw query parameters to numbers and range-checks coordinates,
//! collecting every violation instead of stopping at the first.

mod error;
mod validator;

pub use error::{ValidationError, Violations};
pub use validator::{Coordinates, ValidationConfig, Validator};
