//! Error types for terrain calculations.
//!
//! Every failure is a caller-contract violation found during upfront
//! validation, so nothing here is retryable.

use thiserror::Error;

/// Result type alias for terrain calculations.
pub type Result<T> = std::result::Result<T, TopoError>;

/// Errors raised by the horizon, skew, view factor, gradient and shade
/// operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopoError {
    /// Input does not have the required dimensionality or shape.
    #[error("{context}: expected {expected}, got {actual}")]
    Shape {
        context: &'static str,
        expected: String,
        actual: String,
    },

    /// A scalar or array value lies outside its valid range.
    #[error("{name} = {value} is out of range ({reason})")]
    Range {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A named choice was given a value outside its accepted set.
    #[error("{name}: expected {expected}, got {value}")]
    InvalidOption {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    /// Elevations were not supplied as double precision.
    #[error("{context} must be a double precision (float64) array")]
    Precision { context: &'static str },
}

impl TopoError {
    /// Create a shape error.
    #[must_use]
    pub fn shape(
        context: &'static str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Shape {
            context,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a range error.
    #[must_use]
    pub const fn range(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::Range {
            name,
            value,
            reason,
        }
    }

    /// Create an invalid option error.
    #[must_use]
    pub fn invalid_option(
        name: &'static str,
        expected: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            name,
            expected,
            value: value.into(),
        }
    }

    /// Create a precision error.
    #[must_use]
    pub const fn precision(context: &'static str) -> Self {
        Self::Precision { context }
    }
}

#[cfg(feature = "python")]
impl From<TopoError> for pyo3::PyErr {
    fn from(err: TopoError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
