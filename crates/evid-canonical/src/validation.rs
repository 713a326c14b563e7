use thiserror::Error;

/// Validation errors for identifier primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When encoded text cannot be decoded.
    #[error("invalid {encoding} text: {reason}")]
    InvalidEncoding {
        /// Encoding that was expected.
        encoding: &'static str,
        /// Decoder failure.
        reason: String,
    },
}
