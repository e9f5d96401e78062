//! Error types for commentpulse-core

use thiserror::Error;

/// Classification of event payload validation failures.
///
/// The recorder rejects a payload before any store write happens, and the
/// kind tells the producer what class of fix is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required field is absent (or required-by-type, e.g. a generation
    /// event without generated comments)
    MissingField,
    /// A field carries a value outside its enum domain
    InvalidEnum,
    /// A field is present but structurally wrong (wrong type, negative
    /// duration, etc.)
    ShapeMismatch,
}

impl ValidationErrorKind {
    /// Returns the wire identifier for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::MissingField => "missing-field",
            ValidationErrorKind::InvalidEnum => "invalid-enum",
            ValidationErrorKind::ShapeMismatch => "shape-mismatch",
        }
    }
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the commentpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Event payload rejected before any write
    #[error("validation error ({kind}): {message}")]
    Validation {
        kind: ValidationErrorKind,
        message: String,
    },

    /// Persistence unreachable or timed out; retryable by the caller
    #[error("event store unavailable: {0}")]
    StoreUnavailable(String),

    /// Summary computation failed mid-flight; no partial summary is returned
    #[error("aggregation failed: {0}")]
    Aggregation(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Submit client error
    #[error("submit error: {0}")]
    Submit(String),
}

impl Error {
    /// Shorthand constructor for validation failures.
    pub fn validation(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Error::Validation {
            kind,
            message: message.into(),
        }
    }
}

/// Result type alias for commentpulse-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kind_wire_names() {
        assert_eq!(ValidationErrorKind::MissingField.as_str(), "missing-field");
        assert_eq!(ValidationErrorKind::InvalidEnum.as_str(), "invalid-enum");
        assert_eq!(
            ValidationErrorKind::ShapeMismatch.as_str(),
            "shape-mismatch"
        );
    }

    #[test]
    fn test_validation_display_includes_kind() {
        let err = Error::validation(ValidationErrorKind::MissingField, "eventId is required");
        let rendered = err.to_string();
        assert!(rendered.contains("missing-field"));
        assert!(rendered.contains("eventId"));
    }
}
