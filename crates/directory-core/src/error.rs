//! Error types for directory entry operations.
//!
//! Reading and mutating an entry never fails; these errors only surface from the decoding,
//! parsing and conversion helpers built around it.

use thiserror::Error;

/// Main error type for directory entry helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Distinguished name could not be parsed
    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    /// Required attribute is absent from the entry
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    /// Attribute value could not be decoded
    #[error("Invalid value for attribute {attribute}: {message}")]
    InvalidAttributeValue {
        /// Attribute that carried the value
        attribute: String,
        /// Decoding failure description
        message: String,
    },

    /// Serialized entry data could not be decoded
    #[error("Failed to parse entry data: {0}")]
    ParseError(String),

    /// External service error
    #[error("External service error: {service}: {message}")]
    ExternalServiceError {
        /// Service name that failed
        service: String,
        /// Error message
        message: String,
    },
}

/// Specialized result type for directory entry helpers.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDn(_) => "INVALID_DN",
            Self::MissingAttribute(_) => "MISSING_ATTRIBUTE",
            Self::InvalidAttributeValue { .. } => "INVALID_ATTRIBUTE_VALUE",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
        }
    }

    /// Creates an [`Error::InvalidAttributeValue`] for `attribute`.
    #[must_use]
    pub fn invalid_value(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAttributeValue {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::ExternalServiceError { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}
