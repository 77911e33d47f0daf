//! Policy error types
//!
//! Only two failure families exist for the policy: the operator supplied an
//! incomplete or malformed configuration, or the caller submitted nothing to
//! decide on. An unrecognised intent is not an error; it falls through to a
//! generic acknowledgement.

use thiserror::Error;

/// Result type alias for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that can occur while building or running the disclosure policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A required order field is absent. Fatal to the session.
    #[error("Configuration error: required order field '{field}' is missing")]
    Configuration { field: &'static str },

    /// A keyword set could not be compiled into a matcher
    #[error("Configuration error: invalid keyword set '{set}': {message}")]
    InvalidKeywords { set: &'static str, message: String },

    /// The submitted message contains no text
    #[error("Message is empty")]
    EmptyMessage,
}

impl PolicyError {
    /// Create a missing-field configuration error
    pub fn missing(field: &'static str) -> Self {
        Self::Configuration { field }
    }

    /// Create an invalid keyword set error
    pub fn invalid_keywords(set: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidKeywords {
            set,
            message: message.into(),
        }
    }

    /// Whether this error means the session cannot start at all.
    ///
    /// Configuration errors are surfaced to the operator and never rendered
    /// into the end user's transcript.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::InvalidKeywords { .. }
        )
    }
}
