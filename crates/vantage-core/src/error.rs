//! Error types for Vantage Core
//!
//! Media failures (autoplay rejection, decode or network errors) are not
//! represented here. They are recorded in [`ControllerState::error`] and
//! rendered by the caller; only misuse of the API surfaces as an [`Error`].
//!
//! [`ControllerState::error`]: crate::types::ControllerState::error

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Threshold `{name}` out of range: {value} (expected 0..=1)")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("Distance `{name}` must be finite and non-negative, got {value}")]
    InvalidDistance { name: &'static str, value: f64 },

    // Input errors
    #[error("Unknown effective connection type: {0}")]
    UnknownConnectionType(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid media URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Driver errors
    #[error("Media slot {0} has shut down")]
    SlotClosed(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Returns true if the error was caused by caller-supplied input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::ThresholdOutOfRange { .. }
                | Error::InvalidDistance { .. }
                | Error::UnknownConnectionType(_)
                | Error::Json(_)
                | Error::InvalidUrl(_)
        )
    }

    /// Returns the error code for logs and CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ThresholdOutOfRange { .. } => "THRESHOLD_RANGE",
            Error::InvalidDistance { .. } => "INVALID_DISTANCE",
            Error::UnknownConnectionType(_) => "UNKNOWN_CONNECTION",
            Error::Json(_) => "JSON",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::SlotClosed(_) => "SLOT_CLOSED",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::config("bad").error_code(), "INVALID_CONFIG");
        assert_eq!(
            Error::SlotClosed("slot-1".into()).error_code(),
            "SLOT_CLOSED"
        );
    }

    #[test]
    fn test_input_errors() {
        assert!(Error::ThresholdOutOfRange { name: "play_threshold", value: 1.5 }.is_input_error());
        assert!(!Error::SlotClosed("slot-1".into()).is_input_error());
        assert!(!Error::Internal("boom".into()).is_input_error());
    }
}
