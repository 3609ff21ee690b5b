use std::result::Result as StdResult;

use thiserror::Error;

use crate::domain::BookingStatus;

/// Error type for structural failures in the booking engine.
///
/// No-op and gated lifecycle outcomes are not errors; they are reported through
/// [`crate::core::services::ActionOutcome`].
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("Cannot {action} booking {booking} while it is {from}")]
    InvalidTransition {
        booking: String,
        from: BookingStatus,
        action: String,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = StdResult<T, BookingError>;

impl From<std::io::Error> for BookingError {
    fn from(err: std::io::Error) -> Self {
        BookingError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        BookingError::Storage(err.to_string())
    }
}
