//! Error types shared by every network operation.

use thiserror::Error;

use crate::transport::AsyncTicket;

/// Errors surfaced to callers of the client.
///
/// A deferred ("still working") response is not an error and never shows up
/// here; see [`crate::transport::Outcome`].
#[derive(Debug, Error)]
pub enum SodaError {
    /// The service rejected the request (validation, auth, conflict, missing view).
    #[error("Service error {status}: {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Could not reach the service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service kept reporting the operation as pending until the attempt budget ran out.
    #[error("Operation still pending after {attempts} polls of {}", ticket.poll_location)]
    PollingExhausted { ticket: AsyncTicket, attempts: u32 },

    /// The wait between polls was interrupted.
    #[error("Interrupted while waiting for a long-running operation")]
    Interrupted,

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller supplied an unusable argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl SodaError {
    /// Creates a service error from a status and message, with a generic code.
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            code: format!("http.{}", status),
            message: message.into(),
        }
    }

    /// True for network faults (timeout, connection or other transport failure).
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionFailed(_) | Self::Transport(_)
        )
    }

    /// HTTP status for service errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SodaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SodaError::Timeout
        } else if e.is_connect() {
            SodaError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            SodaError::Decode(e.to_string())
        } else {
            SodaError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SodaError {
    fn from(e: serde_json::Error) -> Self {
        SodaError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transport_fault_classification() {
        assert!(SodaError::Timeout.is_transport_fault());
        assert!(SodaError::ConnectionFailed("refused".into()).is_transport_fault());
        assert!(!SodaError::service(400, "bad").is_transport_fault());
        assert!(!SodaError::Interrupted.is_transport_fault());
    }

    #[test]
    fn test_polling_exhausted_message_names_location() {
        let err = SodaError::PollingExhausted {
            ticket: AsyncTicket::new("https://data.example.org/api/imports2?ticket=t1", Duration::ZERO),
            attempts: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 polls"));
        assert!(msg.contains("ticket=t1"));
    }

    #[test]
    fn test_service_error_status() {
        let err = SodaError::service(409, "already published");
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("http.409"));
        assert_eq!(SodaError::Timeout.status(), None);
    }
}
