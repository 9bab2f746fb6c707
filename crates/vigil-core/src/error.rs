use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The remote endpoint could not be reached.
    Network,
    /// The remote endpoint answered with a non-success status.
    Server,
    /// The request did not finish before the deadline.
    Timeout,
    /// The response could not be decoded into the expected shape.
    Validation,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Server => "server",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a call to the visit API, as surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    /// HTTP status, when the server answered at all.
    pub status: Option<u16>,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: true,
            status: None,
        }
    }

    /// Error for a non-success HTTP status. 404 is the only non-retryable one.
    pub fn from_status(status: u16) -> Self {
        let message = match status {
            404 => "resource not found".to_string(),
            _ => format!("HTTP {status}"),
        };
        Self {
            kind: ErrorKind::Server,
            message,
            retryable: status != 404,
            status: Some(status),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, "request timeout")
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Operator-facing explanation of the failure.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Timeout => "The connection timed out. Check your internet connection.",
            ErrorKind::Network => "Could not reach the server. Check your connection.",
            ErrorKind::Server if self.is_not_found() => "The requested data was not found.",
            ErrorKind::Server => "The server is temporarily unavailable.",
            ErrorKind::Validation => "The server sent data in an unexpected format.",
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_not_retryable() {
        let err = ApiError::from_status(404);
        assert_eq!(err.kind, ErrorKind::Server);
        assert!(!err.retryable);
        assert!(err.is_not_found());
    }

    #[test]
    fn other_statuses_are_retryable_server_errors() {
        for status in [400, 409, 500, 502, 503] {
            let err = ApiError::from_status(status);
            assert_eq!(err.kind, ErrorKind::Server);
            assert!(err.retryable, "status {status} should be retryable");
            assert_eq!(err.status, Some(status));
        }
    }

    #[test]
    fn transport_kinds_are_retryable() {
        assert!(ApiError::network("refused").retryable);
        assert!(ApiError::timeout().retryable);
        assert_eq!(ApiError::timeout().kind, ErrorKind::Timeout);
        assert!(ApiError::unknown("?").retryable);
    }

    #[test]
    fn display_includes_kind() {
        let err = ApiError::from_status(503);
        assert_eq!(err.to_string(), "server error: HTTP 503");
        assert_eq!(ApiError::timeout().to_string(), "timeout error: request timeout");
    }

    #[test]
    fn user_messages_differ_for_not_found() {
        assert_ne!(
            ApiError::from_status(404).user_message(),
            ApiError::from_status(500).user_message()
        );
    }
}
