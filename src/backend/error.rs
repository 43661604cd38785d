//! Transport error types

use thiserror::Error;

/// Channel-level failure talking to the conversation backend
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Status, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Io, message)
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            Self::connect(format!("Connection failed: {err}"))
        } else if err.is_decode() || err.is_body() {
            Self::io(format!("Failed to read response: {err}"))
        } else {
            Self::io(format!("Request failed: {err}"))
        }
    }

    /// Recover a transport error carried through an `std::io::Error`
    pub fn from_io(err: std::io::Error) -> Self {
        let message = err.to_string();
        match err.into_inner().map(|inner| inner.downcast::<TransportError>()) {
            Some(Ok(transport)) => *transport,
            _ => Self::io(message),
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not reach the backend
    Connect,
    /// The backend did not answer in time
    Timeout,
    /// The backend answered with a non-success status
    Status,
    /// The backend's response could not be understood
    Protocol,
    /// Reading the channel failed midway
    Io,
}
