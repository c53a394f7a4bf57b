//! Error types shared by every courier crate.
//!
//! Message composition errors are raised before anything touches a backend,
//! transport errors once delivery has been attempted.

use std::io;

use thiserror::Error;

use crate::address::AddressError;

/// Errors that can occur while building a message's wire entity.
#[derive(Debug, Error)]
pub enum MessageError {
    /// An address field holds a malformed address.
    #[error("Invalid {field} address '{address}': {source}")]
    InvalidAddress {
        field: &'static str,
        address: String,
        #[source]
        source: AddressError,
    },

    /// A custom header name or value would break the header block.
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    #[error("Message has no From address")]
    MissingFrom,

    #[error("Message has no recipients")]
    NoRecipients,

    /// Priority must be within 1 (highest) to 5 (lowest).
    #[error("Invalid priority {0}, expected 1-5")]
    InvalidPriority(u8),

    /// Reading an attachment from disk failed.
    #[error("Unable to read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors that can occur while delivering through a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection to the backend.
    #[error("Failed to connect to {server}: {reason}")]
    Connect { server: String, reason: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("TLS error: {0}")]
    Tls(String),

    /// The backend replied with something we did not expect.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The backend refused the message as a whole.
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Message has no envelope sender")]
    MissingSender,

    /// A local delivery process failed to start or exited unsuccessfully.
    #[error("Process '{command}' failed: {reason}")]
    Process { command: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    /// An HTTP API returned a body we could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Message(#[from] MessageError),
}

impl TransportError {
    /// Returns `true` if the backend could not be reached at all.
    #[must_use]
    pub const fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Tls(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_classification() {
        let err = TransportError::Connect {
            server: "localhost:25".to_string(),
            reason: "refused".to_string(),
        };
        assert!(err.is_connect());
        assert!(TransportError::Timeout(30).is_connect());
        assert!(!TransportError::Rejected("550 no".to_string()).is_connect());
        assert!(!TransportError::MissingSender.is_connect());
    }

    #[test]
    fn test_message_error_display() {
        let err = MessageError::InvalidAddress {
            field: "to",
            address: "nope".to_string(),
            source: AddressError::MissingAtSign,
        };
        assert_eq!(
            err.to_string(),
            "Invalid to address 'nope': Missing '@' separator in mailbox"
        );
    }
}
