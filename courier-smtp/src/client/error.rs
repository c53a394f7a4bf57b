//! Error types for the SMTP client.

use std::io;

use courier_common::TransportError;
use thiserror::Error;

/// Errors that can occur when using the SMTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse an SMTP response from the server.
    #[error("Failed to parse SMTP response: {0}")]
    ParseError(String),

    /// TLS/SSL error occurred.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for TransportError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::Io(err) => Self::Io(err),
            ClientError::TlsError(err) => Self::Tls(err),
            err @ (ClientError::ParseError(_)
            | ClientError::ConnectionClosed
            | ClientError::Utf8Error(_)) => Self::Protocol(err.to_string()),
        }
    }
}
