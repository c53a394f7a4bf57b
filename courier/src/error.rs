//! Error types for the courier crate.
//!
//! Configuration and content errors are raised before a transport is asked
//! to send anything; transport errors come from `courier_common`.

use std::{io, path::PathBuf};

use courier_common::{MessageError, TransportError};
use thiserror::Error;

/// Errors raised while loading configuration or resolving a driver.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No factory is registered under this driver name.
    #[error("Unsupported mail driver [{0}]")]
    UnsupportedDriver(String),

    /// The driver's configuration section is absent.
    #[error("Missing configuration section '{0}'")]
    MissingSection(&'static str),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to read config from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The HTTP client for an API transport could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while turning a `ContentSpec` into message parts.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The value given does not describe a view, a pair or a set of parts.
    #[error("Invalid content: {0}")]
    InvalidShape(String),

    #[error("Content has no html, text or raw part")]
    Empty,

    #[error("View [{0}] not found")]
    ViewNotFound(String),

    #[error("Failed to render view [{view}]: {reason}")]
    Render { view: String, reason: String },

    #[error(transparent)]
    Message(#[from] MessageError),
}

/// Any error surfaced by [`Mailer`](crate::Mailer).
#[derive(Debug, Error)]
pub enum MailError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl MailError {
    /// Returns `true` if the failure happened before anything was sent.
    #[must_use]
    pub const fn is_pre_send(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Content(_))
    }
}
