use async_trait::async_trait;

use crate::{address::Address, error::TransportError, message::Message};

/// A mail delivery backend.
///
/// Implementations are shared behind an `Arc` and manage their own session
/// state, so every method takes `&self`.
#[async_trait]
pub trait Transport: Send + Sync {
    ///
    /// Bring the transport up. Calling this on a started transport does nothing.
    ///
    /// # Errors
    /// If the backend cannot be reached or refuses the session
    ///
    async fn start(&self) -> Result<(), TransportError>;

    ///
    /// Tear the transport down. Safe to call when not started.
    ///
    /// # Errors
    /// Implementations may surface teardown failures, though most swallow them
    ///
    async fn stop(&self) -> Result<(), TransportError>;

    fn is_started(&self) -> bool;

    ///
    /// Deliver `message`, starting the transport first if needed.
    ///
    /// Returns the recipients the backend rejected; an empty list means every
    /// recipient was accepted.
    ///
    /// # Errors
    /// If the message could not be handed to the backend at all
    ///
    async fn send(&self, message: &Message) -> Result<Vec<Address>, TransportError>;

    fn name(&self) -> &'static str;
}
