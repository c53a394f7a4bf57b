//! The entry point for sending mail
//!
//! A [`Mailer`] resolves the active driver through its [`TransportRegistry`],
//! renders content through its [`Renderer`] and hands the finished
//! [`Message`] to the transport.

use std::sync::Arc;

use courier_common::{Address, Message, Transport};
use parking_lot::{Mutex, RwLock};

use crate::{
    config::MailConfig,
    content::ContentSpec,
    error::{ContentError, MailError},
    registry::TransportRegistry,
    view::{Renderer, ViewData},
};

pub struct Mailer {
    registry: Arc<TransportRegistry>,
    renderer: Arc<dyn Renderer>,
    driver: RwLock<String>,
    from: RwLock<Option<Address>>,
    to: RwLock<Option<Address>>,
    failures: Mutex<Vec<Address>>,
}

impl Mailer {
    /// A mailer using the registry's configured driver, with no overrides
    pub fn new(registry: impl Into<Arc<TransportRegistry>>, renderer: Arc<dyn Renderer>) -> Self {
        let registry = registry.into();
        let driver = registry.default_driver().to_string();

        Self {
            registry,
            renderer,
            driver: RwLock::new(driver),
            from: RwLock::new(None),
            to: RwLock::new(None),
            failures: Mutex::default(),
        }
    }

    /// A mailer with the built-in drivers and the `from`/`to` overrides
    /// taken from `config`
    pub fn from_config(config: MailConfig, renderer: Arc<dyn Renderer>) -> Self {
        let from = config.from.clone();
        let to = config.to.clone();

        let mailer = Self::new(TransportRegistry::new(config), renderer);
        *mailer.from.write() = from;
        *mailer.to.write() = to;
        mailer
    }

    ///
    /// Render `content` with `data`, let `customize` address the message,
    /// and send it through the active transport.
    ///
    /// The transport is stopped first, so every send starts a fresh session.
    /// Returns the recipients the transport reported as rejected; these are
    /// also recorded and readable through [`Mailer::failures`].
    ///
    /// # Errors
    /// Configuration and content errors are raised before anything is sent.
    /// Transport errors are returned as is.
    ///
    pub async fn send<C, F>(
        &self,
        content: C,
        data: ViewData,
        customize: F,
    ) -> Result<Vec<Address>, MailError>
    where
        C: Into<ContentSpec> + Send,
        F: FnOnce(&mut Message) + Send,
    {
        let transport = self.transport()?;
        transport.stop().await?;

        let resolved = content
            .into()
            .resolve(self.renderer.as_ref(), &data)?;

        let from = self.from.read().clone();
        let to = self.to.read().clone();

        let mut message = Message::new();
        if let Some(from) = from {
            message.from_address(from);
        }

        resolved.apply(&mut message);
        customize(&mut message);

        if let Some(to) = to {
            message.to_address(to);
        }

        message.validate().map_err(ContentError::from)?;

        let failed = transport.send(&message).await?;

        tracing::info!(
            driver = transport.name(),
            subject = message.subject_line().unwrap_or_default(),
            recipients = message.recipients().len(),
            failures = failed.len(),
            "Mail sent"
        );
        if !failed.is_empty() {
            tracing::warn!(
                failed = %failed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                "Some recipients were rejected"
            );
        }

        self.failures.lock().extend(failed.iter().cloned());
        Ok(failed)
    }

    ///
    /// Send `text` as is, as a single `text/plain` part
    ///
    /// # Errors
    /// See [`Mailer::send`]
    ///
    pub async fn raw<F>(&self, text: impl Into<String>, customize: F) -> Result<Vec<Address>, MailError>
    where
        F: FnOnce(&mut Message) + Send,
    {
        self.send(ContentSpec::raw(text), ViewData::new(), customize)
            .await
    }

    ///
    /// Send a single plain text view
    ///
    /// # Errors
    /// See [`Mailer::send`]
    ///
    pub async fn plain<F>(
        &self,
        view: impl Into<String>,
        data: ViewData,
        customize: F,
    ) -> Result<Vec<Address>, MailError>
    where
        F: FnOnce(&mut Message) + Send,
    {
        self.send(ContentSpec::text(view), data, customize).await
    }

    /// Use `address` as the From of every message
    pub fn always_from(&self, address: Address) {
        *self.from.write() = Some(address);
    }

    /// Add `address` as a recipient of every message
    pub fn always_to(&self, address: Address) {
        *self.to.write() = Some(address);
    }

    /// Every recipient rejected since the mailer was built or last cleared
    pub fn failures(&self) -> Vec<Address> {
        self.failures.lock().clone()
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    ///
    /// The transport for the active driver
    ///
    /// # Errors
    /// If the driver is unknown or its transport cannot be built
    ///
    pub fn transport(&self) -> Result<Arc<dyn Transport>, MailError> {
        let driver = self.driver.read().clone();
        Ok(self.registry.get(&driver)?)
    }

    /// Switch the active driver. The name is checked on the next send.
    pub fn set_driver(&self, driver: impl Into<String>) {
        *self.driver.write() = driver.into();
    }

    pub fn driver(&self) -> String {
        self.driver.read().clone()
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }
}
