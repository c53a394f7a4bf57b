//! Driver name to transport resolution
//!
//! Each driver name maps to a factory that builds the transport from the
//! static [`MailConfig`]. Built transports are cached, so every lookup of the
//! same name returns the same shared instance until its factory is replaced.

use std::{collections::HashMap, sync::Arc};

use courier_common::{Transport, internal};
use parking_lot::RwLock;

use crate::{
    config::MailConfig,
    error::ConfigError,
    transport::{
        LogTransport, MailgunTransport, MandrillTransport, SendmailTransport, SmtpTransport,
    },
};

/// Builds a transport from the configuration
pub type TransportFactory =
    Arc<dyn Fn(&MailConfig) -> Result<Arc<dyn Transport>, ConfigError> + Send + Sync>;

pub struct TransportRegistry {
    config: Arc<MailConfig>,
    factories: RwLock<HashMap<String, TransportFactory>>,
    instances: RwLock<HashMap<String, Arc<dyn Transport>>>,
}

fn smtp(config: &MailConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    let smtp = config.smtp()?;
    if smtp.host.trim().is_empty() {
        return Err(ConfigError::MissingField("smtp.host"));
    }
    if let Some((_, None)) = smtp.credentials() {
        return Err(ConfigError::MissingField("smtp.password"));
    }

    Ok(Arc::new(SmtpTransport::new(smtp.clone())))
}

fn sendmail(config: &MailConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(SendmailTransport::new(&config.sendmail())?))
}

fn mail(_: &MailConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(SendmailTransport::mail()))
}

fn mailgun(config: &MailConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(MailgunTransport::new(config.mailgun()?.clone())?))
}

fn mandrill(config: &MailConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(MandrillTransport::new(config.mandrill()?.clone())?))
}

fn log(config: &MailConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(LogTransport::new(config.log()?.path.clone())))
}

impl TransportRegistry {
    /// A registry with the built-in drivers registered
    pub fn new(config: impl Into<Arc<MailConfig>>) -> Self {
        let builtin: [(&str, TransportFactory); 6] = [
            ("smtp", Arc::new(smtp)),
            ("sendmail", Arc::new(sendmail)),
            ("mail", Arc::new(mail)),
            ("mailgun", Arc::new(mailgun)),
            ("mandrill", Arc::new(mandrill)),
            ("log", Arc::new(log)),
        ];

        Self {
            config: config.into(),
            factories: RwLock::new(
                builtin
                    .into_iter()
                    .map(|(name, factory)| (name.to_string(), factory))
                    .collect(),
            ),
            instances: RwLock::default(),
        }
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// The driver named in the configuration
    pub fn default_driver(&self) -> &str {
        &self.config.driver
    }

    /// Add or replace the factory for `name`, discarding any transport
    /// already built under that name
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&MailConfig) -> Result<Arc<dyn Transport>, ConfigError> + Send + Sync + 'static,
    {
        let name = name.into();
        internal!(level = DEBUG, "Registering mail driver {name}");

        let mut factories = self.factories.write();
        self.instances.write().remove(&name);
        factories.insert(name, Arc::new(factory));
    }

    ///
    /// The transport for `name`, built on first use
    ///
    /// # Errors
    /// If no factory is registered under `name`, or the factory fails
    ///
    pub fn get(&self, name: &str) -> Result<Arc<dyn Transport>, ConfigError> {
        if let Some(transport) = self.instances.read().get(name) {
            return Ok(Arc::clone(transport));
        }

        // Locked in the same order as `register` and held until the instance
        // is cached, so a replaced factory can never leave its transport behind
        let factories = self.factories.read();
        let mut instances = self.instances.write();
        if let Some(transport) = instances.get(name) {
            return Ok(Arc::clone(transport));
        }

        let factory = factories
            .get(name)
            .ok_or_else(|| ConfigError::UnsupportedDriver(name.to_string()))?;

        let transport = factory(&self.config)?;
        internal!(
            level = INFO,
            "Built {} transport for driver {name}",
            transport.name()
        );
        instances.insert(name.to_string(), Arc::clone(&transport));

        Ok(transport)
    }

    ///
    /// The transport for the configured driver
    ///
    /// # Errors
    /// See [`TransportRegistry::get`]
    ///
    pub fn default_transport(&self) -> Result<Arc<dyn Transport>, ConfigError> {
        self.get(self.default_driver())
    }
}
