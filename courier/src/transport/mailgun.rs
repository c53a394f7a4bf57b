//! Mailgun, through the raw MIME endpoint
//!
//! The full message is posted to `{endpoint}/{domain}/messages.mime` as a
//! multipart form with one `to` field per recipient. Mailgun accepts or
//! refuses the message as a whole, so a successful send reports no failed
//! recipients.

use std::fmt;

use async_trait::async_trait;
use courier_common::{Address, Message, Transport, TransportError};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::http;
use crate::error::ConfigError;

fn default_endpoint() -> String {
    "https://api.mailgun.net/v3".to_string()
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailgunConfig {
    pub secret: String,
    pub domain: String,

    /// API base, e.g. `https://api.eu.mailgun.net/v3` for the EU region
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "http::default_timeout")]
    pub timeout: u64,
}

impl MailgunConfig {
    pub fn new(secret: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            domain: domain.into(),
            endpoint: default_endpoint(),
            timeout: http::default_timeout(),
        }
    }
}

impl fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("secret", &"<redacted>")
            .field("domain", &self.domain)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct MailgunResponse {
    id: String,
}

pub struct MailgunTransport {
    config: MailgunConfig,
    client: reqwest::Client,
}

impl MailgunTransport {
    ///
    /// # Errors
    /// If the secret or domain is empty, or the HTTP client cannot be built
    ///
    pub fn new(config: MailgunConfig) -> Result<Self, ConfigError> {
        if config.secret.is_empty() {
            return Err(ConfigError::MissingField("mailgun.secret"));
        }

        if config.domain.is_empty() {
            return Err(ConfigError::MissingField("mailgun.domain"));
        }

        Ok(Self {
            client: http::client(config.timeout)?,
            config,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}/messages.mime",
            self.config.endpoint.trim_end_matches('/'),
            self.config.domain
        )
    }
}

#[async_trait]
impl Transport for MailgunTransport {
    async fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_started(&self) -> bool {
        true
    }

    async fn send(&self, message: &Message) -> Result<Vec<Address>, TransportError> {
        let wire = message.to_entity()?.to_wire();
        let recipients = message.recipients();

        let mut form = Form::new();
        for recipient in &recipients {
            form = form.text("to", recipient.email().to_string());
        }

        let part = Part::bytes(wire.into_bytes())
            .file_name("message.mime")
            .mime_str("message/rfc822")
            .map_err(|err| TransportError::Http(err.to_string()))?;
        form = form.part("message", part);

        let response = self
            .client
            .post(self.url())
            .basic_auth("api", Some(&self.config.secret))
            .multipart(form)
            .send()
            .await
            .map_err(|err| http::request_error(&self.config.endpoint, self.config.timeout, &err))?;

        let response = http::check_status("Mailgun", response).await?;
        let body: MailgunResponse = response
            .json()
            .await
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))?;

        tracing::info!(
            id = %body.id,
            domain = %self.config.domain,
            recipients = recipients.len(),
            "Message queued with Mailgun"
        );
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "mailgun"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let mut config = MailgunConfig::new("key", "mg.example.com");
        config.endpoint = "http://localhost:1234/v3/".to_string();

        let transport = MailgunTransport::new(config).unwrap();
        assert_eq!(
            transport.url(),
            "http://localhost:1234/v3/mg.example.com/messages.mime"
        );
    }

    #[test]
    fn test_requires_secret_and_domain() {
        assert!(matches!(
            MailgunTransport::new(MailgunConfig::new("", "mg.example.com")),
            Err(ConfigError::MissingField("mailgun.secret"))
        ));
        assert!(matches!(
            MailgunTransport::new(MailgunConfig::new("key", "")),
            Err(ConfigError::MissingField("mailgun.domain"))
        ));
    }

    #[test]
    fn test_secret_is_redacted() {
        let debug = format!("{:?}", MailgunConfig::new("key-very-secret", "d"));
        assert!(!debug.contains("key-very-secret"));
    }
}
