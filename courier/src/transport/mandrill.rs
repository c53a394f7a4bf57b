//! Mandrill, through `messages/send-raw.json`
//!
//! Mandrill answers with one status per recipient; recipients reported as
//! `rejected` or `invalid` are returned as failed.

use std::fmt;

use async_trait::async_trait;
use courier_common::{Address, Message, Transport, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::http;
use crate::error::ConfigError;

fn default_endpoint() -> String {
    "https://mandrillapp.com/api/1.0".to_string()
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandrillConfig {
    pub secret: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "http::default_timeout")]
    pub timeout: u64,
}

impl MandrillConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            endpoint: default_endpoint(),
            timeout: http::default_timeout(),
        }
    }
}

impl fmt::Debug for MandrillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MandrillConfig")
            .field("secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// One entry of the send-raw response
#[derive(Debug, Deserialize)]
struct RecipientStatus {
    email: String,
    status: String,
    #[serde(default)]
    reject_reason: Option<String>,
}

impl RecipientStatus {
    fn is_failure(&self) -> bool {
        matches!(self.status.as_str(), "rejected" | "invalid")
    }
}

pub struct MandrillTransport {
    config: MandrillConfig,
    client: reqwest::Client,
}

impl MandrillTransport {
    ///
    /// # Errors
    /// If the secret is empty, or the HTTP client cannot be built
    ///
    pub fn new(config: MandrillConfig) -> Result<Self, ConfigError> {
        if config.secret.is_empty() {
            return Err(ConfigError::MissingField("mandrill.secret"));
        }

        Ok(Self {
            client: http::client(config.timeout)?,
            config,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/messages/send-raw.json",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

/// Map failed statuses back onto the recipients they name
fn failed_recipients(recipients: &[Address], statuses: &[RecipientStatus]) -> Vec<Address> {
    statuses
        .iter()
        .filter(|status| status.is_failure())
        .map(|status| {
            tracing::warn!(
                recipient = %status.email,
                status = %status.status,
                reason = status.reject_reason.as_deref().unwrap_or("unknown"),
                "Mandrill rejected recipient"
            );

            recipients
                .iter()
                .find(|addr| addr.email().eq_ignore_ascii_case(&status.email))
                .cloned()
                .unwrap_or_else(|| Address::new(status.email.clone(), None))
        })
        .collect()
}

#[async_trait]
impl Transport for MandrillTransport {
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

        let payload = json!({
            "key": self.config.secret,
            "raw_message": wire,
            "to": recipients.iter().map(Address::email).collect::<Vec<_>>(),
            "async": false,
        });

        let response = self
            .client
            .post(self.url())
            .json(&payload)
            .send()
            .await
            .map_err(|err| http::request_error(&self.config.endpoint, self.config.timeout, &err))?;

        let response = http::check_status("Mandrill", response).await?;
        let statuses: Vec<RecipientStatus> = response
            .json()
            .await
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))?;

        let failed = failed_recipients(&recipients, &statuses);
        tracing::info!(
            recipients = recipients.len(),
            failures = failed.len(),
            "Message sent via Mandrill"
        );
        Ok(failed)
    }

    fn name(&self) -> &'static str {
        "mandrill"
    }
}
