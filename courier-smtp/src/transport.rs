//! SMTP delivery through a relay
//!
//! The transport keeps one session open between sends. A session runs:
//! - greeting, EHLO (HELO fallback), optional STARTTLS and AUTH on start
//! - MAIL FROM, one RCPT TO per recipient, DATA for each message
//! - QUIT on stop
//!
//! Any failure part way through a transaction drops the session so that the
//! next send reconnects from scratch.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use courier_common::{Address, AddressList, Message, Transport, TransportError, tracing};
use tokio::sync::Mutex;

use crate::{
    client::{self, Response, SmtpClient},
    config::{Encryption, SmtpConfig},
};

async fn timed<T>(
    secs: u64,
    future: impl Future<Output = client::Result<T>> + Send,
) -> Result<T, TransportError> {
    tokio::time::timeout(Duration::from_secs(secs), future)
        .await
        .map_err(|_| TransportError::Timeout(secs))?
        .map_err(TransportError::from)
}

pub struct SmtpTransport {
    config: SmtpConfig,
    session: Mutex<Option<SmtpClient>>,
    started: AtomicBool,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    fn connect_error(&self, reason: impl ToString) -> TransportError {
        TransportError::Connect {
            server: self.config.address(),
            reason: reason.to_string(),
        }
    }

    /// Open a new session: connect, greet, EHLO, STARTTLS and AUTH as configured
    async fn connect(&self) -> Result<SmtpClient, TransportError> {
        let address = self.config.address();
        let secs = self.config.timeout;

        if self.config.accept_invalid_certs && self.config.encryption != Encryption::None {
            tracing::warn!(
                server = %address,
                "TLS certificate validation is disabled for this connection"
            );
        }

        let connected = match self.config.encryption {
            Encryption::Ssl => {
                timed(
                    secs,
                    SmtpClient::connect_tls(
                        &address,
                        self.config.host.clone(),
                        self.config.accept_invalid_certs,
                    ),
                )
                .await
            }
            Encryption::None | Encryption::Tls => {
                timed(secs, SmtpClient::connect(&address, self.config.host.clone()))
                    .await
                    .map(|client| client.accept_invalid_certs(self.config.accept_invalid_certs))
            }
        };

        let mut client = connected.map_err(|err| match err {
            TransportError::Io(err) => self.connect_error(err),
            other => other,
        })?;

        let greeting = timed(secs, client.read_greeting()).await?;
        if greeting.code != 220 {
            return Err(self.connect_error(format!("Server rejected connection: {greeting}")));
        }

        let mut capabilities = self.hello(&mut client).await?;

        if self.config.encryption == Encryption::Tls {
            if !capabilities
                .as_ref()
                .is_some_and(|ehlo| ehlo.supports("STARTTLS"))
            {
                return Err(TransportError::Tls(
                    "Server does not advertise STARTTLS".to_string(),
                ));
            }

            let response = timed(secs, client.starttls()).await?;
            if !response.is_success() {
                return Err(TransportError::Tls(format!(
                    "Server rejected STARTTLS: {response}"
                )));
            }

            capabilities = self.hello(&mut client).await?;
            tracing::debug!(server = %address, "TLS negotiated via STARTTLS");
        }

        if let Some((username, password)) = self.config.credentials() {
            let password = password.ok_or_else(|| {
                TransportError::Authentication("A username was given without a password".to_string())
            })?;
            self.authenticate(&mut client, capabilities.as_ref(), username, password)
                .await?;
        }

        tracing::debug!(server = %address, tls = client.is_tls(), "SMTP session established");
        Ok(client)
    }

    /// EHLO, falling back to HELO. Returns the EHLO response for capability
    /// inspection, or `None` if the server only accepted HELO.
    async fn hello(&self, client: &mut SmtpClient) -> Result<Option<Response>, TransportError> {
        let secs = self.config.timeout;
        let domain = &self.config.local_domain;

        let response = timed(secs, client.ehlo(domain)).await?;
        if response.is_success() {
            return Ok(Some(response));
        }

        tracing::debug!(response = %response, "EHLO rejected, falling back to HELO");
        let response = timed(secs, client.helo(domain)).await?;
        if response.is_success() {
            Ok(None)
        } else {
            Err(TransportError::Protocol(format!(
                "Server rejected HELO: {response}"
            )))
        }
    }

    async fn authenticate(
        &self,
        client: &mut SmtpClient,
        capabilities: Option<&Response>,
        username: &str,
        password: &str,
    ) -> Result<(), TransportError> {
        let secs = self.config.timeout;
        let mechanisms = capabilities.map(Response::auth_mechanisms).unwrap_or_default();

        let response = if mechanisms.iter().any(|m| m == "PLAIN") {
            timed(secs, client.auth_plain(username, password)).await?
        } else if mechanisms.iter().any(|m| m == "LOGIN") {
            timed(secs, client.auth_login(username, password)).await?
        } else {
            return Err(TransportError::Authentication(
                "Server does not advertise AUTH PLAIN or AUTH LOGIN".to_string(),
            ));
        };

        if response.code == 235 {
            Ok(())
        } else {
            Err(TransportError::Authentication(response.to_string()))
        }
    }

    /// Run a single mail transaction on an established session
    async fn transaction(
        &self,
        client: &mut SmtpClient,
        sender: &str,
        recipients: &AddressList,
        data: &str,
    ) -> Result<Vec<Address>, TransportError> {
        let secs = self.config.timeout;

        let response = timed(secs, client.mail_from(sender)).await?;
        if !response.is_success() {
            return Err(TransportError::Rejected(format!(
                "MAIL FROM:<{sender}>: {response}"
            )));
        }

        let mut failed = Vec::new();
        for recipient in recipients.iter() {
            let response = timed(secs, client.rcpt_to(recipient.email())).await?;
            if !response.is_success() {
                tracing::warn!(
                    recipient = %recipient.email(),
                    response = %response,
                    "Recipient rejected"
                );
                failed.push(recipient.clone());
            }
        }

        if failed.len() == recipients.len() {
            let response = timed(secs, client.rset()).await?;
            if !response.is_success() {
                return Err(TransportError::Protocol(format!(
                    "Server rejected RSET: {response}"
                )));
            }
            return Ok(failed);
        }

        let response = timed(secs, client.data()).await?;
        if response.code != 354 {
            return Err(TransportError::Rejected(format!("DATA: {response}")));
        }

        let response = timed(secs, client.send_data(data)).await?;
        if response.code != 250 {
            return Err(TransportError::Rejected(format!(
                "Message content: {response}"
            )));
        }

        Ok(failed)
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.connect().await?);
            self.started.store(true, Ordering::Release);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let mut session = self.session.lock().await;
        if let Some(mut client) = session.take()
            && let Err(err) = timed(self.config.timeout, client.quit()).await
        {
            tracing::debug!(server = %self.config.address(), error = %err, "QUIT failed");
        }
        self.started.store(false, Ordering::Release);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    async fn send(&self, message: &Message) -> Result<Vec<Address>, TransportError> {
        let envelope = message.envelope();
        let sender = envelope
            .sender()
            .ok_or(TransportError::MissingSender)?
            .email()
            .to_string();
        let data = message.to_entity()?.to_wire();

        let mut session = self.session.lock().await;
        let mut client = match session.take() {
            Some(client) => client,
            None => self.connect().await?,
        };

        match self
            .transaction(&mut client, &sender, envelope.recipients(), &data)
            .await
        {
            Ok(failed) => {
                *session = Some(client);
                self.started.store(true, Ordering::Release);

                tracing::info!(
                    server = %self.config.address(),
                    recipients = %envelope.recipients(),
                    failures = failed.len(),
                    "Message sent via SMTP"
                );
                Ok(failed)
            }
            Err(err) => {
                self.started.store(false, Ordering::Release);
                tracing::warn!(
                    server = %self.config.address(),
                    error = %err,
                    "SMTP transaction failed, dropping session"
                );
                Err(err)
            }
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
