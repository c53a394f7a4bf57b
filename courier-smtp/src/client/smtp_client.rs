//! SMTP client implementation with support for TLS and STARTTLS.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use courier_common::{incoming, outgoing, tracing};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};

use super::{
    error::{ClientError, Result},
    response::Response,
};

/// Initial size of the read buffer for SMTP responses.
const BUFFER_SIZE: usize = 8192;

/// Maximum size of the read buffer to prevent unbounded growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// An SMTP client connection that can be either plain TCP or TLS-wrapped.
enum ClientConnection {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl ClientConnection {
    /// Sends data over the connection.
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(stream) => stream.write_all(data).await?,
            Self::Tls(stream) => stream.write_all(data).await?,
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        match self {
            Self::Plain(stream) => stream.flush().await?,
            Self::Tls(stream) => stream.flush().await?,
        }
        Ok(())
    }

    /// Reads data from the connection into the provided buffer.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self {
            Self::Plain(stream) => stream.read(buf).await?,
            Self::Tls(stream) => stream.read(buf).await?,
        };
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(n)
    }

    /// Upgrades a plain connection to TLS.
    async fn upgrade_to_tls(self, domain: &str, accept_invalid_certs: bool) -> Result<Self> {
        match self {
            Self::Plain(stream) => Ok(Self::Tls(Box::new(
                tls_handshake(stream, domain, accept_invalid_certs).await?,
            ))),
            Self::Tls(_) => Err(ClientError::TlsError(
                "Connection is already TLS".to_string(),
            )),
        }
    }
}

async fn tls_handshake(
    stream: TcpStream,
    domain: &str,
    accept_invalid_certs: bool,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let mut root_store = RootCertStore::empty();

    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        root_store
            .add(cert)
            .map_err(|e| ClientError::TlsError(format!("Failed to add certificate: {e}")))?;
    }
    if !certs.errors.is_empty() {
        tracing::warn!(?certs.errors, "Some certificates could not be loaded");
    }

    let mut config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    if accept_invalid_certs {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerifier));
    }

    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(domain.to_string())
        .map_err(|e| ClientError::TlsError(format!("Invalid domain: {e}")))?;

    connector
        .connect(server_name, stream)
        .await
        .map_err(|e| ClientError::TlsError(e.to_string()))
}

/// A certificate verifier that accepts all certificates (for testing only).
#[derive(Debug)]
struct NoVerifier;

impl tokio_rustls::rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[tokio_rustls::rustls::pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: tokio_rustls::rustls::pki_types::UnixTime,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::ServerCertVerified,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
        vec![
            tokio_rustls::rustls::SignatureScheme::RSA_PKCS1_SHA256,
            tokio_rustls::rustls::SignatureScheme::RSA_PSS_SHA256,
            tokio_rustls::rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            tokio_rustls::rustls::SignatureScheme::ED25519,
        ]
    }
}

/// Escape lines beginning with '.' and terminate with `<CRLF>.<CRLF>`
fn dot_stuff(data: &str) -> String {
    let mut stuffed = String::with_capacity(data.len() + 8);

    for line in data.split_inclusive('\n') {
        if line.starts_with('.') {
            stuffed.push('.');
        }
        stuffed.push_str(line);
    }

    if !stuffed.ends_with("\r\n") {
        if stuffed.ends_with('\n') {
            stuffed.insert(stuffed.len() - 1, '\r');
        } else {
            stuffed.push_str("\r\n");
        }
    }

    stuffed.push_str(".\r\n");
    stuffed
}

/// An SMTP client for sending commands and receiving responses.
pub struct SmtpClient {
    connection: Option<ClientConnection>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    server_domain: String,
    accept_invalid_certs: bool,
}

impl SmtpClient {
    fn with_connection(connection: ClientConnection, server_domain: String) -> Self {
        Self {
            connection: Some(connection),
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            server_domain,
            accept_invalid_certs: false,
        }
    }

    /// Creates a new SMTP client by connecting to the specified address.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(addr: &str, server_domain: String) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;

        Ok(Self::with_connection(
            ClientConnection::Plain(stream),
            server_domain,
        ))
    }

    /// Connects to the specified address and performs the TLS handshake
    /// immediately (implicit TLS, usually port 465).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the handshake fails.
    pub async fn connect_tls(
        addr: &str,
        server_domain: String,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let tls = tls_handshake(stream, &server_domain, accept_invalid_certs).await?;

        Ok(Self::with_connection(
            ClientConnection::Tls(Box::new(tls)),
            server_domain,
        )
        .accept_invalid_certs(accept_invalid_certs))
    }

    /// Sets whether to accept invalid TLS certificates.
    ///
    /// Default is `false`. Only meant for testing against self-signed servers.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Returns `true` if the connection has been upgraded to TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.connection, Some(ClientConnection::Tls(_)))
    }

    /// Reads the initial server greeting (220 response).
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the greeting is invalid.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        self.read_response().await
    }

    async fn write_line(&mut self, line: &str, logged: &str) -> Result<()> {
        outgoing!("{logged}");

        let connection = self
            .connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?;
        connection.send(format!("{line}\r\n").as_bytes()).await?;
        connection.flush().await
    }

    /// Sends a raw command and reads the response.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.write_line(command, command).await?;
        self.read_response().await
    }

    /// Sends a command whose content must not appear in logs.
    async fn secret_command(&mut self, command: &str, logged: &str) -> Result<Response> {
        self.write_line(command, logged).await?;
        self.read_response().await
    }

    /// Sends EHLO with the specified domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("EHLO {domain}")).await
    }

    /// Sends HELO with the specified domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn helo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("HELO {domain}")).await
    }

    /// Authenticates with `AUTH PLAIN` (RFC 4616).
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<Response> {
        let token = STANDARD.encode(format!("\0{username}\0{password}"));
        self.secret_command(&format!("AUTH PLAIN {token}"), "AUTH PLAIN <redacted>")
            .await
    }

    /// Authenticates with `AUTH LOGIN`.
    ///
    /// Returns the first response that is not a 334 challenge, so the caller
    /// only needs to check for 235.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the exchange fails.
    pub async fn auth_login(&mut self, username: &str, password: &str) -> Result<Response> {
        let response = self.command("AUTH LOGIN").await?;
        if response.code != 334 {
            return Ok(response);
        }

        let response = self
            .secret_command(&STANDARD.encode(username), "<redacted username>")
            .await?;
        if response.code != 334 {
            return Ok(response);
        }

        self.secret_command(&STANDARD.encode(password), "<redacted password>")
            .await
    }

    /// Sends MAIL FROM command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    /// Sends RCPT TO command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// Sends DATA command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Sends the dot-stuffed message followed by a dot on its own line.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_data(&mut self, data: &str) -> Result<Response> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?;

        outgoing!("<{} bytes of message data>", data.len());
        connection.send(dot_stuff(data).as_bytes()).await?;
        connection.flush().await?;

        self.read_response().await
    }

    /// Sends QUIT command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        let response = self.command("QUIT").await;
        self.connection = None;
        response
    }

    /// Sends STARTTLS command and upgrades the connection to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS fails, if the server pipelined anything
    /// after its reply, or if the TLS upgrade fails.
    pub async fn starttls(&mut self) -> Result<Response> {
        let response = self.command("STARTTLS").await?;

        if response.is_success() {
            // Anything already buffered was sent in the clear and must not
            // be read as a reply once the session is encrypted
            if self.buffer_pos != 0 {
                self.buffer_pos = 0;
                self.connection = None;
                return Err(ClientError::TlsError(
                    "Server sent data after the STARTTLS reply".to_string(),
                ));
            }

            let domain = self.server_domain.clone();
            let accept_invalid = self.accept_invalid_certs;

            let Some(old_connection) = self.connection.take() else {
                return Err(ClientError::ConnectionClosed);
            };
            self.connection = Some(old_connection.upgrade_to_tls(&domain, accept_invalid).await?);
        }

        Ok(response)
    }

    /// Sends RSET command to reset the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rset(&mut self) -> Result<Response> {
        self.command("RSET").await
    }

    /// Reads a complete SMTP response from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the response is malformed.
    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) =
                Response::parse_response(&self.buffer[..self.buffer_pos])?
            {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;

                incoming!("{response}");
                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::ParseError(format!(
                        "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let connection = self
                .connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?;
            let n = connection.read(&mut self.buffer[self.buffer_pos..]).await?;
            self.buffer_pos += n;
        }
    }
}
