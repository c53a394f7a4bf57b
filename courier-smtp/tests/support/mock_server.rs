//! Mock SMTP server for exercising the SMTP transport
//!
//! This module provides a configurable mock SMTP server that can:
#![allow(dead_code)] // Test utility module - not all methods used in every test
//! - Reply to each command with a configurable response
//! - Reject individual recipients
//! - Accept AUTH PLAIN and AUTH LOGIN exchanges
//! - Track received commands and connections for verification
//!
//! # Example
//!
//! ```rust,no_run
//! use support::mock_server::MockSmtpServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockSmtpServer::builder()
//!     .with_greeting(220, "Test server ready")
//!     .with_rcpt_response_for("nobody@example.com", 550, "User unknown")
//!     .build()
//!     .await?;
//!
//! // Server is now running on server.addr()
//!
//! server.shutdown();
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt::Write,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

/// SMTP command received by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    Ehlo(String),
    Helo(String),
    /// AUTH command with the mechanism and any initial response
    Auth(String),
    /// A line sent during an AUTH LOGIN exchange
    AuthLine(String),
    MailFrom(String),
    RcptTo(String),
    Data,
    /// Message content (after DATA)
    MessageContent(Vec<u8>),
    Rset,
    Quit,
    StartTls,
    Other(String),
}

/// Response configuration for SMTP commands
#[derive(Debug, Clone)]
pub struct SmtpResponse {
    pub code: u16,
    pub message: String,
}

impl SmtpResponse {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Clone)]
struct MockServerConfig {
    greeting: SmtpResponse,
    ehlo_response: Option<EhloResponse>,
    helo_response: SmtpResponse,
    auth_response: SmtpResponse,
    mail_from_response: SmtpResponse,
    rcpt_to_response: SmtpResponse,
    rcpt_overrides: HashMap<String, SmtpResponse>,
    data_response: SmtpResponse,
    data_end_response: SmtpResponse,
    rset_response: SmtpResponse,
    quit_response: SmtpResponse,
    starttls_response: Vec<u8>,
}

#[derive(Clone)]
struct EhloResponse {
    code: u16,
    capabilities: Vec<String>,
}

impl EhloResponse {
    fn to_bytes(&self) -> Vec<u8> {
        let mut response = String::new();
        let cap_count = self.capabilities.len();

        for (i, cap) in self.capabilities.iter().enumerate() {
            if i < cap_count - 1 {
                let _ = write!(&mut response, "{}-{}\r\n", self.code, cap);
            } else {
                let _ = write!(&mut response, "{} {}\r\n", self.code, cap);
            }
        }

        response.into_bytes()
    }
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: SmtpResponse::new(220, "Mock SMTP Server"),
            ehlo_response: Some(EhloResponse {
                code: 250,
                capabilities: vec!["localhost".to_string(), "SIZE 10000".to_string()],
            }),
            helo_response: SmtpResponse::new(250, "Hello"),
            auth_response: SmtpResponse::new(235, "Authentication successful"),
            mail_from_response: SmtpResponse::new(250, "OK"),
            rcpt_to_response: SmtpResponse::new(250, "OK"),
            rcpt_overrides: HashMap::new(),
            data_response: SmtpResponse::new(354, "Start mail input; end with <CRLF>.<CRLF>"),
            data_end_response: SmtpResponse::new(250, "OK: Message accepted"),
            rset_response: SmtpResponse::new(250, "OK"),
            quit_response: SmtpResponse::new(221, "Bye"),
            starttls_response: SmtpResponse::new(502, "Command not implemented").to_bytes(),
        }
    }
}

/// Mock SMTP server for testing
pub struct MockSmtpServer {
    addr: SocketAddr,
    commands_received: Arc<RwLock<Vec<SmtpCommand>>>,
    shutdown: Arc<AtomicBool>,
    connection_count: Arc<AtomicUsize>,
}

/// Pull the address out of `FROM:<a@b>` / `TO:<a@b>`
fn path_argument(argument: &str) -> String {
    argument
        .split_once(':')
        .map_or(argument, |(_, path)| path)
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder::new()
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get all commands received by the server
    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.commands_received.read().await.clone()
    }

    /// Number of connections accepted so far
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    #[allow(clippy::too_many_lines)]
    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        commands: Arc<RwLock<Vec<SmtpCommand>>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(&config.greeting.to_bytes()).await?;
        writer.flush().await?;

        loop {
            line.clear();

            let Ok(bytes_read) = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await
            else {
                return Ok(());
            };

            if bytes_read? == 0 {
                return Ok(());
            }

            let cmd_line = line.trim();
            let parts: Vec<&str> = cmd_line.splitn(2, ' ').collect();
            let command = parts[0].to_uppercase();
            let argument = parts.get(1).copied().unwrap_or_default();

            let (response, smtp_cmd) = match command.as_str() {
                "EHLO" => {
                    let resp = config
                        .ehlo_response
                        .as_ref()
                        .map_or_else(|| config.helo_response.to_bytes(), EhloResponse::to_bytes);
                    (resp, SmtpCommand::Ehlo(argument.to_string()))
                }
                "HELO" => (
                    config.helo_response.to_bytes(),
                    SmtpCommand::Helo(argument.to_string()),
                ),
                "AUTH" if argument.eq_ignore_ascii_case("LOGIN") => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::Auth(argument.to_string()));

                    for prompt in ["VXNlcm5hbWU6", "UGFzc3dvcmQ6"] {
                        writer.write_all(format!("334 {prompt}\r\n").as_bytes()).await?;
                        writer.flush().await?;

                        let mut auth_line = String::new();
                        if reader.read_line(&mut auth_line).await? == 0 {
                            return Ok(());
                        }
                        commands
                            .write()
                            .await
                            .push(SmtpCommand::AuthLine(auth_line.trim().to_string()));
                    }

                    writer.write_all(&config.auth_response.to_bytes()).await?;
                    writer.flush().await?;
                    continue;
                }
                "AUTH" => (
                    config.auth_response.to_bytes(),
                    SmtpCommand::Auth(argument.to_string()),
                ),
                "MAIL" => (
                    config.mail_from_response.to_bytes(),
                    SmtpCommand::MailFrom(path_argument(argument)),
                ),
                "RCPT" => {
                    let to = path_argument(argument);
                    let resp = config
                        .rcpt_overrides
                        .get(&to.to_ascii_lowercase())
                        .unwrap_or(&config.rcpt_to_response)
                        .to_bytes();
                    (resp, SmtpCommand::RcptTo(to))
                }
                "DATA" => (config.data_response.to_bytes(), SmtpCommand::Data),
                "RSET" => (config.rset_response.to_bytes(), SmtpCommand::Rset),
                "QUIT" => {
                    commands.write().await.push(SmtpCommand::Quit);
                    writer.write_all(&config.quit_response.to_bytes()).await?;
                    writer.flush().await?;
                    return Ok(());
                }
                "STARTTLS" => (config.starttls_response.clone(), SmtpCommand::StartTls),
                _ => (
                    SmtpResponse::new(500, "Unknown command").to_bytes(),
                    SmtpCommand::Other(cmd_line.to_string()),
                ),
            };

            commands.write().await.push(smtp_cmd.clone());

            writer.write_all(&response).await?;
            writer.flush().await?;

            if matches!(smtp_cmd, SmtpCommand::Data) && config.data_response.code == 354 {
                let mut message_content = Vec::new();
                let mut data_line = String::new();

                loop {
                    data_line.clear();
                    if reader.read_line(&mut data_line).await? == 0 {
                        return Ok(());
                    }

                    if data_line == ".\r\n" || data_line == ".\n" {
                        commands
                            .write()
                            .await
                            .push(SmtpCommand::MessageContent(message_content.clone()));

                        writer
                            .write_all(&config.data_end_response.to_bytes())
                            .await?;
                        writer.flush().await?;
                        break;
                    }

                    message_content.extend_from_slice(data_line.as_bytes());
                }
            }
        }
    }
}

/// Builder for configuring a `MockSmtpServer`
pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = SmtpResponse::new(code, message);
        self
    }

    /// Set the EHLO response with capabilities
    #[must_use]
    pub fn with_ehlo_response(mut self, code: u16, capabilities: Vec<String>) -> Self {
        self.config.ehlo_response = Some(EhloResponse { code, capabilities });
        self
    }

    /// Answer EHLO with the HELO response, as an old server would
    #[must_use]
    pub fn without_ehlo(mut self) -> Self {
        self.config.ehlo_response = None;
        self
    }

    /// Raw bytes written, in a single write, in reply to STARTTLS
    #[must_use]
    pub fn with_starttls_response(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.config.starttls_response = raw.into();
        self
    }

    #[must_use]
    pub fn with_helo_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.helo_response = SmtpResponse::new(code, message);
        self
    }

    /// The final response to an AUTH exchange
    #[must_use]
    pub fn with_auth_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.auth_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from_response = SmtpResponse::new(code, message);
        self
    }

    /// The default RCPT TO response
    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.rcpt_to_response = SmtpResponse::new(code, message);
        self
    }

    /// The RCPT TO response for one specific recipient
    #[must_use]
    pub fn with_rcpt_response_for(
        mut self,
        recipient: &str,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .rcpt_overrides
            .insert(recipient.to_ascii_lowercase(), SmtpResponse::new(code, message));
        self
    }

    #[must_use]
    pub fn with_data_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the response after message content (after `<CRLF>.<CRLF>`)
    #[must_use]
    pub fn with_data_end_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_end_response = SmtpResponse::new(code, message);
        self
    }

    /// Build and start the mock SMTP server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> Result<MockSmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let commands = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let connection_count = Arc::new(AtomicUsize::new(0));

        let commands_clone = Arc::clone(&commands);
        let shutdown_clone = Arc::clone(&shutdown);
        let connection_count_clone = Arc::clone(&connection_count);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                // Accept with a timeout so the shutdown flag is polled
                let accept_result = timeout(Duration::from_millis(100), listener.accept()).await;

                if let Ok(Ok((stream, _peer))) = accept_result {
                    connection_count_clone.fetch_add(1, Ordering::Relaxed);
                    let config = Arc::clone(&config);
                    let commands = Arc::clone(&commands_clone);

                    tokio::spawn(async move {
                        let _ = MockSmtpServer::handle_client(stream, config, commands).await;
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            commands_received: commands,
            shutdown,
            connection_count,
        })
    }
}
