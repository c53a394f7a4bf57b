//! SMTP relay configuration
//!
//! ```ron
//! smtp: Some((
//!     host: "smtp.example.com",
//!     port: 587,
//!     encryption: Tls,
//!     username: Some("mailer"),
//!     password: Some("secret"),
//! )),
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

const fn default_port() -> u16 {
    25
}

const fn default_timeout() -> u64 {
    30
}

fn default_local_domain() -> String {
    "localhost".to_string()
}

/// How the connection to the relay is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encryption {
    #[default]
    #[serde(alias = "none")]
    None,
    /// TLS from the first byte (implicit TLS)
    #[serde(alias = "ssl")]
    Ssl,
    /// Plain connection upgraded with STARTTLS
    #[serde(alias = "tls")]
    Tls,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub encryption: Encryption,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,

    /// Timeout applied to every command, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// The name announced in EHLO/HELO
    #[serde(default = "default_local_domain")]
    pub local_domain: String,

    /// Skip certificate verification. Only meant for test servers.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            encryption: Encryption::None,
            username: None,
            password: None,
            timeout: default_timeout(),
            local_domain: default_local_domain(),
            accept_invalid_certs: false,
        }
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The username and password, if authentication is configured
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.username
            .as_deref()
            .map(|username| (username, self.password.as_deref()))
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("encryption", &self.encryption)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("local_domain", &self.local_domain)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}
