//! Mail configuration, loaded from RON
//!
//! ```ron
//! MailConfig (
//!     driver: "smtp",
//!     from: Some((address: "noreply@example.com", name: Some("Example"))),
//!     smtp: Some((
//!         host: "smtp.example.com",
//!         port: 587,
//!         encryption: Tls,
//!     )),
//!     log: Some((path: "storage/mail.log")),
//!     views: Some("views"),
//! )
//! ```
//!
//! Only the section for the selected driver needs to be present.

use std::{
    io,
    path::{Path, PathBuf},
    str::FromStr,
};

use courier_common::Address;
use courier_smtp::SmtpConfig;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    transport::{LogConfig, MailgunConfig, MandrillConfig, SendmailConfig},
};

/// Environment variable pointing at the configuration file
pub const CONFIG_ENV: &str = "COURIER_CONFIG";

fn default_driver() -> String {
    "smtp".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    /// The active driver name
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Added as the From address of every message
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub from: Option<Address>,

    /// Added as an extra recipient of every message
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub to: Option<Address>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub smtp: Option<SmtpConfig>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sendmail: Option<SendmailConfig>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mailgun: Option<MailgunConfig>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mandrill: Option<MandrillConfig>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub log: Option<LogConfig>,

    /// Directory holding the views rendered by [`TeraRenderer`](crate::TeraRenderer)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub views: Option<PathBuf>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self::new(default_driver())
    }
}

impl MailConfig {
    /// A configuration with only the driver set
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            from: None,
            to: None,
            smtp: None,
            sendmail: None,
            mailgun: None,
            mandrill: None,
            log: None,
            views: None,
        }
    }

    ///
    /// Load the configuration from `path`
    ///
    /// # Errors
    /// If the file cannot be read, is not valid RON, or holds an invalid
    /// `from`/`to` address
    ///
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        content.parse()
    }

    ///
    /// Locate and load the configuration file, see [`MailConfig::find`]
    ///
    /// # Errors
    /// If no file is found or it fails to load
    ///
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_file(Self::find()?)
    }

    ///
    /// Find the configuration file using the following precedence:
    /// 1. `COURIER_CONFIG` environment variable
    /// 2. ./courier.config.ron (current working directory)
    /// 3. /etc/courier/courier.config.ron (system-wide config)
    ///
    /// # Errors
    /// If `COURIER_CONFIG` names a missing file, or none of the defaults exist
    ///
    pub fn find() -> Result<PathBuf, ConfigError> {
        resolve_config_path(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            &[
                PathBuf::from("./courier.config.ron"),
                PathBuf::from("/etc/courier/courier.config.ron"),
            ],
        )
    }

    ///
    /// The SMTP section
    ///
    /// # Errors
    /// If the section is absent
    ///
    pub fn smtp(&self) -> Result<&SmtpConfig, ConfigError> {
        self.smtp.as_ref().ok_or(ConfigError::MissingSection("smtp"))
    }

    ///
    /// The Mailgun section
    ///
    /// # Errors
    /// If the section is absent
    ///
    pub fn mailgun(&self) -> Result<&MailgunConfig, ConfigError> {
        self.mailgun
            .as_ref()
            .ok_or(ConfigError::MissingSection("mailgun"))
    }

    ///
    /// The Mandrill section
    ///
    /// # Errors
    /// If the section is absent
    ///
    pub fn mandrill(&self) -> Result<&MandrillConfig, ConfigError> {
        self.mandrill
            .as_ref()
            .ok_or(ConfigError::MissingSection("mandrill"))
    }

    ///
    /// The log section
    ///
    /// # Errors
    /// If the section is absent
    ///
    pub fn log(&self) -> Result<&LogConfig, ConfigError> {
        self.log.as_ref().ok_or(ConfigError::MissingSection("log"))
    }

    /// The sendmail section, falling back to the default command
    pub fn sendmail(&self) -> SendmailConfig {
        self.sendmail.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for address in self.from.iter().chain(&self.to) {
            address
                .validate()
                .map_err(|err| ConfigError::InvalidAddress {
                    address: address.to_string(),
                    reason: err.to_string(),
                })?;
        }

        Ok(())
    }
}

impl FromStr for MailConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = ron::from_str(s).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn resolve_config_path(
    env_path: Option<PathBuf>,
    defaults: &[PathBuf],
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = env_path {
        if path.exists() {
            return Ok(path);
        }

        return Err(ConfigError::Io {
            source: io::Error::new(
                io::ErrorKind::NotFound,
                format!("{CONFIG_ENV} points to a non-existent file"),
            ),
            path,
        });
    }

    if let Some(path) = defaults.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = defaults
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::Io {
        path: defaults.first().cloned().unwrap_or_default(),
        source: io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
            ),
        ),
    })
}
