//! Delivery by piping the message into a local sendmail binary
//!
//! Without `-t` the envelope is passed on the command line as
//! `-f <sender> -- <recipients...>`; with `-t` sendmail reads the recipients
//! from the headers itself.

use std::process::Stdio;

use async_trait::async_trait;
use courier_common::{Address, Message, Transport, TransportError};
use serde::{Deserialize, Serialize};
use tokio::{io::AsyncWriteExt, process::Command};

use crate::error::ConfigError;

fn default_command() -> String {
    "/usr/sbin/sendmail -i".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendmailConfig {
    #[serde(default = "default_command")]
    pub command: String,
}

impl Default for SendmailConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
        }
    }
}

#[derive(Debug)]
pub struct SendmailTransport {
    program: String,
    args: Vec<String>,
    name: &'static str,
}

impl SendmailTransport {
    ///
    /// # Errors
    /// If the command is empty
    ///
    pub fn new(config: &SendmailConfig) -> Result<Self, ConfigError> {
        Self::with_name(&config.command, "sendmail")
    }

    /// The local MTA, reading recipients from the headers
    pub fn mail() -> Self {
        Self {
            program: "sendmail".to_string(),
            args: vec!["-t".to_string(), "-i".to_string()],
            name: "mail",
        }
    }

    fn with_name(command: &str, name: &'static str) -> Result<Self, ConfigError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or(ConfigError::MissingField("sendmail.command"))?;

        Ok(Self {
            program,
            args: parts.collect(),
            name,
        })
    }

    fn header_mode(&self) -> bool {
        self.args.iter().any(|arg| arg == "-t")
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The arguments for one message, including the envelope unless in `-t` mode
    fn arguments(&self, message: &Message) -> Result<Vec<String>, TransportError> {
        let mut args = self.args.clone();

        if !self.header_mode() {
            let envelope = message.envelope();
            let sender = envelope.sender().ok_or(TransportError::MissingSender)?;

            args.extend(["-f".to_string(), sender.email().to_string(), "--".to_string()]);
            args.extend(envelope.recipients().iter().map(|rcpt| rcpt.email().to_string()));
        }

        Ok(args)
    }

    fn process_error(&self, reason: impl ToString) -> TransportError {
        TransportError::Process {
            command: self.command_line(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Transport for SendmailTransport {
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
        let args = self.arguments(message)?;

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| self.process_error(err))?;

        // Written while stderr is drained, so a chatty process cannot stall
        // on a full pipe. A process that exits without reading stdin closes
        // the pipe early; its exit status is the more useful error then.
        let stdin = child.stdin.take();
        let write = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(wire.as_bytes()).await,
                None => Ok(()),
            }
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(|err| self.process_error(err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.process_error(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        written?;

        tracing::info!(
            command = %self.command_line(),
            recipients = message.recipients().len(),
            "Message handed to sendmail"
        );
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
