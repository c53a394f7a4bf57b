//! A minimal async SMTP client.
//!
//! The client speaks just enough of RFC 5321 to hand a message to a relay:
//!
//! - Plain TCP, implicit TLS and STARTTLS upgrades
//! - EHLO/HELO and capability inspection
//! - AUTH PLAIN and AUTH LOGIN
//! - MAIL/RCPT/DATA with dot-stuffing, RSET and QUIT
//!
//! Every command is written through [`courier_common::outgoing!`] and every
//! reply read through [`courier_common::incoming!`], so a session can be
//! followed at `TRACE` level. Credentials are never logged.
//!
//! # Example
//!
//! ```no_run
//! use courier_smtp::client::SmtpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = SmtpClient::connect("localhost:2525", "localhost".to_string()).await?;
//! client.read_greeting().await?;
//! client.ehlo("client.example.com").await?;
//! client.mail_from("sender@example.com").await?;
//! client.rcpt_to("recipient@example.com").await?;
//! client.data().await?;
//! client.send_data("Subject: Test\r\n\r\nHello World").await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod response;
mod smtp_client;

pub use error::{ClientError, Result};
pub use response::{Response, ResponseLine};
pub use smtp_client::SmtpClient;
