//! The built-in transports
//!
//! | Driver     | Transport                                 |
//! |------------|-------------------------------------------|
//! | `smtp`     | [`SmtpTransport`], from `courier-smtp`    |
//! | `sendmail` | [`SendmailTransport`] running `command`   |
//! | `mail`     | [`SendmailTransport`] in `-t` header mode |
//! | `mailgun`  | [`MailgunTransport`]                      |
//! | `mandrill` | [`MandrillTransport`]                     |
//! | `log`      | [`LogTransport`] appending to a file      |

mod http;
pub mod log;
pub mod mailgun;
pub mod mandrill;
pub mod sendmail;

pub use courier_smtp::{Encryption, SmtpConfig, SmtpTransport};

pub use self::{
    log::{LogConfig, LogTransport},
    mailgun::{MailgunConfig, MailgunTransport},
    mandrill::{MandrillConfig, MandrillTransport},
    sendmail::{SendmailConfig, SendmailTransport},
};
