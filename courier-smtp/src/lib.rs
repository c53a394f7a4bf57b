pub mod client;
pub mod config;
pub mod transport;

pub use self::{
    config::{Encryption, SmtpConfig},
    transport::SmtpTransport,
};
