//! Send mail through one interface, whatever carries it
//!
//! ```no_run
//! # async fn run() -> Result<(), courier::MailError> {
//! use std::sync::Arc;
//!
//! use courier::{MailConfig, Mailer, TeraRenderer};
//!
//! let config = MailConfig::load()?;
//! let mailer = Mailer::from_config(config, Arc::new(TeraRenderer::default()));
//!
//! let failed = mailer
//!     .raw("Your report is ready", |message| {
//!         message.to("ops@example.com", None).subject("Report");
//!     })
//!     .await?;
//! assert!(failed.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod mailer;
pub mod registry;
pub mod transport;
pub mod view;

pub use courier_common::{
    Address, ContentKind, Message, Transport, TransportError, logging,
};

pub use self::{
    config::MailConfig,
    content::{ContentSpec, ResolvedContent},
    error::{ConfigError, ContentError, MailError},
    mailer::Mailer,
    registry::{TransportFactory, TransportRegistry},
    view::{RenderError, Renderer, TeraRenderer, ViewData},
};
