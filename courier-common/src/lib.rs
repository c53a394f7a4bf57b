pub mod address;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod message;
pub mod mime;
pub mod traits;

pub use tracing;

pub use self::{
    address::{Address, AddressList, Mailbox},
    envelope::Envelope,
    error::{MessageError, TransportError},
    message::{ContentKind, Message},
    mime::MimeEntity,
    traits::Transport,
};
