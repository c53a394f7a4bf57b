use crate::address::{Address, AddressList};

/// SMTP envelope derived from a [`Message`](crate::Message)
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    sender: Option<Address>,
    recipients: AddressList,
}

impl Envelope {
    pub fn new(sender: Option<Address>, recipients: impl Into<AddressList>) -> Self {
        Self {
            sender,
            recipients: recipients.into(),
        }
    }

    /// Returns a reference to the [`Envelope`] sender for this message
    #[inline]
    pub const fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    /// Returns a reference to the [`Envelope`] recipients for this message
    #[inline]
    pub const fn recipients(&self) -> &AddressList {
        &self.recipients
    }
}
