use std::{
    collections::HashSet,
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use crate::{
    address::{Address, AddressList},
    envelope::Envelope,
    error::MessageError,
    mime::{MimeEntity, encode_word},
};

/// The media type of a body part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Plain,
}

impl ContentKind {
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Plain => "text/plain",
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub content: String,
    pub kind: ContentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttachmentSource {
    Data(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attachment {
    name: String,
    content_type: String,
    source: AttachmentSource,
}

/// A message under composition.
///
/// Setters never fail; addresses, headers and attachments are checked when
/// the wire entity is built by [`Message::to_entity`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    from: Vec<Address>,
    sender: Option<Address>,
    return_path: Option<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    reply_to: Vec<Address>,
    subject: Option<String>,
    priority: Option<u8>,
    headers: Vec<(String, String)>,
    body: Option<Part>,
    parts: Vec<Part>,
    attachments: Vec<Attachment>,
}

fn address(email: impl Into<String>, name: Option<&str>) -> Address {
    Address::new(email, name.map(str::to_string))
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.from.push(address(email, name));
        self
    }

    pub fn from_address(&mut self, address: Address) -> &mut Self {
        self.from.push(address);
        self
    }

    pub fn sender(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.sender = Some(address(email, name));
        self
    }

    pub fn return_path(&mut self, email: impl Into<String>) -> &mut Self {
        self.return_path = Some(address(email, None));
        self
    }

    pub fn to(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.to.push(address(email, name));
        self
    }

    pub fn to_address(&mut self, address: Address) -> &mut Self {
        self.to.push(address);
        self
    }

    pub fn cc(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.cc.push(address(email, name));
        self
    }

    pub fn bcc(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.bcc.push(address(email, name));
        self
    }

    pub fn reply_to(&mut self, email: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.reply_to.push(address(email, name));
        self
    }

    pub fn subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets `X-Priority`, 1 being the highest and 5 the lowest
    pub const fn priority(&mut self, priority: u8) -> &mut Self {
        self.priority = Some(priority);
        self
    }

    /// Add a custom header. Headers containing line breaks are rejected when
    /// the message is built.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the primary body, replacing any previous one
    pub fn set_body(&mut self, content: impl Into<String>, kind: ContentKind) -> &mut Self {
        self.body = Some(Part {
            content: content.into(),
            kind,
        });
        self
    }

    /// Add an alternative part after the primary body
    pub fn add_part(&mut self, content: impl Into<String>, kind: ContentKind) -> &mut Self {
        self.parts.push(Part {
            content: content.into(),
            kind,
        });
        self
    }

    pub fn attach_data(
        &mut self,
        data: impl Into<Vec<u8>>,
        name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> &mut Self {
        self.attachments.push(Attachment {
            name: name.into(),
            content_type: content_type.into(),
            source: AttachmentSource::Data(data.into()),
        });
        self
    }

    /// Attach a file from disk. The file is read when the message is built and
    /// its type is guessed from the extension.
    pub fn attach_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        self.attachments.push(Attachment {
            name,
            content_type: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            source: AttachmentSource::File(path.to_path_buf()),
        });
        self
    }

    pub fn from_list(&self) -> &[Address] {
        &self.from
    }

    pub fn to_list(&self) -> &[Address] {
        &self.to
    }

    pub fn cc_list(&self) -> &[Address] {
        &self.cc
    }

    pub fn bcc_list(&self) -> &[Address] {
        &self.bcc
    }

    pub fn subject_line(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub const fn body(&self) -> Option<&Part> {
        self.body.as_ref()
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Every unique recipient across To, Cc and Bcc, in that order
    pub fn recipients(&self) -> Vec<Address> {
        let mut seen = HashSet::new();
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .filter(|addr| seen.insert(addr.email().to_ascii_lowercase()))
            .cloned()
            .collect()
    }

    /// The envelope sender is the return-path, else the sender, else the
    /// first From address
    pub fn envelope(&self) -> Envelope {
        let sender = self
            .return_path
            .as_ref()
            .or(self.sender.as_ref())
            .or_else(|| self.from.first())
            .cloned();

        Envelope::new(sender, self.recipients())
    }

    ///
    /// Check addresses, headers and priority without building the entity.
    /// Attachments are only read by [`Message::to_entity`].
    ///
    /// # Errors
    /// If an address is malformed, there is no From or no recipient, a custom
    /// header is invalid, or the priority is out of range
    ///
    pub fn validate(&self) -> Result<(), MessageError> {
        self.address_headers()?;
        self.check_headers()
    }

    ///
    /// Build the wire entity for this message
    ///
    /// # Errors
    /// If an address is malformed, there is no From or no recipient, a custom
    /// header is invalid, the priority is out of range, or an attachment
    /// cannot be read
    ///
    pub fn to_entity(&self) -> Result<MimeEntity, MessageError> {
        let mut headers = self.address_headers()?;
        self.check_headers()?;

        if let Some(subject) = &self.subject {
            headers.push(("Subject".to_string(), encode_word(subject)));
        }

        if let Some(priority) = self.priority {
            headers.push(("X-Priority".to_string(), priority_label(priority)?.to_string()));
        }

        for (name, value) in &self.headers {
            headers.push((name.clone(), encode_word(value)));
        }

        if !self.has_header("Date") {
            headers.insert(0, ("Date".to_string(), chrono::Utc::now().to_rfc2822()));
        }

        if !self.has_header("Message-ID") {
            let domain = self
                .from
                .first()
                .and_then(|from| from.email().rsplit_once('@'))
                .map_or("localhost", |(_, domain)| domain);
            headers.push((
                "Message-ID".to_string(),
                format!("<{}@{domain}>", ulid::Ulid::new()),
            ));
        }

        headers.push(("MIME-Version".to_string(), "1.0".to_string()));

        let mut entity = self.content_entity();
        if !self.attachments.is_empty() {
            let mut children = vec![entity];
            for attachment in &self.attachments {
                children.push(attachment.to_entity()?);
            }
            entity = MimeEntity::multipart("mixed", children);
        }

        entity.prepend_headers(headers);
        Ok(entity)
    }

    fn check_headers(&self) -> Result<(), MessageError> {
        if let Some(subject) = &self.subject {
            check_header_value("Subject", subject)?;
        }

        if let Some(priority) = self.priority {
            priority_label(priority)?;
        }

        for (name, value) in &self.headers {
            if !is_valid_header_name(name) {
                return Err(MessageError::InvalidHeader(name.clone()));
            }
            check_header_value(name, value)?;
        }

        Ok(())
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    fn address_headers(&self) -> Result<Vec<(String, String)>, MessageError> {
        if self.from.is_empty() {
            return Err(MessageError::MissingFrom);
        }

        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(MessageError::NoRecipients);
        }

        let mut headers = Vec::new();
        let single = |addr: &Option<Address>| addr.iter().cloned().collect::<Vec<_>>();

        for (field, list, emit) in [
            ("from", self.from.clone(), Some("From")),
            ("sender", single(&self.sender), Some("Sender")),
            ("return-path", single(&self.return_path), None),
            ("reply-to", self.reply_to.clone(), Some("Reply-To")),
            ("to", self.to.clone(), Some("To")),
            ("cc", self.cc.clone(), Some("Cc")),
            ("bcc", self.bcc.clone(), None),
        ] {
            for addr in &list {
                addr.validate()
                    .map_err(|source| MessageError::InvalidAddress {
                        field,
                        address: addr.email().to_string(),
                        source,
                    })?;
            }

            if let Some(name) = emit
                && !list.is_empty()
            {
                headers.push((name.to_string(), render_address_list(&list)));
            }
        }

        Ok(headers)
    }

    fn content_entity(&self) -> MimeEntity {
        let leaf = |part: &Part| MimeEntity::text(part.kind.mime_type(), part.content.clone());

        match (&self.body, self.parts.as_slice()) {
            (Some(body), []) => leaf(body),
            (Some(body), parts) => MimeEntity::multipart(
                "alternative",
                std::iter::once(body).chain(parts).map(leaf).collect(),
            ),
            (None, []) => MimeEntity::text(ContentKind::Plain.mime_type(), ""),
            (None, [part]) => leaf(part),
            (None, parts) => MimeEntity::multipart("alternative", parts.iter().map(leaf).collect()),
        }
    }
}

impl Attachment {
    fn to_entity(&self) -> Result<MimeEntity, MessageError> {
        let data = match &self.source {
            AttachmentSource::Data(data) => data.clone(),
            AttachmentSource::File(path) => {
                std::fs::read(path).map_err(|source| MessageError::Attachment {
                    path: path.display().to_string(),
                    source,
                })?
            }
        };

        Ok(MimeEntity::attachment(&self.name, &self.content_type, data))
    }
}

fn render_address_list(list: &[Address]) -> String {
    AddressList(
        list.iter()
            .map(|addr| Address::new(addr.email(), addr.name().map(encode_word)))
            .collect(),
    )
    .to_string()
}

fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

fn check_header_value(name: &str, value: &str) -> Result<(), MessageError> {
    if value.contains(['\r', '\n']) {
        Err(MessageError::InvalidHeader(name.to_string()))
    } else {
        Ok(())
    }
}

const fn priority_label(priority: u8) -> Result<&'static str, MessageError> {
    match priority {
        1 => Ok("1 (Highest)"),
        2 => Ok("2 (High)"),
        3 => Ok("3 (Normal)"),
        4 => Ok("4 (Low)"),
        5 => Ok("5 (Lowest)"),
        other => Err(MessageError::InvalidPriority(other)),
    }
}
