//! The wire-level MIME tree a [`Message`](crate::Message) is rendered into.
//!
//! An entity has ordered headers, a body, and for multipart entities a list of
//! children separated on the wire by a generated boundary. Two renderings are
//! available: [`MimeEntity::to_wire`] produces the RFC 5322 text handed to a
//! backend (CRLF line endings, transfer encodings applied), while
//! [`MimeEntity::to_log_string`] produces a readable dump used by the log
//! transport.

use std::fmt::Write as _;

use base64::{Engine, engine::general_purpose::STANDARD};

const BASE64_LINE: usize = 76;
const ENCODED_WORD_CHUNK: usize = 45;
const MAX_7BIT_LINE: usize = 998;
const FOLD_WIDTH: usize = 78;
/// Longest run without whitespace left as is; longer runs become encoded words
const MAX_HEADER_WORD: usize = 900;

/// How a body is encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    SevenBit,
    Base64,
}

impl TransferEncoding {
    const fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::Base64 => "base64",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

impl Body {
    /// The body as it appears in the log rendering
    pub fn display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Binary(data) => wrap_base64(data, "\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeEntity {
    headers: Vec<(String, String)>,
    body: Body,
    encoding: TransferEncoding,
    boundary: Option<String>,
    children: Vec<Self>,
}

impl MimeEntity {
    /// A single text part, e.g. `text/plain` or `text/html`
    pub fn text(mime_type: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        let encoding = if is_7bit_safe(&content) {
            TransferEncoding::SevenBit
        } else {
            TransferEncoding::Base64
        };

        Self {
            headers: vec![
                (
                    "Content-Type".to_string(),
                    format!("{mime_type}; charset=utf-8"),
                ),
                (
                    "Content-Transfer-Encoding".to_string(),
                    encoding.as_str().to_string(),
                ),
            ],
            body: Body::Text(content),
            encoding,
            boundary: None,
            children: Vec::new(),
        }
    }

    /// A base64 encoded attachment
    pub fn attachment(name: &str, mime_type: &str, data: Vec<u8>) -> Self {
        let name = encode_word(name);

        Self {
            headers: vec![
                (
                    "Content-Type".to_string(),
                    format!("{mime_type}; name=\"{name}\""),
                ),
                (
                    "Content-Disposition".to_string(),
                    format!("attachment; filename=\"{name}\""),
                ),
                (
                    "Content-Transfer-Encoding".to_string(),
                    TransferEncoding::Base64.as_str().to_string(),
                ),
            ],
            body: Body::Binary(data),
            encoding: TransferEncoding::Base64,
            boundary: None,
            children: Vec::new(),
        }
    }

    /// A `multipart/<subtype>` container around `children`
    pub fn multipart(subtype: &str, children: Vec<Self>) -> Self {
        let boundary = format!("=_courier_{}", ulid::Ulid::new());

        Self {
            headers: vec![(
                "Content-Type".to_string(),
                format!("multipart/{subtype}; boundary=\"{boundary}\""),
            )],
            body: Body::Text(String::new()),
            encoding: TransferEncoding::SevenBit,
            boundary: Some(boundary),
            children,
        }
    }

    /// Insert headers ahead of the existing ones, preserving their order
    pub fn prepend_headers(&mut self, headers: Vec<(String, String)>) {
        self.headers.splice(0..0, headers);
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The first header named `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The media type without parameters, e.g. `text/plain`
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
            .map(|value| value.split(';').next().unwrap_or(value).trim())
    }

    pub const fn body(&self) -> &Body {
        &self.body
    }

    pub fn children(&self) -> &[Self] {
        &self.children
    }

    pub const fn is_multipart(&self) -> bool {
        self.boundary.is_some()
    }

    /// Render the entity as RFC 5322 text with CRLF line endings
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        self.write_wire(&mut out);
        out
    }

    fn write_wire(&self, out: &mut String) {
        for (name, value) in &self.headers {
            fold_header(out, name, value);
        }
        out.push_str("\r\n");

        match (&self.boundary, &self.body, self.encoding) {
            (Some(boundary), _, _) => {
                out.push_str("This is a multi-part message in MIME format.\r\n");
                for child in &self.children {
                    let _ = write!(out, "\r\n--{boundary}\r\n");
                    child.write_wire(out);
                }
                let _ = write!(out, "\r\n--{boundary}--\r\n");
            }
            (None, Body::Text(text), TransferEncoding::SevenBit) => {
                out.push_str(&normalize_crlf(text));
            }
            (None, Body::Text(text), TransferEncoding::Base64) => {
                out.push_str(&wrap_base64(text.as_bytes(), "\r\n"));
            }
            (None, Body::Binary(data), _) => {
                out.push_str(&wrap_base64(data, "\r\n"));
            }
        }
    }

    /// Render the entity for humans: headers, a blank line and the body,
    /// followed by each child, recursively, separated by blank lines
    pub fn to_log_string(&self) -> String {
        let mut sections = Vec::with_capacity(self.children.len() + 1);

        let mut own = String::new();
        for (name, value) in &self.headers {
            let _ = writeln!(own, "{name}: {value}");
        }
        own.push('\n');
        own.push_str(&self.body.display());
        sections.push(own);

        sections.extend(self.children.iter().map(Self::to_log_string));
        sections.join("\n\n")
    }
}

/// Write `name: value` folded at spaces so lines stay near 78 characters
fn fold_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push(':');

    let mut line = name.len() + 1;
    let mut fresh = true;
    for word in value.split(' ') {
        if !fresh && line + 1 + word.len() > FOLD_WIDTH {
            out.push_str("\r\n");
            line = 0;
        }
        out.push(' ');
        out.push_str(word);
        line += 1 + word.len();
        fresh = false;
    }
    out.push_str("\r\n");
}

/// Encode a header value as RFC 2047 encoded-words if it is not plain ASCII,
/// or if it holds a run too long to fold
pub fn encode_word(value: &str) -> String {
    if value.is_ascii() && value.split_whitespace().all(|word| word.len() <= MAX_HEADER_WORD) {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in value.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(format!("=?utf-8?B?{}?=", STANDARD.encode(&chunk)));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("=?utf-8?B?{}?=", STANDARD.encode(&chunk)));
    }

    words.join(" ")
}

fn is_7bit_safe(text: &str) -> bool {
    text.is_ascii() && text.lines().all(|line| line.len() <= MAX_7BIT_LINE)
}

fn normalize_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
    }
    out
}

fn wrap_base64(data: &[u8], newline: &str) -> String {
    let encoded = STANDARD.encode(data);
    encoded
        .as_bytes()
        .chunks(BASE64_LINE)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect::<Vec<_>>()
        .join(newline)
}
