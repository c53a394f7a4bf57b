//! Email addresses with an optional display name.
//!
//! Mailbox validation follows RFC 5321 Section 4.1.2:
//!
//! ```text
//! Mailbox        = Local-part "@" ( Domain / address-literal )
//! Local-part     = Dot-string / Quoted-string
//! Dot-string     = Atom *("." Atom)
//! Domain         = sub-domain *("." sub-domain)
//! sub-domain     = Let-dig [Ldh-str]
//! ```
//!
//! An [`Address`] is stored as given and only checked when [`Address::validate`]
//! is called, which happens when a message is turned into its wire entity.

use std::{
    fmt::{self, Display},
    net::{Ipv4Addr, Ipv6Addr},
    ops::{Deref, DerefMut},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_LOCAL_PART: usize = 64;
const MAX_DOMAIN: usize = 255;

/// Errors that can occur while parsing or validating an address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,

    #[error("Local-part exceeds {MAX_LOCAL_PART} octets")]
    LocalPartTooLong,

    #[error("Domain exceeds {MAX_DOMAIN} octets")]
    DomainTooLong,

    #[error("Missing '@' separator in mailbox")]
    MissingAtSign,

    #[error("Missing closing angle bracket '>'")]
    MissingCloseBracket,

    #[error("Invalid local-part: {0}")]
    InvalidLocalPart(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid address literal: {0}")]
    InvalidAddressLiteral(String),

    #[error("Invalid display name: {0}")]
    InvalidName(String),
}

/// A validated mailbox (`local_part@domain`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mailbox {
    pub local_part: String,
    pub domain: String,
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

impl FromStr for Mailbox {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mailbox(s.trim())
    }
}

/// An email address with an optional display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    #[serde(alias = "email")]
    address: String,
    #[serde(default)]
    name: Option<String>,
}

impl Address {
    /// Create an address without validating it
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name: name.filter(|n| !n.is_empty()),
        }
    }

    /// The bare email address
    pub fn email(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    ///
    /// Validate this address, returning the parsed mailbox
    ///
    /// # Errors
    /// If the address is not a valid RFC 5321 mailbox, or the display name
    /// contains line breaks
    ///
    pub fn validate(&self) -> Result<Mailbox, AddressError> {
        if let Some(name) = &self.name
            && name.contains(['\r', '\n'])
        {
            return Err(AddressError::InvalidName(name.clone()));
        }

        self.address.parse()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if needs_quoting(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Parses `a@b`, `<a@b>` or `Name <a@b>`, validating the mailbox
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let address = match trimmed.rfind('<') {
            Some(open) => {
                let close = trimmed
                    .rfind('>')
                    .filter(|close| *close > open)
                    .ok_or(AddressError::MissingCloseBracket)?;
                let name = trimmed[..open].trim().trim_matches('"').trim();

                Self::new(
                    &trimmed[open + 1..close],
                    (!name.is_empty()).then(|| name.to_string()),
                )
            }
            None => Self::new(trimmed, None),
        };

        address.validate()?;
        Ok(address)
    }
}

impl From<Mailbox> for Address {
    fn from(value: Mailbox) -> Self {
        Self::new(value.to_string(), None)
    }
}

/// An ordered list of addresses, displayed comma separated
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressList(pub Vec<Address>);

impl Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, addr) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            Display::fmt(addr, f)?;
        }
        Ok(())
    }
}

impl From<Vec<Address>> for AddressList {
    fn from(value: Vec<Address>) -> Self {
        Self(value)
    }
}

impl Deref for AddressList {
    type Target = Vec<Address>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for AddressList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

fn needs_quoting(name: &str) -> bool {
    name.chars()
        .any(|ch| matches!(ch, '"' | ',' | ';' | ':' | '<' | '>' | '@' | '(' | ')' | '[' | ']' | '\\' | '.'))
}

fn parse_mailbox(input: &str) -> Result<Mailbox, AddressError> {
    if input.is_empty() {
        return Err(AddressError::Empty);
    }

    let at = find_unquoted_at(input)?;
    let (local, domain) = (&input[..at], &input[at + 1..]);

    if local.len() > MAX_LOCAL_PART {
        return Err(AddressError::LocalPartTooLong);
    }

    if domain.len() > MAX_DOMAIN {
        return Err(AddressError::DomainTooLong);
    }

    if local.starts_with('"') {
        parse_quoted_string(local)?;
    } else {
        parse_dot_string(local)?;
    }

    if domain.starts_with('[') {
        parse_address_literal(domain)?;
    } else {
        parse_domain(domain)?;
    }

    Ok(Mailbox {
        local_part: local.to_string(),
        domain: domain.to_string(),
    })
}

/// The last '@' outside of a quoted local-part
fn find_unquoted_at(input: &str) -> Result<usize, AddressError> {
    let mut in_quotes = false;
    let mut escaped = false;
    let mut found = None;

    for (i, ch) in input.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '@' if !in_quotes => found = Some(i),
            _ => {}
        }
    }

    found.ok_or(AddressError::MissingAtSign)
}

fn parse_dot_string(input: &str) -> Result<(), AddressError> {
    if input.is_empty() {
        return Err(AddressError::InvalidLocalPart("Empty local-part".to_string()));
    }

    if input.starts_with('.') || input.ends_with('.') || input.contains("..") {
        return Err(AddressError::InvalidLocalPart(format!(
            "Misplaced '.' in '{input}'"
        )));
    }

    match input.chars().find(|ch| *ch != '.' && !is_atext(*ch)) {
        Some(ch) => Err(AddressError::InvalidLocalPart(format!(
            "Invalid character '{ch}' in atom"
        ))),
        None => Ok(()),
    }
}

fn parse_quoted_string(input: &str) -> Result<(), AddressError> {
    if input.len() < 2 || !input.ends_with('"') {
        return Err(AddressError::InvalidLocalPart(
            "Unclosed quoted string".to_string(),
        ));
    }

    let mut chars = input[1..input.len() - 1].chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) if next.is_ascii_graphic() || next == ' ' => {}
                _ => {
                    return Err(AddressError::InvalidLocalPart(
                        "Invalid quoted-pair".to_string(),
                    ));
                }
            }
        } else if !is_qtext_smtp(ch) {
            return Err(AddressError::InvalidLocalPart(format!(
                "Invalid character '{ch}' in quoted string"
            )));
        }
    }

    Ok(())
}

fn parse_domain(input: &str) -> Result<(), AddressError> {
    if input.is_empty() {
        return Err(AddressError::InvalidDomain("Empty domain".to_string()));
    }

    for subdomain in input.split('.') {
        let valid = subdomain
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
            && subdomain
                .chars()
                .last()
                .is_some_and(|c| c.is_ascii_alphanumeric())
            && subdomain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');

        if !valid {
            return Err(AddressError::InvalidDomain(input.to_string()));
        }
    }

    Ok(())
}

fn parse_address_literal(input: &str) -> Result<(), AddressError> {
    let Some(content) = input.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return Err(AddressError::InvalidAddressLiteral(input.to_string()));
    };

    if content.parse::<Ipv4Addr>().is_ok() {
        return Ok(());
    }

    if let Some(v6) = content.strip_prefix("IPv6:")
        && v6.parse::<Ipv6Addr>().is_ok()
    {
        return Ok(());
    }

    Err(AddressError::InvalidAddressLiteral(input.to_string()))
}

#[inline]
const fn is_atext(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// qtextSMTP = %d32-33 / %d35-91 / %d93-126
#[inline]
const fn is_qtext_smtp(ch: char) -> bool {
    matches!(ch as u32, 32..=33 | 35..=91 | 93..=126)
}
