//! SMTP response parsing and representation.

use std::fmt::{self, Display};

use super::error::{ClientError, Result};

/// Represents a single line in an SMTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// The SMTP status code (e.g., 220, 250, 550).
    pub code: u16,
    /// Whether this is the last line in a multi-line response.
    pub is_last: bool,
    /// The message text following the status code.
    pub message: String,
}

/// Represents a complete SMTP response, which may be multi-line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The SMTP status code.
    pub code: u16,
    /// All message lines in the response.
    pub lines: Vec<String>,
}

impl Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.lines.join(" "))
    }
}

impl Response {
    /// Creates a new `Response`.
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Returns the complete message as a single string with lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// Returns `true` if this response indicates success (2xx code).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// Returns `true` if this response indicates a temporary error (4xx code).
    #[must_use]
    pub const fn is_temporary_error(&self) -> bool {
        self.code >= 400 && self.code < 500
    }

    /// Returns `true` if this response indicates a permanent error (5xx code).
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// Returns `true` if this response indicates any error (4xx or 5xx code).
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.is_temporary_error() || self.is_permanent_error()
    }

    /// Whether an EHLO response advertises the extension `keyword`.
    ///
    /// The first line of an EHLO response is the server's greeting and is skipped.
    #[must_use]
    pub fn supports(&self, keyword: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split([' ', '='])
                .next()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(keyword))
        })
    }

    /// The SASL mechanisms advertised in an EHLO response, upper-cased.
    ///
    /// Both `AUTH PLAIN LOGIN` and the legacy `AUTH=PLAIN LOGIN` forms are read.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.lines
            .iter()
            .skip(1)
            .filter_map(|line| {
                let upper = line.to_ascii_uppercase();
                upper
                    .strip_prefix("AUTH ")
                    .or_else(|| upper.strip_prefix("AUTH="))
                    .map(str::to_string)
            })
            .flat_map(|mechanisms| {
                mechanisms
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Parses a single response line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the line doesn't match SMTP format.
    pub fn parse_line(line: &str) -> Result<ResponseLine> {
        if line.len() < 3 || !line.is_char_boundary(3) {
            return Err(ClientError::ParseError(format!(
                "Response line too short: '{line}'"
            )));
        }

        let code_str = &line[..3];
        let code = code_str
            .parse::<u16>()
            .map_err(|_| ClientError::ParseError(format!("Invalid status code: '{code_str}'")))?;

        let is_last = match line[3..].chars().next() {
            Some(' ') | None => true,
            Some('-') => false,
            Some(c) => {
                return Err(ClientError::ParseError(format!(
                    "Invalid separator character: '{c}'"
                )));
            }
        };

        let message = line.get(4..).unwrap_or_default().to_string();

        Ok(ResponseLine {
            code,
            is_last,
            message,
        })
    }

    /// Parses a complete multi-line SMTP response from a buffer.
    ///
    /// Returns the parsed `Response` and the number of bytes consumed, or
    /// `None` if the buffer does not yet hold a complete response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the response is malformed.
    pub fn parse_response(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let text = std::str::from_utf8(buffer)?;
        let mut lines = Vec::new();
        let mut consumed = 0;
        let mut first_code = None;

        while let Some(end) = text[consumed..].find('\n') {
            let raw = &text[consumed..consumed + end];
            consumed += end + 1;

            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.is_empty() {
                continue;
            }

            let parsed = Self::parse_line(line)?;

            match first_code {
                Some(code) if parsed.code != code => {
                    return Err(ClientError::ParseError(format!(
                        "Status code mismatch in multi-line response: expected {code}, got {}",
                        parsed.code
                    )));
                }
                Some(_) => {}
                None => first_code = Some(parsed.code),
            }

            lines.push(parsed.message);

            if parsed.is_last {
                return Ok(Some((Self::new(parsed.code, lines), consumed)));
            }
        }

        Ok(None)
    }
}
