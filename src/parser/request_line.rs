use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::domain::{Method, UnknownMethod, DEFAULT_PROTOCOL};

static PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HTTP/[0-9](\.[0-9])?$").expect("protocol pattern is valid"));

/// Whether `protocol` is a protocol version such as `HTTP/1.1` or `HTTP/2`.
#[must_use]
pub fn is_valid_protocol(protocol: &str) -> bool {
    PROTOCOL.is_match(protocol)
}

/// The first line of a request, with the method and protocol filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The request method, `GET` if omitted.
    pub method: Method,
    /// The request target, as written.
    pub uri: String,
    /// The protocol version, `HTTP/1.1` if omitted.
    pub protocol: String,
}

impl RequestLine {
    /// Parses a request line, defaulting whatever is missing.
    ///
    /// The line is split on whitespace:
    /// - one field is the target alone
    /// - two fields are `METHOD target` when the first is a method keyword,
    ///   and `target PROTOCOL` otherwise
    /// - three fields are `METHOD target PROTOCOL`
    ///
    /// # Errors
    ///
    /// Fails if the line has no fields or more than three, if a third field
    /// is present but the first one is not a method, or if the protocol is
    /// not of the form `HTTP/1.1`.
    pub fn parse(line: &str) -> Result<Self, RequestLineError> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        let (method, uri, protocol) = match fields[..] {
            [uri] => (Method::default(), uri, DEFAULT_PROTOCOL),
            [first, second] => match first.parse::<Method>() {
                Ok(method) => (method, second, DEFAULT_PROTOCOL),
                Err(_) => (Method::default(), first, second),
            },
            [method, uri, protocol] => (method.parse::<Method>()?, uri, protocol),
            _ => return Err(RequestLineError::FieldCount(fields.len())),
        };

        if !is_valid_protocol(protocol) {
            return Err(RequestLineError::InvalidProtocol(protocol.to_string()));
        }

        Ok(Self {
            method,
            uri: uri.to_string(),
            protocol: protocol.to_string(),
        })
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.uri, self.protocol)
    }
}

/// Rewrites the first line of a request definition into its normalized
/// `METHOD target PROTOCOL` form, leaving the remaining lines untouched.
///
/// Leading and trailing blank lines are dropped and the result ends with a
/// line break.
///
/// # Errors
///
/// Returns an error if the first line is not a valid request line.
pub fn normalize_request(text: &str) -> Result<String, RequestLineError> {
    let text = text.trim();
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let request_line = RequestLine::parse(first)?;

    if rest.is_empty() {
        Ok(format!("{request_line}\n"))
    } else {
        Ok(format!("{request_line}\n{rest}\n"))
    }
}

/// Errors that can occur when parsing a request line.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestLineError {
    /// The line does not have between one and three fields.
    #[error("expected 1 to 3 fields but found {0}")]
    FieldCount(usize),

    /// Three fields were given but the first is not a method.
    #[error(transparent)]
    Method(#[from] UnknownMethod),

    /// The protocol is not of the form `HTTP/<major>[.<minor>]`.
    #[error("invalid protocol '{0}'")]
    InvalidProtocol(String),
}
