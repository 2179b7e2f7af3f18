use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The protocol version used when a request line omits one.
pub const DEFAULT_PROTOCOL: &str = "HTTP/1.1";

/// An HTTP request method.
///
/// Only the upper-case spellings are recognised; `get` is not a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    /// `GET`, the method used when a request line omits one.
    #[default]
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `CONNECT`
    Connect,
    /// `PATCH`
    Patch,
    /// `OPTIONS`
    Options,
    /// `TRACE`
    Trace,
}

impl Method {
    /// Every recognised method, in a stable order.
    pub const ALL: [Self; 9] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Connect,
        Self::Patch,
        Self::Options,
        Self::Trace,
    ];

    /// The keyword as it appears on a request line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }

    /// Whether `word` is a method keyword.
    #[must_use]
    pub fn is_method(word: &str) -> bool {
        word.parse::<Self>().is_ok()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

impl TryFrom<String> for Method {
    type Error = UnknownMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

/// Error returned when a word is not a recognised method keyword.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown HTTP method '{0}'")]
pub struct UnknownMethod(String);

/// A fully parsed request, ready to be handed to an HTTP client.
///
/// The client should send the method, target, protocol version, headers and
/// body exactly as given. The target is an outgoing request target; there is
/// no server-side "request URI".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// The display name of the request.
    pub key: String,
    /// The request method.
    pub method: Method,
    /// The request target, a valid URI reference.
    pub uri: String,
    /// The protocol version, such as `HTTP/1.1`.
    pub protocol_version: String,
    /// Header fields. A repeated name keeps the last value.
    pub headers: BTreeMap<String, String>,
    /// The request body, possibly empty.
    pub body: String,
}

impl RequestDescriptor {
    /// The normalized request line, `METHOD uri PROTOCOL`.
    #[must_use]
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.uri, self.protocol_version)
    }

    /// Returns the value of a header, matching the name case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for RequestDescriptor {
    /// Renders the request as it would be written in a request file.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.request_line())?;
        for (name, value) in &self.headers {
            writeln!(f, "{name}: {value}")?;
        }
        if !self.body.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.body)?;
        }
        Ok(())
    }
}
