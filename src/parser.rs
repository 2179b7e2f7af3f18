//! Parsing of request files into request descriptors.
//!
//! A request file holds one or more HTTP requests separated by `###` lines:
//!
//! ```text
//! ### Create user
//! POST http://{{host}}/user
//! Content-Type: application/json
//!
//! {"foo":"bar"}
//! ```
//!
//! Parsing runs in two stages. The [segmenter](segment) substitutes
//! variables, drops comments and groups lines into one [`RawBlock`] per
//! request. Each block is then turned into a [`RequestDescriptor`] by
//! [`parse_block`]. [`parse_document`] runs both stages.
//!
//! The [`lexer`] is a stricter, character-level validation of the same
//! grammar. It rejects input the block parser lets through, such as stray
//! whitespace on the request line, and produces a token stream rather than
//! descriptors.

use std::sync::LazyLock;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;
use url::Url;

use crate::domain::{Environment, RequestDescriptor};

mod block;
pub use block::parse_block;

/// Character-level tokenizer for request text.
pub mod lexer;
pub use lexer::{lex, LexError, Token, TokenKind};

mod request_line;
pub use request_line::{is_valid_protocol, normalize_request, RequestLine, RequestLineError};

mod segmenter;
pub use segmenter::{segment, RawBlock};

/// Parses the lines of a request file into request descriptors.
///
/// Variables from `env` are substituted before any structure is parsed.
/// Descriptors are returned in document order.
///
/// # Errors
///
/// Parsing stops at the first invalid request, in document order. The error
/// names the request and the line within it.
#[instrument(level = "debug", skip_all, fields(lines = lines.len()))]
pub fn parse_document<S: AsRef<str>>(
    lines: &[S],
    env: &Environment,
) -> Result<Vec<RequestDescriptor>, Error> {
    let blocks = segment(lines, env);
    tracing::debug!("Found {} requests", blocks.len());
    parse_blocks(&blocks)
}

/// Parses a whole request file held in memory.
///
/// # Errors
///
/// See [`parse_document`].
pub fn parse_str(input: &str, env: &Environment) -> Result<Vec<RequestDescriptor>, Error> {
    let lines: Vec<&str> = input.lines().collect();
    parse_document(&lines, env)
}

/// Parses raw blocks into request descriptors.
///
/// Blocks do not depend on each other and are parsed in parallel. The
/// descriptors keep the order of the blocks.
///
/// # Errors
///
/// Returns the error of the first block, in order, that fails to parse.
pub fn parse_blocks(blocks: &[RawBlock]) -> Result<Vec<RequestDescriptor>, Error> {
    let results: Vec<_> = blocks.par_iter().map(parse_block).collect();

    results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| tracing::error!("Failed to parse request '{}': {e}", e.key()))
}

/// Runs the strict lexer over a raw block.
///
/// # Errors
///
/// Returns [`Error::Lex`] naming the block if the lexer rejects its text.
pub fn validate_block(block: &RawBlock) -> Result<Vec<Token>, Error> {
    lex(&block.text).map_err(|source| Error::Lex {
        key: block.key.clone(),
        source,
    })
}

/// Whether a trimmed line is a comment (`// text` or `# text`).
pub(crate) fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("// ") || trimmed.starts_with("# ") || trimmed == "//" || trimmed == "#"
}

/// Returns the request name if a trimmed line is a separator (`### name`).
///
/// A bare `###` is a separator with an empty name.
pub(crate) fn separator_key(trimmed: &str) -> Option<&str> {
    if trimmed == "###" {
        Some("")
    } else {
        trimmed.strip_prefix("### ").map(str::trim)
    }
}

/// Base against which relative request targets are resolved when checking
/// them.
static RELATIVE_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost/").expect("base URL is valid"));

/// Checks that a request target is a valid URI reference, either absolute or
/// relative.
pub(crate) fn validate_target(target: &str) -> Result<(), url::ParseError> {
    match Url::parse(target) {
        Ok(_) => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => RELATIVE_BASE.join(target).map(drop),
        Err(e) => Err(e),
    }
}

/// Errors that can occur when parsing a request.
///
/// Every error names the request it occurred in. Line numbers are 1-based
/// and count lines of the request's block, comments excluded.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request line has an unsupported shape.
    #[error("request '{key}', line {line}: malformed request line, {source}")]
    MalformedRequestLine {
        /// The request name.
        key: String,
        /// The offending line.
        line: usize,
        /// What is wrong with the request line.
        source: RequestLineError,
    },

    /// A header line has no `:` separator, or no name before it.
    #[error("request '{key}', line {line}: malformed header line, expected 'Name: value'")]
    MalformedHeaderLine {
        /// The request name.
        key: String,
        /// The offending line.
        line: usize,
    },

    /// The request target is not a valid URI reference.
    #[error("request '{key}', line {line}: invalid request target '{target}'")]
    InvalidTarget {
        /// The request name.
        key: String,
        /// The offending line.
        line: usize,
        /// The target as written.
        target: String,
        /// Why the target was rejected.
        source: url::ParseError,
    },

    /// The protocol version is not of the form `HTTP/1.1`.
    #[error("request '{key}', line {line}: invalid protocol '{protocol}'")]
    InvalidProtocol {
        /// The request name.
        key: String,
        /// The offending line.
        line: usize,
        /// The protocol as written.
        protocol: String,
    },

    /// The block has no request line.
    #[error("request '{key}' has no request line")]
    EmptyRequestBlock {
        /// The request name.
        key: String,
    },

    /// The strict lexer rejected the request.
    #[error("request '{key}': {source}")]
    Lex {
        /// The request name.
        key: String,
        /// The lexing failure.
        source: LexError,
    },
}

impl Error {
    fn request_line(error: RequestLineError, key: &str, line: usize) -> Self {
        match error {
            RequestLineError::InvalidProtocol(protocol) => Self::InvalidProtocol {
                key: key.to_string(),
                line,
                protocol,
            },
            source => Self::MalformedRequestLine {
                key: key.to_string(),
                line,
                source,
            },
        }
    }

    /// The name of the request the error occurred in.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::MalformedRequestLine { key, .. }
            | Self::MalformedHeaderLine { key, .. }
            | Self::InvalidTarget { key, .. }
            | Self::InvalidProtocol { key, .. }
            | Self::EmptyRequestBlock { key }
            | Self::Lex { key, .. } => key,
        }
    }

    /// The 1-based line within the request, when the error has one.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedRequestLine { line, .. }
            | Self::MalformedHeaderLine { line, .. }
            | Self::InvalidTarget { line, .. }
            | Self::InvalidProtocol { line, .. } => Some(*line),
            Self::Lex { source, .. } => Some(source.line()),
            Self::EmptyRequestBlock { .. } => None,
        }
    }
}
