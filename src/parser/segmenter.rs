//! Splitting of a request file into one raw block per request.
//!
//! Lines are grouped by walking a small state machine:
//!
//! - `Start`: blank lines and comments before the first request are skipped.
//!   The first separator moves to `Separator`; any other line opens an
//!   unnamed block keyed by that line.
//! - `Separator`: commits the previous block and opens a new one named after
//!   the separator.
//! - `BeforeRequest`: blank lines and comments between a separator and the
//!   request line are skipped.
//! - `Request`: lines are accumulated until the next separator.

use tracing::instrument;

use super::{is_comment, separator_key, RequestLineError};
use crate::domain::Environment;

/// The raw text of a single request, as found in a request file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlock {
    /// The display name of the request.
    ///
    /// Taken from the separator line, or from the first line of the request
    /// when the separator has no name or is missing.
    pub key: String,

    /// The request definition with comments removed and variables
    /// substituted.
    ///
    /// Leading and trailing blank lines are trimmed and every line ends with
    /// a line break.
    pub text: String,
}

impl RawBlock {
    /// Creates a block from a key and its text.
    #[must_use]
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Returns the block text with its request line normalized to
    /// `METHOD target PROTOCOL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the first line is not a valid request line.
    pub fn normalized_text(&self) -> Result<String, RequestLineError> {
        super::normalize_request(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Separator,
    BeforeRequest,
    Request,
}

/// Groups the lines of a request file into raw blocks, one per request.
///
/// Variables from `env` are substituted into each line before it is
/// classified. Comment lines are dropped wherever they appear. Blocks are
/// returned in document order; blocks without any content are skipped.
#[instrument(level = "debug", skip_all, fields(lines = lines.len()))]
pub fn segment<S: AsRef<str>>(lines: &[S], env: &Environment) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut current = RawBlock::default();
    let mut state = State::Start;
    let mut index = 0;

    while let Some(raw) = lines.get(index) {
        let line = env.substitute(raw.as_ref());
        let trimmed = line.trim();

        match state {
            State::Start => {
                if trimmed.is_empty() || is_comment(trimmed) {
                    index += 1;
                    continue;
                }
                if separator_key(trimmed).is_some() {
                    state = State::Separator;
                } else {
                    current.key = trimmed.to_string();
                    state = State::Request;
                }
            }
            State::Separator => {
                commit(&mut blocks, std::mem::take(&mut current));
                current.key = separator_key(trimmed).unwrap_or_default().to_string();
                state = State::BeforeRequest;
                index += 1;
            }
            State::BeforeRequest => {
                if trimmed.is_empty() || is_comment(trimmed) {
                    index += 1;
                    continue;
                }
                if current.key.is_empty() && separator_key(trimmed).is_none() {
                    current.key = trimmed.to_string();
                }
                state = State::Request;
            }
            State::Request => {
                if separator_key(trimmed).is_some() {
                    state = State::Separator;
                    continue;
                }
                if !is_comment(trimmed) {
                    current.text.push_str(&line);
                    current.text.push('\n');
                }
                index += 1;
            }
        }
    }

    commit(&mut blocks, current);
    blocks
}

/// Trims blank lines around the block text and keeps the block if anything
/// is left.
fn commit(blocks: &mut Vec<RawBlock>, mut block: RawBlock) {
    let lines: Vec<&str> = block.text.lines().collect();
    let Some(first) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return;
    };
    let last = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .unwrap_or(first);

    let mut text = String::with_capacity(block.text.len());
    for line in &lines[first..=last] {
        text.push_str(line);
        text.push('\n');
    }
    block.text = text;

    tracing::debug!("Segmented request '{}'", block.key);
    blocks.push(block);
}
