use std::collections::BTreeMap;

use super::{is_comment, separator_key, validate_target, Error, RawBlock, RequestLine};
use crate::domain::RequestDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Headers,
    Body,
}

/// Parses one raw block into a request descriptor.
///
/// The block is read line by line:
///
/// - before the request line, blank lines and comments are skipped and a
///   separator line renames the request
/// - the request line is normalized, defaulting the method to `GET` and the
///   protocol to `HTTP/1.1`
/// - header lines follow until the first blank line
/// - everything after that blank line is the body
///
/// Comment lines are skipped everywhere, including inside the body.
///
/// # Errors
///
/// Returns an error naming the request and the 1-based line within the block
/// if the request line or a header line is malformed, if the request target
/// is not a valid URI reference, or if the block has no request line at all.
pub fn parse_block(block: &RawBlock) -> Result<RequestDescriptor, Error> {
    let mut key = block.key.clone();
    let mut state = State::Start;
    let mut request_line = None;
    let mut headers = BTreeMap::new();
    let mut body: Vec<&str> = Vec::new();

    for (index, line) in block.text.lines().enumerate() {
        let number = index + 1;
        let trimmed = line.trim();

        match state {
            State::Start => {
                if trimmed.is_empty() || is_comment(trimmed) {
                    continue;
                }
                if let Some(name) = separator_key(trimmed) {
                    if !name.is_empty() {
                        key = name.to_string();
                    }
                    continue;
                }

                let parsed = RequestLine::parse(trimmed)
                    .map_err(|source| Error::request_line(source, &key, number))?;
                validate_target(&parsed.uri).map_err(|source| Error::InvalidTarget {
                    key: key.clone(),
                    line: number,
                    target: parsed.uri.clone(),
                    source,
                })?;

                if key.is_empty() {
                    key = trimmed.to_string();
                }
                request_line = Some(parsed);
                state = State::Headers;
            }
            State::Headers => {
                if is_comment(trimmed) {
                    continue;
                }
                if trimmed.is_empty() {
                    state = State::Body;
                    continue;
                }

                let (name, value) =
                    split_header(line).ok_or_else(|| Error::MalformedHeaderLine {
                        key: key.clone(),
                        line: number,
                    })?;
                if let Some(previous) = headers.insert(name.to_string(), value.to_string()) {
                    tracing::debug!("Header '{name}' in '{key}' overrides value '{previous}'");
                }
            }
            State::Body => {
                if !is_comment(trimmed) {
                    body.push(line);
                }
            }
        }
    }

    let Some(RequestLine {
        method,
        uri,
        protocol,
    }) = request_line
    else {
        return Err(Error::EmptyRequestBlock { key });
    };

    Ok(RequestDescriptor {
        key,
        method,
        uri,
        protocol_version: protocol,
        headers,
        body: body.join("\n"),
    })
}

/// Splits a header line on its first `:`.
///
/// The name must be non-empty and free of whitespace. One space after the
/// colon is dropped, as is trailing whitespace.
fn split_header(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let value = value.strip_prefix(' ').unwrap_or(value).trim_end();
    Some((name, value))
}
