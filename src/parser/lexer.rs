//! A cursor over the request text emits typed [`Token`]s in document order.
//!
//! The lexer accepts the same files as the block parser, with stricter rules
//! for the request line and headers:
//!
//! - the method, when present, is followed by exactly one space
//! - the target must be a valid URI reference
//! - the protocol, when present, must look like `HTTP/1.1` and end the line
//! - every header line needs a `:` after a non-empty name without whitespace
//!
//! At the top level a line starting with `//` or `#` is a comment, and a line
//! starting with `###` is a separator. Inside a body only comments in the
//! block parser's sense (`// text`, `# text`) are split out, and the body
//! runs until the next separator or the end of the input.

use std::fmt;

use super::{is_comment, validate_target};
use crate::domain::Method;

/// The kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A `//` or `#` comment line.
    Comment,
    /// A `###` line starting a new request.
    Separator,
    /// The request method.
    Method,
    /// The request target.
    Target,
    /// The protocol version.
    Protocol,
    /// A header name.
    HeaderField,
    /// The `:` between a header name and its value.
    HeaderSeparator,
    /// A header value.
    HeaderValue,
    /// A run of body lines.
    Body,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Comment => "comment",
            Self::Separator => "separator",
            Self::Method => "method",
            Self::Target => "target",
            Self::Protocol => "protocol",
            Self::HeaderField => "header field",
            Self::HeaderSeparator => "header separator",
            Self::HeaderValue => "header value",
            Self::Body => "body",
        };
        f.write_str(name)
    }
}

/// A piece of request text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The text of the token, as written.
    pub value: String,
    /// What the text is.
    pub kind: TokenKind,
    /// The 1-based line the token starts on.
    pub line: usize,
}

/// Errors that can occur while lexing request text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LexError {
    /// The request target is not a valid URI reference.
    #[error("line {line}: invalid request target '{target}'")]
    InvalidTarget {
        /// The line of the target.
        line: usize,
        /// The target as written.
        target: String,
        /// Why the target was rejected.
        source: url::ParseError,
    },

    /// The protocol is not of the form `HTTP/<major>[.<minor>]`.
    #[error("line {line}: invalid protocol '{protocol}'")]
    InvalidProtocol {
        /// The line of the protocol.
        line: usize,
        /// The protocol as written.
        protocol: String,
    },

    /// A header line has no `:`.
    #[error("line {line}: expected ':' after header field '{field}'")]
    MissingHeaderSeparator {
        /// The line of the header.
        line: usize,
        /// The text before the end of the line.
        field: String,
    },

    /// A header name is empty or contains whitespace.
    #[error("line {line}: invalid header field '{field}'")]
    InvalidHeaderField {
        /// The line of the header.
        line: usize,
        /// The header name as written.
        field: String,
    },

    /// Something other than what the grammar allows.
    #[error("line {line}: expected {expected}, found {}", describe(.found))]
    UnexpectedCharacter {
        /// The line of the character.
        line: usize,
        /// What the grammar allows here.
        expected: &'static str,
        /// The character found, `None` at the end of the input.
        found: Option<char>,
    },
}

impl LexError {
    /// The 1-based line the error occurred on.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::InvalidTarget { line, .. }
            | Self::InvalidProtocol { line, .. }
            | Self::MissingHeaderSeparator { line, .. }
            | Self::InvalidHeaderField { line, .. }
            | Self::UnexpectedCharacter { line, .. } => *line,
        }
    }
}

#[allow(clippy::ref_option)]
fn describe(found: &Option<char>) -> String {
    match *found {
        Some('\n') => "a line break".to_string(),
        Some(c) => format!("{c:?}"),
        None => "the end of the input".to_string(),
    }
}

/// Tokenizes request text.
///
/// # Errors
///
/// Returns the first place the text breaks the grammar.
pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut state = State::Start;

    while state != State::Done {
        state = lexer.step(state)?;
    }

    Ok(lexer.tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    RequestLine,
    Method,
    Target,
    Protocol,
    AfterRequestLine,
    HeaderLine,
    Body,
    Done,
}

struct Lexer<'a> {
    input: &'a str,
    /// Start of the pending token.
    start: usize,
    /// Line of `start`.
    start_line: usize,
    pos: usize,
    /// Line of `pos`.
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            start: 0,
            start_line: 1,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn step(&mut self, state: State) -> Result<State, LexError> {
        match state {
            State::Start => Ok(self.lex_start()),
            State::RequestLine => Ok(self.lex_request_line()),
            State::Method => self.lex_method(),
            State::Target => self.lex_target(),
            State::Protocol => self.lex_protocol(),
            State::AfterRequestLine => Ok(self.lex_after_request_line()),
            State::HeaderLine => self.lex_header_line(),
            State::Body => Ok(self.lex_body()),
            State::Done => Ok(State::Done),
        }
    }

    // cursor primitives

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn accept(&mut self, c: char) -> bool {
        self.accept_if(|next| next == c)
    }

    fn accept_if(&mut self, predicate: impl Fn(char) -> bool) -> bool {
        if self.peek().is_some_and(predicate) {
            self.next();
            true
        } else {
            false
        }
    }

    fn accept_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.accept_if(&predicate) {}
    }

    fn accept_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// The rest of the current line, without its line break.
    fn current_line(&self) -> &'a str {
        let rest = self.rest();
        rest.split_once('\n').map_or(rest, |(line, _)| line)
    }

    /// Moves to the end of the current line, before its line break.
    fn skip_line(&mut self) {
        self.pos += self.current_line().len();
    }

    fn selection(&self) -> &'a str {
        &self.input[self.start..self.pos]
    }

    fn ignore(&mut self) {
        self.start = self.pos;
        self.start_line = self.line;
    }

    fn emit(&mut self, kind: TokenKind) {
        let value = self.selection().to_string();
        self.push(kind, value);
    }

    fn push(&mut self, kind: TokenKind, value: String) {
        tracing::trace!("Emitting {kind} token {value:?} on line {}", self.start_line);
        self.tokens.push(Token {
            value,
            kind,
            line: self.start_line,
        });
        self.ignore();
    }

    fn unexpected(&self, expected: &'static str) -> LexError {
        LexError::UnexpectedCharacter {
            line: self.line,
            expected,
            found: self.peek(),
        }
    }

    // states

    fn lex_start(&mut self) -> State {
        self.accept_while(char::is_whitespace);
        self.ignore();

        match self.peek() {
            None => State::Done,
            Some('#') => {
                self.lex_comment();
                State::Start
            }
            Some('/') if self.rest().starts_with("//") => {
                self.lex_comment();
                State::Start
            }
            Some(_) => State::RequestLine,
        }
    }

    /// Emits the current line as a comment, or as a separator if it starts
    /// with `###`, and moves past its line break.
    fn lex_comment(&mut self) {
        self.accept_while(|c| c == ' ' || c == '\t');
        self.ignore();

        let kind = if self.current_line().trim_start().starts_with("###") {
            TokenKind::Separator
        } else {
            TokenKind::Comment
        };
        self.skip_line();
        self.emit(kind);
        self.accept('\n');
        self.ignore();
    }

    fn lex_request_line(&self) -> State {
        let mut words = self.current_line().split_whitespace();
        match (words.next(), words.next()) {
            (Some(first), Some(_)) if Method::is_method(first) => State::Method,
            _ => State::Target,
        }
    }

    fn lex_method(&mut self) -> Result<State, LexError> {
        self.accept_while(|c| c.is_ascii_uppercase());
        self.emit(TokenKind::Method);

        if !self.accept(' ') {
            return Err(self.unexpected("a space after the method"));
        }
        self.ignore();
        Ok(State::Target)
    }

    fn lex_target(&mut self) -> Result<State, LexError> {
        self.accept_while(|c| !c.is_whitespace());

        let target = self.selection();
        if target.is_empty() {
            return Err(self.unexpected("a request target"));
        }
        validate_target(target).map_err(|source| LexError::InvalidTarget {
            line: self.start_line,
            target: target.to_string(),
            source,
        })?;
        self.emit(TokenKind::Target);

        match self.peek() {
            None => Ok(State::Done),
            Some('\n') => Ok(self.end_request_line()),
            Some(' ') if self.current_line().trim().is_empty() => {
                self.skip_line();
                Ok(self.end_request_line())
            }
            Some(' ') => {
                self.next();
                self.ignore();
                Ok(State::Protocol)
            }
            Some(_) => Err(self.unexpected("a space or a line break after the target")),
        }
    }

    fn lex_protocol(&mut self) -> Result<State, LexError> {
        let valid = self.accept_str("HTTP/")
            && self.accept_if(|c| c.is_ascii_digit())
            && (!self.accept('.') || self.accept_if(|c| c.is_ascii_digit()))
            && self.peek().is_none_or(char::is_whitespace);

        if !valid {
            self.accept_while(|c| !c.is_whitespace());
            return Err(LexError::InvalidProtocol {
                line: self.start_line,
                protocol: self.selection().to_string(),
            });
        }
        self.emit(TokenKind::Protocol);

        self.accept_while(|c| c == ' ' || c == '\t');
        match self.peek() {
            None => Ok(State::Done),
            Some('\n') => Ok(self.end_request_line()),
            Some(_) => Err(self.unexpected("a line break after the protocol")),
        }
    }

    /// Moves past the line break ending the request line.
    fn end_request_line(&mut self) -> State {
        self.accept('\n');
        self.ignore();
        State::AfterRequestLine
    }

    /// Decides what a line after the request line holds: a header, a
    /// comment, the blank line before the body, or the next request.
    fn lex_after_request_line(&mut self) -> State {
        let line = self.current_line();
        let content = line.trim_start();

        if self.peek().is_none() {
            State::Done
        } else if content.starts_with("###") {
            State::Start
        } else if is_comment(content.trim_end()) {
            self.lex_comment();
            State::AfterRequestLine
        } else if content.trim_end().is_empty() {
            self.skip_line();
            self.accept('\n');
            self.ignore();
            State::Body
        } else {
            State::HeaderLine
        }
    }

    fn lex_header_line(&mut self) -> Result<State, LexError> {
        self.accept_while(|c| c == ' ' || c == '\t');
        self.ignore();

        self.accept_while(|c| c != ':' && c != '\n');
        let field = self.selection().trim_end();
        if self.peek() != Some(':') {
            return Err(LexError::MissingHeaderSeparator {
                line: self.start_line,
                field: field.to_string(),
            });
        }
        if field.is_empty() || field.contains(char::is_whitespace) {
            return Err(LexError::InvalidHeaderField {
                line: self.start_line,
                field: field.to_string(),
            });
        }
        self.push(TokenKind::HeaderField, field.to_string());

        self.next();
        self.emit(TokenKind::HeaderSeparator);

        if self.accept(' ') {
            self.ignore();
        }
        self.skip_line();
        let value = self.selection().trim_end().to_string();
        self.push(TokenKind::HeaderValue, value);

        self.accept('\n');
        self.ignore();
        Ok(State::AfterRequestLine)
    }

    fn lex_body(&mut self) -> State {
        loop {
            let line = self.current_line();
            let trimmed = line.trim();

            if self.peek().is_none() {
                self.emit_body();
                return State::Done;
            }
            if trimmed.starts_with("###") {
                self.emit_body();
                return State::Start;
            }
            if is_comment(trimmed) {
                self.emit_body();
                self.lex_comment();
                continue;
            }

            self.skip_line();
            self.accept('\n');
        }
    }

    /// Emits the pending body lines, if any hold content. Trailing blank
    /// lines are left out of the token.
    fn emit_body(&mut self) {
        let lines: Vec<&str> = self.selection().lines().collect();
        match lines.iter().rposition(|line| !line.trim().is_empty()) {
            Some(last) => self.push(TokenKind::Body, lines[..=last].join("\n")),
            None => self.ignore(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{lex, LexError, Token, TokenKind};
    use TokenKind::*;

    fn kinds_and_values(input: &str) -> Vec<(TokenKind, String)> {
        lex(input)
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.value))
            .collect()
    }

    fn expected(tokens: &[(TokenKind, &str)]) -> Vec<(TokenKind, String)> {
        tokens
            .iter()
            .map(|(kind, value)| (*kind, (*value).to_string()))
            .collect()
    }

    #[test]
    fn full_request() {
        let input = "### Create user
POST http://localhost:3000/user HTTP/1.1
Content-Type: application/json
Fake-Header:Tamer

{\"foo\":\"bar\"}
";

        assert_eq!(
            kinds_and_values(input),
            expected(&[
                (Separator, "### Create user"),
                (Method, "POST"),
                (Target, "http://localhost:3000/user"),
                (Protocol, "HTTP/1.1"),
                (HeaderField, "Content-Type"),
                (HeaderSeparator, ":"),
                (HeaderValue, "application/json"),
                (HeaderField, "Fake-Header"),
                (HeaderSeparator, ":"),
                (HeaderValue, "Tamer"),
                (Body, "{\"foo\":\"bar\"}"),
            ])
        );
    }

    #[test]
    fn target_only() {
        assert_eq!(
            kinds_and_values("http://localhost/health"),
            expected(&[(Target, "http://localhost/health")])
        );
    }

    #[test]
    fn target_and_protocol() {
        assert_eq!(
            kinds_and_values("/users HTTP/2\n"),
            expected(&[(Target, "/users"), (Protocol, "HTTP/2")])
        );
    }

    #[test]
    fn lone_method_keyword_is_a_target() {
        assert_eq!(kinds_and_values("GET\n"), expected(&[(Target, "GET")]));
    }

    #[test]
    fn tokens_carry_line_numbers() {
        let tokens = lex("\n// hello\nGET /users\nAccept: */*\n\nbody\n").unwrap();

        let lines: Vec<(TokenKind, usize)> = tokens.iter().map(|t| (t.kind, t.line)).collect();
        assert_eq!(
            lines,
            vec![
                (Comment, 2),
                (Method, 3),
                (Target, 3),
                (HeaderField, 4),
                (HeaderSeparator, 4),
                (HeaderValue, 4),
                (Body, 6),
            ]
        );
    }

    #[test]
    fn comments_between_headers_resume_headers() {
        assert_eq!(
            kinds_and_values("GET /users\nAccept: */*\n# why\nX-Id: 1\n"),
            expected(&[
                (Method, "GET"),
                (Target, "/users"),
                (HeaderField, "Accept"),
                (HeaderSeparator, ":"),
                (HeaderValue, "*/*"),
                (Comment, "# why"),
                (HeaderField, "X-Id"),
                (HeaderSeparator, ":"),
                (HeaderValue, "1"),
            ])
        );
    }

    #[test]
    fn body_runs_to_next_separator_across_blank_lines() {
        let input = "POST /a

line one

line two


### Next
GET /b
";

        assert_eq!(
            kinds_and_values(input),
            expected(&[
                (Method, "POST"),
                (Target, "/a"),
                (Body, "line one\n\nline two"),
                (Separator, "### Next"),
                (Method, "GET"),
                (Target, "/b"),
            ])
        );
    }

    #[test]
    fn comments_split_the_body() {
        assert_eq!(
            kinds_and_values("PUT /a\n\nfirst\n// note\nsecond\n"),
            expected(&[
                (Method, "PUT"),
                (Target, "/a"),
                (Body, "first"),
                (Comment, "// note"),
                (Body, "second"),
            ])
        );
    }

    #[test]
    fn trailing_spaces_after_target_are_allowed() {
        assert_eq!(
            kinds_and_values("GET /a   \nAccept: */*\n"),
            expected(&[
                (Method, "GET"),
                (Target, "/a"),
                (HeaderField, "Accept"),
                (HeaderSeparator, ":"),
                (HeaderValue, "*/*"),
            ])
        );
    }

    #[test]
    fn invalid_target_fails() {
        let error = lex("GET http://[::1 HTTP/1.1\n").unwrap_err();

        assert!(matches!(
            error,
            LexError::InvalidTarget { line: 1, ref target, .. } if target == "http://[::1"
        ));
    }

    #[test]
    fn double_space_after_method_fails() {
        let error = lex("GET  /users\n").unwrap_err();

        assert_eq!(
            error,
            LexError::UnexpectedCharacter {
                line: 1,
                expected: "a request target",
                found: Some(' '),
            }
        );
    }

    #[test]
    fn invalid_protocols_fail() {
        for (input, protocol) in [
            ("GET /a HTTP/x\n", "HTTP/x"),
            ("GET /a HTTP/1.\n", "HTTP/1."),
            ("GET /a HTTP/1.1x\n", "HTTP/1.1x"),
            ("GET /a http/1.1\n", "http/1.1"),
        ] {
            let error = lex(input).unwrap_err();
            assert_eq!(
                error,
                LexError::InvalidProtocol {
                    line: 1,
                    protocol: protocol.to_string(),
                },
                "input: {input:?}"
            );
        }
    }

    #[test]
    fn extra_field_after_protocol_fails() {
        let error = lex("GET /a HTTP/1.1 extra\n").unwrap_err();
        assert!(matches!(
            error,
            LexError::UnexpectedCharacter { line: 1, found: Some('e'), .. }
        ));
    }

    #[test]
    fn header_names_must_be_single_words() {
        for (input, field) in [
            ("GET /a\nBad Name: value\n", "Bad Name"),
            ("GET /a\n: value\n", ""),
        ] {
            let error = lex(input).unwrap_err();
            assert_eq!(
                error,
                LexError::InvalidHeaderField {
                    line: 2,
                    field: field.to_string(),
                },
                "input: {input:?}"
            );
        }
    }

    #[test]
    fn header_tokens_are_trimmed() {
        assert_eq!(
            kinds_and_values("GET /a\n  Accept: */*  \nX-Id:1\t\n"),
            expected(&[
                (Method, "GET"),
                (Target, "/a"),
                (HeaderField, "Accept"),
                (HeaderSeparator, ":"),
                (HeaderValue, "*/*"),
                (HeaderField, "X-Id"),
                (HeaderSeparator, ":"),
                (HeaderValue, "1"),
            ])
        );
    }

    #[test]
    fn header_without_colon_fails() {
        let error = lex("GET /a\nAccept: */*\nBadHeaderNoColon\n").unwrap_err();

        assert_eq!(
            error,
            LexError::MissingHeaderSeparator {
                line: 3,
                field: "BadHeaderNoColon".to_string(),
            }
        );
        assert_eq!(error.line(), 3);
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(lex("").unwrap().is_empty());
        assert!(lex("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn error_messages_describe_the_input() {
        let error = lex("GET /a HTTP/1.1 extra").unwrap_err();
        assert_eq!(
            error.to_string(),
            "line 1: expected a line break after the protocol, found 'e'"
        );

        let error = lex("GET /a\nAccept: */*\nX-Id").unwrap_err();
        assert_eq!(
            error.to_string(),
            "line 3: expected ':' after header field 'X-Id'"
        );
    }

    #[test]
    fn tokens_are_plain_values() {
        let token = Token {
            value: "GET".to_string(),
            kind: Method,
            line: 1,
        };
        assert_eq!(lex("GET /").unwrap()[0], token);
    }
}
