//! Lexical Scanner
//!
//! Splits preprocessed shader text into classified [`Token`]s on demand.
//! Nothing is materialized up front: the parser pulls one token at a time and
//! uses [`Scanner::peek`] for a single token of lookahead.
//!
//! Classification, in priority order:
//!
//! 1. Whitespace is skipped; `\n` advances the line counter.
//! 2. A digit starts an integer, or a float if a `.` follows
//!    (optional trailing `f`).
//! 3. A letter or `_` starts an identifier, reclassified as a keyword for
//!    `struct`, `cbuffer`/`tbuffer` and `register`.
//! 4. `"` starts a string literal running to the next unescaped `"`.
//! 5. Anything else is a one-character punctuation token.

pub mod token;

pub use token::{Token, TokenKind};

use crate::errors::{Result, ShaderError};

/// Cursor over an in-memory character buffer.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    cursor: usize,
    line: u32,
    current: Token,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            line: 1,
            current: Token::default(),
        }
    }

    /// Rewind to the start of the buffer.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.line = 1;
        self.current = Token::default();
    }

    /// Line the read cursor is on.
    #[inline]
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The token most recently returned by [`Scanner::next_token`].
    #[inline]
    #[must_use]
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Whether another non-empty token follows.
    #[must_use]
    pub fn has_next(&mut self) -> bool {
        !self.peek().is_empty()
    }

    /// Scan the next token without consuming it.
    pub fn peek(&mut self) -> Token {
        let cursor = self.cursor;
        let line = self.line;
        let current = std::mem::take(&mut self.current);

        let token = self.next_token();

        self.cursor = cursor;
        self.line = line;
        self.current = current;

        token
    }

    /// Consume the next token, failing unless it is of `kind`.
    pub fn try_next(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.next_token();

        if token.kind == kind {
            return Ok(token);
        }

        let found = if token.is_empty() {
            "end of input".to_owned()
        } else {
            format!("\"{}\"", token.text)
        };

        Err(ShaderError::parse(
            token.line,
            format!("unexpected token {found}, expected \"{kind}\""),
        ))
    }

    #[must_use]
    pub fn is_next(&mut self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume the next token if it is of `kind`.
    pub fn next_if(&mut self, kind: TokenKind) -> bool {
        if self.is_next(kind) {
            self.next_token();
            return true;
        }
        false
    }

    /// Consume and classify one token. Returns an [`TokenKind::Empty`] token
    /// at end of input.
    pub fn next_token(&mut self) -> Token {
        let mut token = Token::new(String::new(), TokenKind::Empty, self.line);

        while let Some(c) = self.peek_char() {
            if c.is_ascii_whitespace() {
                self.bump();
                if c == '\n' {
                    self.line += 1;
                }
                token.line = self.line;
                continue;
            }

            if c.is_ascii_digit() {
                token.kind = TokenKind::Integer;
                self.take_while(&mut token.text, |c| c.is_ascii_digit());

                if self.peek_char() == Some('.') {
                    token.kind = TokenKind::Float;
                    self.push_bump(&mut token.text);
                    self.take_while(&mut token.text, |c| c.is_ascii_digit());

                    if self.peek_char() == Some('f') {
                        self.push_bump(&mut token.text);
                    }
                }
            } else if c.is_ascii_alphabetic() || c == '_' {
                self.take_while(&mut token.text, |c| c.is_ascii_alphanumeric() || c == '_');
                token.kind = TokenKind::keyword(&token.text).unwrap_or(TokenKind::Identifier);
            } else if c == '"' {
                token.kind = TokenKind::String;
                self.push_bump(&mut token.text);

                while let Some(c) = self.bump() {
                    token.text.push(c);
                    match c {
                        '"' => break,
                        '\\' if self.peek_char() == Some('"') => self.push_bump(&mut token.text),
                        '\n' => self.line += 1,
                        _ => {}
                    }
                }
            } else {
                self.bump();
                token.kind = TokenKind::punctuation(c);
                token.text.push(c);
            }

            break;
        }

        self.current = token.clone();
        token
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn push_bump(&mut self, text: &mut String) {
        if let Some(c) = self.bump() {
            text.push(c);
        }
    }

    fn take_while(&mut self, text: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            self.bump();
            text.push(c);
        }
    }
}

/// Yields tokens until end of input.
impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (!token.is_empty()).then_some(token)
    }
}
