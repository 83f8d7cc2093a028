//! Token types produced by the [`Scanner`](super::Scanner).

use std::fmt;

/// Classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenKind {
    /// End of input
    #[default]
    Empty,
    Identifier,
    Integer,
    Float,
    String,

    // Keywords
    /// `struct`
    Struct,
    /// `cbuffer` or `tbuffer`
    CBuffer,
    /// `register`
    Register,

    // Punctuation
    Semicolon,
    Colon,
    Dot,
    Equals,
    Comma,
    Hash,
    BlockOpen,
    BlockClose,
    BracketOpen,
    BracketClose,
    SquareOpen,
    SquareClose,

    /// Any other single character
    Symbol,
}

impl TokenKind {
    /// Keyword kind for a reserved word, if it is one.
    #[must_use]
    pub fn keyword(word: &str) -> Option<Self> {
        match word {
            "struct" => Some(Self::Struct),
            "cbuffer" | "tbuffer" => Some(Self::CBuffer),
            "register" => Some(Self::Register),
            _ => None,
        }
    }

    /// Punctuation kind for a single character. Unlisted characters are
    /// [`TokenKind::Symbol`].
    #[must_use]
    pub fn punctuation(c: char) -> Self {
        match c {
            ';' => Self::Semicolon,
            ':' => Self::Colon,
            '.' => Self::Dot,
            '=' => Self::Equals,
            ',' => Self::Comma,
            '#' => Self::Hash,
            '{' => Self::BlockOpen,
            '}' => Self::BlockClose,
            '(' => Self::BracketOpen,
            ')' => Self::BracketClose,
            '[' => Self::SquareOpen,
            ']' => Self::SquareClose,
            _ => Self::Symbol,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Empty => "end of input",
            TokenKind::Identifier => "identifier",
            TokenKind::Integer => "integer",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::Struct => "struct",
            TokenKind::CBuffer => "cbuffer",
            TokenKind::Register => "register",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Equals => "=",
            TokenKind::Comma => ",",
            TokenKind::Hash => "#",
            TokenKind::BlockOpen => "{",
            TokenKind::BlockClose => "}",
            TokenKind::BracketOpen => "(",
            TokenKind::BracketClose => ")",
            TokenKind::SquareOpen => "[",
            TokenKind::SquareClose => "]",
            TokenKind::Symbol => "symbol",
        };
        f.write_str(s)
    }
}

/// A classified span of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    /// 1-based line the token starts on.
    pub line: u32,
}

impl Default for Token {
    fn default() -> Self {
        Self {
            text: String::new(),
            kind: TokenKind::Empty,
            line: 1,
        }
    }
}

impl Token {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: TokenKind, line: u32) -> Self {
        Self {
            text: text.into(),
            kind,
            line,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind == TokenKind::Empty
    }

    #[inline]
    #[must_use]
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
