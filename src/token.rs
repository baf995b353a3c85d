//! Lexical tokens produced by the scanner.

use serde::Serialize;
use std::fmt;

/// 1-based line/column of the first character of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token classes, listed in the priority order the scanner tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Comment,
    Preprocessor,
    Number,
    String,
    Keyword,
    Macro,
    Operator,
    Punctuation,
    Identifier,
    Whitespace,
}

impl TokenKind {
    pub const PRIORITY: [TokenKind; 10] = [
        TokenKind::Comment,
        TokenKind::Preprocessor,
        TokenKind::Number,
        TokenKind::String,
        TokenKind::Keyword,
        TokenKind::Macro,
        TokenKind::Operator,
        TokenKind::Punctuation,
        TokenKind::Identifier,
        TokenKind::Whitespace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Comment => "Comment",
            TokenKind::Preprocessor => "Preprocessor",
            TokenKind::Number => "Number",
            TokenKind::String => "String",
            TokenKind::Keyword => "Keyword",
            TokenKind::Macro => "Macro",
            TokenKind::Operator => "Operator",
            TokenKind::Punctuation => "Punctuation",
            TokenKind::Identifier => "Identifier",
            TokenKind::Whitespace => "Whitespace",
        }
    }

    /// Tokens dropped before parsing.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Whitespace)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            value: value.into(),
            line: position.line,
            column: position.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// True when the token has the given class and exact text.
    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.value)
    }
}
