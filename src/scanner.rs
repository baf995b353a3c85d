//! Regex-driven scanner.
//!
//! Each token class owns one pattern anchored at the scan position. Classes are
//! tried in [`TokenKind::PRIORITY`] order and the first one that matches a
//! non-empty prefix wins, so keywords beat identifiers and comments beat the
//! `/` operator.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::token::{Position, Token, TokenKind};

pub const KEYWORDS: [&str; 12] = [
    "int", "float", "char", "void", "class", "return", "while", "continue", "break", "if",
    "else", "New",
];

/// Compiled once per process; every [`Scanner`] shares them.
static PATTERNS: LazyLock<Vec<(TokenKind, Regex)>> = LazyLock::new(|| {
    TokenKind::PRIORITY
        .iter()
        .map(|&kind| {
            let re = Regex::new(&pattern(kind)).expect("scanner patterns are valid regexes");
            (kind, re)
        })
        .collect()
});

fn pattern(kind: TokenKind) -> String {
    let pattern = match kind {
        TokenKind::Comment => r"^(?://[^\n]*|/\*[\s\S]*?\*/)",
        TokenKind::Preprocessor => r"^#[A-Za-z0-9_]+",
        TokenKind::Number => r"^[0-9]+(?:\.[0-9]*)?",
        TokenKind::String => r#"^"[^"]*""#,
        TokenKind::Keyword => return format!(r"^(?:{})\b", KEYWORDS.join("|")),
        TokenKind::Macro => r"^::",
        TokenKind::Operator => {
            r"^(?:\*\*|<<=|>>=|&&|\|\||\+\+|--|<<|>>|[-+*/=<>!%&|^]=?|~|\?|:)"
        }
        TokenKind::Punctuation => r"^[{}()\[\];,.]",
        TokenKind::Identifier => r"^[A-Za-z_][A-Za-z0-9_]*",
        TokenKind::Whitespace => r"^\s+",
    };
    pattern.to_string()
}

/// Whether trivia (comments and whitespace) is kept in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Every token, trivia included; concatenating the values reproduces the input.
    Full,
    /// Trivia dropped. This is what the parser consumes.
    SignificantOnly,
}

pub struct Scanner {
    patterns: &'static [(TokenKind, Regex)],
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            patterns: &PATTERNS,
        }
    }

    /// Split `source` into tokens, failing on the first position no pattern matches.
    pub fn scan(&self, source: &str, mode: ScanMode) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        let mut cursor = Cursor::default();

        while offset < source.len() {
            let rest = &source[offset..];
            let (kind, text) = self.match_at(rest).ok_or_else(|| {
                let found = rest.chars().next().unwrap_or_default();
                CompileError::lexical(
                    cursor.position(),
                    format!("unrecognized character {found:?}"),
                )
            })?;

            if mode == ScanMode::Full || !kind.is_trivia() {
                tokens.push(Token::new(kind, text, cursor.position()));
            }
            cursor.advance(text);
            offset += text.len();
        }

        debug!(count = tokens.len(), ?mode, "scanned source");
        Ok(tokens)
    }

    fn match_at<'s>(&self, rest: &'s str) -> Option<(TokenKind, &'s str)> {
        self.patterns.iter().find_map(|(kind, re)| {
            re.find(rest)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| (*kind, m.as_str()))
        })
    }
}

/// Running line/column of the scan position.
struct Cursor {
    line: usize,
    column: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl Cursor {
    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self, consumed: &str) {
        for ch in consumed.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

/// Scan `source` in significant-only mode.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    Scanner::new().scan(source, ScanMode::SignificantOnly)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_matches_keyword_pattern() {
        let scanner = Scanner::new();
        for keyword in KEYWORDS {
            let tokens = scanner.scan(keyword, ScanMode::Full).unwrap();
            assert_eq!(tokens.len(), 1, "{keyword}");
            assert_eq!(tokens[0].kind, TokenKind::Keyword, "{keyword}");
        }
    }

    #[test]
    fn keyword_prefixes_scan_as_identifiers() {
        let scanner = Scanner::new();
        for word in ["iffy", "int_x", "returned", "News"] {
            let tokens = scanner.scan(word, ScanMode::Full).unwrap();
            assert_eq!(tokens.len(), 1, "{word}");
            assert_eq!(tokens[0].kind, TokenKind::Identifier, "{word}");
        }
    }

    #[test]
    fn scanners_share_compiled_patterns() {
        let first = Scanner::new();
        let second = Scanner::new();
        assert!(std::ptr::eq(first.patterns, second.patterns));
        assert_eq!(first.patterns.len(), TokenKind::PRIORITY.len());
    }

    #[test]
    fn cursor_tracks_newlines() {
        let mut cursor = Cursor::default();
        cursor.advance("ab\ncd");
        assert_eq!(cursor.position(), Position::new(2, 3));
    }
}
