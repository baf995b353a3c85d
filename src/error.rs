//! Error taxonomy shared by every compilation stage.
//!
//! Every error is fatal to the compilation that raised it; stages return the
//! first one they hit and the driver decides how to present it.

use thiserror::Error;

use crate::token::Position;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("lexical error{}: {message}", at(.position))]
    Lexical {
        message: String,
        position: Option<Position>,
    },
    #[error("syntax error{}: {message}", at(.position))]
    Syntax {
        message: String,
        position: Option<Position>,
    },
    #[error("type error{}: {message}", at(.position))]
    Type {
        message: String,
        position: Option<Position>,
    },
    #[error("name error{}: {message}", at(.position))]
    Name {
        message: String,
        position: Option<Position>,
    },
    #[error("structural error{}: {message}", at(.position))]
    Structural {
        message: String,
        position: Option<Position>,
    },
}

fn at(position: &Option<Position>) -> String {
    position.map(|p| format!(" at {p}")).unwrap_or_default()
}

impl CompileError {
    pub fn lexical(position: Position, message: impl Into<String>) -> Self {
        Self::Lexical {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn syntax(position: Option<Position>, message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn type_error(position: Option<Position>, message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
            position,
        }
    }

    pub fn name(position: Option<Position>, message: impl Into<String>) -> Self {
        Self::Name {
            message: message.into(),
            position,
        }
    }

    pub fn structural(position: Option<Position>, message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
            position,
        }
    }

    /// Short classification string used for logging.
    pub fn category(&self) -> &'static str {
        match self {
            CompileError::Lexical { .. } => "lexical",
            CompileError::Syntax { .. } => "syntax",
            CompileError::Type { .. } => "type",
            CompileError::Name { .. } => "name",
            CompileError::Structural { .. } => "structural",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Lexical { message, .. }
            | CompileError::Syntax { message, .. }
            | CompileError::Type { message, .. }
            | CompileError::Name { message, .. }
            | CompileError::Structural { message, .. } => message,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            CompileError::Lexical { position, .. }
            | CompileError::Syntax { position, .. }
            | CompileError::Type { position, .. }
            | CompileError::Name { position, .. }
            | CompileError::Structural { position, .. } => *position,
        }
    }

    /// Format the error against its source, pointing at the offending column
    /// with a caret.
    pub fn render(&self, source: &str) -> String {
        let Some(position) = self.position() else {
            return self.to_string();
        };
        let Some(line) = source.lines().nth(position.line.saturating_sub(1)) else {
            return self.to_string();
        };
        let gutter = position.line.to_string();
        let marker = " ".repeat(position.column.saturating_sub(1));
        format!(
            "{self}\n{gutter} | {line}\n{pad} | {marker}^",
            pad = " ".repeat(gutter.len())
        )
    }
}
