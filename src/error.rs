//! Errors of every pipeline stage, and the collector that gathers them.
//!
//! Scanner, parser, resolver and interpreter all fail with a [`LoxError`];
//! I/O and decoding failures of the driver wrap into the same enum so `?`
//! works end to end and converts into `anyhow::Error` in the binary.
//!
//! Every pipeline variant renders as `[line N] Error<location>: <message>`,
//! where `<location>` is empty for lexical errors and `" at end"` or
//! `" at '<lexeme>'"` otherwise.
//!
//! Nothing here prints.  Stages push into a [`Diagnostics`] collector and the
//! driver decides where the text goes.

use std::io;
use thiserror::Error;

use log::{debug, info};

use crate::token::{Token, TokenType};

/// One diagnostic, or a host failure while reading input.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Bad character or unterminated string.
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// Grammar violation found by the parser.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis failure (duplicate local, self‑initializer, stray `return`).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error; aborts the current unit only.
    #[error("[line {line}] Error{location}: {message}")]
    Runtime {
        message: String,
        location: String,
        line: usize,
    },

    /// Reading a source file or writing program output failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A source file that is not UTF‑8.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// `" at end"` for EOF, `" at '<lexeme>'"` for everything else.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LoxError {
    /// Scanner errors carry only a line.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Parse error located at `token`.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Resolve error located at `token`.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: line={}, msg={}",
            token.line, message
        );

        LoxError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Runtime error located at `token`: an operator, a property name or a
    /// call's closing paren.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, msg={}",
            token.line, message
        );

        LoxError::Runtime {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// The bare message without the line/location prefix, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. }
            | LoxError::Runtime { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Source line the error points at, if it came from the pipeline.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoxError>;

/// Accumulates every scan, parse and resolve error of one compilation unit.
///
/// Threaded by `&mut` through Scanner → Parser → Resolver.  A unit with a
/// non‑empty collector must not be executed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one diagnostic.
    pub fn report(&mut self, error: LoxError) {
        debug!("Diagnostic reported: {}", error);

        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoxError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<LoxError> {
        self.errors
    }
}
