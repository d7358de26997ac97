//! One interpreter session: runs compilation units through
//! Scanner → Parser → Resolver → Interpreter and reports how each one ended.
//!
//! The session owns the interpreter, so globals declared by one unit are
//! visible to the next (a REPL feeds one line per unit).

use std::io::Write;

use log::{debug, info};

use crate::ast::{Expr, Stmt};
use crate::error::{Diagnostics, LoxError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::value::Value;

/// How a compilation unit ended.
#[derive(Debug)]
pub enum Outcome {
    /// Ran to completion.
    Completed,

    /// Scan, parse or resolve errors; nothing was executed.
    StaticErrors(Vec<LoxError>),

    /// Execution started and was aborted by this error.
    RuntimeError(LoxError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Session printing to stdout.
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// Session printing to `out`.
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
        }
    }

    /// Scan and parse `source` into statements, collecting every error.
    pub fn compile(source: &str, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
        let tokens = Scanner::new(source).scan_tokens(diagnostics);

        Parser::new(&tokens, diagnostics).parse()
    }

    /// Run one compilation unit.
    pub fn run(&mut self, source: &str) -> Outcome {
        info!("Running unit of {} bytes", source.len());

        let mut diagnostics = Diagnostics::new();

        // Parse even after lexical errors so syntax errors surface too.
        let statements: Vec<Stmt> = Self::compile(source, &mut diagnostics);

        if diagnostics.has_errors() {
            debug!("{} error(s) before resolution", diagnostics.len());
            return Outcome::StaticErrors(diagnostics.into_errors());
        }

        let locals = Resolver::new(&mut diagnostics)
            .with_globals(self.interpreter.global_names())
            .resolve(&statements);

        if diagnostics.has_errors() {
            debug!("{} resolution error(s)", diagnostics.len());
            return Outcome::StaticErrors(diagnostics.into_errors());
        }

        self.interpreter.resolve(locals);

        match self.interpreter.interpret(&statements) {
            Ok(()) => Outcome::Completed,
            Err(e) => Outcome::RuntimeError(e),
        }
    }

    /// Evaluate `source` as a single expression and return its value.
    pub fn evaluate(&mut self, source: &str) -> std::result::Result<Value, Outcome> {
        let mut diagnostics = Diagnostics::new();

        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        let expr: Option<Expr> = Parser::new(&tokens, &mut diagnostics).parse_expression();

        match expr {
            Some(expr) if !diagnostics.has_errors() => self
                .interpreter
                .evaluate(&expr)
                .map_err(Outcome::RuntimeError),

            _ => Err(Outcome::StaticErrors(diagnostics.into_errors())),
        }
    }
}
