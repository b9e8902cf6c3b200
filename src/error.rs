//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! The module **does not** print diagnostics itself.  Every pass hands its
//! findings to a [`Reporter`]; the embedding driver decides where they go.

use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.  `location` is either empty, ` at end` or
    /// ` at 'lexeme'`.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**, located at `token`.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**, located at `token`.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Source line the error points at.
    pub fn line(&self) -> usize {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. } => *line,
            LoxError::Runtime(e) => e.line(),
        }
    }
}

fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Faults raised while evaluating a program.  Every variant carries the line
/// of the token that caused it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    /// Operand types do not fit the operator.
    #[error("{message}\n[line {line}]")]
    Type { message: String, line: usize },

    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Variable '{name}' is not initialized.\n[line {line}]")]
    UninitializedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    Arity {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { line: usize },

    /// Property access or assignment on something that is not an instance.
    #[error("Only instances have {what}.\n[line {line}]")]
    NotAnInstance { what: &'static str, line: usize },

    #[error("Superclass must be a class.\n[line {line}]")]
    InvalidSuperclass { line: usize },

    #[error("Cannot divide by zero.\n[line {line}]")]
    DivisionByZero { line: usize },

    /// A `Binary` node produced by the parser's missing-operand error production.
    #[error("Invalid binary expression with missing left operand.\n[line {line}]")]
    MissingOperand { line: usize },

    /// Failure reported by a host-provided function.
    #[error("{message}\n[line {line}]")]
    Native { message: String, line: usize },

    /// The `print` sink refused the write.
    #[error("Failed to write output: {message}\n[line {line}]")]
    Output { message: String, line: usize },

    /// Calls nested deeper than the interpreter allows.
    #[error("Stack overflow.\n[line {line}]")]
    StackOverflow { line: usize },
}

impl RuntimeError {
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::Type { line, .. }
            | RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::UninitializedVariable { line, .. }
            | RuntimeError::UndefinedProperty { line, .. }
            | RuntimeError::Arity { line, .. }
            | RuntimeError::NotCallable { line }
            | RuntimeError::NotAnInstance { line, .. }
            | RuntimeError::InvalidSuperclass { line }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::MissingOperand { line }
            | RuntimeError::Native { line, .. }
            | RuntimeError::Output { line, .. }
            | RuntimeError::StackOverflow { line } => *line,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Diagnostic sink shared by every pass.  Errors block execution, warnings
/// never do.
pub trait Reporter {
    fn error(&mut self, error: LoxError);

    fn warning(&mut self, message: String);
}

/// A [`Reporter`] that simply keeps everything it is told.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub errors: Vec<LoxError>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Rendered error messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl Reporter for Diagnostics {
    fn error(&mut self, error: LoxError) {
        self.errors.push(error);
    }

    fn warning(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Counts errors on their way to another reporter, so a driver can tell
/// whether a pass failed without owning the sink.
pub struct Tally<'r> {
    inner: &'r mut dyn Reporter,
    errors: usize,
}

impl<'r> Tally<'r> {
    pub fn new(inner: &'r mut dyn Reporter) -> Self {
        Self { inner, errors: 0 }
    }

    pub fn errors(&self) -> usize {
        self.errors
    }
}

impl Reporter for Tally<'_> {
    fn error(&mut self, error: LoxError) {
        self.errors += 1;
        self.inner.error(error);
    }

    fn warning(&mut self, message: String) {
        self.inner.warning(message);
    }
}
