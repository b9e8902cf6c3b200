//! A tree-walking interpreter for the Lox language.
//!
//! Source text flows through four passes: [`scanner`] → [`parser`] →
//! [`resolver`] → [`interpreter`].  [`Lox`] strings them together for a
//! whole file or a single REPL line.
//!
//! ```
//! use rox::error::Diagnostics;
//! use rox::{Lox, Status};
//!
//! let mut lox = Lox::with_output(Box::new(std::io::sink()));
//! let mut diagnostics = Diagnostics::new();
//!
//! assert_eq!(lox.run("var a = 1; print a + 2;", &mut diagnostics), Status::Ok);
//! assert_eq!(lox.run("print ;", &mut diagnostics), Status::StaticError);
//! ```

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::Write;
use std::mem;

use log::{debug, info};

use crate::ast::{ExprIds, Stmt};
use crate::error::{LoxError, Reporter, Tally};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;

/// Outcome of running one batch of source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// Scanning, parsing or resolution reported an error; nothing ran.
    StaticError,
    /// Execution stopped at a runtime error.
    RuntimeError,
}

/// One interpreter session.  Globals, closures and the expression id counter
/// persist between calls, which is what lets a REPL build on earlier lines.
pub struct Lox {
    interpreter: Interpreter,
    ids: ExprIds,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    /// Session whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            ids: ExprIds::new(),
        }
    }

    /// Run a whole program.
    pub fn run(&mut self, source: &str, reporter: &mut dyn Reporter) -> Status {
        self.execute(source, reporter, false)
    }

    /// Run one REPL line.  Bare expression statements echo their value.
    pub fn run_line(&mut self, source: &str, reporter: &mut dyn Reporter) -> Status {
        self.execute(source, reporter, true)
    }

    fn execute(&mut self, source: &str, reporter: &mut dyn Reporter, echo: bool) -> Status {
        let mut tally = Tally::new(reporter);

        let Some(statements) = self.front_end(source, &mut tally) else {
            return Status::StaticError;
        };

        Resolver::new(&mut self.interpreter, &mut tally).resolve(&statements);
        if tally.errors() > 0 {
            debug!("Resolution reported {} error(s)", tally.errors());
            return Status::StaticError;
        }

        let result = if echo {
            self.interpreter.evaluate_and_print(&statements)
        } else {
            self.interpreter.interpret(&statements)
        };

        match result {
            Ok(()) => Status::Ok,
            Err(e) => {
                info!("Runtime error: {}", e);
                tally.error(LoxError::Runtime(e));
                Status::RuntimeError
            }
        }
    }

    /// Scan and parse, continuing the session's id numbering.  `None` when
    /// either pass reported an error.
    fn front_end(&mut self, source: &str, tally: &mut Tally<'_>) -> Option<Vec<Stmt>> {
        let tokens = scanner::scan(source, tally);

        let mut parser = Parser::new(tokens, tally).with_ids(mem::take(&mut self.ids));
        let parsed = parser.parse();
        self.ids = parser.ids();

        if tally.errors() > 0 {
            debug!("Front end reported {} error(s)", tally.errors());
            return None;
        }

        parsed.into_iter().collect()
    }
}
