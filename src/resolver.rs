//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, Variable>` tracking the
//!    state of every local binding).
//! 2. Report static errors (redeclaration, read in own initializer, misplaced
//!    `return`, `break`, `this` or `super`, self-inheritance) and warn about
//!    locals that are never read.
//! 3. Tell the interpreter, for *each* local variable occurrence, at what
//!    depth its binding lives.  Anything not found in a scope is a global, so
//!    the interpreter never falls back to dynamic lookup that would see a
//!    later shadowing local.
//!
//! Errors go to the [`Reporter`] and the walk keeps going, so one pass
//! surfaces every problem in the program.

use std::collections::HashMap;

use bitflags::bitflags;
use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, FunctionStmt, Stmt};
use crate::error::{LoxError, Reporter};
use crate::interpreter::Interpreter;
use crate::token::Token;

bitflags! {
    /// Lifecycle of a local binding.
    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    struct VariableState: u8 {
        const DECLARED = 1 << 0;
        const INITIALIZED = 1 << 1;
        const USED = 1 << 2;
        /// Function parameters are never reported as unused.
        const PARAMETER = 1 << 3;
        /// Bindings the language introduces itself (`this`, `super`).
        const SYNTHETIC = 1 << 4;
    }
}

#[derive(Debug)]
struct Variable {
    state: VariableState,
    token: Token,
}

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
    Lambda,
}

/// What kind of class body are we in?  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances by calling back into the interpreter.
pub struct Resolver<'i, 'r> {
    interpreter: &'i mut Interpreter,
    reporter: &'r mut dyn Reporter,
    scopes: Vec<HashMap<String, Variable>>,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
}

impl<'i, 'r> Resolver<'i, 'r> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'i mut Interpreter, reporter: &'r mut dyn Reporter) -> Self {
        info!("Resolver instantiated");
        Resolver {
            interpreter,
            reporter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Break(keyword) => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Cannot use 'break' keyword outside of loop.");
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),

            Stmt::Expression(expr) | Stmt::Print { value: expr, .. } => self.resolve_expr(expr),

            Stmt::Function(FunctionStmt { name, decl }) => {
                // The name is visible inside its own body, for recursion.
                self.declare(name, VariableState::empty());
                self.define(name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name, VariableState::empty());
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[FunctionStmt]) {
        let enclosing = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name, VariableState::empty());
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: parent, .. } = superclass {
                if parent.lexeme == name.lexeme {
                    self.error(parent, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.define_synthetic("super", name);
        }

        self.begin_scope();
        self.define_synthetic("this", name);

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(&method.decl, kind);
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } => {
                if let Some(left) = left {
                    self.resolve_expr(left);
                }
                self.resolve_expr(right);
            }

            Expr::Logical { left, right, .. } | Expr::Comma { left, right } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { id, name } => {
                let uninitialized = self.scopes.last().is_some_and(|scope| {
                    scope
                        .get(&name.lexeme)
                        .is_some_and(|var| !var.state.contains(VariableState::INITIALIZED))
                });
                if uninitialized {
                    self.error(name, "Can't read local variable in its own initializer.");
                }
                self.resolve_local(*id, name, true);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name, false);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::Lambda { decl, .. } => self.resolve_function(decl, FunctionType::Lambda),

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.")
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword, true);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword, true);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        // `break` never crosses a function boundary.
        let enclosing_loops = std::mem::take(&mut self.loop_depth);

        self.begin_scope();
        for param in &decl.params {
            self.declare(param, VariableState::PARAMETER);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.loop_depth = enclosing_loops;
        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, warning about locals nobody read.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<(&String, &Variable)> = scope
            .iter()
            .filter(|(_, var)| {
                !var.state
                    .intersects(VariableState::PARAMETER | VariableState::SYNTHETIC)
                    && var.state.contains(VariableState::INITIALIZED)
                    && !var.state.contains(VariableState::USED)
            })
            .collect();
        unused.sort_by(|(a, x), (b, y)| (x.token.line, a).cmp(&(y.token.line, b)));

        for (name, var) in unused {
            self.reporter.warning(format!(
                "[line {}] Variable {} is never used.",
                var.token.line, name
            ));
        }
    }

    fn declare(&mut self, name: &Token, extra: VariableState) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(
            name.lexeme.clone(),
            Variable {
                state: VariableState::DECLARED | extra,
                token: name.clone(),
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(var) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            var.state |= VariableState::INITIALIZED;
        }
    }

    /// Bind `this` or `super` in the innermost scope.  `at` only supplies a
    /// line for diagnostics.
    fn define_synthetic(&mut self, name: &str, at: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                Variable {
                    state: VariableState::DECLARED
                        | VariableState::INITIALIZED
                        | VariableState::SYNTHETIC,
                    token: at.clone(),
                },
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it to the
    /// global frame if no scope has it.  Reads mark the binding used.
    fn resolve_local(&mut self, id: ExprId, name: &Token, is_read: bool) {
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(var) = scope.get_mut(&name.lexeme) {
                if is_read {
                    var.state |= VariableState::USED;
                }
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    fn error(&mut self, token: &Token, message: &str) {
        debug!("Resolve error at line {}: {}", token.line, message);
        self.reporter.error(LoxError::resolve(token, message));
    }
}
