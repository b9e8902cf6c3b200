//! Abstract syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Expressions that read or write a binding (`Variable`, `Assign`, `This`,
//! `Super`) carry an [`ExprId`].  The resolver records lexical depths against
//! that id, so two uses of the same name at different sites resolve
//! independently.

use std::rc::Rc;

use crate::token::Token;

/// Identity of a binding-referencing expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub usize);

/// Hands out [`ExprId`]s.  One counter lives for a whole session so ids from
/// different REPL lines never collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprIds {
    next: usize,
}

impl ExprIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree.  They do
/// **not** retain the originating [`Token`]; [`Expr::Literal`] keeps its line.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal (Lox’s `null`).
    Nil,
}

/// Parameters and body shared by named functions, methods and lambdas.
///
/// Held behind an `Rc` so a closure keeps its code alive after the statement
/// list it was parsed from is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// A named function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionStmt {
    pub name: Token,
    pub decl: Rc<FunctionDecl>,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    ///
    /// `left` is absent only for the parser's missing-operand error production.
    Binary {
        left: Option<Box<Expr>>,
        /// Operator token such as `+`, `*`, `==`, …
        operator: Token,
        right: Box<Expr>,
    },

    /// Function‑ or method‑call expression
    /// *Example:* `clock()` or `add(1, 2)`
    Call {
        /// Expression that evaluates to a callable (variable, property, etc.).
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        /// Argument list (may be empty).
        arguments: Vec<Expr>,
    },

    /// `condition ? then_branch : else_branch`
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `left , right`: evaluates both, yields `right`.
    Comma { left: Box<Expr>, right: Box<Expr> },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Anonymous function: `fun (a, b) { … }`
    Lambda {
        keyword: Token,
        decl: Rc<FunctionDecl>,
    },

    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal { value: LiteralValue, line: usize },

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// The 'this' keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary { operator: Token, right: Box<Expr> },

    /// Variable access ‑ resolves to the identifier’s current value at runtime.
    Variable { id: ExprId, name: Token },
}

/// **Abstract‑Syntax‑Tree node** for *statements* (complete executable
/// constructs).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `break` inside a loop; the token is kept for diagnostics.
    Break(Token),

    /// `class Name (< Superclass)? { methods }`.  `superclass` is always an
    /// `Expr::Variable`.
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<FunctionStmt>,
    },

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(FunctionStmt),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `print` statement used for output.
    Print { keyword: Token, value: Expr },

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Optional expression to return.
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `while` loop.  `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },
}
