//! Parenthesised prefix rendering of the AST, used by the `parse` subcommand
//! and by tests that pin down precedence and desugaring.

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

pub struct AstPrinter;

impl AstPrinter {
    pub fn print_program(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Block(statements) => {
                let inner: Vec<String> = statements.iter().map(|s| self.print_stmt(s)).collect();
                if inner.is_empty() {
                    "(block)".to_string()
                } else {
                    format!("(block {})", inner.join(" "))
                }
            }

            Stmt::Break(_) => "(break)".to_string(),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    out.push_str(&format!(" < {}", self.print_expr(superclass)));
                }
                for method in methods {
                    out.push(' ');
                    out.push_str(&self.print_function(Some(&method.name.lexeme), &method.decl));
                }
                out.push(')');
                out
            }

            Stmt::Expression(expr) => format!("(; {})", self.print_expr(expr)),

            Stmt::Function(function) => {
                self.print_function(Some(&function.name.lexeme), &function.decl)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::Print { value, .. } => format!("(print {})", self.print_expr(value)),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print_expr(value)),
                None => "(return)".to_string(),
            },

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, self.print_expr(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                self.print_expr(condition),
                self.print_stmt(body)
            ),
        }
    }

    pub fn print_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print_expr(value))
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => match left {
                Some(left) => format!(
                    "({} {} {})",
                    operator.lexeme,
                    self.print_expr(left),
                    self.print_expr(right)
                ),
                None => format!("({} <missing> {})", operator.lexeme, self.print_expr(right)),
            },

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print_expr(callee));
                for arg in arguments {
                    out.push(' ');
                    out.push_str(&self.print_expr(arg));
                }
                out.push(')');
                out
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(?: {} {} {})",
                self.print_expr(condition),
                self.print_expr(then_branch),
                self.print_expr(else_branch)
            ),

            Expr::Comma { left, right } => {
                format!("(, {} {})", self.print_expr(left), self.print_expr(right))
            }

            Expr::Get { object, name } => format!("(. {} {})", self.print_expr(object), name.lexeme),

            Expr::Grouping(expr) => format!("(group {})", self.print_expr(expr)),

            Expr::Lambda { decl, .. } => self.print_function(None, decl),

            Expr::Literal { value, .. } => match value {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => s.to_string(),

                LiteralValue::True => "true".to_string(),

                LiteralValue::False => "false".to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print_expr(left),
                self.print_expr(right)
            ),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                self.print_expr(object),
                name.lexeme,
                self.print_expr(value)
            ),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::This { .. } => "this".to_string(),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print_expr(right))
            }

            Expr::Variable { name, .. } => name.lexeme.to_string(),
        }
    }

    fn print_function(&self, name: Option<&str>, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        let body: Vec<String> = decl.body.iter().map(|s| self.print_stmt(s)).collect();

        let head = format!("(fun {}({})", name.unwrap_or(""), params.join(" "));

        if body.is_empty() {
            format!("{head})")
        } else {
            format!("{head} {})", body.join(" "))
        }
    }
}
