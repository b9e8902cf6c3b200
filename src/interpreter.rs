use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionStmt, LiteralValue, Stmt};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nesting limit for calls, checked before the native stack runs out.
pub const MAX_CALL_DEPTH: usize = 200;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished.  `Return` and `Break` travel up through
/// enclosing statements until a call or a loop consumes them.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Return(Value),
    Break,
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
    call_depth: usize,
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter that prints to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` output goes to `out`, and defines
    /// native functions such as `clock`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock,
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    /// Replaces the default [`MAX_CALL_DEPTH`].
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Called by the resolver: the binding `id` refers to lives `depth`
    /// frames up from where it is evaluated.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Recording {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").  Stops at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Completion::Return(_) | Completion::Break = self.execute(stmt)? {
                debug!("Ignoring stray control flow at top level");
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// REPL flavour of [`interpret`]: a bare expression statement prints its
    /// value instead of discarding it.
    ///
    /// [`interpret`]: Interpreter::interpret
    pub fn evaluate_and_print(&mut self, statements: &[Stmt]) -> IResult<()> {
        for stmt in statements {
            match stmt {
                Stmt::Expression(expr) => {
                    let value = self.evaluate(expr)?;
                    self.emit(&value, expr_line(expr))?;
                }
                _ => {
                    self.execute(stmt)?;
                }
            }
        }

        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Completion> {
        match stmt {
            Stmt::Block(statements) => {
                debug!("Entering block with {} statements", statements.len());
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::Break(_) => Ok(Completion::Break),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class(name, superclass.as_ref(), methods)?;
                Ok(Completion::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Completion::Normal)
            }

            Stmt::Function(FunctionStmt { name, decl }) => {
                debug!("Defining function '{}'", name.lexeme);
                // The function closes over the frame it is declared in.
                let function = LoxFunction::new(
                    Some(name.lexeme.clone()),
                    Rc::clone(decl),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Function(Rc::new(function)));
                info!(
                    "Function '{}' defined with {} parameters",
                    name.lexeme,
                    decl.params.len()
                );
                Ok(Completion::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::Print { keyword, value } => {
                let value = self.evaluate(value)?;
                self.emit(&value, keyword.line)?;
                Ok(Completion::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Completion::Return(value))
            }

            Stmt::Var { name, initializer } => {
                match initializer {
                    Some(expr) => {
                        let value = self.evaluate(expr)?;
                        self.environment.borrow_mut().define(&name.lexeme, value);
                    }
                    None => self.environment.borrow_mut().declare(&name.lexeme),
                }
                debug!("Variable '{}' defined", name.lexeme);
                Ok(Completion::Normal)
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Completion::Normal => {}
                        Completion::Break => break,
                        done @ Completion::Return(_) => return Ok(done),
                    }
                }
                debug!("Exited while loop");
                Ok(Completion::Normal)
            }
        }
    }

    /// Runs `statements` in `environment`, then restores the previous frame
    /// whether or not they completed normally.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<Completion> {
        let previous = mem::replace(&mut self.environment, environment);

        let mut result = Ok(Completion::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Completion::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[FunctionStmt],
    ) -> IResult<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::InvalidSuperclass {
                        line: expr_line(expr),
                    })
                }
            },
            None => None,
        };

        // Methods may refer to the class by name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let previous = superclass.as_ref().map(|superclass| {
            let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
            environment.define("super", Value::Class(Rc::clone(superclass)));
            mem::replace(&mut self.environment, Rc::new(RefCell::new(environment)))
        });

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Some(method.name.lexeme.clone()),
                    Rc::clone(&method.decl),
                    Rc::clone(&self.environment),
                    method.name.lexeme == "init",
                );
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        if let Some(previous) = previous {
            self.environment = previous;
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);
        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        info!("Class '{}' defined", name.lexeme);
        Ok(())
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&depth) => {
                        let found = self.environment.borrow_mut().assign_at(
                            depth,
                            &name.lexeme,
                            value.clone(),
                        );
                        if !found {
                            return Err(undefined(name));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => match left {
                Some(left) => self.evaluate_binary(left, operator, right),
                None => Err(RuntimeError::MissingOperand {
                    line: operator.line,
                }),
            },

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Comma { left, right } => {
                self.evaluate(left)?;
                self.evaluate(right)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::NotAnInstance {
                    what: "properties",
                    line: name.line,
                }),
            },

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Lambda { decl, .. } => {
                let function =
                    LoxFunction::new(None, Rc::clone(decl), Rc::clone(&self.environment), false);
                Ok(Value::Function(Rc::new(function)))
            }

            Expr::Literal { value: literal, .. } => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = if operator.token_type == TokenType::OR {
                    is_truthy(&left)
                } else {
                    !is_truthy(&left)
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::NotAnInstance {
                        what: "fields",
                        line: name.line,
                    });
                };
                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(type_error("Operand must be a number.", operator)),
                    },
                    _ => Ok(Value::Bool(!is_truthy(&right))),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> IResult<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match op.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
            TokenType::PLUS => {
                return match (left, right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                    _ => Err(type_error(
                        "Operands must be two numbers or two strings.",
                        op,
                    )),
                }
            }
            _ => {}
        }

        let (Value::Number(a), Value::Number(b)) = (left, right) else {
            return Err(type_error("Operands must be numbers.", op));
        };

        Ok(match op.token_type {
            TokenType::MINUS => Value::Number(a - b),
            TokenType::STAR => Value::Number(a * b),
            TokenType::SLASH => {
                if b == 0.0 {
                    return Err(RuntimeError::DivisionByZero { line: op.line });
                }
                Value::Number(a / b)
            }
            TokenType::GREATER => Value::Bool(a > b),
            TokenType::GREATER_EQUAL => Value::Bool(a >= b),
            TokenType::LESS => Value::Bool(a < b),
            _ => Value::Bool(a <= b),
        })
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> IResult<Value> {
        let callee = self.evaluate(callee)?;

        let Some(function) = callee.as_callable() else {
            return Err(RuntimeError::NotCallable { line: paren.line });
        };

        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }

        if values.len() != function.arity() {
            return Err(RuntimeError::Arity {
                expected: function.arity(),
                got: values.len(),
                line: paren.line,
            });
        }

        if self.call_depth >= self.max_call_depth {
            info!("Call depth limit {} reached", self.max_call_depth);
            return Err(RuntimeError::StackOverflow { line: paren.line });
        }

        self.call_depth += 1;
        let result = function.call(self, paren, values);
        self.call_depth -= 1;
        result
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let depth = self.locals.get(&id).copied().ok_or_else(|| undefined(keyword))?;

        let superclass = self.environment.borrow().get_at(depth, "super");
        let Some(Value::Class(superclass)) = superclass else {
            return Err(undefined(keyword));
        };

        // `this` always sits one frame inside the `super` frame.
        let object = depth
            .checked_sub(1)
            .and_then(|depth| self.environment.borrow().get_at(depth, "this"));
        let Some(Value::Instance(object)) = object else {
            return Err(RuntimeError::UndefinedVariable {
                name: "this".to_string(),
                line: keyword.line,
            });
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(object)))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&depth) => self
                .environment
                .borrow()
                .get_at(depth, &name.lexeme)
                .ok_or_else(|| undefined(name)),
            None => self.globals.borrow().get(name),
        }
    }

    fn emit(&mut self, value: &Value, line: usize) -> IResult<()> {
        writeln!(self.out, "{}", value).map_err(|e| RuntimeError::Output {
            message: e.to_string(),
            line,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Bool(false))
}

fn type_error(message: &str, operator: &Token) -> RuntimeError {
    RuntimeError::Type {
        message: message.to_string(),
        line: operator.line,
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable {
        name: name.lexeme.clone(),
        line: name.line,
    }
}

/// Source line of an expression, for errors that have no operator token of
/// their own.
fn expr_line(expr: &Expr) -> usize {
    match expr {
        Expr::Assign { name, .. } | Expr::Variable { name, .. } | Expr::Get { name, .. } => {
            name.line
        }
        Expr::Binary { operator, .. }
        | Expr::Logical { operator, .. }
        | Expr::Unary { operator, .. } => operator.line,
        Expr::Call { paren, .. } => paren.line,
        Expr::Conditional { condition, .. } => expr_line(condition),
        Expr::Comma { left, .. } => expr_line(left),
        Expr::Grouping(inner) => expr_line(inner),
        Expr::Set { name, .. } => name.line,
        Expr::Super { keyword, .. } | Expr::This { keyword, .. } => keyword.line,
        Expr::Lambda { keyword, .. } => keyword.line,
        Expr::Literal { line, .. } => *line,
    }
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> Result<Value, String> {
    let now = chrono::Utc::now();
    Ok(Value::Number(now.timestamp_micros() as f64 / 1_000_000.0))
}
