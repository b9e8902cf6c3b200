use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    initialized: bool,
}

/// One scope frame.  Frames are shared (`Rc<RefCell<_>>`) because a closure
/// keeps the frame it was created in alive, and assignments through any
/// holder are visible to all of them.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Binding>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(
            name.to_string(),
            Binding {
                value,
                initialized: true,
            },
        );
    }

    /// Bind `name` without a value (`var a;`).  Reading it through [`get`]
    /// fails until something is assigned.
    ///
    /// [`get`]: Environment::get
    pub fn declare(&mut self, name: &str) {
        self.values.insert(
            name.to_string(),
            Binding {
                value: Value::Nil,
                initialized: false,
            },
        );
    }

    /// Search this frame, then each enclosing one.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(binding) = self.values.get(&name.lexeme) {
            if !binding.initialized {
                return Err(RuntimeError::UninitializedVariable {
                    name: name.lexeme.clone(),
                    line: name.line,
                });
            }

            Ok(binding.value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            })
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(binding) = self.values.get_mut(&name.lexeme) {
            binding.value = value;
            binding.initialized = true;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            })
        }
    }

    /// Read `name` from the frame exactly `depth` links up, with no search.
    pub fn get_at(&self, depth: usize, name: &str) -> Option<Value> {
        if depth == 0 {
            return self.values.get(name).map(|binding| binding.value.clone());
        }

        self.enclosing.as_ref()?.borrow().get_at(depth - 1, name)
    }

    /// Write `name` in the frame exactly `depth` links up.  Returns `false`
    /// when no such binding exists there.
    pub fn assign_at(&mut self, depth: usize, name: &str, value: Value) -> bool {
        if depth == 0 {
            return match self.values.get_mut(name) {
                Some(binding) => {
                    binding.value = value;
                    binding.initialized = true;
                    true
                }
                None => false,
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign_at(depth - 1, name, value),
            None => false,
        }
    }
}
