use crate::ast::Value;
use crate::error::RuntimeError;
use ahash::AHashMap;

/// Lexical scopes of a running program. Scope 0 holds the program-level bindings.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<AHashMap<String, Value>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![AHashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declares `name` in the innermost scope.
    pub fn declare(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let scope = self.innermost();
        if scope.contains_key(name) {
            return Err(RuntimeError::Syntax(format!(
                "Identifier '{name}' has already been declared"
            )));
        }
        scope.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// Writes to the nearest binding of `name`, creating a program-level binding
    /// when none exists.
    pub fn assign(&mut self, name: &str, value: Value) {
        match self.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.scopes[0].insert(name.to_string(), value);
            }
        }
    }

    /// Detaches every scope except the program scope and opens a fresh one for a
    /// function call. Pass the result to [`Self::leave_call`] afterwards.
    pub fn enter_call(&mut self) -> Vec<AHashMap<String, Value>> {
        let saved = self.scopes.split_off(1);
        self.push();
        saved
    }

    pub fn leave_call(&mut self, saved: Vec<AHashMap<String, Value>>) {
        self.scopes.truncate(1);
        self.scopes.extend(saved);
    }

    fn innermost(&mut self) -> &mut AHashMap<String, Value> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}
