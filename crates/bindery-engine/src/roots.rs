//! GC root tracking
//!
//! Roots are starting points for marking and include:
//! - Values pinned in open handle scopes
//! - Global bindings
//!
//! The outermost scope is permanent; handles pinned there live until the
//! engine is dropped, like handles created at the top level of a script.

use bindery::{ObjectId, ScriptValue};
use rustc_hash::FxHashMap;

/// Root set for garbage collection
pub struct RootSet {
    /// Handle scopes, innermost last
    scopes: Vec<Vec<ScriptValue>>,

    /// Global bindings
    globals: FxHashMap<String, ScriptValue>,
}

impl RootSet {
    /// Create a root set with only the permanent outer scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Vec::new()],
            globals: FxHashMap::default(),
        }
    }

    /// Open a handle scope
    pub fn open_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Close the innermost scope. The outer scope is never closed.
    pub fn close_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        } else {
            log::warn!("roots: close_scope without a matching open_scope");
        }
    }

    /// Number of open scopes, counting the outer one
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Pin a value in the innermost scope. Primitive values are ignored.
    pub fn pin(&mut self, value: &ScriptValue) {
        let mut objects = Vec::new();
        value.collect_objects(&mut objects);
        if objects.is_empty() {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(value.clone());
        }
    }

    /// Set a global binding
    pub fn set_global(&mut self, name: &str, value: ScriptValue) {
        self.globals.insert(name.to_string(), value);
    }

    /// Read a global binding
    pub fn global(&self, name: &str) -> Option<&ScriptValue> {
        self.globals.get(name)
    }

    /// Remove a global binding
    pub fn remove_global(&mut self, name: &str) -> Option<ScriptValue> {
        self.globals.remove(name)
    }

    /// Every heap object referenced from a root
    pub fn objects(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        for value in self.scopes.iter().flatten().chain(self.globals.values()) {
            value.collect_objects(&mut out);
        }
        out
    }

    /// Get total number of rooted values
    pub fn len(&self) -> usize {
        self.scopes.iter().map(Vec::len).sum::<usize>() + self.globals.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RootSet {
    fn default() -> Self {
        Self::new()
    }
}
