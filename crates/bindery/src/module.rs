//! Modules: named groups of exported values and functions
//!
//! Exported values are converted once, when the module is loaded, and
//! published as a global object. Exported functions are dispatched by
//! symbolic name (`module.function`) through the interception layer.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::BindResult;
use crate::intercept::CallContext;
use crate::native::{NativeType, NativeValue};
use crate::typed::IntoNative;

/// Native function body
pub type FunctionFn = Rc<dyn Fn(&mut CallContext<'_>, Vec<NativeValue>) -> BindResult<NativeValue>>;

/// An exported function
pub struct FunctionDef {
    pub(crate) name: String,
    pub(crate) params: Vec<NativeType>,
    pub(crate) body: FunctionFn,
}

impl FunctionDef {
    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[NativeType] {
        &self.params
    }
}

/// A module exposed to script
pub struct ModuleDef {
    name: String,
    pub(crate) values: Vec<(String, NativeValue)>,
    functions: FxHashMap<String, Rc<FunctionDef>>,
}

impl ModuleDef {
    /// Module name (also the global it is published under)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exported function by name
    pub fn function(&self, name: &str) -> Option<&Rc<FunctionDef>> {
        self.functions.get(name)
    }

    /// Symbolic names of all exported functions, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .keys()
            .map(|f| format!("{}.{}", self.name, f))
            .collect();
        names.sort();
        names
    }
}

/// Builder for [`ModuleDef`]
pub struct ModuleBuilder {
    def: ModuleDef,
}

impl ModuleBuilder {
    /// Start a module named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: ModuleDef {
                name: name.into(),
                values: Vec::new(),
                functions: FxHashMap::default(),
            },
        }
    }

    /// Export a constant value
    pub fn value(mut self, name: &str, value: impl IntoNative) -> Self {
        self.def.values.push((name.to_string(), value.into_native()));
        self
    }

    /// Export a function
    pub fn function<F>(mut self, name: &str, params: Vec<NativeType>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>, Vec<NativeValue>) -> BindResult<NativeValue> + 'static,
    {
        self.def.functions.insert(
            name.to_string(),
            Rc::new(FunctionDef {
                name: name.to_string(),
                params,
                body: Rc::new(f),
            }),
        );
        self
    }

    /// Finish the definition
    pub fn build(self) -> ModuleDef {
        self.def
    }
}
