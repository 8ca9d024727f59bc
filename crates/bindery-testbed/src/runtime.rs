//! Runtime: a bridge over the reference engine with the sample bindings
//! installed, plus the scope and collection helpers the tests drive it with.

use bindery::{BindResult, Bridge, BridgeOptions, ScriptValue};
use bindery_engine::{Engine, HeapOptions};

use crate::{types, view};

/// Bridge, engine and bindings wired together
pub struct Runtime {
    bridge: Bridge,
}

impl Runtime {
    /// Create a runtime with default options
    pub fn new() -> BindResult<Self> {
        Self::with_options(BridgeOptions::default(), HeapOptions::default())
    }

    /// Create a runtime
    pub fn with_options(options: BridgeOptions, heap: HeapOptions) -> BindResult<Self> {
        let mut bridge = Bridge::with_options(Engine::with_options(heap), options);
        view::register(&mut bridge)?;
        bridge.load_module(types::module())?;
        Ok(Self { bridge })
    }

    /// Underlying bridge
    pub fn bridge(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    /// Exports of the `types` module
    pub fn types(&self) -> ScriptValue {
        self.bridge
            .host()
            .global(types::MODULE)
            .unwrap_or(ScriptValue::Undefined)
    }

    /// Call a `types` function
    pub fn call_types(&mut self, name: &str, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        self.bridge.call_function(types::MODULE, name, args)
    }

    /// `new View()`
    pub fn new_view(&mut self) -> BindResult<ScriptValue> {
        self.bridge.construct(view::CLASS, &[])
    }

    /// `receiver.name(...args)`
    pub fn call(&mut self, receiver: &ScriptValue, name: &str, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        self.bridge.call_method(receiver, name, args)
    }

    /// Run `f` in a fresh handle scope; values created inside become
    /// unreachable once it returns, unless stored elsewhere.
    pub fn run_in_new_scope<T>(&mut self, f: impl FnOnce(&mut Runtime) -> BindResult<T>) -> BindResult<T> {
        self.bridge.host_mut().open_scope();
        let result = f(self);
        self.bridge.host_mut().close_scope();
        result
    }

    /// Create a script function
    pub fn function(&mut self, name: &str, body: impl Fn(&[ScriptValue]) -> BindResult<ScriptValue> + 'static) -> ScriptValue {
        self.bridge.create_function(name, body)
    }

    /// Run `f` once `value` has been collected
    pub fn add_finalizer(&mut self, value: &ScriptValue, f: impl FnOnce() + 'static) -> BindResult<()> {
        self.bridge.add_finalizer(value, f)
    }

    /// Collect until `done` holds or the pass limit is reached
    pub fn gc_until(&mut self, mut done: impl FnMut() -> bool) -> bool {
        self.bridge.gc_until(|_| done())
    }
}
