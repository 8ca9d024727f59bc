//! Bridge: owns the host engine and all boundary state
//!
//! The bridge is the single entry point for script-facing operations:
//! defining classes, loading modules, wrapping natives, maintaining ownership
//! edges, handing out weak handles and driving collection. Method dispatch
//! lives in [`crate::intercept`] and finalization in [`crate::finalize`].

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::class::{ClassDef, ClassTable};
use crate::convert::Converter;
use crate::defaults::BridgeOptions;
use crate::edges::EdgeTable;
use crate::error::{BindError, BindResult};
use crate::host::HostEngine;
use crate::module::ModuleDef;
use crate::native::{NativeObject, NativeType, NativeValue, WeakHandle};
use crate::registry::{HandleRegistry, WrapperMode};
use crate::value::{ObjectId, ScriptString, ScriptValue};

/// Boundary between native objects and a garbage-collected script heap.
pub struct Bridge {
    pub(crate) host: Box<dyn HostEngine>,
    pub(crate) registry: HandleRegistry,
    pub(crate) edges: EdgeTable,
    pub(crate) classes: ClassTable,
    pub(crate) modules: FxHashMap<String, Rc<ModuleDef>>,
    pub(crate) options: BridgeOptions,
}

impl Bridge {
    /// Create a bridge over `host` with default options
    pub fn new(host: impl HostEngine + 'static) -> Self {
        Self::with_options(host, BridgeOptions::default())
    }

    /// Create a bridge over `host`
    pub fn with_options(host: impl HostEngine + 'static, options: BridgeOptions) -> Self {
        Self {
            host: Box::new(host),
            registry: HandleRegistry::new(),
            edges: EdgeTable::new(),
            classes: ClassTable::new(),
            modules: FxHashMap::default(),
            options,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Configuration
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Underlying host engine
    pub fn host(&self) -> &dyn HostEngine {
        &*self.host
    }

    /// Underlying host engine
    pub fn host_mut(&mut self) -> &mut dyn HostEngine {
        &mut *self.host
    }

    /// Handle registry
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Ownership edges
    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    /// Registered classes
    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a class. Its base, if any, must already be registered.
    pub fn define_class(&mut self, class: ClassDef) -> BindResult<()> {
        log::debug!("bridge: define class {}", class.name());
        self.classes.insert(class)
    }

    /// Register a module, publish its values as a global object and return
    /// that object.
    pub fn load_module(&mut self, module: ModuleDef) -> BindResult<ScriptValue> {
        let name = module.name().to_string();
        let values = module.values.clone();
        let exports = self.with_scope(|bridge| {
            let mut cx = bridge.converter();
            let mut entries = Vec::with_capacity(values.len());
            for (key, value) in values {
                entries.push((ScriptString::from_utf8(&key), cx.to_script(value)?));
            }
            Ok(ScriptValue::Map(entries))
        })?;
        self.host.set_global(&name, exports.clone());
        log::debug!("bridge: loaded module {} ({})", name, module.symbols().join(", "));
        self.modules.insert(name, Rc::new(module));
        Ok(exports)
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    pub(crate) fn converter(&mut self) -> Converter<'_> {
        Converter::new(
            &mut *self.host,
            &mut self.registry,
            &mut self.edges,
            &self.classes,
            self.options.max_conversion_depth,
        )
    }

    /// Convert a native value to script
    pub fn to_script(&mut self, value: NativeValue) -> BindResult<ScriptValue> {
        self.converter().to_script(value)
    }

    /// Convert a script value to the declared native type
    pub fn from_script(&mut self, value: &ScriptValue, ty: &NativeType, index: usize) -> BindResult<NativeValue> {
        self.converter().from_script(value, ty, index)
    }

    /// Wrapper for a native instance; the same instance always yields the
    /// same wrapper while that wrapper is alive.
    pub fn wrap_object(&mut self, native: NativeObject) -> ObjectId {
        self.converter().wrap(native)
    }

    /// Native instance behind a wrapper value
    pub fn native_of(&self, value: &ScriptValue) -> Option<NativeObject> {
        match value {
            ScriptValue::Wrapper(id) if self.host.is_alive(*id) => self.registry.native(*id).cloned(),
            _ => None,
        }
    }

    // ========================================================================
    // Ownership
    // ========================================================================

    /// Make `child` reachable whenever `parent` is. Idempotent.
    pub fn add_ownership_edge(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        self.edges.add(parent, child)
    }

    /// Drop the parent → child retention. No-op if absent.
    pub fn remove_ownership_edge(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        self.edges.remove(parent, child)
    }

    /// Non-retaining handle to a live heap object
    pub fn pass_weak(&self, value: &ScriptValue) -> Option<WeakHandle> {
        let (kind, id) = value.object_ref()?;
        self.host.is_alive(id).then(|| WeakHandle::new(kind, id))
    }

    /// Script value behind a weak handle, if its target is still alive
    pub fn upgrade(&self, handle: &WeakHandle) -> Option<ScriptValue> {
        self.host.is_alive(handle.id()).then(|| handle.to_value())
    }

    /// Switch a wrapper between weak and strong retention
    pub fn set_wrapper_mode(&mut self, wrapper: ObjectId, mode: WrapperMode) -> bool {
        self.registry.set_mode(wrapper, mode)
    }

    // ========================================================================
    // Host helpers
    // ========================================================================

    /// Run `f` inside a host handle scope. The scope closes on every path.
    pub fn with_scope<T>(&mut self, f: impl FnOnce(&mut Bridge) -> BindResult<T>) -> BindResult<T> {
        self.host.open_scope();
        let result = f(self);
        self.host.close_scope();
        result
    }

    /// Create a script function and pin it in the current scope
    pub fn create_function<F>(&mut self, name: &str, body: F) -> ScriptValue
    where
        F: Fn(&[ScriptValue]) -> BindResult<ScriptValue> + 'static,
    {
        let id = self.host.create_function(name, Vec::new(), Rc::new(body));
        let value = ScriptValue::Function(id);
        self.host.pin(&value);
        value
    }

    /// Call a script function
    pub fn call_script(&mut self, function: &ScriptValue, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        match function {
            ScriptValue::Function(id) => self.host.call_function(*id, args),
            other => Err(BindError::NotCallable(other.type_name().to_string())),
        }
    }

    /// Register a host finalizer on a heap object
    pub fn add_finalizer(&mut self, value: &ScriptValue, f: impl FnOnce() + 'static) -> BindResult<()> {
        let id = value
            .object_id()
            .ok_or_else(|| BindError::Host(format!("cannot finalize a {}", value.type_name())))?;
        self.host.add_finalizer(id, Box::new(f))
    }
}
