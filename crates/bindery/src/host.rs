//! HostEngine trait: what the bridge needs from the script engine
//!
//! The bridge never touches the host heap directly. Allocation, handle
//! scopes, liveness checks, function calls and collection all go through
//! this trait, so any tracing collector can sit underneath.

use std::rc::Rc;

use crate::error::BindResult;
use crate::value::{ObjectId, ScriptValue};

/// Body of a script function.
pub type HostFunction = Rc<dyn Fn(&[ScriptValue]) -> BindResult<ScriptValue>>;

/// Host-side finalizer registered on a single object.
pub type HostFinalizer = Box<dyn FnOnce()>;

/// Extra reachability the bridge contributes to a collection pass.
///
/// Strong wrappers act as roots, and every ownership edge makes its child
/// reachable from its parent.
pub trait Retention {
    /// Visit objects that must be treated as roots
    fn extra_roots(&self, visit: &mut dyn FnMut(ObjectId));

    /// Visit objects retained by `id`
    fn retained_by(&self, id: ObjectId, visit: &mut dyn FnMut(ObjectId));
}

/// Retention source that contributes nothing.
pub struct NoRetention;

impl Retention for NoRetention {
    fn extra_roots(&self, _visit: &mut dyn FnMut(ObjectId)) {}

    fn retained_by(&self, _id: ObjectId, _visit: &mut dyn FnMut(ObjectId)) {}
}

/// Abstract script engine.
///
/// All calls happen on the single script thread and never block.
pub trait HostEngine {
    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate a wrapper object for an instance of `class`
    fn alloc_wrapper(&mut self, class: &'static str) -> ObjectId;

    /// Allocate a function object. `captures` are traced like properties.
    fn create_function(&mut self, name: &str, captures: Vec<ScriptValue>, body: HostFunction) -> ObjectId;

    /// Check whether `id` still names a live object
    fn is_alive(&self, id: ObjectId) -> bool;

    /// Invoke a function object
    fn call_function(&mut self, id: ObjectId, args: &[ScriptValue]) -> BindResult<ScriptValue>;

    // ========================================================================
    // Handle scopes
    // ========================================================================

    /// Open a handle scope
    fn open_scope(&mut self);

    /// Close the innermost handle scope, releasing its handles
    fn close_scope(&mut self);

    /// Keep `value` alive until the innermost scope closes
    fn pin(&mut self, value: &ScriptValue);

    // ========================================================================
    // Globals and properties
    // ========================================================================

    /// Set a global binding (a root)
    fn set_global(&mut self, name: &str, value: ScriptValue);

    /// Read a global binding
    fn global(&self, name: &str) -> Option<ScriptValue>;

    /// Remove a global binding
    fn remove_global(&mut self, name: &str) -> Option<ScriptValue>;

    /// Set an ordinary (traced) property on a heap object
    fn set_property(&mut self, id: ObjectId, key: &str, value: ScriptValue) -> BindResult<()>;

    /// Read an ordinary property of a heap object
    fn property(&self, id: ObjectId, key: &str) -> Option<ScriptValue>;

    // ========================================================================
    // Collection
    // ========================================================================

    /// Register a finalizer that runs at most once, when `id` is collected
    fn add_finalizer(&mut self, id: ObjectId, finalizer: HostFinalizer) -> BindResult<()>;

    /// Run one full collection pass and return the ids it swept
    fn collect(&mut self, retention: &dyn Retention) -> Vec<ObjectId>;
}
