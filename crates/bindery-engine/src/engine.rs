//! Engine: the reference [`HostEngine`]
//!
//! Owns the object heap, the root set and collector statistics. Collection
//! only happens when the bridge asks for it.

use std::rc::Rc;

use bindery::{BindResult, HostEngine, HostFinalizer, HostFunction, ObjectId, Retention, ScriptValue};

use crate::collector::{self, GcStats};
use crate::defaults::HeapOptions;
use crate::error::EngineError;
use crate::heap::{HeapObject, ObjectHeap};
use crate::roots::RootSet;

/// Reference script heap
pub struct Engine {
    heap: ObjectHeap,
    roots: RootSet,
    stats: GcStats,
}

impl Engine {
    /// Create an engine with default options
    pub fn new() -> Self {
        Self::with_options(HeapOptions::default())
    }

    /// Create an engine
    pub fn with_options(options: HeapOptions) -> Self {
        Self {
            heap: ObjectHeap::with_capacity(options.initial_capacity),
            roots: RootSet::new(),
            stats: GcStats::default(),
        }
    }

    /// Get GC statistics
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Get read-only access to the heap
    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    /// Get read-only access to the root set
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEngine for Engine {
    fn alloc_wrapper(&mut self, class: &'static str) -> ObjectId {
        self.heap.allocate(HeapObject::Wrapper { class })
    }

    fn create_function(&mut self, name: &str, captures: Vec<ScriptValue>, body: HostFunction) -> ObjectId {
        self.heap.allocate(HeapObject::Function {
            name: name.to_string(),
            captures,
            body,
        })
    }

    fn is_alive(&self, id: ObjectId) -> bool {
        self.heap.contains(id)
    }

    fn call_function(&mut self, id: ObjectId, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        let entry = self.heap.get(id).ok_or(EngineError::StaleHandle(id))?;
        let body = match entry.object() {
            HeapObject::Function { body, .. } => Rc::clone(body),
            HeapObject::Wrapper { .. } => return Err(EngineError::NotCallable(id).into()),
        };
        self.roots.open_scope();
        for arg in args {
            self.roots.pin(arg);
        }
        let result = body(args);
        self.roots.close_scope();
        result
    }

    fn open_scope(&mut self) {
        self.roots.open_scope();
    }

    fn close_scope(&mut self) {
        self.roots.close_scope();
    }

    fn pin(&mut self, value: &ScriptValue) {
        self.roots.pin(value);
    }

    fn set_global(&mut self, name: &str, value: ScriptValue) {
        self.roots.set_global(name, value);
    }

    fn global(&self, name: &str) -> Option<ScriptValue> {
        self.roots.global(name).cloned()
    }

    fn remove_global(&mut self, name: &str) -> Option<ScriptValue> {
        self.roots.remove_global(name)
    }

    fn set_property(&mut self, id: ObjectId, key: &str, value: ScriptValue) -> BindResult<()> {
        self.heap.entry_mut(id)?.properties.insert(key.to_string(), value);
        Ok(())
    }

    fn property(&self, id: ObjectId, key: &str) -> Option<ScriptValue> {
        self.heap.get(id)?.property(key).cloned()
    }

    fn add_finalizer(&mut self, id: ObjectId, finalizer: HostFinalizer) -> BindResult<()> {
        self.heap.entry_mut(id)?.finalizers.push(finalizer);
        Ok(())
    }

    fn collect(&mut self, retention: &dyn Retention) -> Vec<ObjectId> {
        collector::collect(&mut self.heap, &self.roots, retention, &mut self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery::{BindError, NoRetention};
    use std::cell::Cell;

    #[test]
    fn test_scoped_handles_are_released() {
        let mut engine = Engine::new();
        engine.open_scope();
        let id = engine.alloc_wrapper("View");
        engine.pin(&ScriptValue::Wrapper(id));
        assert!(engine.collect(&NoRetention).is_empty());

        engine.close_scope();
        assert_eq!(engine.collect(&NoRetention), vec![id]);
        assert!(!engine.is_alive(id));
    }

    #[test]
    fn test_finalizer_runs_once() {
        let mut engine = Engine::new();
        let id = engine.alloc_wrapper("View");
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        engine
            .add_finalizer(id, Box::new(move || counter.set(counter.get() + 1)))
            .unwrap();
        engine.collect(&NoRetention);
        engine.collect(&NoRetention);
        assert_eq!(runs.get(), 1);
        assert!(engine.add_finalizer(id, Box::new(|| {})).is_err());
    }

    #[test]
    fn test_call_function() {
        let mut engine = Engine::new();
        let f = engine.create_function(
            "len",
            Vec::new(),
            Rc::new(|args| Ok(ScriptValue::Int(args.len() as i64))),
        );
        let result = engine.call_function(f, &[ScriptValue::Null, ScriptValue::Null]).unwrap();
        assert_eq!(result, ScriptValue::Int(2));
        assert_eq!(engine.roots().scope_depth(), 1);

        let w = engine.alloc_wrapper("View");
        assert!(matches!(engine.call_function(w, &[]), Err(BindError::NotCallable(_))));
    }

    #[test]
    fn test_properties_are_traced() {
        let mut engine = Engine::new();
        let holder = engine.alloc_wrapper("View");
        let held = engine.alloc_wrapper("View");
        engine.set_global("holder", ScriptValue::Wrapper(holder));
        engine.set_property(holder, "child", ScriptValue::Wrapper(held)).unwrap();

        assert!(engine.collect(&NoRetention).is_empty());
        assert_eq!(engine.property(holder, "child"), Some(ScriptValue::Wrapper(held)));

        engine.set_property(holder, "child", ScriptValue::Null).unwrap();
        assert_eq!(engine.collect(&NoRetention), vec![held]);
        assert_eq!(engine.stats().collections, 2);
    }

    #[test]
    fn test_captures_are_traced() {
        let mut engine = Engine::new();
        let captured = engine.alloc_wrapper("View");
        let f = engine.create_function(
            "closure",
            vec![ScriptValue::Wrapper(captured)],
            Rc::new(|_| Ok(ScriptValue::Undefined)),
        );
        engine.set_global("f", ScriptValue::Function(f));
        assert!(engine.collect(&NoRetention).is_empty());
        engine.remove_global("f");
        assert_eq!(engine.collect(&NoRetention).len(), 2);
    }
}
