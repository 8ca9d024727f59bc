//! Method interception layer
//!
//! Every script-facing call goes through the same pipeline:
//!
//! 1. open a host handle scope and pin the arguments
//! 2. convert every argument to its declared type (missing ones are
//!    undefined); the first failure aborts the call
//! 3. apply the pre-call half of the method's [`WrapPolicy`]
//! 4. invoke the native body
//! 5. apply the post-call half of the policy
//! 6. convert the result
//!
//! The scope is closed on every exit path and a successful result is pinned
//! in the caller's scope.

use crate::bridge::Bridge;
use crate::class::WrapPolicy;
use crate::error::{BindError, BindResult};
use crate::native::{NativeObject, NativeType, NativeValue, WeakHandle};
use crate::value::{ObjectId, ObjectKind, ScriptValue};

// ============================================================================
// Call context
// ============================================================================

/// What a native body can reach while it runs.
pub struct CallContext<'a> {
    bridge: &'a mut Bridge,
    this: Option<ObjectId>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(bridge: &'a mut Bridge, this: Option<ObjectId>) -> Self {
        Self { bridge, this }
    }

    /// Receiver wrapper, for methods
    pub fn this(&self) -> Option<ObjectId> {
        self.this
    }

    /// Receiver wrapper, failing for free functions and constructors
    pub fn this_wrapper(&self) -> BindResult<ObjectId> {
        self.this.ok_or_else(|| BindError::InvalidReceiver {
            expected: "wrapper".to_string(),
            actual: "no receiver".to_string(),
        })
    }

    /// The bridge the call runs on
    pub fn bridge(&mut self) -> &mut Bridge {
        self.bridge
    }

    /// Whether a weak handle's target is still alive
    pub fn is_alive(&self, handle: &WeakHandle) -> bool {
        self.bridge.host.is_alive(handle.id())
    }

    /// Wrapper value for a native instance
    pub fn wrap(&mut self, native: NativeObject) -> ScriptValue {
        ScriptValue::Wrapper(self.bridge.wrap_object(native))
    }

    /// Convert a native value to script
    pub fn to_script(&mut self, value: NativeValue) -> BindResult<ScriptValue> {
        self.bridge.to_script(value)
    }

    /// Call a function argument
    pub fn call(&mut self, function: ObjectId, args: Vec<NativeValue>) -> BindResult<ScriptValue> {
        let args = args
            .into_iter()
            .map(|arg| self.bridge.to_script(arg))
            .collect::<BindResult<Vec<_>>>()?;
        self.bridge.host.call_function(function, &args)
    }

    /// Call through a weak handle. Returns `None`, without calling, if the
    /// target has been collected.
    pub fn call_weak(&mut self, handle: &WeakHandle, args: Vec<NativeValue>) -> BindResult<Option<ScriptValue>> {
        if !self.is_alive(handle) {
            log::trace!("intercept: skip collected callback {}", handle.id());
            return Ok(None);
        }
        self.call(handle.id(), args).map(Some)
    }
}

// ============================================================================
// Dispatch
// ============================================================================

fn wrapper_argument(args: &[ScriptValue], index: usize) -> Option<ObjectId> {
    match args.get(index) {
        Some(ScriptValue::Wrapper(id)) => Some(*id),
        _ => None,
    }
}

fn demote_to_weak(value: &mut NativeValue) {
    match value {
        NativeValue::Function(id) => {
            let id = *id;
            *value = NativeValue::WeakFunction(WeakHandle::new(ObjectKind::Function, id));
        }
        NativeValue::Variant { value, .. } => demote_to_weak(value),
        _ => {}
    }
}

impl Bridge {
    fn dispatch<F>(
        &mut self,
        this: Option<ObjectId>,
        params: &[NativeType],
        policy: WrapPolicy,
        args: &[ScriptValue],
        body: F,
    ) -> BindResult<ScriptValue>
    where
        F: FnOnce(&mut CallContext<'_>, Vec<NativeValue>) -> BindResult<NativeValue>,
    {
        self.host.open_scope();
        for arg in args {
            self.host.pin(arg);
        }
        let result = self.dispatch_in_scope(this, params, policy, args, body);
        self.host.close_scope();
        if let Ok(value) = &result {
            self.host.pin(value);
        }
        result
    }

    fn dispatch_in_scope<F>(
        &mut self,
        this: Option<ObjectId>,
        params: &[NativeType],
        policy: WrapPolicy,
        args: &[ScriptValue],
        body: F,
    ) -> BindResult<ScriptValue>
    where
        F: FnOnce(&mut CallContext<'_>, Vec<NativeValue>) -> BindResult<NativeValue>,
    {
        let undefined = ScriptValue::Undefined;
        let mut converted = Vec::with_capacity(params.len());
        {
            let mut cx = self.converter();
            for (index, ty) in params.iter().enumerate() {
                let arg = args.get(index).unwrap_or(&undefined);
                converted.push(cx.from_script(arg, ty, index)?);
            }
        }

        let mut retain = None;
        match policy {
            WrapPolicy::None => {}
            WrapPolicy::RetainArgument(index) => retain = this.zip(wrapper_argument(args, index)),
            WrapPolicy::ReleaseArgument(index) => {
                if let (Some(parent), Some(child)) = (this, wrapper_argument(args, index)) {
                    self.edges.remove(parent, child);
                }
            }
            WrapPolicy::WeakCallback(index) => {
                if let Some(arg) = converted.get_mut(index) {
                    demote_to_weak(arg);
                }
            }
        }

        let result = body(&mut CallContext::new(self, this), converted)?;

        if let Some((parent, child)) = retain {
            self.edges.add(parent, child);
        }
        self.converter().to_script(result)
    }

    fn receiver(&self, value: &ScriptValue) -> BindResult<(ObjectId, NativeObject)> {
        let invalid = || BindError::InvalidReceiver {
            expected: "wrapper".to_string(),
            actual: match value {
                ScriptValue::Wrapper(_) => "collected wrapper".to_string(),
                other => other.type_name().to_string(),
            },
        };
        let id = match value {
            ScriptValue::Wrapper(id) if self.host.is_alive(*id) => *id,
            _ => return Err(invalid()),
        };
        let native = self.registry.native(id).cloned().ok_or_else(invalid)?;
        Ok((id, native))
    }

    /// `new class(...args)`
    pub fn construct(&mut self, class: &str, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        let def = self
            .classes
            .get(class)
            .cloned()
            .ok_or_else(|| BindError::UnknownClass(class.to_string()))?;
        let ctor = def
            .constructor
            .as_ref()
            .ok_or_else(|| BindError::NoConstructor(class.to_string()))?;
        let body = ctor.body.clone();
        self.dispatch(None, &ctor.params, WrapPolicy::None, args, |cx, args| {
            body(cx, args).map(NativeValue::Object)
        })
    }

    /// `receiver.name(...args)`
    pub fn call_method(&mut self, receiver: &ScriptValue, name: &str, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        let (id, native) = self.receiver(receiver)?;
        let method = self
            .classes
            .find_method(native.class(), name)
            .ok_or_else(|| BindError::UnknownMethod {
                class: native.class().to_string(),
                name: name.to_string(),
            })?;
        log::trace!("intercept: {}.{} on {}", native.class(), name, id);
        let body = method.body.clone();
        self.dispatch(Some(id), &method.params, method.policy, args, |cx, args| {
            body(cx, &native, args)
        })
    }

    /// `module.name(...args)`
    pub fn call_function(&mut self, module: &str, name: &str, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        let def = self
            .modules
            .get(module)
            .cloned()
            .ok_or_else(|| BindError::UnknownModule(module.to_string()))?;
        let function = def.function(name).cloned().ok_or_else(|| BindError::UnknownFunction {
            module: module.to_string(),
            name: name.to_string(),
        })?;
        let body = function.body.clone();
        self.dispatch(None, &function.params, WrapPolicy::None, args, |cx, args| body(cx, args))
    }

    /// Call by symbolic `module.function` name
    pub fn call_symbol(&mut self, symbol: &str, args: &[ScriptValue]) -> BindResult<ScriptValue> {
        let (module, name) = symbol.split_once('.').ok_or_else(|| BindError::UnknownFunction {
            module: String::new(),
            name: symbol.to_string(),
        })?;
        self.call_function(module, name, args)
    }

    /// `receiver.name`: accessors first, then ordinary properties
    pub fn get_property(&mut self, receiver: &ScriptValue, name: &str) -> BindResult<ScriptValue> {
        if let ScriptValue::Wrapper(_) = receiver {
            let (id, native) = self.receiver(receiver)?;
            if let Some(accessor) = self.classes.find_accessor(native.class(), name) {
                let value = (accessor.getter)(&native)?;
                return self.to_script(value);
            }
            return Ok(self.host.property(id, name).unwrap_or(ScriptValue::Undefined));
        }
        match receiver.object_id() {
            Some(id) if self.host.is_alive(id) => Ok(self.host.property(id, name).unwrap_or(ScriptValue::Undefined)),
            Some(_) => Err(BindError::InvalidReceiver {
                expected: "object".to_string(),
                actual: "collected object".to_string(),
            }),
            None => Err(BindError::InvalidReceiver {
                expected: "object".to_string(),
                actual: receiver.type_name().to_string(),
            }),
        }
    }

    /// `receiver.name = value`: accessors first, then ordinary properties
    pub fn set_property(&mut self, receiver: &ScriptValue, name: &str, value: ScriptValue) -> BindResult<()> {
        if let ScriptValue::Wrapper(_) = receiver {
            let (id, native) = self.receiver(receiver)?;
            if let Some(accessor) = self.classes.find_accessor(native.class(), name) {
                let setter = accessor.setter.as_ref().ok_or_else(|| BindError::ReadOnlyProperty {
                    class: native.class().to_string(),
                    name: name.to_string(),
                })?;
                let converted = self.from_script(&value, &accessor.ty, 0)?;
                return setter(&native, converted);
            }
            return self.host.set_property(id, name, value);
        }
        match receiver.object_id() {
            Some(id) => self.host.set_property(id, name, value),
            None => Err(BindError::InvalidReceiver {
                expected: "object".to_string(),
                actual: receiver.type_name().to_string(),
            }),
        }
    }
}
