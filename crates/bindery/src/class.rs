//! Class definitions exposed to script
//!
//! A class is a named table of methods, accessors, an optional constructor
//! and an optional finalizer. Every method declares its parameter types and
//! a [`WrapPolicy`] up front; the interception layer reads both at call time.
//!
//! # Example
//!
//! ```ignore
//! let class = ClassBuilder::new("View")
//!     .constructor(vec![], |_cx, _args| Ok(View::default()))
//!     .instance_method::<View>(
//!         "addChildView",
//!         vec![NativeType::Object("View")],
//!         WrapPolicy::RetainArgument(0),
//!         |_cx, view, args| { /* ... */ Ok(NativeValue::Undefined) },
//!     )
//!     .build();
//! ```

use std::any::Any;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{BindError, BindResult};
use crate::intercept::CallContext;
use crate::native::{NativeObject, NativeType, NativeValue};

/// Native method body: receives the receiver's native instance.
pub type MethodFn = Rc<dyn Fn(&mut CallContext<'_>, &NativeObject, Vec<NativeValue>) -> BindResult<NativeValue>>;

/// Constructor body: produces the native instance for a new wrapper.
pub type ConstructorFn = Rc<dyn Fn(&mut CallContext<'_>, Vec<NativeValue>) -> BindResult<NativeObject>>;

/// Accessor getter.
pub type GetterFn = Rc<dyn Fn(&NativeObject) -> BindResult<NativeValue>>;

/// Accessor setter.
pub type SetterFn = Rc<dyn Fn(&NativeObject, NativeValue) -> BindResult<()>>;

/// Class finalizer, run once on the native instance of a collected wrapper.
pub type FinalizerFn = Rc<dyn Fn(&NativeObject) -> BindResult<()>>;

// ============================================================================
// Policies
// ============================================================================

/// Lifetime policy applied around a method call.
///
/// Each policy names the argument position it applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WrapPolicy {
    /// Plain call
    #[default]
    None,
    /// After a successful call, add edge self → argument
    RetainArgument(usize),
    /// Before the call, remove edge self → argument
    ReleaseArgument(usize),
    /// Hand the function argument to native code as a weak handle
    WeakCallback(usize),
}

impl WrapPolicy {
    /// Argument position the policy applies to
    pub fn argument(&self) -> Option<usize> {
        match self {
            WrapPolicy::None => None,
            WrapPolicy::RetainArgument(i)
            | WrapPolicy::ReleaseArgument(i)
            | WrapPolicy::WeakCallback(i) => Some(*i),
        }
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// A method exposed on a class
pub struct MethodDef {
    pub(crate) name: String,
    pub(crate) params: Vec<NativeType>,
    pub(crate) policy: WrapPolicy,
    pub(crate) body: MethodFn,
}

impl MethodDef {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[NativeType] {
        &self.params
    }

    /// Declared wrapping policy
    pub fn policy(&self) -> WrapPolicy {
        self.policy
    }
}

/// A property backed by native getter/setter
pub struct AccessorDef {
    pub(crate) name: String,
    pub(crate) ty: NativeType,
    pub(crate) getter: GetterFn,
    pub(crate) setter: Option<SetterFn>,
}

impl AccessorDef {
    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the property can be assigned
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

pub(crate) struct ConstructorDef {
    pub(crate) params: Vec<NativeType>,
    pub(crate) body: ConstructorFn,
}

/// A class exposed to script
pub struct ClassDef {
    name: &'static str,
    base: Option<&'static str>,
    pub(crate) constructor: Option<ConstructorDef>,
    methods: FxHashMap<String, Rc<MethodDef>>,
    accessors: FxHashMap<String, Rc<AccessorDef>>,
    finalizer: Option<FinalizerFn>,
}

impl ClassDef {
    /// Class name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Base class name
    pub fn base(&self) -> Option<&'static str> {
        self.base
    }

    /// Whether script can construct instances
    pub fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }

    /// Method declared directly on this class
    pub fn method(&self, name: &str) -> Option<&Rc<MethodDef>> {
        self.methods.get(name)
    }

    /// Accessor declared directly on this class
    pub fn accessor(&self, name: &str) -> Option<&Rc<AccessorDef>> {
        self.accessors.get(name)
    }

    /// Names of methods declared directly on this class
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(|s| s.as_str()).collect()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ClassDef`]
pub struct ClassBuilder {
    def: ClassDef,
}

impl ClassBuilder {
    /// Start a class named `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            def: ClassDef {
                name,
                base: None,
                constructor: None,
                methods: FxHashMap::default(),
                accessors: FxHashMap::default(),
                finalizer: None,
            },
        }
    }

    /// Inherit methods, accessors and finalizer from `base`
    pub fn inherits(mut self, base: &'static str) -> Self {
        self.def.base = Some(base);
        self
    }

    /// Allow `new Class(...)`. The returned value becomes the native instance.
    pub fn constructor<T, F>(mut self, params: Vec<NativeType>, f: F) -> Self
    where
        T: Any,
        F: Fn(&mut CallContext<'_>, Vec<NativeValue>) -> BindResult<T> + 'static,
    {
        let class = self.def.name;
        self.def.constructor = Some(ConstructorDef {
            params,
            body: Rc::new(move |cx: &mut CallContext<'_>, args: Vec<NativeValue>| {
                Ok(NativeObject::new(class, f(cx, args)?))
            }),
        });
        self
    }

    /// Add a method operating on the raw native handle
    pub fn method<F>(mut self, name: &str, params: Vec<NativeType>, policy: WrapPolicy, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>, &NativeObject, Vec<NativeValue>) -> BindResult<NativeValue> + 'static,
    {
        self.def.methods.insert(
            name.to_string(),
            Rc::new(MethodDef {
                name: name.to_string(),
                params,
                policy,
                body: Rc::new(f),
            }),
        );
        self
    }

    /// Add a method that mutably borrows the receiver as `T`
    pub fn instance_method<T, F>(self, name: &str, params: Vec<NativeType>, policy: WrapPolicy, f: F) -> Self
    where
        T: Any,
        F: Fn(&mut CallContext<'_>, &mut T, Vec<NativeValue>) -> BindResult<NativeValue> + 'static,
    {
        self.method(name, params, policy, move |cx, this, args| {
            let mut instance = this.borrow_mut::<T>()?;
            f(cx, &mut instance, args)
        })
    }

    /// Add a read-only property
    pub fn getter<T, G>(mut self, name: &str, get: G) -> Self
    where
        T: Any,
        G: Fn(&T) -> NativeValue + 'static,
    {
        self.def.accessors.insert(
            name.to_string(),
            Rc::new(AccessorDef {
                name: name.to_string(),
                ty: NativeType::Any,
                getter: Rc::new(move |this: &NativeObject| Ok(get(&*this.borrow::<T>()?))),
                setter: None,
            }),
        );
        self
    }

    /// Add a read-write property whose assigned values convert to `ty`
    pub fn accessor<T, G, S>(mut self, name: &str, ty: NativeType, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&T) -> NativeValue + 'static,
        S: Fn(&mut T, NativeValue) -> BindResult<()> + 'static,
    {
        self.def.accessors.insert(
            name.to_string(),
            Rc::new(AccessorDef {
                name: name.to_string(),
                ty,
                getter: Rc::new(move |this: &NativeObject| Ok(get(&*this.borrow::<T>()?))),
                setter: Some(Rc::new(move |this: &NativeObject, value: NativeValue| {
                    set(&mut *this.borrow_mut::<T>()?, value)
                })),
            }),
        );
        self
    }

    /// Run `f` on the native instance when its wrapper is collected
    pub fn finalizer<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T) -> BindResult<()> + 'static,
    {
        self.def.finalizer = Some(Rc::new(move |this: &NativeObject| f(&mut *this.borrow_mut::<T>()?)));
        self
    }

    /// Finish the definition
    pub fn build(self) -> ClassDef {
        self.def
    }
}

// ============================================================================
// Class table
// ============================================================================

/// Registered classes, with base-chain lookups
#[derive(Default)]
pub struct ClassTable {
    classes: FxHashMap<&'static str, Rc<ClassDef>>,
}

impl ClassTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a class
    pub fn insert(&mut self, def: ClassDef) -> BindResult<()> {
        if let Some(base) = def.base {
            if !self.classes.contains_key(base) {
                return Err(BindError::UnknownClass(base.to_string()));
            }
        }
        self.classes.insert(def.name, Rc::new(def));
        Ok(())
    }

    /// Class by name
    pub fn get(&self, name: &str) -> Option<&Rc<ClassDef>> {
        self.classes.get(name)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// `class` and its registered bases, nearest first
    pub fn ancestry<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Rc<ClassDef>> + 'a {
        let mut next = self.classes.get(class);
        let mut remaining = self.classes.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let current = next?;
            next = current.base.and_then(|base| self.classes.get(base));
            Some(current)
        })
    }

    /// Whether `class` is `ancestor` or derives from it
    pub fn is_a(&self, class: &str, ancestor: &str) -> bool {
        class == ancestor || self.ancestry(class).any(|def| def.name == ancestor)
    }

    /// Method resolved through the base chain
    pub fn find_method(&self, class: &str, name: &str) -> Option<Rc<MethodDef>> {
        self.ancestry(class).find_map(|def| def.methods.get(name).cloned())
    }

    /// Accessor resolved through the base chain
    pub fn find_accessor(&self, class: &str, name: &str) -> Option<Rc<AccessorDef>> {
        self.ancestry(class).find_map(|def| def.accessors.get(name).cloned())
    }

    /// Nearest finalizer in the base chain
    pub fn finalizer_for(&self, class: &str) -> Option<FinalizerFn> {
        self.ancestry(class).find_map(|def| def.finalizer.clone())
    }
}
