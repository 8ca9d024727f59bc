//! NativeValue and NativeType: the native side of the conversion protocol
//!
//! `NativeType` is the declared expected type of an argument. Conversion from
//! script is driven entirely by these descriptors; there is no reflection.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::{BindError, BindResult};
use crate::value::{ObjectId, ObjectKind, ScriptValue, Symbol};

// ============================================================================
// Native objects
// ============================================================================

/// Identity of a native instance (address of its shared allocation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeId(usize);

/// Shared handle to a native instance of a registered class.
///
/// Cloning shares the instance; identity is the allocation, so every clone
/// maps to the same wrapper.
#[derive(Clone)]
pub struct NativeObject {
    class: &'static str,
    instance: Rc<dyn Any>,
}

impl NativeObject {
    /// Move `value` into a new shared instance of `class`
    pub fn new<T: Any>(class: &'static str, value: T) -> Self {
        Self::from_rc(class, Rc::new(RefCell::new(value)))
    }

    /// Share an existing instance
    pub fn from_rc<T: Any>(class: &'static str, instance: Rc<RefCell<T>>) -> Self {
        Self { class, instance }
    }

    /// Registered class name
    pub fn class(&self) -> &'static str {
        self.class
    }

    /// Identity of the underlying instance
    pub fn identity(&self) -> NativeId {
        NativeId(Rc::as_ptr(&self.instance) as *const () as usize)
    }

    /// Check whether the instance is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.instance.is::<RefCell<T>>()
    }

    /// Recover the typed shared instance
    pub fn downcast<T: Any>(&self) -> Option<Rc<RefCell<T>>> {
        Rc::clone(&self.instance).downcast::<RefCell<T>>().ok()
    }

    /// Borrow the instance as `T`
    pub fn borrow<T: Any>(&self) -> BindResult<Ref<'_, T>> {
        self.cell::<T>()?
            .try_borrow()
            .map_err(|_| BindError::Native(format!("{} instance is mutably borrowed", self.class)))
    }

    /// Mutably borrow the instance as `T`
    pub fn borrow_mut<T: Any>(&self) -> BindResult<RefMut<'_, T>> {
        self.cell::<T>()?
            .try_borrow_mut()
            .map_err(|_| BindError::Native(format!("{} instance is already borrowed", self.class)))
    }

    /// Same instance as `other`
    pub fn ptr_eq(&self, other: &NativeObject) -> bool {
        self.identity() == other.identity()
    }

    /// Number of strong handles to the instance
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.instance)
    }

    fn cell<T: Any>(&self) -> BindResult<&RefCell<T>> {
        self.instance
            .downcast_ref::<RefCell<T>>()
            .ok_or_else(|| BindError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                got: self.class.to_string(),
            })
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeObject({} @ {:#x})", self.class, self.identity().0)
    }
}

// ============================================================================
// Weak handles
// ============================================================================

/// Non-retaining reference to a host object.
///
/// Never counted toward reachability. Use sites must check liveness through
/// the bridge; a collected target yields an empty result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WeakHandle {
    id: ObjectId,
    kind: ObjectKind,
}

impl WeakHandle {
    /// Create a weak handle to an object
    pub fn new(kind: ObjectKind, id: ObjectId) -> Self {
        Self { id, kind }
    }

    /// Target object id
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Target object kind
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Script value for the target, assuming it is still alive
    pub(crate) fn to_value(self) -> ScriptValue {
        match self.kind {
            ObjectKind::Wrapper => ScriptValue::Wrapper(self.id),
            ObjectKind::Function => ScriptValue::Function(self.id),
        }
    }
}

// ============================================================================
// UTF-16 strings
// ============================================================================

/// Native UTF-16 string, converted to and from script without re-encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct U16String(pub Vec<u16>);

impl U16String {
    /// Encode UTF-8 text as UTF-16
    pub fn from_str(text: &str) -> Self {
        Self(text.encode_utf16().collect())
    }

    /// Code units
    pub fn as_units(&self) -> &[u16] {
        &self.0
    }
}

// ============================================================================
// NativeValue
// ============================================================================

/// A value on the native side of the boundary.
#[derive(Clone, Debug)]
pub enum NativeValue {
    /// No value (void result, absent optional)
    Undefined,
    /// Null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// UTF-8 string
    String(String),
    /// UTF-16 string
    U16String(U16String),
    /// Symbol
    Symbol(Symbol),
    /// Fixed-arity sequence (tuple, pair)
    Tuple(Vec<NativeValue>),
    /// Variant holding the alternative at `index`
    Variant {
        /// Alternative position in declaration order
        index: usize,
        /// Held value
        value: Box<NativeValue>,
    },
    /// Variable-length sequence
    List(Vec<NativeValue>),
    /// Key-value pairs
    Map(Vec<(NativeValue, NativeValue)>),
    /// Sequence of distinct elements
    Set(Vec<NativeValue>),
    /// Native object instance
    Object(NativeObject),
    /// Function argument, valid for the duration of the call
    Function(ObjectId),
    /// Function argument demoted to a weak handle
    WeakFunction(WeakHandle),
    /// Script value passed through untouched
    Script(ScriptValue),
}

impl NativeValue {
    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Undefined => "Undefined",
            NativeValue::Null => "Null",
            NativeValue::Bool(_) => "Boolean",
            NativeValue::Integer(_) => "Integer",
            NativeValue::Number(_) => "Number",
            NativeValue::String(_) | NativeValue::U16String(_) => "String",
            NativeValue::Symbol(_) => "Symbol",
            NativeValue::Tuple(_) => "Tuple",
            NativeValue::Variant { .. } => "Variant",
            NativeValue::List(_) => "Array",
            NativeValue::Map(_) => "Object",
            NativeValue::Set(_) => "Set",
            NativeValue::Object(_) => "NativeObject",
            NativeValue::Function(_) => "Function",
            NativeValue::WeakFunction(_) => "WeakFunction",
            NativeValue::Script(_) => "Value",
        }
    }

    /// Strip variant layers down to the held value
    pub fn into_inner(self) -> NativeValue {
        match self {
            NativeValue::Variant { value, .. } => value.into_inner(),
            other => other,
        }
    }

    /// Shorthand for a type mismatch against this value
    pub fn mismatch(&self, expected: &str) -> BindError {
        BindError::TypeMismatch {
            expected: expected.to_string(),
            got: self.type_name().to_string(),
        }
    }
}

impl Default for NativeValue {
    fn default() -> Self {
        NativeValue::Undefined
    }
}

// ============================================================================
// NativeType
// ============================================================================

/// Declared native type of an argument, property or container element.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeType {
    /// Any script value, passed through untouched
    Any,
    /// Null (also accepts undefined)
    Null,
    /// Boolean
    Bool,
    /// Integer
    Integer,
    /// Integer restricted to `min..=max`, reported under `name`
    BoundedInteger {
        /// Name used in diagnostics
        name: &'static str,
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },
    /// Number (accepts integers)
    Number,
    /// String decoded to UTF-8
    String,
    /// String kept as UTF-16
    U16String,
    /// Symbol
    Symbol,
    /// Fixed-arity array
    Tuple(Vec<NativeType>),
    /// First matching alternative, in declaration order
    Variant(Vec<NativeType>),
    /// Array of elements
    List(Box<NativeType>),
    /// Object with converted keys and values
    Map(Box<NativeType>, Box<NativeType>),
    /// Array read as distinct elements
    Set(Box<NativeType>),
    /// Undefined/null, or the inner type
    Optional(Box<NativeType>),
    /// Wrapper of the named class (or a subclass)
    Object(&'static str),
    /// Script function
    Function,
}

impl NativeType {
    /// Two-element tuple
    pub fn pair(first: NativeType, second: NativeType) -> Self {
        NativeType::Tuple(vec![first, second])
    }

    /// List of `element`
    pub fn list(element: NativeType) -> Self {
        NativeType::List(Box::new(element))
    }

    /// Map from `key` to `value`
    pub fn map(key: NativeType, value: NativeType) -> Self {
        NativeType::Map(Box::new(key), Box::new(value))
    }

    /// Set of `element`
    pub fn set(element: NativeType) -> Self {
        NativeType::Set(Box::new(element))
    }

    /// Optional `inner`
    pub fn optional(inner: NativeType) -> Self {
        NativeType::Optional(Box::new(inner))
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Any => write!(f, "Value"),
            NativeType::Null => write!(f, "Null"),
            NativeType::Bool => write!(f, "Boolean"),
            NativeType::Integer => write!(f, "Integer"),
            NativeType::BoundedInteger { name, .. } => write!(f, "{}", name),
            NativeType::Number => write!(f, "Number"),
            NativeType::String | NativeType::U16String => write!(f, "String"),
            NativeType::Symbol => write!(f, "Symbol"),
            NativeType::Tuple(items) => {
                write!(f, "[")?;
                for (i, ty) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                write!(f, "]")
            }
            NativeType::Variant(alternatives) => {
                write!(f, "(")?;
                for (i, ty) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                write!(f, ")")
            }
            NativeType::List(element) => write!(f, "Array<{}>", element),
            NativeType::Map(key, value) => write!(f, "Object<{}, {}>", key, value),
            NativeType::Set(element) => write!(f, "Set<{}>", element),
            NativeType::Optional(inner) => write!(f, "{}?", inner),
            NativeType::Object(class) => write!(f, "{}", class),
            NativeType::Function => write!(f, "Function"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: u32,
    }

    #[test]
    fn test_native_object_identity_is_shared() {
        let a = NativeObject::new("Counter", Counter { hits: 0 });
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.identity(), b.identity());

        let c = NativeObject::new("Counter", Counter { hits: 0 });
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_native_object_borrow() {
        let obj = NativeObject::new("Counter", Counter { hits: 1 });
        obj.borrow_mut::<Counter>().unwrap().hits += 1;
        assert_eq!(obj.borrow::<Counter>().unwrap().hits, 2);
        assert!(obj.is::<Counter>());
        assert!(obj.borrow::<String>().is_err());
    }

    #[test]
    fn test_native_object_double_borrow_is_error() {
        let obj = NativeObject::new("Counter", Counter { hits: 0 });
        let _guard = obj.borrow_mut::<Counter>().unwrap();
        assert!(obj.borrow_mut::<Counter>().is_err());
    }

    #[test]
    fn test_downcast_shares_instance() {
        let obj = NativeObject::new("Counter", Counter { hits: 5 });
        let rc = obj.downcast::<Counter>().unwrap();
        rc.borrow_mut().hits = 9;
        assert_eq!(obj.borrow::<Counter>().unwrap().hits, 9);
    }

    #[test]
    fn test_type_display() {
        let ty = NativeType::Variant(vec![NativeType::String, NativeType::Number]);
        assert_eq!(ty.to_string(), "(String | Number)");
        let ty = NativeType::Tuple(vec![NativeType::Integer, NativeType::Bool, NativeType::String]);
        assert_eq!(ty.to_string(), "[Integer, Boolean, String]");
        let ty = NativeType::map(NativeType::String, NativeType::optional(NativeType::Integer));
        assert_eq!(ty.to_string(), "Object<String, Integer?>");
        let ty = NativeType::set(NativeType::BoundedInteger {
            name: "u8",
            min: 0,
            max: 255,
        });
        assert_eq!(ty.to_string(), "Set<u8>");
    }

    #[test]
    fn test_into_inner_strips_variants() {
        let v = NativeValue::Variant {
            index: 1,
            value: Box::new(NativeValue::Integer(8964)),
        };
        assert!(matches!(v.into_inner(), NativeValue::Integer(8964)));
    }
}
