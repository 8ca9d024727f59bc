//! Typed layer over [`NativeValue`]
//!
//! Rust types declare how they map onto the conversion protocol:
//! [`NativeTyped`] names the expected script type, [`IntoNative`] builds the
//! native value handed to `to_script`, and [`FromNative`] extracts a typed
//! value from the result of `from_script`.
//!
//! Extraction strips variant layers first, so a `String` can be read
//! straight out of a `(String | Number)` argument once its alternative is
//! known.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{BindError, BindResult};
use crate::native::{NativeObject, NativeType, NativeValue, U16String, WeakHandle};
use crate::value::{ScriptValue, Symbol};

/// Rust types with a declared script-side type.
pub trait NativeTyped {
    /// Expected type used when converting arguments from script
    fn native_type() -> NativeType;
}

/// Convert from Rust type to NativeValue.
pub trait IntoNative {
    /// Convert to NativeValue
    fn into_native(self) -> NativeValue;
}

/// Convert from NativeValue to Rust type.
pub trait FromNative: Sized {
    /// Convert, returning a type mismatch if the value has the wrong shape
    fn from_native(value: NativeValue) -> BindResult<Self>;
}

impl IntoNative for NativeValue {
    fn into_native(self) -> NativeValue {
        self
    }
}

impl FromNative for NativeValue {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        Ok(value)
    }
}

// ============================================================================
// Primitive Type Implementations
// ============================================================================

macro_rules! impl_integer {
    (@convert $ty:ty) => {
        impl IntoNative for $ty {
            fn into_native(self) -> NativeValue {
                NativeValue::Integer(i64::from(self))
            }
        }

        impl FromNative for $ty {
            fn from_native(value: NativeValue) -> BindResult<Self> {
                match value.into_inner() {
                    NativeValue::Integer(i) => <$ty>::try_from(i).map_err(|_| BindError::TypeMismatch {
                        expected: stringify!($ty).to_string(),
                        got: format!("Integer {}", i),
                    }),
                    other => Err(other.mismatch(stringify!($ty))),
                }
            }
        }
    };
    ($($ty:ty),*) => {
        $(
            impl NativeTyped for $ty {
                fn native_type() -> NativeType {
                    NativeType::BoundedInteger {
                        name: stringify!($ty),
                        min: i64::from(<$ty>::MIN),
                        max: i64::from(<$ty>::MAX),
                    }
                }
            }

            impl_integer!(@convert $ty);
        )*
    };
}

impl_integer!(i8, i16, i32, u8, u16, u32);
impl_integer!(@convert i64);

impl NativeTyped for i64 {
    fn native_type() -> NativeType {
        NativeType::Integer
    }
}

impl NativeTyped for u64 {
    fn native_type() -> NativeType {
        NativeType::BoundedInteger {
            name: "u64",
            min: 0,
            max: i64::MAX,
        }
    }
}

impl IntoNative for u64 {
    fn into_native(self) -> NativeValue {
        match i64::try_from(self) {
            Ok(i) => NativeValue::Integer(i),
            Err(_) => NativeValue::Number(self as f64),
        }
    }
}

impl FromNative for u64 {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Integer(i) => u64::try_from(i).map_err(|_| BindError::TypeMismatch {
                expected: "u64".to_string(),
                got: format!("Integer {}", i),
            }),
            other => Err(other.mismatch("u64")),
        }
    }
}

impl NativeTyped for f64 {
    fn native_type() -> NativeType {
        NativeType::Number
    }
}

impl IntoNative for f64 {
    fn into_native(self) -> NativeValue {
        NativeValue::Number(self)
    }
}

impl FromNative for f64 {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Number(f) => Ok(f),
            NativeValue::Integer(i) => Ok(i as f64),
            other => Err(other.mismatch("f64")),
        }
    }
}

impl NativeTyped for f32 {
    fn native_type() -> NativeType {
        NativeType::Number
    }
}

impl IntoNative for f32 {
    fn into_native(self) -> NativeValue {
        NativeValue::Number(f64::from(self))
    }
}

impl FromNative for f32 {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        f64::from_native(value).map(|f| f as f32)
    }
}

impl NativeTyped for bool {
    fn native_type() -> NativeType {
        NativeType::Bool
    }
}

impl IntoNative for bool {
    fn into_native(self) -> NativeValue {
        NativeValue::Bool(self)
    }
}

impl FromNative for bool {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

// Unit type (for functions that return nothing)
impl IntoNative for () {
    fn into_native(self) -> NativeValue {
        NativeValue::Undefined
    }
}

// ============================================================================
// Strings and symbols
// ============================================================================

impl NativeTyped for String {
    fn native_type() -> NativeType {
        NativeType::String
    }
}

impl IntoNative for String {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self)
    }
}

impl IntoNative for &str {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self.to_string())
    }
}

impl FromNative for String {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::String(s) => Ok(s),
            NativeValue::U16String(s) => String::from_utf16(s.as_units()).map_err(|_| BindError::TypeMismatch {
                expected: "String".to_string(),
                got: "ill-formed UTF-16".to_string(),
            }),
            other => Err(other.mismatch("String")),
        }
    }
}

impl NativeTyped for U16String {
    fn native_type() -> NativeType {
        NativeType::U16String
    }
}

impl IntoNative for U16String {
    fn into_native(self) -> NativeValue {
        NativeValue::U16String(self)
    }
}

impl FromNative for U16String {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::U16String(s) => Ok(s),
            NativeValue::String(s) => Ok(U16String::from_str(&s)),
            other => Err(other.mismatch("U16String")),
        }
    }
}

impl NativeTyped for Symbol {
    fn native_type() -> NativeType {
        NativeType::Symbol
    }
}

impl IntoNative for Symbol {
    fn into_native(self) -> NativeValue {
        NativeValue::Symbol(self)
    }
}

impl FromNative for Symbol {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Symbol(s) => Ok(s),
            other => Err(other.mismatch("Symbol")),
        }
    }
}

// ============================================================================
// Script values and handles
// ============================================================================

impl NativeTyped for ScriptValue {
    fn native_type() -> NativeType {
        NativeType::Any
    }
}

impl IntoNative for ScriptValue {
    fn into_native(self) -> NativeValue {
        NativeValue::Script(self)
    }
}

impl FromNative for ScriptValue {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Script(v) => Ok(v),
            other => Err(other.mismatch("Value")),
        }
    }
}

impl IntoNative for NativeObject {
    fn into_native(self) -> NativeValue {
        NativeValue::Object(self)
    }
}

impl FromNative for NativeObject {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Object(o) => Ok(o),
            other => Err(other.mismatch("NativeObject")),
        }
    }
}

impl FromNative for WeakHandle {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::WeakFunction(h) => Ok(h),
            other => Err(other.mismatch("WeakFunction")),
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: NativeTyped> NativeTyped for Option<T> {
    fn native_type() -> NativeType {
        NativeType::optional(T::native_type())
    }
}

impl<T: IntoNative> IntoNative for Option<T> {
    fn into_native(self) -> NativeValue {
        match self {
            Some(value) => value.into_native(),
            None => NativeValue::Null,
        }
    }
}

impl<T: FromNative> FromNative for Option<T> {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Undefined | NativeValue::Null => Ok(None),
            other => T::from_native(other).map(Some),
        }
    }
}

impl<T: NativeTyped> NativeTyped for Vec<T> {
    fn native_type() -> NativeType {
        NativeType::list(T::native_type())
    }
}

impl<T: IntoNative> IntoNative for Vec<T> {
    fn into_native(self) -> NativeValue {
        NativeValue::List(self.into_iter().map(IntoNative::into_native).collect())
    }
}

impl<T: FromNative> FromNative for Vec<T> {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::List(items) => items.into_iter().map(T::from_native).collect(),
            other => Err(other.mismatch("Array")),
        }
    }
}

impl<K: NativeTyped, V: NativeTyped> NativeTyped for BTreeMap<K, V> {
    fn native_type() -> NativeType {
        NativeType::map(K::native_type(), V::native_type())
    }
}

impl<K: IntoNative, V: IntoNative> IntoNative for BTreeMap<K, V> {
    fn into_native(self) -> NativeValue {
        NativeValue::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_native(), v.into_native()))
                .collect(),
        )
    }
}

impl<K: FromNative + Ord, V: FromNative> FromNative for BTreeMap<K, V> {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_native(k)?, V::from_native(v)?)))
                .collect(),
            other => Err(other.mismatch("Object")),
        }
    }
}

impl<T: NativeTyped> NativeTyped for BTreeSet<T> {
    fn native_type() -> NativeType {
        NativeType::set(T::native_type())
    }
}

impl<T: IntoNative> IntoNative for BTreeSet<T> {
    fn into_native(self) -> NativeValue {
        NativeValue::Set(self.into_iter().map(IntoNative::into_native).collect())
    }
}

impl<T: FromNative + Ord> FromNative for BTreeSet<T> {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        match value.into_inner() {
            NativeValue::Set(items) | NativeValue::List(items) => items.into_iter().map(T::from_native).collect(),
            other => Err(other.mismatch("Set")),
        }
    }
}

fn tuple_items(value: NativeValue, arity: usize) -> BindResult<Vec<NativeValue>> {
    match value.into_inner() {
        NativeValue::Tuple(items) if items.len() == arity => Ok(items),
        other => Err(BindError::TypeMismatch {
            expected: format!("Tuple of {}", arity),
            got: match other {
                NativeValue::Tuple(items) => format!("Tuple of {}", items.len()),
                other => other.type_name().to_string(),
            },
        }),
    }
}

impl<A: NativeTyped, B: NativeTyped> NativeTyped for (A, B) {
    fn native_type() -> NativeType {
        NativeType::pair(A::native_type(), B::native_type())
    }
}

impl<A: IntoNative, B: IntoNative> IntoNative for (A, B) {
    fn into_native(self) -> NativeValue {
        NativeValue::Tuple(vec![self.0.into_native(), self.1.into_native()])
    }
}

impl<A: FromNative, B: FromNative> FromNative for (A, B) {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        let mut items = tuple_items(value, 2)?.into_iter();
        let (Some(a), Some(b)) = (items.next(), items.next()) else {
            return Err(BindError::Native("tuple arity changed".to_string()));
        };
        Ok((A::from_native(a)?, B::from_native(b)?))
    }
}

impl<A: NativeTyped, B: NativeTyped, C: NativeTyped> NativeTyped for (A, B, C) {
    fn native_type() -> NativeType {
        NativeType::Tuple(vec![A::native_type(), B::native_type(), C::native_type()])
    }
}

impl<A: IntoNative, B: IntoNative, C: IntoNative> IntoNative for (A, B, C) {
    fn into_native(self) -> NativeValue {
        NativeValue::Tuple(vec![
            self.0.into_native(),
            self.1.into_native(),
            self.2.into_native(),
        ])
    }
}

impl<A: FromNative, B: FromNative, C: FromNative> FromNative for (A, B, C) {
    fn from_native(value: NativeValue) -> BindResult<Self> {
        let mut items = tuple_items(value, 3)?.into_iter();
        let (Some(a), Some(b), Some(c)) = (items.next(), items.next(), items.next()) else {
            return Err(BindError::Native("tuple arity changed".to_string()));
        };
        Ok((A::from_native(a)?, B::from_native(b)?, C::from_native(c)?))
    }
}

/// Extract argument `index` from a converted argument list
pub fn arg<T: FromNative>(args: &[NativeValue], index: usize) -> BindResult<T> {
    T::from_native(args.get(index).cloned().unwrap_or_default())
}
