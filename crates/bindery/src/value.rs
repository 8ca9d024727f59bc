//! ScriptValue: the dynamic value space of the host engine
//!
//! Primitive values are stored inline. Wrappers and functions live on the
//! host heap and are referenced by [`ObjectId`], a slot index paired with a
//! generation so that a recycled slot never answers for a stale reference.

use std::fmt;
use std::string::FromUtf16Error;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Object identity
// ============================================================================

/// Identity of a host heap object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Create an id from a slot index and its generation
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index on the host heap
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this object was allocated
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// What kind of heap object an [`ObjectId`] names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Script handle bound to a native instance
    Wrapper,
    /// Script function
    Function,
}

// ============================================================================
// Strings
// ============================================================================

/// Script string in the host's internal representation (UTF-16 code units).
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptString(Vec<u16>);

impl ScriptString {
    /// Re-encode UTF-8 text into the host representation
    pub fn from_utf8(text: &str) -> Self {
        Self(text.encode_utf16().collect())
    }

    /// Copy UTF-16 code units as-is
    pub fn from_utf16(units: &[u16]) -> Self {
        Self(units.to_vec())
    }

    /// Raw code units
    pub fn as_units(&self) -> &[u16] {
        &self.0
    }

    /// Decode to UTF-8, failing on unpaired surrogates
    pub fn to_utf8(&self) -> Result<String, FromUtf16Error> {
        String::from_utf16(&self.0)
    }

    /// Decode to UTF-8, replacing unpaired surrogates
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Number of code units
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ScriptString {
    fn from(s: &str) -> Self {
        Self::from_utf8(s)
    }
}

impl From<String> for ScriptString {
    fn from(s: String) -> Self {
        Self::from_utf8(&s)
    }
}

impl PartialEq<str> for ScriptString {
    fn eq(&self, other: &str) -> bool {
        self.0.iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for ScriptString {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for ScriptString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for ScriptString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

// ============================================================================
// Symbols
// ============================================================================

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// Unique symbol. Two symbols are equal only if they came from the same
/// [`Symbol::new`] call, regardless of description.
#[derive(Clone, Debug)]
pub struct Symbol {
    id: u64,
    description: String,
}

impl Symbol {
    /// Mint a fresh symbol
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    /// Process-unique id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Description given at creation
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// ScriptValue
// ============================================================================

/// A value as seen by script code.
#[derive(Clone, Debug)]
pub enum ScriptValue {
    /// Absent value
    Undefined,
    /// Null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    String(ScriptString),
    /// Symbol
    Symbol(Symbol),
    /// Ordered sequence (arrays, tuples, pairs)
    Array(Vec<ScriptValue>),
    /// Key-value map (plain object); key order is not significant
    Map(Vec<(ScriptString, ScriptValue)>),
    /// Reference to a wrapper object
    Wrapper(ObjectId),
    /// Reference to a function object
    Function(ObjectId),
}

impl ScriptValue {
    /// Build a string value from UTF-8 text
    pub fn string(text: &str) -> Self {
        ScriptValue::String(ScriptString::from_utf8(text))
    }

    /// Build a map value from UTF-8 keys
    pub fn map<'a>(entries: impl IntoIterator<Item = (&'a str, ScriptValue)>) -> Self {
        ScriptValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (ScriptString::from_utf8(k), v))
                .collect(),
        )
    }

    /// Runtime type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Int(_) => "integer",
            ScriptValue::Float(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Symbol(_) => "symbol",
            ScriptValue::Array(_) => "array",
            ScriptValue::Map(_) => "object",
            ScriptValue::Wrapper(_) => "wrapper",
            ScriptValue::Function(_) => "function",
        }
    }

    /// Check for null or undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Null | ScriptValue::Undefined)
    }

    /// Heap object referenced by this value, if any
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            ScriptValue::Wrapper(id) | ScriptValue::Function(id) => Some(*id),
            _ => None,
        }
    }

    /// Kind and id of the heap object referenced by this value
    pub fn object_ref(&self) -> Option<(ObjectKind, ObjectId)> {
        match self {
            ScriptValue::Wrapper(id) => Some((ObjectKind::Wrapper, *id)),
            ScriptValue::Function(id) => Some((ObjectKind::Function, *id)),
            _ => None,
        }
    }

    /// Look up a key in a map value
    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        match self {
            ScriptValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Extract boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract number, widening integers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Int(i) => Some(*i as f64),
            ScriptValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Extract string as UTF-8 (lossy)
    pub fn as_string(&self) -> Option<String> {
        match self {
            ScriptValue::String(s) => Some(s.to_string_lossy()),
            _ => None,
        }
    }

    /// Push every heap object directly or transitively contained in this
    /// value (through arrays and maps) onto `out`.
    pub fn collect_objects(&self, out: &mut Vec<ObjectId>) {
        match self {
            ScriptValue::Wrapper(id) | ScriptValue::Function(id) => out.push(*id),
            ScriptValue::Array(items) => {
                for item in items {
                    item.collect_objects(out);
                }
            }
            ScriptValue::Map(entries) => {
                for (_, value) in entries {
                    value.collect_objects(out);
                }
            }
            _ => {}
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        use ScriptValue::*;
        match (self, other) {
            (Undefined, Undefined) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(i), Float(f)) | (Float(f), Int(i)) => *i as f64 == *f,
            (String(a), String(b)) => a == b,
            (Symbol(a), Symbol(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => same_entries(a, b),
            (Wrapper(a), Wrapper(b)) | (Function(a), Function(b)) => a == b,
            _ => false,
        }
    }
}

/// Entry multisets match, in any order. Each entry of `b` answers for at
/// most one entry of `a`, so duplicate keys cannot stand in for missing ones.
fn same_entries(a: &[(ScriptString, ScriptValue)], b: &[(ScriptString, ScriptValue)]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|(key, value)| {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, (k, v))| !used[i] && k == key && v == value);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<i64> for ScriptValue {
    fn from(i: i64) -> Self {
        ScriptValue::Int(i)
    }
}

impl From<i32> for ScriptValue {
    fn from(i: i32) -> Self {
        ScriptValue::Int(i as i64)
    }
}

impl From<f64> for ScriptValue {
    fn from(f: f64) -> Self {
        ScriptValue::Float(f)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::string(s)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(items: Vec<ScriptValue>) -> Self {
        ScriptValue::Array(items)
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "undefined"),
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(b) => write!(f, "{}", b),
            ScriptValue::Int(i) => write!(f, "{}", i),
            ScriptValue::Float(fl) => write!(f, "{}", fl),
            ScriptValue::String(s) => write!(f, "'{}'", s),
            ScriptValue::Symbol(sym) => write!(f, "Symbol({})", sym.description()),
            ScriptValue::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            ScriptValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            ScriptValue::Wrapper(id) => write!(f, "[object {}]", id),
            ScriptValue::Function(id) => write!(f, "[function {}]", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_reencoding_is_lossless() {
        let s = ScriptString::from_utf8("字符串");
        assert_eq!(s.len(), 3);
        assert_eq!(s.to_utf8().unwrap(), "字符串");
        assert!(s == "字符串");
    }

    #[test]
    fn test_utf16_units_preserved() {
        let units: Vec<u16> = "チャーポインター".encode_utf16().collect();
        let s = ScriptString::from_utf16(&units);
        assert_eq!(s.as_units(), units.as_slice());
    }

    #[test]
    fn test_lone_surrogate_fails_strict_decode() {
        let s = ScriptString::from_utf16(&[0xD800]);
        assert!(s.to_utf8().is_err());
        assert_eq!(s.to_string_lossy(), "\u{FFFD}");
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::new("sym");
        let b = Symbol::new("sym");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = ScriptValue::map([("x", ScriptValue::Int(1)), ("y", ScriptValue::Int(2))]);
        let b = ScriptValue::map([("y", ScriptValue::Int(2)), ("x", ScriptValue::Int(1))]);
        assert_eq!(a, b);
        let c = ScriptValue::map([("x", ScriptValue::Int(1))]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_map_equality_counts_duplicates() {
        let dup = ScriptValue::map([("x", ScriptValue::Int(1)), ("x", ScriptValue::Int(1))]);
        let distinct = ScriptValue::map([("x", ScriptValue::Int(1)), ("y", ScriptValue::Int(2))]);
        assert_ne!(dup, distinct);
        assert_ne!(distinct, dup);
        assert_eq!(dup, dup.clone());
    }

    #[test]
    fn test_int_and_float_compare_as_numbers() {
        assert_eq!(ScriptValue::Int(2), ScriptValue::Float(2.0));
        assert_eq!(ScriptValue::Float(2.0), ScriptValue::Int(2));
        assert_ne!(ScriptValue::Int(2), ScriptValue::Float(2.5));
        assert_ne!(ScriptValue::Int(0), ScriptValue::Float(f64::NAN));
        assert_eq!(ScriptValue::Int(2).as_number(), Some(2.0));
    }

    #[test]
    fn test_collect_objects_descends_containers() {
        let a = ObjectId::new(1, 0);
        let b = ObjectId::new(2, 3);
        let v = ScriptValue::Array(vec![
            ScriptValue::Wrapper(a),
            ScriptValue::map([("f", ScriptValue::Function(b))]),
            ScriptValue::Int(7),
        ]);
        let mut out = Vec::new();
        v.collect_objects(&mut out);
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn test_display() {
        let v = ScriptValue::Array(vec![ScriptValue::Int(89), true.into(), "64".into()]);
        assert_eq!(v.to_string(), "[89, true, '64']");
    }
}
