//! Value conversion engine
//!
//! `to_script` is total over native values; `from_script` is driven by a
//! declared [`NativeType`] and reports every failure against the position of
//! the outermost argument, however deep inside a container it happened.
//!
//! Native objects pass through the handle registry on the way out, so a
//! native instance always surfaces in script as the same wrapper.

use crate::class::ClassTable;
use crate::edges::EdgeTable;
use crate::error::{BindError, BindResult};
use crate::finalize::release_dead;
use crate::host::HostEngine;
use crate::native::{NativeObject, NativeType, NativeValue, U16String};
use crate::registry::HandleRegistry;
use crate::value::{ObjectId, ScriptString, ScriptValue};

/// Position reported for failures while converting a return value
pub const RESULT_INDEX: usize = 0;

/// Borrowed view of the bridge state a conversion needs.
pub struct Converter<'a> {
    pub(crate) host: &'a mut dyn HostEngine,
    pub(crate) registry: &'a mut HandleRegistry,
    pub(crate) edges: &'a mut EdgeTable,
    pub(crate) classes: &'a ClassTable,
    pub(crate) max_depth: usize,
}

impl<'a> Converter<'a> {
    pub(crate) fn new(
        host: &'a mut dyn HostEngine,
        registry: &'a mut HandleRegistry,
        edges: &'a mut EdgeTable,
        classes: &'a ClassTable,
        max_depth: usize,
    ) -> Self {
        Self {
            host,
            registry,
            edges,
            classes,
            max_depth,
        }
    }

    // ========================================================================
    // Native → script
    // ========================================================================

    /// Convert a native value into a script value
    pub fn to_script(&mut self, value: NativeValue) -> BindResult<ScriptValue> {
        self.to_script_at(value, 0)
    }

    fn to_script_at(&mut self, value: NativeValue, depth: usize) -> BindResult<ScriptValue> {
        if depth > self.max_depth {
            return Err(BindError::Depth {
                index: RESULT_INDEX,
                limit: self.max_depth,
            });
        }
        Ok(match value {
            NativeValue::Undefined => ScriptValue::Undefined,
            NativeValue::Null => ScriptValue::Null,
            NativeValue::Bool(b) => ScriptValue::Bool(b),
            NativeValue::Integer(i) => ScriptValue::Int(i),
            NativeValue::Number(f) => ScriptValue::Float(f),
            NativeValue::String(s) => ScriptValue::String(ScriptString::from_utf8(&s)),
            NativeValue::U16String(s) => ScriptValue::String(ScriptString::from_utf16(s.as_units())),
            NativeValue::Symbol(s) => ScriptValue::Symbol(s),
            NativeValue::Variant { value, .. } => self.to_script_at(*value, depth)?,
            NativeValue::Tuple(items) | NativeValue::List(items) => ScriptValue::Array(
                items
                    .into_iter()
                    .map(|item| self.to_script_at(item, depth + 1))
                    .collect::<BindResult<_>>()?,
            ),
            NativeValue::Set(items) => {
                let mut out: Vec<ScriptValue> = Vec::with_capacity(items.len());
                for item in items {
                    let item = self.to_script_at(item, depth + 1)?;
                    if !out.contains(&item) {
                        out.push(item);
                    }
                }
                ScriptValue::Array(out)
            }
            NativeValue::Map(entries) => {
                let mut out: Vec<(ScriptString, ScriptValue)> = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = property_key(&key).ok_or_else(|| BindError::Lookup {
                        index: RESULT_INDEX,
                        key: format!("{:?}", key),
                    })?;
                    let value = self.to_script_at(value, depth + 1)?;
                    match out.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = value,
                        None => out.push((key, value)),
                    }
                }
                ScriptValue::Map(out)
            }
            NativeValue::Object(native) => ScriptValue::Wrapper(self.wrap(native)),
            NativeValue::Function(id) => ScriptValue::Function(id),
            NativeValue::WeakFunction(handle) => {
                if self.host.is_alive(handle.id()) {
                    handle.to_value()
                } else {
                    ScriptValue::Undefined
                }
            }
            NativeValue::Script(value) => value,
        })
    }

    /// Wrapper for a native instance, created on first use
    pub fn wrap(&mut self, native: NativeObject) -> ObjectId {
        if let Some(existing) = self.registry.lookup(&native) {
            if self.host.is_alive(existing) {
                return existing;
            }
            release_dead(self.registry, self.edges, self.classes, existing);
        }
        let id = self.host.alloc_wrapper(native.class());
        self.host.pin(&ScriptValue::Wrapper(id));
        self.registry.insert(native, id)
    }

    // ========================================================================
    // Script → native
    // ========================================================================

    /// Convert argument `index` to its declared type
    pub fn from_script(&mut self, value: &ScriptValue, ty: &NativeType, index: usize) -> BindResult<NativeValue> {
        self.from_script_at(value, ty, index, 0)
    }

    fn from_script_at(
        &mut self,
        value: &ScriptValue,
        ty: &NativeType,
        index: usize,
        depth: usize,
    ) -> BindResult<NativeValue> {
        if depth > self.max_depth {
            return Err(BindError::Depth {
                index,
                limit: self.max_depth,
            });
        }
        let fail = || BindError::Conversion {
            index,
            expected: ty.to_string(),
            actual: value.type_name().to_string(),
        };

        match (ty, value) {
            (NativeType::Any, v) => Ok(NativeValue::Script(v.clone())),

            (NativeType::Null, v) if v.is_nullish() => Ok(NativeValue::Null),

            (NativeType::Bool, ScriptValue::Bool(b)) => Ok(NativeValue::Bool(*b)),

            (NativeType::Integer, v) => script_integer(v).map(NativeValue::Integer).ok_or_else(fail),
            (NativeType::BoundedInteger { min, max, .. }, v) => script_integer(v)
                .filter(|i| (*min..=*max).contains(i))
                .map(NativeValue::Integer)
                .ok_or_else(fail),

            (NativeType::Number, ScriptValue::Int(i)) => Ok(NativeValue::Number(*i as f64)),
            (NativeType::Number, ScriptValue::Float(f)) => Ok(NativeValue::Number(*f)),

            (NativeType::String, ScriptValue::String(s)) => s.to_utf8().map(NativeValue::String).map_err(|_| {
                BindError::Conversion {
                    index,
                    expected: ty.to_string(),
                    actual: "ill-formed string".to_string(),
                }
            }),
            (NativeType::U16String, ScriptValue::String(s)) => {
                Ok(NativeValue::U16String(U16String(s.as_units().to_vec())))
            }

            (NativeType::Symbol, ScriptValue::Symbol(s)) => Ok(NativeValue::Symbol(s.clone())),

            (NativeType::Tuple(types), ScriptValue::Array(items)) => {
                if items.len() != types.len() {
                    return Err(BindError::Arity {
                        index,
                        expected: types.len(),
                        actual: items.len(),
                    });
                }
                items
                    .iter()
                    .zip(types)
                    .map(|(item, ty)| self.from_script_at(item, ty, index, depth + 1))
                    .collect::<BindResult<_>>()
                    .map(NativeValue::Tuple)
            }

            (NativeType::Variant(alternatives), v) => {
                for (alt, alt_ty) in alternatives.iter().enumerate() {
                    match self.from_script_at(v, alt_ty, index, depth + 1) {
                        Ok(converted) => {
                            return Ok(NativeValue::Variant {
                                index: alt,
                                value: Box::new(converted),
                            })
                        }
                        Err(err @ BindError::Depth { .. }) => return Err(err),
                        Err(_) => continue,
                    }
                }
                Err(fail())
            }

            (NativeType::List(element), ScriptValue::Array(items)) => items
                .iter()
                .map(|item| self.from_script_at(item, element, index, depth + 1))
                .collect::<BindResult<_>>()
                .map(NativeValue::List),

            (NativeType::Set(element), ScriptValue::Array(items)) => {
                let mut seen: Vec<&ScriptValue> = Vec::with_capacity(items.len());
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if seen.contains(&item) {
                        continue;
                    }
                    seen.push(item);
                    out.push(self.from_script_at(item, element, index, depth + 1)?);
                }
                Ok(NativeValue::Set(out))
            }

            (NativeType::Map(key_ty, value_ty), ScriptValue::Map(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let key = map_key(key, key_ty).ok_or_else(|| BindError::Lookup {
                        index,
                        key: key.to_string_lossy(),
                    })?;
                    out.push((key, self.from_script_at(item, value_ty, index, depth + 1)?));
                }
                Ok(NativeValue::Map(out))
            }

            (NativeType::Optional(_), ScriptValue::Undefined) => Ok(NativeValue::Undefined),
            (NativeType::Optional(_), ScriptValue::Null) => Ok(NativeValue::Null),
            (NativeType::Optional(inner), v) => self.from_script_at(v, inner, index, depth),

            (NativeType::Object(class), ScriptValue::Wrapper(id)) => {
                let native = self
                    .registry
                    .native(*id)
                    .filter(|_| self.host.is_alive(*id))
                    .ok_or_else(fail)?;
                if !self.classes.is_a(native.class(), class) {
                    return Err(BindError::Conversion {
                        index,
                        expected: ty.to_string(),
                        actual: native.class().to_string(),
                    });
                }
                Ok(NativeValue::Object(native.clone()))
            }

            (NativeType::Function, ScriptValue::Function(id)) => Ok(NativeValue::Function(*id)),

            _ => Err(fail()),
        }
    }
}

/// Integer value of a script number, if it has one
fn script_integer(value: &ScriptValue) -> Option<i64> {
    match value {
        ScriptValue::Int(i) => Some(*i),
        ScriptValue::Float(f) => integral(*f),
        _ => None,
    }
}

/// Integer held by a float, if it is finite, integral and in i64 range
fn integral(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    (f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

/// Property-name form of a native map key
fn property_key(key: &NativeValue) -> Option<ScriptString> {
    match key {
        NativeValue::String(s) => Some(ScriptString::from_utf8(s)),
        NativeValue::U16String(s) => Some(ScriptString::from_utf16(s.as_units())),
        NativeValue::Integer(i) => Some(ScriptString::from_utf8(&i.to_string())),
        NativeValue::Number(f) if f.is_finite() => Some(ScriptString::from_utf8(&f.to_string())),
        NativeValue::Bool(b) => Some(ScriptString::from_utf8(if *b { "true" } else { "false" })),
        NativeValue::Variant { value, .. } => property_key(value),
        NativeValue::Script(ScriptValue::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Convert a property name to the declared key type
fn map_key(key: &ScriptString, ty: &NativeType) -> Option<NativeValue> {
    match ty {
        NativeType::Any => Some(NativeValue::Script(ScriptValue::String(key.clone()))),
        NativeType::String => key.to_utf8().ok().map(NativeValue::String),
        NativeType::U16String => Some(NativeValue::U16String(U16String(key.as_units().to_vec()))),
        NativeType::Integer => {
            let text = key.to_utf8().ok()?;
            let i: i64 = text.parse().ok()?;
            (i.to_string() == text).then_some(NativeValue::Integer(i))
        }
        NativeType::BoundedInteger { min, max, .. } => match map_key(key, &NativeType::Integer)? {
            NativeValue::Integer(i) if (*min..=*max).contains(&i) => Some(NativeValue::Integer(i)),
            _ => None,
        },
        NativeType::Number => {
            let f: f64 = key.to_utf8().ok()?.parse().ok()?;
            f.is_finite().then_some(NativeValue::Number(f))
        }
        NativeType::Bool => match key.to_utf8().ok()?.as_str() {
            "true" => Some(NativeValue::Bool(true)),
            "false" => Some(NativeValue::Bool(false)),
            _ => None,
        },
        NativeType::Optional(inner) => map_key(key, inner),
        NativeType::Variant(alternatives) => alternatives.iter().enumerate().find_map(|(index, alt)| {
            map_key(key, alt).map(|value| NativeValue::Variant {
                index,
                value: Box::new(value),
            })
        }),
        _ => None,
    }
}
