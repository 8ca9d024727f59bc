//! Handle registry: one wrapper per native instance
//!
//! The registry is the only place that stores wrapper records. It maps a
//! native identity to its wrapper and a wrapper back to its native instance.
//! Entries are weak by default: the registry never keeps a wrapper alive
//! unless it has been switched to [`WrapperMode::Strong`].
//!
//! There is no removal API. Records leave the table only when the
//! finalization dispatcher retires a collected wrapper.

use rustc_hash::FxHashMap;

use crate::native::{NativeId, NativeObject};
use crate::value::ObjectId;

/// Retention mode of a wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WrapperMode {
    /// Reachable only through script references or ownership edges
    #[default]
    Weak,
    /// Pinned by native code; treated as a collector root
    Strong,
}

/// A registered wrapper
#[derive(Debug)]
pub struct WrapperRecord {
    native: NativeObject,
    mode: WrapperMode,
}

impl WrapperRecord {
    /// Native instance bound to the wrapper
    pub fn native(&self) -> &NativeObject {
        &self.native
    }

    /// Current retention mode
    pub fn mode(&self) -> WrapperMode {
        self.mode
    }

    pub(crate) fn into_native(self) -> NativeObject {
        self.native
    }
}

/// Identity-to-wrapper table
#[derive(Debug, Default)]
pub struct HandleRegistry {
    by_native: FxHashMap<NativeId, ObjectId>,
    wrappers: FxHashMap<ObjectId, WrapperRecord>,
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrapper previously registered for this native instance
    pub fn lookup(&self, native: &NativeObject) -> Option<ObjectId> {
        self.by_native.get(&native.identity()).copied()
    }

    /// Bind `native` to `wrapper`. Returns the wrapper that ends up bound:
    /// an existing binding for the same identity wins.
    pub fn insert(&mut self, native: NativeObject, wrapper: ObjectId) -> ObjectId {
        let identity = native.identity();
        if let Some(existing) = self.by_native.get(&identity) {
            return *existing;
        }
        log::trace!("registry: bind {:?} -> {}", native, wrapper);
        self.by_native.insert(identity, wrapper);
        self.wrappers.insert(
            wrapper,
            WrapperRecord {
                native,
                mode: WrapperMode::Weak,
            },
        );
        wrapper
    }

    /// Native instance bound to a wrapper
    pub fn native(&self, wrapper: ObjectId) -> Option<&NativeObject> {
        self.wrappers.get(&wrapper).map(|r| &r.native)
    }

    /// Full record for a wrapper
    pub fn record(&self, wrapper: ObjectId) -> Option<&WrapperRecord> {
        self.wrappers.get(&wrapper)
    }

    /// Check if `wrapper` is registered
    pub fn contains(&self, wrapper: ObjectId) -> bool {
        self.wrappers.contains_key(&wrapper)
    }

    /// Retention mode of a wrapper
    pub fn mode(&self, wrapper: ObjectId) -> Option<WrapperMode> {
        self.wrappers.get(&wrapper).map(|r| r.mode)
    }

    /// Switch retention mode. Returns false if `wrapper` is not registered.
    pub fn set_mode(&mut self, wrapper: ObjectId, mode: WrapperMode) -> bool {
        match self.wrappers.get_mut(&wrapper) {
            Some(record) => {
                record.mode = mode;
                true
            }
            None => false,
        }
    }

    /// Wrappers currently in strong mode
    pub fn strong_wrappers(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.wrappers
            .iter()
            .filter(|(_, r)| r.mode == WrapperMode::Strong)
            .map(|(id, _)| *id)
    }

    /// Number of registered wrappers
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Retire a collected wrapper. Finalization only.
    pub(crate) fn retire(&mut self, wrapper: ObjectId) -> Option<WrapperRecord> {
        let record = self.wrappers.remove(&wrapper)?;
        let identity = record.native.identity();
        if self.by_native.get(&identity) == Some(&wrapper) {
            self.by_native.remove(&identity);
        }
        Some(record)
    }
}
