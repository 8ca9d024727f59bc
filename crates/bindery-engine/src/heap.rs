//! Generational object heap
//!
//! Objects live in slots addressed by [`ObjectId`]. Freeing a slot bumps its
//! generation before the slot goes back on the free list, so an id taken
//! before the free never resolves to whatever is allocated there next.

use std::fmt;

use bindery::{HostFinalizer, HostFunction, ObjectId, ObjectKind, ScriptValue};
use rustc_hash::FxHashMap;

use crate::error::{EngineError, EngineResult};

/// Payload of a heap object
pub enum HeapObject {
    /// Script handle for a native instance
    Wrapper {
        /// Registered class name
        class: &'static str,
    },
    /// Script function
    Function {
        /// Function name, for diagnostics
        name: String,
        /// Values closed over by the function; traced like properties
        captures: Vec<ScriptValue>,
        /// Native body
        body: HostFunction,
    },
}

/// A live heap object with its properties and pending finalizers
pub struct HeapEntry {
    pub(crate) object: HeapObject,
    pub(crate) properties: FxHashMap<String, ScriptValue>,
    pub(crate) finalizers: Vec<HostFinalizer>,
    pub(crate) marked: bool,
}

impl HeapEntry {
    fn new(object: HeapObject) -> Self {
        Self {
            object,
            properties: FxHashMap::default(),
            finalizers: Vec::new(),
            marked: false,
        }
    }

    /// Object kind
    pub fn kind(&self) -> ObjectKind {
        match self.object {
            HeapObject::Wrapper { .. } => ObjectKind::Wrapper,
            HeapObject::Function { .. } => ObjectKind::Function,
        }
    }

    /// Payload
    pub fn object(&self) -> &HeapObject {
        &self.object
    }

    /// Ordinary property
    pub fn property(&self, key: &str) -> Option<&ScriptValue> {
        self.properties.get(key)
    }

    /// Every value this object references directly
    pub(crate) fn references(&self) -> impl Iterator<Item = &ScriptValue> {
        let captures: &[ScriptValue] = match &self.object {
            HeapObject::Function { captures, .. } => captures.as_slice(),
            HeapObject::Wrapper { .. } => &[],
        };
        self.properties.values().chain(captures.iter())
    }
}

struct HeapSlot {
    generation: u32,
    entry: Option<HeapEntry>,
}

/// Slot storage for wrappers and functions
pub struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
    live: usize,
}

impl ObjectHeap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty heap with room for `capacity` objects
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Allocate an object, reusing a freed slot when one is available
    pub fn allocate(&mut self, object: HeapObject) -> ObjectId {
        self.live += 1;
        let entry = HeapEntry::new(object);
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            ObjectId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                entry: Some(entry),
            });
            ObjectId::new(index, 0)
        }
    }

    /// Live object for `id`; `None` if freed or stale
    pub fn get(&self, id: ObjectId) -> Option<&HeapEntry> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Mutable live object for `id`
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapEntry> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Live object for `id`, or a stale-handle error
    pub fn entry_mut(&mut self, id: ObjectId) -> EngineResult<&mut HeapEntry> {
        self.get_mut(id).ok_or(EngineError::StaleHandle(id))
    }

    /// Check whether `id` names a live object
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Free an object and return it. The slot's generation is bumped.
    pub fn free(&mut self, id: ObjectId) -> Option<HeapEntry> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index());
        self.live -= 1;
        Some(entry)
    }

    /// Ids of every live object
    pub fn ids(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(index, slot)| ObjectId::new(index as u32, slot.generation))
            .collect()
    }

    /// Iterate live objects mutably
    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut HeapEntry> {
        self.slots.iter_mut().filter_map(|slot| slot.entry.as_mut())
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("live", &self.live)
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}
