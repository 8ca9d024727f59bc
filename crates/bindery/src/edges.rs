//! Ownership edges between wrappers
//!
//! An edge parent → child tells the collector that the child is reachable
//! whenever the parent is. Edges are keyed by wrapper identity and kept apart
//! from native pointer structure, so cycles among native objects never leak
//! into reachability.
//!
//! Adding an existing edge and removing a missing one are both no-ops; edge
//! operations never fail.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::host::Retention;
use crate::registry::HandleRegistry;
use crate::value::ObjectId;

/// Directed strong-retention edges
#[derive(Debug, Default)]
pub struct EdgeTable {
    outgoing: FxHashMap<ObjectId, FxHashSet<ObjectId>>,
    incoming: FxHashMap<ObjectId, FxHashSet<ObjectId>>,
}

impl EdgeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add parent → child. Returns true if the edge was created.
    pub fn add(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        let created = self.outgoing.entry(parent).or_default().insert(child);
        if created {
            self.incoming.entry(child).or_default().insert(parent);
            log::trace!("edges: add {} -> {}", parent, child);
        }
        created
    }

    /// Remove parent → child. Returns true if an edge was removed.
    pub fn remove(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        if !self.contains(parent, child) {
            return false;
        }
        unlink(&mut self.outgoing, parent, child);
        unlink(&mut self.incoming, child, parent);
        log::trace!("edges: remove {} -> {}", parent, child);
        true
    }

    /// Check for parent → child
    pub fn contains(&self, parent: ObjectId, child: ObjectId) -> bool {
        self.outgoing
            .get(&parent)
            .is_some_and(|children| children.contains(&child))
    }

    /// Children retained by `parent`
    pub fn children(&self, parent: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.outgoing
            .get(&parent)
            .into_iter()
            .flat_map(|children| children.iter().copied())
    }

    /// Drop every edge leaving `parent`. Returns how many were removed.
    pub fn detach_all(&mut self, parent: ObjectId) -> usize {
        let Some(children) = self.outgoing.remove(&parent) else {
            return 0;
        };
        for child in &children {
            unlink(&mut self.incoming, *child, parent);
        }
        let removed = children.len();
        if removed > 0 {
            log::trace!("edges: detach {} ({} children)", parent, removed);
        }
        removed
    }

    /// Drop every edge pointing at `child`
    pub fn purge_target(&mut self, child: ObjectId) {
        let Some(parents) = self.incoming.remove(&child) else {
            return;
        };
        for parent in parents {
            unlink(&mut self.outgoing, parent, child);
        }
    }

    /// Parents retaining `child`
    pub fn parents(&self, child: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.incoming
            .get(&child)
            .into_iter()
            .flat_map(|parents| parents.iter().copied())
    }

    /// Total number of edges
    pub fn len(&self) -> usize {
        self.outgoing.values().map(|children| children.len()).sum()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }
}

/// Remove `to` from the set at `from`, dropping the set once empty
fn unlink(index: &mut FxHashMap<ObjectId, FxHashSet<ObjectId>>, from: ObjectId, to: ObjectId) {
    if let Some(set) = index.get_mut(&from) {
        set.remove(&to);
        if set.is_empty() {
            index.remove(&from);
        }
    }
}

/// What the bridge reports to the collector: strong wrappers as roots and
/// ownership edges as extra references.
pub(crate) struct BridgeRetention<'a> {
    pub(crate) registry: &'a HandleRegistry,
    pub(crate) edges: &'a EdgeTable,
}

impl Retention for BridgeRetention<'_> {
    fn extra_roots(&self, visit: &mut dyn FnMut(ObjectId)) {
        for id in self.registry.strong_wrappers() {
            visit(id);
        }
    }

    fn retained_by(&self, id: ObjectId, visit: &mut dyn FnMut(ObjectId)) {
        for child in self.edges.children(id) {
            visit(child);
        }
    }
}
