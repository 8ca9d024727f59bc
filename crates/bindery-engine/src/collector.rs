//! Mark-sweep garbage collector
//!
//! Marking is precise and iterative: it starts from the root set plus the
//! extra roots contributed by the bridge, and follows properties, function
//! captures and the bridge's retention edges. Everything left unmarked is
//! swept and its host finalizers run.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use bindery::{ObjectId, Retention};

use crate::heap::{HeapEntry, ObjectHeap};
use crate::roots::RootSet;

/// Garbage collector statistics
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    /// Total number of collections
    pub collections: usize,

    /// Total objects freed
    pub objects_freed: usize,

    /// Total pause time across all collections
    pub total_pause_time: Duration,

    /// Last collection duration
    pub last_pause_time: Duration,

    /// Maximum pause time
    pub max_pause_time: Duration,

    /// Objects marked in last collection
    pub last_marked_count: usize,

    /// Objects freed in last collection
    pub last_freed_count: usize,

    /// Live objects after last collection
    pub live_objects: usize,

    /// Host finalizers that failed
    pub finalizer_panics: usize,
}

impl GcStats {
    fn update(&mut self, pause_time: Duration, marked: usize, freed: usize, live_objects: usize) {
        self.collections += 1;
        self.objects_freed += freed;
        self.total_pause_time += pause_time;
        self.last_pause_time = pause_time;
        if pause_time > self.max_pause_time {
            self.max_pause_time = pause_time;
        }
        self.last_marked_count = marked;
        self.last_freed_count = freed;
        self.live_objects = live_objects;
    }

    /// Average pause time
    pub fn avg_pause_time(&self) -> Duration {
        if self.collections == 0 {
            return Duration::ZERO;
        }
        self.total_pause_time / self.collections as u32
    }
}

/// Run one full collection over `heap`. Returns the swept ids.
pub fn collect(heap: &mut ObjectHeap, roots: &RootSet, retention: &dyn Retention, stats: &mut GcStats) -> Vec<ObjectId> {
    let start = Instant::now();

    let marked = mark(heap, roots, retention);
    let swept = sweep(heap);

    let mut freed = Vec::with_capacity(swept.len());
    for (id, entry) in swept {
        stats.finalizer_panics += run_finalizers(id, entry);
        freed.push(id);
    }

    stats.update(start.elapsed(), marked, freed.len(), heap.len());
    log::debug!(
        "gc: marked {}, freed {}, live {} ({:?})",
        marked,
        freed.len(),
        heap.len(),
        stats.last_pause_time
    );
    freed
}

/// Mark phase: mark all reachable objects.
/// Returns number of objects marked
fn mark(heap: &mut ObjectHeap, roots: &RootSet, retention: &dyn Retention) -> usize {
    for entry in heap.entries_mut() {
        entry.marked = false;
    }

    let mut worklist = roots.objects();
    retention.extra_roots(&mut |id| worklist.push(id));

    let mut marked = 0;
    while let Some(id) = worklist.pop() {
        let Some(entry) = heap.get_mut(id) else {
            continue;
        };
        if entry.marked {
            continue;
        }
        entry.marked = true;
        marked += 1;

        for value in entry.references() {
            value.collect_objects(&mut worklist);
        }
        retention.retained_by(id, &mut |child| worklist.push(child));
    }
    marked
}

/// Sweep phase: free unmarked objects
fn sweep(heap: &mut ObjectHeap) -> Vec<(ObjectId, HeapEntry)> {
    let dead: Vec<ObjectId> = heap
        .ids()
        .into_iter()
        .filter(|id| heap.get(*id).is_some_and(|entry| !entry.marked))
        .collect();
    dead.into_iter()
        .filter_map(|id| heap.free(id).map(|entry| (id, entry)))
        .collect()
}

/// Run host finalizers of a swept object. Returns how many panicked.
fn run_finalizers(id: ObjectId, entry: HeapEntry) -> usize {
    let mut panics = 0;
    for finalizer in entry.finalizers {
        if panic::catch_unwind(AssertUnwindSafe(finalizer)).is_err() {
            log::warn!("gc: finalizer for {} panicked", id);
            panics += 1;
        }
    }
    panics
}
