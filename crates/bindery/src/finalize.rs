//! Finalization dispatcher
//!
//! After each host collection pass the bridge walks the swept ids. For a
//! swept wrapper it detaches the wrapper's outgoing edges, retires its
//! registry record and runs the class finalizer on the native instance.
//! Children that were only reachable through the detached edges become
//! collectable on a later pass.
//!
//! A wrapper the host swept outside [`Bridge::collect_garbage`] is released
//! through the same path when its native instance is next wrapped.
//!
//! Finalizers run at most once per wrapper and never propagate failures.

use std::panic::{self, AssertUnwindSafe};

use crate::bridge::Bridge;
use crate::class::ClassTable;
use crate::edges::{BridgeRetention, EdgeTable};
use crate::registry::HandleRegistry;
use crate::value::ObjectId;

/// Outcome of one collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Heap objects the host swept
    pub swept: usize,
    /// Wrappers finalized by the bridge
    pub finalized: usize,
    /// Ownership edges detached from finalized wrappers
    pub detached_edges: usize,
}

impl Bridge {
    /// Run one host collection pass and finalize every swept wrapper
    pub fn collect_garbage(&mut self) -> CollectReport {
        let swept = {
            let retention = BridgeRetention {
                registry: &self.registry,
                edges: &self.edges,
            };
            self.host.collect(&retention)
        };

        let mut report = CollectReport {
            swept: swept.len(),
            ..CollectReport::default()
        };
        for id in swept {
            let (detached, finalized) = release_dead(&mut self.registry, &mut self.edges, &self.classes, id);
            report.detached_edges += detached;
            if finalized {
                report.finalized += 1;
            }
        }
        log::debug!(
            "finalize: swept {} objects, finalized {} wrappers, detached {} edges",
            report.swept,
            report.finalized,
            report.detached_edges
        );
        report
    }

    /// Collect until `done` holds, for at most `max_gc_passes` passes.
    /// Returns whether `done` was satisfied.
    pub fn gc_until(&mut self, mut done: impl FnMut(&Bridge) -> bool) -> bool {
        for _ in 0..self.options.max_gc_passes {
            if done(self) {
                return true;
            }
            self.collect_garbage();
        }
        done(self)
    }
}

/// Release a wrapper the host no longer holds: detach its edges, retire its
/// record and run the class finalizer. Returns the detached edge count and
/// whether a wrapper was finalized.
pub(crate) fn release_dead(
    registry: &mut HandleRegistry,
    edges: &mut EdgeTable,
    classes: &ClassTable,
    id: ObjectId,
) -> (usize, bool) {
    let detached = edges.detach_all(id);
    edges.purge_target(id);

    let Some(record) = registry.retire(id) else {
        return (detached, false);
    };
    let native = record.into_native();
    let class = native.class();

    if let Some(finalizer) = classes.finalizer_for(class) {
        match panic::catch_unwind(AssertUnwindSafe(|| finalizer(&native))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("finalize: {} finalizer for {} failed: {}", class, id, err),
            Err(_) => log::warn!("finalize: {} finalizer for {} panicked", class, id),
        }
    }

    if panic::catch_unwind(AssertUnwindSafe(move || drop(native))).is_err() {
        log::warn!("finalize: dropping {} instance for {} panicked", class, id);
    }
    (detached, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use crate::error::{BindError, BindResult};
    use crate::host::testing::{StubHost, StubState};
    use crate::host::NoRetention;
    use crate::native::NativeObject;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked {
        finalized: Rc<Cell<usize>>,
    }

    fn bridge_with(finalizer: impl Fn(&mut Tracked) -> BindResult<()> + 'static) -> (Bridge, Rc<StubState>) {
        let (host, state) = StubHost::new();
        let mut bridge = Bridge::new(host);
        bridge
            .define_class(ClassBuilder::new("Tracked").finalizer::<Tracked, _>(finalizer).build())
            .unwrap();
        bridge
            .define_class(ClassBuilder::new("SubTracked").inherits("Tracked").build())
            .unwrap();
        (bridge, state)
    }

    #[test]
    fn test_finalizer_runs_once_and_detaches() {
        let (mut bridge, state) = bridge_with(|p| {
            p.finalized.set(p.finalized.get() + 1);
            Ok(())
        });
        let count = Rc::new(Cell::new(0));
        let parent = bridge.wrap_object(NativeObject::new("Tracked", Tracked { finalized: count.clone() }));
        let child = bridge.wrap_object(NativeObject::new("SubTracked", Tracked { finalized: count.clone() }));
        bridge.add_ownership_edge(parent, child);

        state.doomed.borrow_mut().push(parent);
        let report = bridge.collect_garbage();
        assert_eq!(report.finalized, 1);
        assert_eq!(report.detached_edges, 1);
        assert_eq!(count.get(), 1);
        assert!(bridge.edges().is_empty());
        assert!(!bridge.registry().contains(parent));

        state.doomed.borrow_mut().push(child);
        bridge.collect_garbage();
        assert_eq!(count.get(), 2);

        assert_eq!(bridge.collect_garbage(), CollectReport::default());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_finalizer_failures_are_swallowed() {
        let (mut bridge, state) = bridge_with(|_| Err(BindError::Native("boom".into())));
        let a = bridge.wrap_object(NativeObject::new("Tracked", Tracked { finalized: Rc::default() }));
        state.doomed.borrow_mut().push(a);
        assert_eq!(bridge.collect_garbage().finalized, 1);

        let (mut bridge, state) = bridge_with(|_| panic!("finalizer panic"));
        let b = bridge.wrap_object(NativeObject::new("Tracked", Tracked { finalized: Rc::default() }));
        state.doomed.borrow_mut().push(b);
        assert_eq!(bridge.collect_garbage().finalized, 1);
    }

    #[test]
    fn test_rewrap_after_host_sweep_finalizes_stale_wrapper() {
        let (mut bridge, state) = bridge_with(|t| {
            t.finalized.set(t.finalized.get() + 1);
            Ok(())
        });
        let count = Rc::new(Cell::new(0));
        let native = NativeObject::new("Tracked", Tracked { finalized: count.clone() });
        let parent = bridge.wrap_object(NativeObject::new("Tracked", Tracked { finalized: Rc::default() }));
        let stale = bridge.wrap_object(native.clone());
        bridge.add_ownership_edge(parent, stale);

        // Sweep behind the bridge's back
        state.doomed.borrow_mut().push(stale);
        assert_eq!(bridge.host_mut().collect(&NoRetention), vec![stale]);
        assert_eq!(count.get(), 0);

        // Re-wrapping releases the stale record through the dispatcher
        let fresh = bridge.wrap_object(native.clone());
        assert_ne!(fresh, stale);
        assert_eq!(count.get(), 1);
        assert!(!bridge.registry().contains(stale));
        assert!(bridge.edges().is_empty());

        // Only the fresh wrapper is finalized from here on
        state.doomed.borrow_mut().push(fresh);
        assert_eq!(bridge.collect_garbage().finalized, 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_gc_until_gives_up() {
        let (mut bridge, _state) = bridge_with(|_| Ok(()));
        let passes = Cell::new(0);
        let reached = bridge.gc_until(|_| {
            passes.set(passes.get() + 1);
            false
        });
        assert!(!reached);
        assert_eq!(passes.get(), bridge.options().max_gc_passes + 1);
    }
}
