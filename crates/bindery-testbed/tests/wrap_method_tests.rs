//! Integration tests for wrapper lifetimes driven through the `View` class
//!
//! Tests cover:
//! - Parent and child collection once both are unreachable
//! - Weak callbacks that do not keep their function alive
//! - RetainArgument and ReleaseArgument policies
//! - Edge idempotence and wrapper identity
//! - Strong wrapper mode
//! - Weak handles across slot reuse
//! - Errors that leave edges untouched and calls on collected wrappers

use std::cell::Cell;
use std::rc::Rc;

use bindery::{BindError, ScriptValue, WrapperMode};
use bindery_testbed::{Runtime, View};

fn runtime() -> Runtime {
    Runtime::new().expect("runtime")
}

/// Flag set by a finalizer
fn flag() -> Rc<Cell<bool>> {
    Rc::new(Cell::new(false))
}

fn watch(rt: &mut Runtime, value: &ScriptValue, collected: &Rc<Cell<bool>>) {
    let collected = collected.clone();
    rt.add_finalizer(value, move || collected.set(true)).unwrap();
}

// ============================================================================
// Collection scenarios
// ============================================================================

#[test]
fn test_parent_with_child_get_collected() {
    let mut rt = runtime();
    let parent_collected = flag();
    let child_collected = flag();

    // Create parent and child in an inner scope
    rt.run_in_new_scope(|rt| {
        let parent = rt.new_view()?;
        let child = rt.new_view()?;
        rt.call(&parent, "addChildView", &[child.clone()])?;
        watch(rt, &parent, &parent_collected);
        watch(rt, &child, &child_collected);
        Ok(())
    })
    .unwrap();

    // Parent goes first, its edge detaches, then the child follows
    assert!(rt.gc_until(|| child_collected.get()));
    assert!(parent_collected.get() && child_collected.get());
    assert!(rt.bridge().edges().is_empty());
    assert!(rt.bridge().registry().is_empty());
}

#[test]
fn test_weak_callback_gets_collected() {
    let mut rt = runtime();
    let listener_collected = flag();

    let view = rt.new_view().unwrap();
    rt.run_in_new_scope(|rt| {
        let listener = rt.function("listener", |_| Ok(ScriptValue::Undefined));
        rt.call(&view, "addEventListener", &[listener.clone()])?;
        watch(rt, &listener, &listener_collected);
        Ok(())
    })
    .unwrap();

    // The view only holds the listener weakly
    assert!(rt.gc_until(|| listener_collected.get()));
    assert_eq!(
        rt.call(&view, "dispatchEvent", &[ScriptValue::Null]).unwrap(),
        ScriptValue::Int(0)
    );
}

#[test]
fn test_retained_child_survives_pass_through_view() {
    let mut rt = runtime();
    let view_collected = flag();
    let child_collected = flag();

    let parent = rt.new_view().unwrap();
    let child = rt
        .run_in_new_scope(|rt| {
            let view = rt.new_view()?;
            let child = rt.new_view()?;
            rt.call(&parent, "doNothingWithView", &[view.clone()])?;
            rt.call(&parent, "addChildView", &[child.clone()])?;
            watch(rt, &view, &view_collected);
            watch(rt, &child, &child_collected);
            Ok(child)
        })
        .unwrap();

    // Passed-through view is collectable, the retained child is not
    assert!(rt.gc_until(|| view_collected.get()));
    assert!(!child_collected.get());
    assert!(rt.bridge().host().is_alive(child.object_id().unwrap()));
    assert_eq!(rt.bridge().get_property(&parent, "childCount").unwrap(), ScriptValue::Int(1));
}

#[test]
fn test_released_child_gets_collected() {
    let mut rt = runtime();
    let child_collected = flag();

    let parent = rt.new_view().unwrap();
    rt.run_in_new_scope(|rt| {
        let child = rt.new_view()?;
        rt.call(&parent, "addChildView", &[child.clone()])?;
        rt.call(&parent, "removeChildView", &[child.clone()])?;
        watch(rt, &child, &child_collected);
        Ok(())
    })
    .unwrap();

    assert!(rt.gc_until(|| child_collected.get()));
    assert_eq!(rt.bridge().get_property(&parent, "childCount").unwrap(), ScriptValue::Int(0));
}

// ============================================================================
// Edges and identity
// ============================================================================

#[test]
fn test_repeated_adds_need_one_remove() {
    let mut rt = runtime();
    let parent = rt.new_view().unwrap();
    let child = rt.new_view().unwrap();
    let (p, c) = (parent.object_id().unwrap(), child.object_id().unwrap());

    // Two adds, one edge
    rt.call(&parent, "addChildView", &[child.clone()]).unwrap();
    rt.call(&parent, "addChildView", &[child.clone()]).unwrap();
    assert_eq!(rt.bridge().edges().len(), 1);

    // One remove detaches it, a second is a no-op
    rt.call(&parent, "removeChildView", &[child.clone()]).unwrap();
    assert!(!rt.bridge().edges().contains(p, c));

    rt.call(&parent, "removeChildView", &[child.clone()]).unwrap();
    assert!(rt.bridge().edges().is_empty());
}

#[test]
fn test_child_reachable_elsewhere_survives_release() {
    let mut rt = runtime();
    let child_collected = flag();
    let parent = rt.new_view().unwrap();
    let child = rt.new_view().unwrap();
    watch(&mut rt, &child, &child_collected);

    rt.call(&parent, "addChildView", &[child.clone()]).unwrap();
    rt.call(&parent, "removeChildView", &[child.clone()]).unwrap();
    rt.bridge().collect_garbage();
    assert!(!child_collected.get());
}

#[test]
fn test_wrapper_identity_is_stable() {
    let mut rt = runtime();
    let view = rt.new_view().unwrap();
    let native = rt.bridge().native_of(&view).unwrap();
    let id = rt.bridge().wrap_object(native.clone());
    assert_eq!(ScriptValue::Wrapper(id), view);

    let view_id = rt.bridge().get_property(&view, "id").unwrap();
    assert_eq!(view_id.as_int(), Some(i64::from(native.borrow::<View>().unwrap().id())));
}

#[test]
fn test_strong_mode_pins_wrapper() {
    let mut rt = runtime();
    let collected = flag();
    let id = rt
        .run_in_new_scope(|rt| {
            let view = rt.new_view()?;
            watch(rt, &view, &collected);
            Ok(view.object_id().unwrap())
        })
        .unwrap();

    // Strong mode roots the wrapper
    assert!(rt.bridge().set_wrapper_mode(id, WrapperMode::Strong));
    rt.bridge().collect_garbage();
    assert!(!collected.get());

    // Back to weak - collectable again
    rt.bridge().set_wrapper_mode(id, WrapperMode::Weak);
    assert!(rt.gc_until(|| collected.get()));
}

// ============================================================================
// Weak callbacks
// ============================================================================

#[test]
fn test_dispatch_skips_collected_listeners() {
    let mut rt = runtime();
    let calls = Rc::new(Cell::new(0));
    let view = rt.new_view().unwrap();

    let counter = calls.clone();
    let kept = rt.function("kept", move |_| {
        counter.set(counter.get() + 1);
        Ok(ScriptValue::Undefined)
    });
    rt.call(&view, "addEventListener", &[kept]).unwrap();

    // A second listener only reachable through the view
    let dropped_collected = flag();
    rt.run_in_new_scope(|rt| {
        let counter = calls.clone();
        let dropped = rt.function("dropped", move |_| {
            counter.set(counter.get() + 1);
            Ok(ScriptValue::Undefined)
        });
        rt.call(&view, "addEventListener", &[dropped.clone()])?;
        watch(rt, &dropped, &dropped_collected);
        Ok(())
    })
    .unwrap();

    assert_eq!(
        rt.call(&view, "dispatchEvent", &[ScriptValue::Int(1)]).unwrap(),
        ScriptValue::Int(2)
    );
    assert!(rt.gc_until(|| dropped_collected.get()));
    assert_eq!(
        rt.call(&view, "dispatchEvent", &[ScriptValue::Int(2)]).unwrap(),
        ScriptValue::Int(1)
    );
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_weak_handle_does_not_outlive_slot_reuse() {
    let mut rt = runtime();
    let weak = rt
        .run_in_new_scope(|rt| {
            let view = rt.new_view()?;
            Ok(rt.bridge().pass_weak(&view).unwrap())
        })
        .unwrap();
    rt.bridge().collect_garbage();
    assert!(rt.bridge().upgrade(&weak).is_none());

    let reused = rt.new_view().unwrap();
    assert_eq!(reused.object_id().unwrap().index(), weak.id().index());
    assert!(rt.bridge().upgrade(&weak).is_none());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_bad_arguments_leave_edges_untouched() {
    let mut rt = runtime();
    let parent = rt.new_view().unwrap();
    let err = rt
        .call(&parent, "addChildView", &[ScriptValue::string("not a view")])
        .unwrap_err();
    assert!(err.is_conversion_failure());
    assert!(rt.bridge().edges().is_empty());

    let err = rt.call(&parent, "addEventListener", &[ScriptValue::Int(1)]).unwrap_err();
    assert_eq!(err.argument_index(), Some(0));
}

#[test]
fn test_method_on_collected_wrapper_is_rejected() {
    let mut rt = runtime();
    let view = rt.run_in_new_scope(|rt| rt.new_view()).unwrap();
    rt.bridge().collect_garbage();
    match rt.call(&view, "childCount", &[]) {
        Err(BindError::InvalidReceiver { expected, actual }) => {
            assert_eq!(expected, "wrapper");
            assert_eq!(actual, "collected wrapper");
        }
        other => panic!("expected invalid receiver, got {:?}", other),
    }
}
