//! `View`: a native aggregate whose methods exercise every wrap policy

use std::sync::atomic::{AtomicU32, Ordering};

use bindery::{
    arg, BindResult, Bridge, ClassBuilder, IntoNative, NativeObject, NativeType, NativeValue, WeakHandle, WrapPolicy,
};

/// Class name
pub const CLASS: &str = "View";

static NEXT_VIEW_ID: AtomicU32 = AtomicU32::new(1);

/// Native view. Children are held strongly; listeners only weakly.
pub struct View {
    id: u32,
    children: Vec<NativeObject>,
    listeners: Vec<WeakHandle>,
}

impl View {
    /// Create an empty view with a fresh id
    pub fn new() -> Self {
        Self {
            id: NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed),
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Process-unique view id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Attached children
    pub fn children(&self) -> &[NativeObject] {
        &self.children
    }

    fn add_child(&mut self, child: NativeObject) {
        if !self.children.iter().any(|c| c.ptr_eq(&child)) {
            self.children.push(child);
        }
    }

    fn remove_child(&mut self, child: &NativeObject) {
        self.children.retain(|c| !c.ptr_eq(child));
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the `View` class on `bridge`
pub fn register(bridge: &mut Bridge) -> BindResult<()> {
    let view = NativeType::Object(CLASS);

    let class = ClassBuilder::new(CLASS)
        .constructor(vec![], |_cx, _args| Ok(View::new()))
        .instance_method::<View, _>(
            "addChildView",
            vec![view.clone()],
            WrapPolicy::RetainArgument(0),
            |_cx, this, args| {
                this.add_child(arg(&args, 0)?);
                Ok(NativeValue::Undefined)
            },
        )
        .instance_method::<View, _>(
            "removeChildView",
            vec![view.clone()],
            WrapPolicy::ReleaseArgument(0),
            |_cx, this, args| {
                let child: NativeObject = arg(&args, 0)?;
                this.remove_child(&child);
                Ok(NativeValue::Undefined)
            },
        )
        .instance_method::<View, _>(
            "addEventListener",
            vec![NativeType::Function],
            WrapPolicy::WeakCallback(0),
            |_cx, this, args| {
                this.listeners.push(arg(&args, 0)?);
                Ok(NativeValue::Undefined)
            },
        )
        .instance_method::<View, _>("doNothingWithView", vec![view], WrapPolicy::None, |_cx, _this, _args| {
            Ok(NativeValue::Undefined)
        })
        .instance_method::<View, _>("dispatchEvent", vec![NativeType::Any], WrapPolicy::None, |cx, this, args| {
            let event = args.into_iter().next().unwrap_or_default();
            let mut invoked = 0i64;
            for listener in &this.listeners {
                if cx.call_weak(listener, vec![event.clone()])?.is_some() {
                    invoked += 1;
                }
            }
            this.listeners.retain(|listener| cx.is_alive(listener));
            Ok(invoked.into_native())
        })
        .getter::<View, _>("childCount", |this| (this.children.len() as i64).into_native())
        .getter::<View, _>("id", |this| this.id.into_native())
        .finalizer::<View, _>(|this| {
            log::trace!("view {}: finalized with {} children", this.id, this.children.len());
            this.children.clear();
            this.listeners.clear();
            Ok(())
        })
        .build();

    bridge.define_class(class)
}
