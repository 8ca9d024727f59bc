//! Bindery - native objects on a garbage-collected script heap
//!
//! This crate is the boundary layer between natively-owned objects and a
//! tracing-collected script value space:
//!
//! - a bidirectional value conversion engine ([`convert`], [`typed`])
//! - a handle registry giving every native instance exactly one wrapper
//!   ([`registry`])
//! - ownership edges that tell the collector about native aggregation
//!   ([`edges`])
//! - a method interception layer applying lifetime policies around calls
//!   ([`class`], [`intercept`])
//! - a finalization dispatcher run after each collection pass ([`finalize`])
//!
//! The script engine itself sits behind the [`HostEngine`] trait.
//!
//! # Example
//!
//! ```ignore
//! use bindery::{Bridge, ClassBuilder, NativeType, NativeValue, WrapPolicy};
//!
//! let mut bridge = Bridge::new(engine);
//! bridge.define_class(
//!     ClassBuilder::new("View")
//!         .constructor(vec![], |_cx, _args| Ok(View::default()))
//!         .instance_method::<View, _>(
//!             "addChildView",
//!             vec![NativeType::Object("View")],
//!             WrapPolicy::RetainArgument(0),
//!             |_cx, view, args| {
//!                 view.children.push(bindery::arg(&args, 0)?);
//!                 Ok(NativeValue::Undefined)
//!             },
//!         )
//!         .build(),
//! )?;
//! let parent = bridge.construct("View", &[])?;
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod class;
pub mod convert;
pub mod defaults;
pub mod edges;
pub mod error;
pub mod finalize;
pub mod host;
pub mod intercept;
pub mod module;
pub mod native;
pub mod registry;
pub mod typed;
pub mod value;

pub use bridge::Bridge;
pub use class::{ClassBuilder, ClassDef, ClassTable, WrapPolicy};
pub use convert::Converter;
pub use defaults::BridgeOptions;
pub use edges::EdgeTable;
pub use error::{BindError, BindResult};
pub use finalize::CollectReport;
pub use host::{HostEngine, HostFinalizer, HostFunction, NoRetention, Retention};
pub use intercept::CallContext;
pub use module::{ModuleBuilder, ModuleDef};
pub use native::{NativeObject, NativeType, NativeValue, U16String, WeakHandle};
pub use registry::{HandleRegistry, WrapperMode};
pub use typed::{arg, FromNative, IntoNative, NativeTyped};
pub use value::{ObjectId, ObjectKind, ScriptString, ScriptValue, Symbol};
