//! Bindery Engine - reference script heap
//!
//! A small single-threaded heap that implements [`bindery::HostEngine`]:
//!
//! - generational object slots for wrappers and functions ([`heap`])
//! - handle scopes and globals as roots ([`roots`])
//! - a precise mark-sweep collector that honours the bridge's ownership
//!   edges and runs per-object finalizers ([`collector`])
//!
//! It exists to drive the bridge in tests and embedding experiments; it has
//! no interpreter of its own.

#![warn(missing_docs)]

pub mod collector;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod heap;
pub mod roots;

pub use collector::GcStats;
pub use defaults::HeapOptions;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use heap::{HeapEntry, HeapObject, ObjectHeap};
pub use roots::RootSet;
