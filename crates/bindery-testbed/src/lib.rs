//! Bindery Testbed - sample bindings over the reference engine
//!
//! - [`types`]: a module exporting one value per supported conversion and
//!   identity functions for tuples, pairs, variants and maps
//! - [`view`]: the `View` class, whose methods cover every wrap policy
//! - [`runtime`]: wires a [`bindery::Bridge`] to a [`bindery_engine::Engine`]
//!   with both installed

pub mod runtime;
pub mod types;
pub mod view;

pub use runtime::Runtime;
pub use view::View;
