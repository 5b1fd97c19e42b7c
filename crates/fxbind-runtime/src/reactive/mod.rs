#![forbid(unsafe_code)]

//! Reactive closure properties.
//!
//! This module turns an arbitrary expression into an observable property
//! that stays current as the data it reads changes:
//!
//! - [`Expression`]: a re-evaluable body plus the context and captures it
//!   reads, evaluated through a [`Scope`].
//! - [`DependencyNode`]: the member paths one discovery pass recorded.
//! - [`BindPath`]: a recorded path resolved to real properties, with the
//!   engine's listener attached.
//! - [`ClosureProperty`]: the engine tying the three together.
//!
//! # Architecture
//!
//! Binding is a two-pass affair. Discovery runs the expression body against
//! recorder slots and collects the member names it touches, without running
//! any method or reading any real value. Resolution then walks the recorded
//! tree against the real objects and attaches listeners. Everything is
//! single-threaded (`Rc`/`RefCell`) and notifications are delivered inline.
//!
//! # Invariants
//!
//! 1. Discovery never invokes a host method.
//! 2. Reading a member on a method-call result fails the bind with
//!    [`BindError::Unbindable`](crate::BindError::Unbindable).
//! 3. Attach and detach are symmetric per bind tree.
//! 4. Dependencies hold engines weakly.

pub mod bind_path;
pub mod closure_property;
pub mod expression;
mod recorder;

pub use bind_path::BindPath;
pub use closure_property::ClosureProperty;
pub use expression::{Expression, ExpressionBuilder, Scope, Slot};
pub use recorder::DependencyNode;
