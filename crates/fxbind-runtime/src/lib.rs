#![forbid(unsafe_code)]

//! Runtime: closure-expression bindings over observable properties.
//!
//! # Role in fxbind
//! `fxbind-runtime` builds [`ClosureProperty`] on top of the capabilities in
//! `fxbind-core`. A closure property evaluates an [`Expression`], discovers
//! which observable properties the expression reads, listens to all of
//! them, and re-publishes a fresh value whenever one changes.
//!
//! # Primary responsibilities
//! - **Discovery**: record the member paths an expression touches without
//!   evaluating it for real.
//! - **Binding**: resolve recorded paths to properties and attach listeners;
//!   detach them again on rebind, clear, or drop.
//! - **Propagation**: recompute on change, forward invalidation, and notify
//!   downstream listeners with `(old, new)` pairs.
//!
//! # How it fits in the system
//! Host applications expose their data through `fxbind_core::HostObject` and
//! `fxbind_core::ObservableProperty`. A `ClosureProperty` is itself an
//! `ObservableProperty`, so bindings compose.

pub mod config;
pub mod error;
pub mod reactive;

pub use config::{BindingConfig, UnresolvedPolicy};
#[cfg(feature = "config-file")]
pub use config::{BindingConfigFile, ConfigError};
pub use error::BindError;
pub use reactive::{
    BindPath, ClosureProperty, DependencyNode, Expression, ExpressionBuilder, Scope, Slot,
};
