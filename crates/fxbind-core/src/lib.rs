#![forbid(unsafe_code)]

//! Core: observable properties, the host object model, and property resolution.
//!
//! # Role in fxbind
//! `fxbind-core` is the capability layer. It owns the dynamic [`Value`] type,
//! the [`ObservableProperty`] contract (value + change/invalidation listeners),
//! the concrete [`SimpleProperty`] and [`ConstantProperty`] holders, and the
//! [`HostObject`] trait through which named properties are looked up on
//! arbitrary objects.
//!
//! # Primary responsibilities
//! - **Property capability**: get value, bean/name metadata, listener
//!   registration with identity-based removal.
//! - **Host objects**: native observable properties, bean-style property
//!   adapters, plain attributes, and methods, all resolved by name.
//! - **Resolution**: the ordered [`ResolveStrategy`] list used both for live
//!   reads and for binding.
//!
//! # How it fits in the system
//! The runtime (`fxbind-runtime`) builds closure properties on top of these
//! capabilities. It never touches concrete host types, only the traits
//! exported here.

pub mod error;
pub mod logging;
pub mod object;
pub mod observable;
pub mod property;
pub mod resolve;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod value;

pub use error::EvalError;
pub use object::{BeanObject, BeanObjectBuilder, HostObject, Method, ObjectRef};
pub use observable::{ConstantProperty, SimpleProperty};
pub use property::{
    ChangeListener, ChangeListenerRef, InvalidationListener, InvalidationListenerRef, Listeners,
    ObservableProperty, PropertyRef, change_listener, invalidation_listener,
};
pub use resolve::{ResolveStrategy, read_member, resolve_property};
pub use value::Value;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};
