#![forbid(unsafe_code)]

//! Settable and constant observable properties.
//!
//! # Design
//!
//! [`SimpleProperty`] wraps a [`Value`] in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). When the value changes (determined by `PartialEq`),
//! invalidation listeners are notified first, then change listeners, each in
//! registration order.
//!
//! [`ConstantProperty`] is a value holder that accepts listener registrations
//! but never notifies. It stands in for plain attributes that have no
//! observable backing, so attach/detach stays symmetric.
//!
//! # Performance
//!
//! | Operation    | Complexity                 |
//! |--------------|----------------------------|
//! | `get()`      | O(1) plus value clone      |
//! | `set()`      | O(L) where L = listeners   |
//! | add listener | O(1) amortized             |
//! | remove       | O(L)                       |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: calling `set()` from a listener is allowed; the
//!   borrow is released before notification, so the nested set runs its own
//!   full notification round before the outer one continues.
//! - **Bean dropped**: the bean is held weakly; `bean()` returns `None` once
//!   the owning object is gone.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::object::{HostObject, ObjectRef};
use crate::property::{
    ChangeListener, ChangeListenerRef, InvalidationListener, InvalidationListenerRef, Listeners,
    ObservableProperty, PropertyRef,
};
use crate::value::Value;

/// Shared interior for [`SimpleProperty`].
struct SimpleInner {
    value: Value,
    version: u64,
    bean: Option<Weak<dyn HostObject>>,
    name: Option<String>,
}

/// A shared, version-tracked, settable observable value.
///
/// Cloning a `SimpleProperty` creates a new handle to the **same** inner
/// state: both handles see the same value and share listeners.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Invalidation listeners fire before change listeners.
#[derive(Clone)]
pub struct SimpleProperty {
    inner: Rc<RefCell<SimpleInner>>,
    change: Rc<Listeners<dyn ChangeListener>>,
    invalidation: Rc<Listeners<dyn InvalidationListener>>,
}

impl std::fmt::Debug for SimpleProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SimpleProperty")
            .field("name", &inner.name)
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("change_listeners", &self.change.len())
            .field("invalidation_listeners", &self.invalidation.len())
            .finish()
    }
}

impl SimpleProperty {
    /// Create an anonymous property with the given initial value.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self::build(None, value.into())
    }

    /// Create a named property.
    #[must_use]
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::build(Some(name.into()), value.into())
    }

    fn build(name: Option<String>, value: Value) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SimpleInner {
                value,
                version: 0,
                bean: None,
                name,
            })),
            change: Rc::new(Listeners::new()),
            invalidation: Rc::new(Listeners::new()),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.borrow().value.clone()
    }

    /// Set a new value. Returns whether the value changed.
    ///
    /// On change the version is bumped, then invalidation listeners and
    /// change listeners are notified outside the borrow.
    pub fn set(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        let old = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.version += 1;
            std::mem::replace(&mut inner.value, value.clone())
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(name = ?self.inner.borrow().name, "property changed");
        self.invalidation.fire(self);
        self.change.fire(self, &old, &value);
        true
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Associate the property with an owning object (held weakly).
    pub fn set_bean(&self, bean: &ObjectRef) {
        self.inner.borrow_mut().bean = Some(Rc::downgrade(bean));
    }

    pub(crate) fn set_bean_weak(&self, bean: Weak<dyn HostObject>) {
        self.inner.borrow_mut().bean = Some(bean);
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.borrow_mut().name = Some(name.into());
    }

    #[must_use]
    pub fn change_listener_count(&self) -> usize {
        self.change.len()
    }

    #[must_use]
    pub fn invalidation_listener_count(&self) -> usize {
        self.invalidation.len()
    }

    /// Shared, type-erased handle to this property.
    #[must_use]
    pub fn to_property_ref(&self) -> PropertyRef {
        Rc::new(self.clone())
    }
}

impl ObservableProperty for SimpleProperty {
    fn value(&self) -> Value {
        self.get()
    }

    fn bean(&self) -> Option<ObjectRef> {
        self.inner.borrow().bean.as_ref().and_then(Weak::upgrade)
    }

    fn name(&self) -> Option<String> {
        self.inner.borrow().name.clone()
    }

    fn add_change_listener(&self, listener: ChangeListenerRef) {
        self.change.add(listener);
    }

    fn remove_change_listener(&self, listener: &ChangeListenerRef) -> bool {
        self.change.remove(listener)
    }

    fn add_invalidation_listener(&self, listener: InvalidationListenerRef) {
        self.invalidation.add(listener);
    }

    fn remove_invalidation_listener(&self, listener: &InvalidationListenerRef) -> bool {
        self.invalidation.remove(listener)
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.inner).cast::<()>()
    }
}

// ---------------------------------------------------------------------------
// ConstantProperty
// ---------------------------------------------------------------------------

/// A value holder exposed through the property capability.
///
/// Listener registrations are recorded (so they can be removed again) but
/// never notified.
pub struct ConstantProperty {
    value: Value,
    name: Option<String>,
    change: Listeners<dyn ChangeListener>,
    invalidation: Listeners<dyn InvalidationListener>,
}

impl std::fmt::Debug for ConstantProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantProperty")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

impl ConstantProperty {
    #[must_use]
    pub fn new(name: Option<String>, value: Value) -> Self {
        Self {
            value,
            name,
            change: Listeners::new(),
            invalidation: Listeners::new(),
        }
    }

    /// Number of listener registrations of either kind.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.change.len() + self.invalidation.len()
    }
}

impl ObservableProperty for ConstantProperty {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn bean(&self) -> Option<ObjectRef> {
        None
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn add_change_listener(&self, listener: ChangeListenerRef) {
        self.change.add(listener);
    }

    fn remove_change_listener(&self, listener: &ChangeListenerRef) -> bool {
        self.change.remove(listener)
    }

    fn add_invalidation_listener(&self, listener: InvalidationListenerRef) {
        self.invalidation.add(listener);
    }

    fn remove_invalidation_listener(&self, listener: &InvalidationListenerRef) -> bool {
        self.invalidation.remove(listener)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
