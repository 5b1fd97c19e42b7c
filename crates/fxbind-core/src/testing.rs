//! Test doubles for observable properties and listeners.
//!
//! Available with the `test-helpers` feature (and always inside this
//! crate's own tests).

use std::cell::RefCell;
use std::rc::Rc;

use crate::object::ObjectRef;
use crate::property::{
    ChangeListener, ChangeListenerRef, InvalidationListener, InvalidationListenerRef, Listeners,
    ObservableProperty,
};
use crate::value::Value;

/// A property whose value can be replaced without any notification, and
/// which fires invalidation (never change) on demand.
#[derive(Default)]
pub struct InvalidatingProperty {
    value: RefCell<Value>,
    change: Listeners<dyn ChangeListener>,
    invalidation: Listeners<dyn InvalidationListener>,
}

impl InvalidatingProperty {
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(value.into()),
            ..Self::default()
        })
    }

    /// Replace the value silently.
    pub fn replace(&self, value: impl Into<Value>) {
        *self.value.borrow_mut() = value.into();
    }

    /// Notify invalidation listeners only.
    pub fn invalidate(&self) {
        self.invalidation.fire(self);
    }

    #[must_use]
    pub fn change_listener_count(&self) -> usize {
        self.change.len()
    }

    #[must_use]
    pub fn invalidation_listener_count(&self) -> usize {
        self.invalidation.len()
    }
}

impl ObservableProperty for InvalidatingProperty {
    fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    fn bean(&self) -> Option<ObjectRef> {
        None
    }

    fn name(&self) -> Option<String> {
        None
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

/// Records every `(old, new)` pair and invalidation it receives.
#[derive(Default)]
pub struct EventLog {
    changes: RefCell<Vec<(Value, Value)>>,
    invalidations: RefCell<usize>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Change-listener handle feeding this log.
    #[must_use]
    pub fn change_handle(self: &Rc<Self>) -> ChangeListenerRef {
        Rc::clone(self) as ChangeListenerRef
    }

    /// Invalidation-listener handle feeding this log.
    #[must_use]
    pub fn invalidation_handle(self: &Rc<Self>) -> InvalidationListenerRef {
        Rc::clone(self) as InvalidationListenerRef
    }

    #[must_use]
    pub fn changes(&self) -> Vec<(Value, Value)> {
        self.changes.borrow().clone()
    }

    #[must_use]
    pub fn invalidations(&self) -> usize {
        *self.invalidations.borrow()
    }

    pub fn clear(&self) {
        self.changes.borrow_mut().clear();
        *self.invalidations.borrow_mut() = 0;
    }
}

impl ChangeListener for EventLog {
    fn changed(&self, _source: &dyn ObservableProperty, old: &Value, new: &Value) {
        self.changes.borrow_mut().push((old.clone(), new.clone()));
    }
}

impl InvalidationListener for EventLog {
    fn invalidated(&self, _source: &dyn ObservableProperty) {
        *self.invalidations.borrow_mut() += 1;
    }
}
