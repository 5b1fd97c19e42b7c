//! The observable property capability and its listener contracts.
//!
//! # Design
//!
//! An [`ObservableProperty`] exposes its current value, optional bean/name
//! metadata, and two independent notification channels:
//!
//! - **invalidation**: "the value may have changed", no payload;
//! - **change**: "the value changed from `old` to `new`".
//!
//! Listeners are registered as shared `Rc` handles and removed by identity
//! (`Rc::ptr_eq`), so the same handle that was added is the one that must be
//! passed to removal. Registering the same handle twice registers it twice;
//! each removal drops one registration.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. Removal returns `true` only when a matching registration was dropped.
//! 3. Notification iterates a snapshot, so listeners may add or remove
//!    listeners from inside a callback without affecting the current round.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::object::ObjectRef;
use crate::value::Value;

/// Receives `(old, new)` pairs when an observed value changes.
pub trait ChangeListener {
    fn changed(&self, source: &dyn ObservableProperty, old: &Value, new: &Value);
}

/// Receives a notification when an observed value becomes invalid.
pub trait InvalidationListener {
    fn invalidated(&self, source: &dyn ObservableProperty);
}

pub type ChangeListenerRef = Rc<dyn ChangeListener>;
pub type InvalidationListenerRef = Rc<dyn InvalidationListener>;

/// A read-only observable value with listener registration.
pub trait ObservableProperty {
    /// Current value.
    fn value(&self) -> Value;

    /// The object this property belongs to, if any (and still alive).
    fn bean(&self) -> Option<ObjectRef>;

    /// The property's name, if any.
    fn name(&self) -> Option<String>;

    fn add_change_listener(&self, listener: ChangeListenerRef);

    /// Remove one registration of `listener`. Returns whether it was found.
    fn remove_change_listener(&self, listener: &ChangeListenerRef) -> bool;

    fn add_invalidation_listener(&self, listener: InvalidationListenerRef);

    /// Remove one registration of `listener`. Returns whether it was found.
    fn remove_invalidation_listener(&self, listener: &InvalidationListenerRef) -> bool;

    /// Identity of the shared state behind this handle.
    ///
    /// Handle types that share state across clones override this so that
    /// two handles to the same property compare equal inside [`Value`].
    fn identity(&self) -> *const () {
        (self as *const Self).cast::<()>()
    }
}

pub type PropertyRef = Rc<dyn ObservableProperty>;

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

struct FnChangeListener<F>(F);

impl<F: Fn(&Value, &Value)> ChangeListener for FnChangeListener<F> {
    fn changed(&self, _source: &dyn ObservableProperty, old: &Value, new: &Value) {
        (self.0)(old, new);
    }
}

struct FnInvalidationListener<F>(F);

impl<F: Fn(&dyn ObservableProperty)> InvalidationListener for FnInvalidationListener<F> {
    fn invalidated(&self, source: &dyn ObservableProperty) {
        (self.0)(source);
    }
}

/// Wrap a closure receiving `(old, new)` as a change listener handle.
pub fn change_listener(f: impl Fn(&Value, &Value) + 'static) -> ChangeListenerRef {
    Rc::new(FnChangeListener(f))
}

/// Wrap a closure receiving the source property as an invalidation listener
/// handle.
pub fn invalidation_listener(
    f: impl Fn(&dyn ObservableProperty) + 'static,
) -> InvalidationListenerRef {
    Rc::new(FnInvalidationListener(f))
}

// ---------------------------------------------------------------------------
// Listeners<L>: ordered registration list keyed by identity
// ---------------------------------------------------------------------------

/// Ordered listener registrations with identity-based removal.
pub struct Listeners<L: ?Sized> {
    entries: RefCell<Vec<Rc<L>>>,
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> fmt::Debug for Listeners<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

impl<L: ?Sized> Listeners<L> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Rc<L>) {
        self.entries.borrow_mut().push(listener);
    }

    /// Drop the first registration of `listener`.
    pub fn remove(&self, listener: &Rc<L>) -> bool {
        let mut entries = self.entries.borrow_mut();
        let target = Rc::as_ptr(listener).cast::<()>();
        match entries
            .iter()
            .position(|l| Rc::as_ptr(l).cast::<()>() == target)
        {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Clone the current registrations for notification outside the borrow.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<L>> {
        self.entries.borrow().clone()
    }
}

impl Listeners<dyn ChangeListener> {
    /// Notify every registered change listener in order.
    pub fn fire(&self, source: &dyn ObservableProperty, old: &Value, new: &Value) {
        for listener in self.snapshot() {
            listener.changed(source, old, new);
        }
    }
}

impl Listeners<dyn InvalidationListener> {
    /// Notify every registered invalidation listener in order.
    pub fn fire(&self, source: &dyn ObservableProperty) {
        for listener in self.snapshot() {
            listener.invalidated(source);
        }
    }
}
