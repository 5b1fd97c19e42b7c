#![forbid(unsafe_code)]

//! Observable property whose value is a re-evaluable expression.
//!
//! # Design
//!
//! [`ClosureProperty`] owns at most one [`Expression`]. Setting one runs a
//! discovery pass, resolves the recorded paths into a [`BindPath`] tree with
//! the engine's listener attached to every node, and evaluates the
//! expression once. From then on any watched property drives the engine:
//!
//! - **change** marks the cache dirty, re-evaluates, and notifies change
//!   listeners with `(previous, current)`;
//! - **invalidation** marks the cache dirty and notifies invalidation
//!   listeners only. The next [`value`](ClosureProperty::value) call
//!   re-evaluates.
//!
//! The listener registered on dependencies holds only a `Weak` reference to
//! the engine. Dependencies never keep an engine alive, and dropping the
//! last handle detaches the whole tree.
//!
//! # Invariants
//!
//! 1. A failed `set_expression` leaves the previous expression, bind tree,
//!    and values untouched.
//! 2. Every listener attached by a bind is detached exactly once, on rebind,
//!    `clear_expression`, or drop.
//! 3. `old_value`/`new_value` only move when the engine recomputes for a
//!    dependency change or a new expression.
//! 4. Listener callbacks never run while engine state is borrowed.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use fxbind_core::{
    ChangeListener, ChangeListenerRef, HostObject, InvalidationListener,
    InvalidationListenerRef, Listeners, ObjectRef, ObservableProperty, PropertyRef, Value,
};
use tracing::{debug, trace, warn};

use super::bind_path::{Attachment, BindPath, Watched};
use super::expression::Expression;
use crate::config::BindingConfig;
use crate::error::BindError;

struct State {
    expression: Option<Expression>,
    bean: Option<Weak<dyn HostObject>>,
    name: Option<String>,
    old_value: Value,
    new_value: Value,
    cached: Value,
    dirty: bool,
    paths: Vec<BindPath>,
    /// Keeps the root resolution target alive for the bind tree's lifetime.
    scope: Option<ObjectRef>,
    config: BindingConfig,
}

struct Shared {
    state: RefCell<State>,
    change: Listeners<dyn ChangeListener>,
    invalidation: Listeners<dyn InvalidationListener>,
    attachment: Attachment,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let detached: usize = state
            .paths
            .iter_mut()
            .map(|path| path.unbind(&self.attachment))
            .sum();
        if detached > 0 {
            trace!(detached, "closure property dropped; listeners detached");
        }
    }
}

/// The listener an engine registers on its dependencies.
struct EngineListener {
    engine: Weak<Shared>,
}

impl EngineListener {
    fn engine(&self) -> Option<ClosureProperty> {
        self.engine
            .upgrade()
            .map(|shared| ClosureProperty { shared })
    }
}

impl ChangeListener for EngineListener {
    fn changed(&self, _source: &dyn ObservableProperty, _old: &Value, _new: &Value) {
        if let Some(engine) = self.engine() {
            engine.dependency_changed();
        }
    }
}

impl InvalidationListener for EngineListener {
    fn invalidated(&self, _source: &dyn ObservableProperty) {
        if let Some(engine) = self.engine() {
            engine.dependency_invalidated();
        }
    }
}

/// An observable property computed from an [`Expression`].
///
/// Cloning yields another handle to the same property.
#[derive(Clone)]
pub struct ClosureProperty {
    shared: Rc<Shared>,
}

impl fmt::Debug for ClosureProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ClosureProperty")
            .field("name", &state.name)
            .field("expression", &state.expression)
            .field("dirty", &state.dirty)
            .field("paths", &state.paths)
            .finish()
    }
}

impl Default for ClosureProperty {
    fn default() -> Self {
        Self::new()
    }
}

impl ClosureProperty {
    /// An unbound property. Its value is `Null` until an expression is set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BindingConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BindingConfig) -> Self {
        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let listener = Rc::new(EngineListener {
                engine: weak.clone(),
            });
            Shared {
                state: RefCell::new(State {
                    expression: None,
                    bean: None,
                    name: None,
                    old_value: Value::Null,
                    new_value: Value::Null,
                    cached: Value::Null,
                    dirty: false,
                    paths: Vec::new(),
                    scope: None,
                    config,
                }),
                change: Listeners::new(),
                invalidation: Listeners::new(),
                attachment: Attachment {
                    change: Rc::clone(&listener) as ChangeListenerRef,
                    invalidation: listener as InvalidationListenerRef,
                },
            }
        });
        Self { shared }
    }

    #[must_use]
    pub fn with_bean_and_name(bean: &ObjectRef, name: impl Into<String>) -> Self {
        let property = Self::new();
        property.set_bean(bean);
        property.set_name(name);
        property
    }

    pub fn from_expression(expression: Expression) -> Result<Self, BindError> {
        let property = Self::new();
        property.set_expression(expression)?;
        Ok(property)
    }

    pub fn with_expression(
        bean: &ObjectRef,
        name: impl Into<String>,
        expression: Expression,
    ) -> Result<Self, BindError> {
        let property = Self::with_bean_and_name(bean, name);
        property.set_expression(expression)?;
        Ok(property)
    }

    /// Replace the expression and rebind.
    ///
    /// The new dependency tree is discovered and fully attached before the
    /// old one is detached. On error nothing changes. No change
    /// notification is sent for the new value.
    pub fn set_expression(&self, expression: Expression) -> Result<(), BindError> {
        let roots = expression.discover()?;
        let scope = expression.scope_object();
        let config = self.shared.state.borrow().config.clone();
        let attachment = &self.shared.attachment;

        let mut paths: Vec<BindPath> = roots.iter().map(BindPath::from_node).collect();
        let target = Value::Object(Rc::clone(&scope));
        let mut watched = Watched::new();
        if let Err(err) = paths
            .iter_mut()
            .try_for_each(|path| path.bind(&target, attachment, &config, &mut watched))
        {
            let rolled_back: usize = paths.iter_mut().map(|path| path.unbind(attachment)).sum();
            debug!(
                expression = expression.label().unwrap_or_default(),
                rolled_back,
                error = %err,
                "bind failed; previous binding kept"
            );
            return Err(err);
        }

        let fresh = self.evaluate(&expression);
        let attached: usize = paths.iter().map(BindPath::attached_count).sum();
        let previous = {
            let mut state = self.shared.state.borrow_mut();
            state.expression = Some(expression);
            state.scope = Some(scope);
            state.old_value = std::mem::replace(&mut state.new_value, fresh.clone());
            state.cached = fresh;
            state.dirty = false;
            std::mem::replace(&mut state.paths, paths)
        };
        let detached: usize = previous
            .into_iter()
            .map(|mut path| path.unbind(attachment))
            .sum();
        debug!(
            name = %self.name().unwrap_or_default(),
            roots = roots.len(),
            attached,
            detached,
            "expression bound"
        );
        Ok(())
    }

    /// Detach every dependency and drop the expression. The value becomes
    /// `Null`.
    pub fn clear_expression(&self) {
        let previous = {
            let mut state = self.shared.state.borrow_mut();
            state.expression = None;
            state.scope = None;
            state.old_value = std::mem::take(&mut state.new_value);
            state.cached = Value::Null;
            state.dirty = false;
            std::mem::take(&mut state.paths)
        };
        let detached: usize = previous
            .into_iter()
            .map(|mut path| path.unbind(&self.shared.attachment))
            .sum();
        debug!(detached, "expression cleared");
    }

    #[must_use]
    pub fn expression(&self) -> Option<Expression> {
        self.shared.state.borrow().expression.clone()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.shared.state.borrow().expression.is_some()
    }

    /// The owning object, while it is alive.
    #[must_use]
    pub fn bean(&self) -> Option<ObjectRef> {
        self.shared
            .state
            .borrow()
            .bean
            .as_ref()
            .and_then(Weak::upgrade)
    }

    pub fn set_bean(&self, bean: &ObjectRef) {
        self.shared.state.borrow_mut().bean = Some(Rc::downgrade(bean));
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.shared.state.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.shared.state.borrow_mut().name = Some(name.into());
    }

    #[must_use]
    pub fn config(&self) -> BindingConfig {
        self.shared.state.borrow().config.clone()
    }

    /// Replace the configuration. Takes effect at the next `set_expression`.
    pub fn set_config(&self, config: BindingConfig) {
        self.shared.state.borrow_mut().config = config;
    }

    /// Current value, re-evaluated if a dependency invalidated it.
    ///
    /// A result that is itself a property is unwrapped one level.
    #[must_use]
    pub fn value(&self) -> Value {
        let expression = {
            let state = self.shared.state.borrow();
            match &state.expression {
                None => return Value::Null,
                Some(_) if !state.dirty => return state.cached.resolved(),
                Some(expression) => expression.clone(),
            }
        };
        let fresh = self.evaluate(&expression);
        let resolved = fresh.resolved();
        let mut state = self.shared.state.borrow_mut();
        state.cached = fresh;
        state.dirty = false;
        resolved
    }

    /// Value before the last recompute.
    #[must_use]
    pub fn old_value(&self) -> Value {
        self.shared.state.borrow().old_value.clone()
    }

    /// Value produced by the last recompute.
    #[must_use]
    pub fn new_value(&self) -> Value {
        self.shared.state.borrow().new_value.clone()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.state.borrow().dirty
    }

    /// Number of distinct properties this engine is listening to.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.shared
            .state
            .borrow()
            .paths
            .iter()
            .map(BindPath::attached_count)
            .sum()
    }

    /// Dotted paths of every watched property, in discovery order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let state = self.shared.state.borrow();
        let mut out = Vec::new();
        for path in &state.paths {
            path.collect_resolved("", &mut out);
        }
        out
    }

    #[must_use]
    pub fn change_listener_count(&self) -> usize {
        self.shared.change.len()
    }

    #[must_use]
    pub fn invalidation_listener_count(&self) -> usize {
        self.shared.invalidation.len()
    }

    /// Shared trait-object handle, for use as another binding's dependency.
    #[must_use]
    pub fn to_property_ref(&self) -> PropertyRef {
        Rc::new(self.clone())
    }

    fn evaluate(&self, expression: &Expression) -> Value {
        match expression.evaluate() {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    name = %self.name().unwrap_or_default(),
                    expression = expression.label().unwrap_or_default(),
                    error = %err,
                    "expression evaluation failed; value is null"
                );
                Value::Null
            }
        }
    }

    fn dependency_changed(&self) {
        let expression = {
            let mut state = self.shared.state.borrow_mut();
            state.dirty = true;
            state.expression.clone()
        };
        let Some(expression) = expression else {
            return;
        };
        let fresh = self.evaluate(&expression);
        let (old, new) = {
            let mut state = self.shared.state.borrow_mut();
            state.old_value = std::mem::replace(&mut state.new_value, fresh.clone());
            state.cached = fresh;
            state.dirty = false;
            (state.old_value.clone(), state.new_value.clone())
        };
        trace!(old = %old, new = %new, "dependency changed; recomputed");
        self.shared.change.fire(self, &old, &new);
    }

    fn dependency_invalidated(&self) {
        let recompute = {
            let mut state = self.shared.state.borrow_mut();
            state.dirty = true;
            state.config.recompute_on_invalidation && state.expression.is_some()
        };
        if recompute {
            let _ = self.value();
        }
        self.shared.invalidation.fire(self);
    }
}

impl ObservableProperty for ClosureProperty {
    fn value(&self) -> Value {
        ClosureProperty::value(self)
    }

    fn bean(&self) -> Option<ObjectRef> {
        ClosureProperty::bean(self)
    }

    fn name(&self) -> Option<String> {
        ClosureProperty::name(self)
    }

    fn add_change_listener(&self, listener: ChangeListenerRef) {
        self.shared.change.add(listener);
    }

    fn remove_change_listener(&self, listener: &ChangeListenerRef) -> bool {
        self.shared.change.remove(listener)
    }

    fn add_invalidation_listener(&self, listener: InvalidationListenerRef) {
        self.shared.invalidation.add(listener);
    }

    fn remove_invalidation_listener(&self, listener: &InvalidationListenerRef) -> bool {
        self.shared.invalidation.remove(listener)
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.shared).cast::<()>()
    }
}
