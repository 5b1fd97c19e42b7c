#![forbid(unsafe_code)]

//! Resolved, listener-attached mirror of a discovered dependency tree.
//!
//! # Design
//!
//! Each [`BindPath`] node names one recorded member. Binding a node against
//! a target value:
//!
//! 1. resolves the name with the configured [`ResolveStrategy`] chain;
//! 2. attaches the engine's listener for both change and invalidation;
//! 3. reads the property's current value (unwrapping one level of property
//!    indirection, as live reads do) and binds every child against it, in
//!    discovery order.
//!
//! A property reached along several paths (two captures of the same object,
//! say) is attached once per bind. The first node to reach it owns the
//! registration; later nodes stay resolved but add none, so one change
//! triggers one recomputation.
//!
//! Unbinding removes exactly the registrations that binding added, walking
//! the whole tree even when a removal does not find its listener.
//!
//! The target object is held weakly. The engine only needs it while
//! attaching; detaching goes through the resolved property.
//!
//! [`ResolveStrategy`]: fxbind_core::ResolveStrategy

use std::collections::HashSet;
use std::rc::{Rc, Weak};

use fxbind_core::{
    ChangeListenerRef, HostObject, InvalidationListenerRef, PropertyRef, ResolveStrategy, Value,
    resolve_property,
};
use tracing::{trace, warn};

use super::recorder::DependencyNode;
use crate::config::{BindingConfig, UnresolvedPolicy};
use crate::error::BindError;

/// Identities of the properties already attached during one bind.
pub(crate) type Watched = HashSet<*const ()>;

/// The pair of listener handles an engine registers on every dependency.
#[derive(Clone)]
pub(crate) struct Attachment {
    pub(crate) change: ChangeListenerRef,
    pub(crate) invalidation: InvalidationListenerRef,
}

impl Attachment {
    fn attach(&self, property: &PropertyRef) {
        property.add_change_listener(Rc::clone(&self.change));
        property.add_invalidation_listener(Rc::clone(&self.invalidation));
    }

    /// Remove both registrations. Returns whether both were found.
    fn detach(&self, property: &PropertyRef) -> bool {
        let change = property.remove_change_listener(&self.change);
        let invalidation = property.remove_invalidation_listener(&self.invalidation);
        change && invalidation
    }
}

/// One node of the bound dependency tree.
pub struct BindPath {
    name: String,
    target: Option<Weak<dyn HostObject>>,
    property: Option<PropertyRef>,
    /// Whether this node holds the listener registration on `property`.
    owns_registration: bool,
    strategy: Option<ResolveStrategy>,
    children: Vec<BindPath>,
}

impl std::fmt::Debug for BindPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindPath")
            .field("name", &self.name)
            .field("resolved", &self.property.is_some())
            .field("owns_registration", &self.owns_registration)
            .field("strategy", &self.strategy.map(|s| s.label()))
            .field("children", &self.children)
            .finish()
    }
}

impl BindPath {
    /// Unbound tree mirroring `node`.
    #[must_use]
    pub fn from_node(node: &DependencyNode) -> Self {
        Self {
            name: node.name().to_string(),
            target: None,
            property: None,
            owns_registration: false,
            strategy: None,
            children: node.children().iter().map(Self::from_node).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn property(&self) -> Option<&PropertyRef> {
        self.property.as_ref()
    }

    /// Strategy that resolved this node, if bound.
    #[must_use]
    pub fn strategy(&self) -> Option<ResolveStrategy> {
        self.strategy
    }

    /// The object this node was resolved on, while it is alive.
    #[must_use]
    pub fn target(&self) -> Option<Rc<dyn HostObject>> {
        self.target.as_ref().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn children(&self) -> &[BindPath] {
        &self.children
    }

    /// Number of listener registrations held by this subtree.
    ///
    /// A node whose property was already attached elsewhere in the tree is
    /// resolved but not counted.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        usize::from(self.owns_registration)
            + self
                .children
                .iter()
                .map(BindPath::attached_count)
                .sum::<usize>()
    }

    /// Dotted paths of the resolved nodes in this subtree.
    pub(crate) fn collect_resolved(&self, prefix: &str, out: &mut Vec<String>) {
        if self.property.is_none() {
            return;
        }
        let path = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{prefix}.{}", self.name)
        };
        out.push(path.clone());
        for child in &self.children {
            child.collect_resolved(&path, out);
        }
    }

    /// Resolve this node on `target`, attach, and recurse into children.
    ///
    /// `watched` is shared by every root of one bind. A property whose
    /// identity is already in it is not attached again.
    ///
    /// On error the subtree may be partially attached; the caller unbinds.
    pub(crate) fn bind(
        &mut self,
        target: &Value,
        attachment: &Attachment,
        config: &BindingConfig,
        watched: &mut Watched,
    ) -> Result<(), BindError> {
        let Some((strategy, property)) = resolve_property(&config.strategies, target, &self.name)
        else {
            let err = BindError::Resolution {
                name: self.name.clone(),
                target: target.describe(),
            };
            return match config.unresolved {
                UnresolvedPolicy::Fail => Err(err),
                UnresolvedPolicy::Skip => {
                    warn!(
                        name = %self.name,
                        target = %target.describe(),
                        "no resolution strategy matched; branch left unobserved"
                    );
                    Ok(())
                }
            };
        };

        if watched.insert(property.identity()) {
            trace!(name = %self.name, strategy = strategy.label(), "attaching listener");
            attachment.attach(&property);
            self.owns_registration = true;
        } else {
            trace!(name = %self.name, "property already watched by this binding");
        }
        self.target = target.as_object().map(Rc::downgrade);
        self.strategy = Some(strategy);
        let current = property.value().resolved();
        self.property = Some(property);

        for child in &mut self.children {
            child.bind(&current, attachment, config, watched)?;
        }
        Ok(())
    }

    /// Detach from every resolved property in this subtree.
    ///
    /// Returns the number of registrations removed. A removal that finds no
    /// registration is logged and the walk continues.
    pub(crate) fn unbind(&mut self, attachment: &Attachment) -> usize {
        let mut detached = 0;
        let owned = std::mem::take(&mut self.owns_registration);
        if let (Some(property), true) = (self.property.take(), owned) {
            if !attachment.detach(&property) {
                warn!(name = %self.name, "listener missing on detach; continuing");
            }
            detached += 1;
        }
        self.target = None;
        self.strategy = None;
        for child in &mut self.children {
            detached += child.unbind(attachment);
        }
        detached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxbind_core::{
        BeanObject, ObjectRef, ObservableProperty, SimpleProperty, change_listener,
        invalidation_listener,
    };

    fn attachment() -> Attachment {
        Attachment {
            change: change_listener(|_, _| {}),
            invalidation: invalidation_listener(|_| {}),
        }
    }

    fn node(name: &str, children: Vec<DependencyNode>) -> DependencyNode {
        DependencyNode::new(name, children)
    }

    struct Fixture {
        root: Value,
        a: Rc<BeanObject>,
        b: Rc<BeanObject>,
    }

    fn fixture() -> Fixture {
        let b = BeanObject::builder("B").property("c", 3).build();
        let b_obj: ObjectRef = b.clone();
        let a = BeanObject::builder("A").property("b", b_obj).build();
        let a_obj: ObjectRef = a.clone();
        let root: ObjectRef = BeanObject::builder("Root").property("a", a_obj).build();
        Fixture {
            root: Value::Object(root),
            a,
            b,
        }
    }

    #[test]
    fn bind_attaches_along_the_path() {
        let fx = fixture();
        let att = attachment();
        let mut path = BindPath::from_node(&node("a", vec![node("b", vec![node("c", vec![])])]));
        path.bind(&fx.root, &att, &BindingConfig::default(), &mut Watched::new())
            .expect("resolvable");

        assert_eq!(path.attached_count(), 3);
        let c = fx.b.property("c").expect("c");
        assert_eq!(c.change_listener_count(), 1);
        assert_eq!(c.invalidation_listener_count(), 1);
        let b = fx.a.property("b").expect("b");
        assert_eq!(b.change_listener_count(), 1);
        assert_eq!(path.strategy().map(|s| s.label()), Some("native"));
        assert_eq!(path.target().map(|t| t.type_name().to_string()).as_deref(), Some("Root"));

        let mut out = Vec::new();
        path.collect_resolved("", &mut out);
        assert_eq!(out, vec!["a", "a.b", "a.b.c"]);
    }

    #[test]
    fn unbind_is_symmetric() {
        let fx = fixture();
        let att = attachment();
        let mut path = BindPath::from_node(&node("a", vec![node("b", vec![node("c", vec![])])]));
        path.bind(&fx.root, &att, &BindingConfig::default(), &mut Watched::new())
            .expect("resolvable");

        assert_eq!(path.unbind(&att), 3);
        assert_eq!(path.attached_count(), 0);
        let c = fx.b.property("c").expect("c");
        assert_eq!(c.change_listener_count(), 0);
        assert_eq!(c.invalidation_listener_count(), 0);
    }

    #[test]
    fn unbind_continues_after_missing_listener() {
        let fx = fixture();
        let att = attachment();
        let mut path = BindPath::from_node(&node("a", vec![node("b", vec![node("c", vec![])])]));
        path.bind(&fx.root, &att, &BindingConfig::default(), &mut Watched::new())
            .expect("resolvable");

        // Someone else removed our registration on `b` behind our back.
        let b = fx.a.native_property("b").expect("b");
        assert!(b.remove_change_listener(&att.change));

        assert_eq!(path.unbind(&att), 3);
        let c = fx.b.property("c").expect("c");
        assert_eq!(c.change_listener_count(), 0);
    }

    #[test]
    fn shared_property_is_attached_once_per_bind() {
        let fx = fixture();
        let att = attachment();
        let mut watched = Watched::new();
        let mut first = BindPath::from_node(&node("a", vec![node("b", vec![])]));
        let mut second = BindPath::from_node(&node("a", vec![node("b", vec![])]));
        first
            .bind(&fx.root, &att, &BindingConfig::default(), &mut watched)
            .expect("resolvable");
        second
            .bind(&fx.root, &att, &BindingConfig::default(), &mut watched)
            .expect("resolvable");

        let b = fx.a.property("b").expect("b");
        assert_eq!(b.change_listener_count(), 1);
        assert_eq!(b.invalidation_listener_count(), 1);
        assert_eq!(first.attached_count(), 2);
        assert_eq!(second.attached_count(), 0);
        assert!(second.property().is_some());

        let mut out = Vec::new();
        second.collect_resolved("", &mut out);
        assert_eq!(out, vec!["a", "a.b"]);

        assert_eq!(second.unbind(&att), 0);
        assert_eq!(b.change_listener_count(), 1);
        assert_eq!(first.unbind(&att), 2);
        assert_eq!(b.change_listener_count(), 0);
    }

    #[test]
    fn unresolved_fail_policy_errors() {
        let fx = fixture();
        let att = attachment();
        let mut path = BindPath::from_node(&node("a", vec![node("missing", vec![])]));
        let err = path
            .bind(&fx.root, &att, &BindingConfig::default(), &mut Watched::new())
            .expect_err("missing member");
        assert_eq!(
            err,
            BindError::Resolution {
                name: "missing".into(),
                target: "A".into()
            }
        );
        // Partial attachment is left for the caller to roll back.
        assert_eq!(path.attached_count(), 1);
        assert_eq!(path.unbind(&att), 1);
    }

    #[test]
    fn unresolved_skip_policy_continues() {
        let fx = fixture();
        let att = attachment();
        let mut path = BindPath::from_node(&node(
            "a",
            vec![node("missing", vec![]), node("b", vec![])],
        ));
        path.bind(&fx.root, &att, &BindingConfig::lenient(), &mut Watched::new())
            .expect("skip policy");
        assert_eq!(path.attached_count(), 2);
    }

    #[test]
    fn children_bind_against_current_value_only() {
        let fx = fixture();
        let att = attachment();
        let mut path = BindPath::from_node(&node("a", vec![node("b", vec![node("c", vec![])])]));
        path.bind(&fx.root, &att, &BindingConfig::default(), &mut Watched::new())
            .expect("resolvable");

        // Replacing `b` does not re-resolve the subtree; the old `c` stays watched.
        let fresh: ObjectRef = BeanObject::builder("B").property("c", 30).build();
        fx.a.set("b", fresh).expect("settable");
        assert_eq!(fx.b.property("c").expect("c").change_listener_count(), 1);
    }

    #[test]
    fn attribute_and_property_values_are_wrapped() {
        let shared = SimpleProperty::named("shared", 1);
        let root: ObjectRef = BeanObject::builder("Root")
            .attribute("plain", 5)
            .attribute("held", shared.to_property_ref())
            .build();
        let att = attachment();
        let mut plain = BindPath::from_node(&node("plain", vec![]));
        plain
            .bind(
                &Value::Object(Rc::clone(&root)),
                &att,
                &BindingConfig::default(),
                &mut Watched::new(),
            )
            .expect("attribute");
        assert_eq!(plain.strategy().map(|s| s.label()), Some("attribute"));
        assert_eq!(plain.property().map(|p| p.value()), Some(Value::Int(5)));

        let mut held = BindPath::from_node(&node("held", vec![]));
        held.bind(
            &Value::Object(root),
            &att,
            &BindingConfig::default(),
            &mut Watched::new(),
        )
            .expect("attribute property");
        assert_eq!(shared.change_listener_count(), 1);
    }
}
