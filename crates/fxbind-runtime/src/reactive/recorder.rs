#![forbid(unsafe_code)]

//! Dependency recording for expression discovery.
//!
//! # Design
//!
//! During discovery an expression runs against a [`Recording`] instead of
//! real data. Every named access on a recorded slot goes through
//! [`RecorderNode::access`], which returns the child node for that name,
//! creating it on first access. Children are memoized per name, so
//! `a.b` and `a.c` accumulate into one `a` subtree.
//!
//! A method call on a recorded slot never runs. It yields the terminal
//! marker instead, and any named access on the terminal marker is latched
//! on the recording as a dead end: the bind fails even if the expression
//! swallows the returned error.
//!
//! Once the expression returns, [`Recording::into_dependencies`] snapshots
//! the node tree into plain [`DependencyNode`] values. The recording is then
//! dropped; it is a trace, not a live structure.
//!
//! # Invariants
//!
//! 1. Repeated access to the same name on the same node yields the same child.
//! 2. Children are kept in first-access order.
//! 3. Untouched names contribute no nodes.

use std::cell::RefCell;
use std::rc::Rc;

/// One node of the recorded access tree.
#[derive(Default)]
pub(crate) struct RecorderNode {
    children: RefCell<Vec<(String, Rc<RecorderNode>)>>,
}

impl RecorderNode {
    /// Child node for `name`, created on first access.
    pub(crate) fn access(&self, name: &str) -> Rc<RecorderNode> {
        let mut children = self.children.borrow_mut();
        if let Some((_, child)) = children.iter().find(|(n, _)| n == name) {
            return Rc::clone(child);
        }
        let child = Rc::new(RecorderNode::default());
        children.push((name.to_string(), Rc::clone(&child)));
        child
    }

    fn snapshot(&self) -> Vec<DependencyNode> {
        self.children
            .borrow()
            .iter()
            .map(|(name, child)| DependencyNode {
                name: name.clone(),
                children: child.snapshot(),
            })
            .collect()
    }
}

/// State shared by every recorded slot of one discovery pass.
#[derive(Default)]
pub(crate) struct Recording {
    root: Rc<RecorderNode>,
    dead_end: RefCell<Option<String>>,
}

impl Recording {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn root(&self) -> &Rc<RecorderNode> {
        &self.root
    }

    /// Latch an access on the terminal marker. The first one wins.
    pub(crate) fn mark_dead_end(&self, property: &str) {
        let mut dead_end = self.dead_end.borrow_mut();
        if dead_end.is_none() {
            *dead_end = Some(property.to_string());
        }
    }

    /// Name of the first property accessed on a method-call result, if any.
    pub(crate) fn dead_end(&self) -> Option<String> {
        self.dead_end.borrow().clone()
    }

    pub(crate) fn into_dependencies(&self) -> Vec<DependencyNode> {
        self.root.snapshot()
    }
}

/// A discovered dependency: one accessed name and what was accessed on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    name: String,
    children: Vec<DependencyNode>,
}

impl DependencyNode {
    #[must_use]
    pub fn new(name: impl Into<String>, children: Vec<DependencyNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn children(&self) -> &[DependencyNode] {
        &self.children
    }

    /// Dotted paths of every node in this subtree, parents before children.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{prefix}.{}", self.name)
        };
        out.push(path.clone());
        for child in &self.children {
            child.collect_paths(&path, out);
        }
    }
}
