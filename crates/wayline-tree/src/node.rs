//! # Navigation Tree Nodes
//!
//! A rooted, ordered tree of [`Destination`]s. Child order reflects UI stacking
//! order; the `is_active_route` flags mark the single visible path from the
//! root towards one leaf.
//!
//! Nodes are shared handles (`Arc`) with interior mutability so that the
//! navigation state can build and edit trees in place. Parent links are
//! [`Weak`] and never own their target: dropping the root drops the tree.
//!
//! Node identity for every tree operation is [`Destination`] equality, not
//! structural position or pointer identity. Use [`TreeNode::ptr_eq`] when the
//! instance matters.
//!
//! `H` is the type of the externally owned handler a driver may bind to a
//! node. The tree stores it but never interprets it.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::destination::Destination;

/// Visiting order for [`TreeNode::traverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Visit a node, then its children.
    PreOrder,
    /// Visit a node's children, then the node.
    PostOrder,
}

/// Whether [`TreeNode::deep_copy_with`] carries bound handlers over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyBindings {
    /// Copies start unbound.
    #[default]
    Strip,
    /// Copies share the original's bound handlers.
    Keep,
}

struct NodeLinks<H> {
    is_active_route: bool,
    children: Vec<TreeNode<H>>,
    parent: Weak<NodeInner<H>>,
    bound_handler: Option<H>,
}

struct NodeInner<H> {
    value: Destination,
    links: RwLock<NodeLinks<H>>,
}

/// One node of a navigation tree, and by extension the subtree below it.
pub struct TreeNode<H> {
    inner: Arc<NodeInner<H>>,
}

impl<H> Clone for TreeNode<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H> TreeNode<H> {
    /// Create an inactive, parentless node.
    pub fn new(value: Destination) -> Self {
        Self::with_active(value, false)
    }

    /// Create a parentless node marked as part of the active route.
    pub fn new_active(value: Destination) -> Self {
        Self::with_active(value, true)
    }

    /// Create a parentless node with an explicit active flag.
    pub fn with_active(value: Destination, is_active_route: bool) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                value,
                links: RwLock::new(NodeLinks {
                    is_active_route,
                    children: Vec::new(),
                    parent: Weak::new(),
                    bound_handler: None,
                }),
            }),
        }
    }

    fn from_inner(inner: Arc<NodeInner<H>>) -> Self {
        Self { inner }
    }

    /// The destination this node represents.
    pub fn value(&self) -> &Destination {
        &self.inner.value
    }

    /// Whether this node lies on the active route.
    pub fn is_active_route(&self) -> bool {
        self.inner.links.read().is_active_route
    }

    /// Mark or unmark this node as part of the active route.
    pub fn set_active_route(&self, active: bool) {
        self.inner.links.write().is_active_route = active;
    }

    /// Children in stacking order.
    pub fn children(&self) -> Vec<TreeNode<H>> {
        self.inner.links.read().children.clone()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.inner.links.read().children.len()
    }

    /// The parent node, if this node is attached and the parent is alive.
    pub fn parent(&self) -> Option<TreeNode<H>> {
        self.inner.links.read().parent.upgrade().map(Self::from_inner)
    }

    /// Walk parent links up to the root of the tree containing this node.
    pub fn root(&self) -> TreeNode<H> {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// Whether both handles point at the same node instance.
    pub fn ptr_eq(&self, other: &TreeNode<H>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Append `child`, detaching it from any previous parent first.
    pub fn add_child(&self, child: TreeNode<H>) {
        if child.parent().is_some() {
            child.remove_from_parent();
        }
        child.inner.links.write().parent = Arc::downgrade(&self.inner);
        self.inner.links.write().children.push(child);
    }

    /// Append every node of `children` in order.
    pub fn add_children(&self, children: impl IntoIterator<Item = TreeNode<H>>) {
        for child in children {
            self.add_child(child);
        }
    }

    /// Detach the child equal to `child`. Returns whether one was found.
    pub fn remove_child(&self, child: &TreeNode<H>) -> bool {
        let removed = {
            let mut links = self.inner.links.write();
            let Some(index) = links
                .children
                .iter()
                .position(|c| c.value() == child.value())
            else {
                return false;
            };
            links.children.remove(index)
        };
        removed.inner.links.write().parent = Weak::new();
        true
    }

    /// Detach this node from its parent. No-op for a root.
    pub fn remove_from_parent(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// First child on the active route, in child order.
    pub fn active_child(&self) -> Option<TreeNode<H>> {
        self.inner
            .links
            .read()
            .children
            .iter()
            .find(|c| c.is_active_route())
            .cloned()
    }

    /// Deepest node reached by following active children from here.
    ///
    /// `None` when this node itself is not active.
    pub fn active_leaf(&self) -> Option<TreeNode<H>> {
        if !self.is_active_route() {
            return None;
        }
        let mut leaf = self.clone();
        while let Some(child) = leaf.active_child() {
            leaf = child;
        }
        Some(leaf)
    }

    /// Append `node` below the current active leaf (or below `self` when
    /// nothing is active) and make it the new active leaf.
    pub fn mark_active_leaf(&self, node: TreeNode<H>) {
        let leaf = self.active_leaf().unwrap_or_else(|| self.clone());
        leaf.set_active_route(true);
        node.set_active_route(true);
        leaf.add_child(node);
    }

    /// Visit every node of this subtree.
    ///
    /// Siblings are visited in child order except that active children come
    /// after all inactive ones, so the active path is always reached last.
    pub fn traverse<F>(&self, order: TraversalOrder, mut visit: F)
    where
        F: FnMut(&TreeNode<H>),
    {
        self.traverse_dyn(order, &mut visit);
    }

    fn traverse_dyn(&self, order: TraversalOrder, visit: &mut dyn FnMut(&TreeNode<H>)) {
        if order == TraversalOrder::PreOrder {
            visit(self);
        }

        let mut children = self.children();
        // Stable: inactive siblings keep their order, active ones move last.
        children.sort_by_key(TreeNode::is_active_route);
        for child in &children {
            child.traverse_dyn(order, visit);
        }

        if order == TraversalOrder::PostOrder {
            visit(self);
        }
    }

    /// Depth-first search in child order; returns the first match.
    pub fn find<P>(&self, mut predicate: P) -> Option<TreeNode<H>>
    where
        P: FnMut(&TreeNode<H>) -> bool,
    {
        self.find_dyn(&mut predicate)
    }

    fn find_dyn(&self, predicate: &mut dyn FnMut(&TreeNode<H>) -> bool) -> Option<TreeNode<H>> {
        if predicate(self) {
            return Some(self.clone());
        }
        self.children()
            .iter()
            .find_map(|child| child.find_dyn(predicate))
    }

    /// Node whose destination equals `destination`.
    pub fn find_destination(&self, destination: &Destination) -> Option<TreeNode<H>> {
        self.find(|node| node.value() == destination)
    }

    /// Node whose destination carries the given user identifier.
    pub fn find_user_identifier(&self, identifier: &str) -> Option<TreeNode<H>> {
        self.find(|node| node.value().user_identifier() == Some(identifier))
    }

    /// Node whose destination carries the given instance identifier.
    pub fn find_instance(&self, identifier: Uuid) -> Option<TreeNode<H>> {
        self.find(|node| node.value().instance_identifier() == identifier)
    }

    /// Whether this subtree contains `destination`.
    pub fn contains(&self, destination: &Destination) -> bool {
        self.find_destination(destination).is_some()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        1 + self.children().iter().map(TreeNode::len).sum::<usize>()
    }

    /// A node always counts itself, so a subtree is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Structural identity: same destinations, active flags and child order
    /// at every position.
    pub fn same_shape(&self, other: &TreeNode<H>) -> bool {
        if self.value() != other.value() || self.is_active_route() != other.is_active_route() {
            return false;
        }
        let ours = self.children();
        let theirs = other.children();
        ours.len() == theirs.len() && ours.iter().zip(&theirs).all(|(a, b)| a.same_shape(b))
    }
}

impl<H: Clone> TreeNode<H> {
    /// Handler bound to this node by a driver, if any.
    pub fn bound_handler(&self) -> Option<H> {
        self.inner.links.read().bound_handler.clone()
    }

    /// Bind a handler to this node, replacing any previous binding.
    pub fn bind_handler(&self, handler: H) {
        self.inner.links.write().bound_handler = Some(handler);
    }

    /// Remove and return the bound handler.
    pub fn unbind_handler(&self) -> Option<H> {
        self.inner.links.write().bound_handler.take()
    }

    /// Detached copy of this subtree without handler bindings.
    ///
    /// Destinations are shared, structure and active flags are cloned, parent
    /// links are rebuilt. The copy never reaches above `self`.
    pub fn deep_copy(&self) -> TreeNode<H> {
        self.deep_copy_with(CopyBindings::Strip)
    }

    /// Detached copy of this subtree, optionally keeping handler bindings.
    pub fn deep_copy_with(&self, bindings: CopyBindings) -> TreeNode<H> {
        let (is_active_route, children, bound_handler) = {
            let links = self.inner.links.read();
            let handler = match bindings {
                CopyBindings::Keep => links.bound_handler.clone(),
                CopyBindings::Strip => None,
            };
            (links.is_active_route, links.children.clone(), handler)
        };

        let copy = TreeNode::with_active(self.value().clone(), is_active_route);
        copy.inner.links.write().bound_handler = bound_handler;
        for child in &children {
            copy.add_child(child.deep_copy_with(bindings));
        }
        copy
    }
}

impl<H> PartialEq for TreeNode<H> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl<H> fmt::Debug for TreeNode<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("value", &format_args!("{}", self.value()))
            .field("active", &self.is_active_route())
            .field("children", &self.children())
            .finish()
    }
}
