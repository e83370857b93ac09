//! # Navigation State
//!
//! The live navigation tree plus the reducer that edits it.
//!
//! Every mutation is copy-on-write: the root is deep-copied (bindings kept)
//! before it is touched, so trees already handed out, including the nodes
//! referenced by an in-flight reconciliation batch, never change under their
//! holders.
//!
//! Removing or activating a destination that is not in the tree is a benign
//! no-op and reports `false`.

use std::fmt;

use uuid::Uuid;
use wayline_tree::{CopyBindings, Destination, TreeNode};

use crate::handler::{HandlerRef, NavNode};

/// A request to change the navigation state.
#[derive(Clone)]
pub enum NavigationAction {
    /// Push a destination on top of the active route.
    AddDestination(Destination),
    /// Drop the active leaf.
    RemoveActiveDestination,
    /// Drop the destination with this instance identifier, with its subtree.
    RemoveDestination(Uuid),
    /// Drop the destination with this user identifier, with its subtree.
    RemoveUserDestination(String),
    /// Re-point the active route so it ends at this destination.
    ActivateDestination(Uuid),
    /// Discard the tree and start over from a single bound root.
    SetRoot {
        /// Destination of the new root.
        destination: Destination,
        /// Handler already showing the root.
        handler: HandlerRef,
    },
}

impl fmt::Debug for NavigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddDestination(d) => write!(f, "AddDestination({d})"),
            Self::RemoveActiveDestination => f.write_str("RemoveActiveDestination"),
            Self::RemoveDestination(id) => write!(f, "RemoveDestination({id})"),
            Self::RemoveUserDestination(id) => write!(f, "RemoveUserDestination({id})"),
            Self::ActivateDestination(id) => write!(f, "ActivateDestination({id})"),
            Self::SetRoot { destination, .. } => write!(f, "SetRoot({destination})"),
        }
    }
}

/// Process-wide navigation state.
#[derive(Clone, Default)]
pub struct NavigationState {
    root: Option<NavNode>,
}

impl NavigationState {
    /// State around an existing tree, e.g. one restored from storage.
    pub fn new(root: Option<NavNode>) -> Self {
        Self { root }
    }

    /// Root of the live tree.
    pub fn root(&self) -> Option<&NavNode> {
        self.root.as_ref()
    }

    /// Destination at the end of the active route.
    pub fn active_destination(&self) -> Option<Destination> {
        self.root
            .as_ref()
            .and_then(TreeNode::active_leaf)
            .map(|leaf| leaf.value().clone())
    }

    /// Apply `action`. Returns whether the tree changed.
    pub fn apply(&mut self, action: NavigationAction) -> bool {
        match action {
            NavigationAction::AddDestination(destination) => {
                self.add_destination(destination);
                true
            }
            NavigationAction::RemoveActiveDestination => self.remove_active_destination().is_some(),
            NavigationAction::RemoveDestination(id) => self.remove_destination(id),
            NavigationAction::RemoveUserDestination(id) => {
                self.remove_where(|node| node.value().user_identifier() == Some(id.as_str()))
            }
            NavigationAction::ActivateDestination(id) => self.activate_destination(id),
            NavigationAction::SetRoot {
                destination,
                handler,
            } => {
                self.set_root(destination, handler);
                true
            }
        }
    }

    /// Push `destination` as the new active leaf; it becomes the root of an
    /// empty tree.
    pub fn add_destination(&mut self, destination: Destination) {
        let node = NavNode::new_active(destination);
        match self.mutate_root() {
            Some(root) => root.mark_active_leaf(node),
            None => self.root = Some(node),
        }
    }

    /// Detach the active leaf and return its destination. The root itself is
    /// never removed this way.
    pub fn remove_active_destination(&mut self) -> Option<Destination> {
        let leaf = self.root.as_ref()?.active_leaf()?;
        leaf.parent()?;

        let root = self.mutate_root()?;
        let leaf = root.find_destination(leaf.value())?;
        leaf.remove_from_parent();
        Some(leaf.value().clone())
    }

    /// Detach the destination with this instance identifier.
    pub fn remove_destination(&mut self, id: Uuid) -> bool {
        self.remove_where(|node| node.value().instance_identifier() == id)
    }

    /// Make the destination with this instance identifier the end of the
    /// active route.
    ///
    /// Every ancestor becomes active and every sibling subtree along the way
    /// inactive; the destination's own subtree is untouched.
    pub fn activate_destination(&mut self, id: Uuid) -> bool {
        let exists = self
            .root
            .as_ref()
            .is_some_and(|root| root.find_instance(id).is_some());
        if !exists {
            return false;
        }

        let Some(target) = self.mutate_root().and_then(|root| root.find_instance(id)) else {
            return false;
        };

        let mut cursor = Some(target);
        while let Some(node) = cursor {
            node.set_active_route(true);
            if let Some(parent) = node.parent() {
                for sibling in parent.children() {
                    if !sibling.ptr_eq(&node) {
                        deactivate_subtree(&sibling);
                    }
                }
            }
            cursor = node.parent();
        }
        true
    }

    /// Replace the tree with a single active root bound to `handler`.
    pub fn set_root(&mut self, destination: Destination, handler: HandlerRef) {
        let root = NavNode::new_active(destination);
        root.bind_handler(handler);
        self.root = Some(root);
    }

    fn remove_where(&mut self, predicate: impl Fn(&NavNode) -> bool) -> bool {
        let Some(found) = self.root.as_ref().and_then(|root| root.find(&predicate)) else {
            return false;
        };
        if found.parent().is_none() {
            return false;
        }

        match self.mutate_root().and_then(|root| root.find(&predicate)) {
            Some(node) => {
                node.remove_from_parent();
                true
            }
            None => false,
        }
    }

    /// Swap in a private copy of the root before editing it.
    fn mutate_root(&mut self) -> Option<NavNode> {
        let copy = self.root.as_ref()?.deep_copy_with(CopyBindings::Keep);
        self.root = Some(copy.clone());
        Some(copy)
    }
}

fn deactivate_subtree(node: &NavNode) {
    node.set_active_route(false);
    for child in node.children() {
        deactivate_subtree(&child);
    }
}

impl fmt::Debug for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationState")
            .field("root", &self.root)
            .finish()
    }
}
