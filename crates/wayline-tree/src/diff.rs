//! # Navigation Tree Diff
//!
//! Computes the ordered list of structural changes that turn the `previous`
//! snapshot's shape into the `current` one's:
//!
//! ```text
//! leaving  = previous \ current   (post-order: children before parents)
//! entering = current \ previous   (pre-order:  parents before children)
//!
//! [Leave / Replace(pops only)]  ->  [Enter / Replace]  ->  [ActiveChildChanged]
//! ```
//!
//! Entering nodes are grouped by parent. A lone entrant whose parent loses no
//! child becomes an `Enter`; anything else under that parent collapses into a
//! single `Replace` listing the parent's final children in current order.
//! Leaving nodes not absorbed by a `Replace` are grouped the same way.
//!
//! The diff is pure: neither tree is mutated and no state survives a call.

use std::fmt;

use crate::destination::Destination;
use crate::node::{TraversalOrder, TreeNode};

/// One structural change to be realised by a handler.
pub enum ReconcileAction<H> {
    /// A single destination appears under a parent that loses nothing.
    Enter(TreeNode<H>),
    /// A single destination disappears.
    Leave(TreeNode<H>),
    /// Several siblings change at once under the same parent.
    Replace {
        /// Nodes leaving, taken from the previous snapshot.
        left: Vec<TreeNode<H>>,
        /// The parent's children in final order, taken from the current tree.
        entered: Vec<TreeNode<H>>,
    },
    /// The node is now the active child of its parent.
    ActiveChildChanged(TreeNode<H>),
}

/// Discriminant of a [`ReconcileAction`], for logging and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// [`ReconcileAction::Enter`]
    Enter,
    /// [`ReconcileAction::Leave`]
    Leave,
    /// [`ReconcileAction::Replace`]
    Replace,
    /// [`ReconcileAction::ActiveChildChanged`]
    ActiveChildChanged,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enter => "enter",
            Self::Leave => "leave",
            Self::Replace => "replace",
            Self::ActiveChildChanged => "active-child-changed",
        };
        f.write_str(label)
    }
}

impl<H> ReconcileAction<H> {
    /// Discriminant of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Enter(_) => ActionKind::Enter,
            Self::Leave(_) => ActionKind::Leave,
            Self::Replace { .. } => ActionKind::Replace,
            Self::ActiveChildChanged(_) => ActionKind::ActiveChildChanged,
        }
    }

    /// The node the action is about. For `Replace`, the first leaving node,
    /// or the first entered one when nothing leaves.
    pub fn subject(&self) -> Option<&TreeNode<H>> {
        match self {
            Self::Enter(node) | Self::Leave(node) | Self::ActiveChildChanged(node) => Some(node),
            Self::Replace { left, entered } => left.first().or_else(|| entered.first()),
        }
    }

    /// The parent whose handler must realise this action. `None` for
    /// root-level actions.
    pub fn parent(&self) -> Option<TreeNode<H>> {
        self.subject().and_then(TreeNode::parent)
    }
}

impl<H> Clone for ReconcileAction<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Enter(node) => Self::Enter(node.clone()),
            Self::Leave(node) => Self::Leave(node.clone()),
            Self::Replace { left, entered } => Self::Replace {
                left: left.clone(),
                entered: entered.clone(),
            },
            Self::ActiveChildChanged(node) => Self::ActiveChildChanged(node.clone()),
        }
    }
}

impl<H> fmt::Debug for ReconcileAction<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |nodes: &[TreeNode<H>]| {
            nodes
                .iter()
                .map(|n| n.value().to_string())
                .collect::<Vec<_>>()
        };
        match self {
            Self::Enter(node) => write!(f, "Enter({})", node.value()),
            Self::Leave(node) => write!(f, "Leave({})", node.value()),
            Self::Replace { left, entered } => f
                .debug_struct("Replace")
                .field("left", &names(left))
                .field("entered", &names(entered))
                .finish(),
            Self::ActiveChildChanged(node) => write!(f, "ActiveChildChanged({})", node.value()),
        }
    }
}

/// Nodes sharing one parent, in discovery order.
struct ParentGroup<H> {
    parent: Option<TreeNode<H>>,
    members: Vec<TreeNode<H>>,
    last_position: usize,
}

fn parent_destination<H>(node: &TreeNode<H>) -> Option<Destination> {
    node.parent().map(|p| p.value().clone())
}

fn same_parent<H>(node: &TreeNode<H>, parent: Option<&TreeNode<H>>) -> bool {
    match (node.parent(), parent) {
        (None, None) => true,
        (Some(a), Some(b)) => a.value() == b.value(),
        _ => false,
    }
}

/// Partition `nodes` by parent destination. Groups come out in the order of
/// their first member.
fn group_by_parent<H>(nodes: &[TreeNode<H>]) -> Vec<ParentGroup<H>> {
    let mut groups: Vec<ParentGroup<H>> = Vec::new();
    for (position, node) in nodes.iter().enumerate() {
        let parent = parent_destination(node);
        let existing = groups
            .iter_mut()
            .find(|g| g.parent.as_ref().map(|p| p.value()) == parent.as_ref());
        match existing {
            Some(group) => {
                group.members.push(node.clone());
                group.last_position = position;
            }
            None => groups.push(ParentGroup {
                parent: node.parent(),
                members: vec![node.clone()],
                last_position: position,
            }),
        }
    }
    groups
}

/// Nodes of `source` whose destination does not occur in `other`.
fn missing_from<H>(
    source: Option<&TreeNode<H>>,
    other: Option<&TreeNode<H>>,
    order: TraversalOrder,
) -> Vec<TreeNode<H>> {
    let mut missing = Vec::new();
    if let Some(source) = source {
        source.traverse(order, |node| {
            if !other.is_some_and(|tree| tree.contains(node.value())) {
                missing.push(node.clone());
            }
        });
    }
    missing
}

/// Compute the actions turning `previous` into `current`.
///
/// Either side may be `None` ("no tree"). Identical snapshots produce an empty
/// list.
pub fn diff<H>(
    previous: Option<&TreeNode<H>>,
    current: Option<&TreeNode<H>>,
) -> Vec<ReconcileAction<H>> {
    let leaving = missing_from(previous, current, TraversalOrder::PostOrder);
    let entering = missing_from(current, previous, TraversalOrder::PreOrder);

    let mut pending_leaves = leaving.clone();
    let mut insertions = Vec::new();

    for group in group_by_parent(&entering) {
        let parent = group.parent.as_ref();
        let left: Vec<_> = pending_leaves
            .iter()
            .filter(|node| same_parent(node, parent))
            .cloned()
            .collect();

        if group.members.len() == 1 && left.is_empty() {
            insertions.extend(group.members.into_iter().map(ReconcileAction::Enter));
            continue;
        }

        let entered = match parent {
            Some(parent) => parent.children(),
            None => current.into_iter().cloned().collect(),
        };
        pending_leaves.retain(|node| !same_parent(node, parent));
        insertions.push(ReconcileAction::Replace { left, entered });
    }

    let mut actions = removals(&pending_leaves);
    actions.extend(insertions);
    actions.extend(active_child_changes(previous, current));

    tracing::trace!(
        leaving = leaving.len(),
        entering = entering.len(),
        actions = actions.len(),
        "computed navigation diff"
    );
    actions
}

/// Pop actions for leaving nodes that no `Replace` absorbed.
///
/// A group is ordered by its last member in the post-order walk, so the group
/// removing a node's children always precedes the group removing the node.
fn removals<H>(leaving: &[TreeNode<H>]) -> Vec<ReconcileAction<H>> {
    let mut groups = group_by_parent(leaving);
    groups.sort_by_key(|g| g.last_position);

    groups
        .into_iter()
        .map(|mut group| {
            if group.members.len() == 1 {
                ReconcileAction::Leave(group.members.remove(0))
            } else {
                ReconcileAction::Replace {
                    left: group.members,
                    entered: Vec::new(),
                }
            }
        })
        .collect()
}

/// One `ActiveChildChanged` per node of `current` whose active child differs
/// from the active child of the matching node in `previous`.
fn active_child_changes<H>(
    previous: Option<&TreeNode<H>>,
    current: Option<&TreeNode<H>>,
) -> Vec<ReconcileAction<H>> {
    let mut changes = Vec::new();
    let Some(current) = current else {
        return changes;
    };

    current.traverse(TraversalOrder::PostOrder, |node| {
        let Some(active) = node.active_child() else {
            return;
        };
        let previous_active = previous
            .and_then(|tree| tree.find_destination(node.value()))
            .and_then(|matching| matching.active_child());
        if previous_active.map_or(true, |before| before.value() != active.value()) {
            changes.push(ReconcileAction::ActiveChildChanged(active));
        }
    });
    changes
}
