//! Wayline-Tree: Navigation Tree Snapshots and Structural Diff
//!
//! Pure layer of the Wayline router. It models the navigation state as a
//! rooted, ordered tree of [`Destination`]s and computes the ordered list of
//! [`ReconcileAction`]s that transforms one snapshot into another.
//!
//! # Overview
//!
//! - [`Destination`]: identity-bearing descriptor of a navigation target
//! - [`TreeNode`]: shared tree node with weak parent links and active-route flags
//! - [`diff`]: stateless tree diff producing `Enter`/`Leave`/`Replace`/
//!   `ActiveChildChanged` actions
//!
//! Nothing here performs I/O, spawns tasks or fails. Executing the actions
//! against live handlers is the job of `wayline-router`.
//!
//! ```rust
//! use wayline_tree::{diff, Destination, ReconcileAction, TargetKind, TreeNode};
//!
//! let root: TreeNode<()> = TreeNode::new_active(Destination::new(TargetKind::named("home")));
//! let next = root.deep_copy();
//! next.add_child(TreeNode::new(Destination::new(TargetKind::named("detail"))));
//!
//! let actions = diff(Some(&root), Some(&next));
//! assert!(matches!(actions.as_slice(), [ReconcileAction::Enter(_)]));
//! ```

#![forbid(unsafe_code)]

pub mod destination;
pub mod diff;
pub mod node;

pub use destination::{ContextData, Destination, TargetKind};
pub use diff::{diff, ActionKind, ReconcileAction};
pub use node::{CopyBindings, TraversalOrder, TreeNode};
