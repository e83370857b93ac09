//! # Route Handlers
//!
//! A [`RouteHandler`] is the externally owned object (usually a view
//! controller) that realises navigation changes below one destination. The
//! router asks the handler bound to a parent destination to push, pop or
//! replace its children.
//!
//! Every call receives a [`Completion`]. The handler must call
//! [`Completion::complete`] exactly once, on every path, after its transition
//! has finished. It may do so synchronously or later from any thread. A
//! completion that is dropped unsignalled, or that is not signalled before the
//! configured deadline, halts the router.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use wayline_tree::{Destination, ReconcileAction, TargetKind, TreeNode};

/// Shared reference to a live handler.
pub type HandlerRef = Arc<dyn RouteHandler>;

/// Navigation tree node carrying handler bindings.
pub type NavNode = TreeNode<HandlerRef>;

/// Reconciliation action over [`NavNode`]s.
pub type NavAction = ReconcileAction<HandlerRef>;

/// One-shot completion signal handed to a handler with each call.
#[must_use = "a handler must signal completion, or the router halts"]
pub struct Completion {
    signal: oneshot::Sender<()>,
}

impl Completion {
    /// Create a completion and the receiver that observes it.
    pub fn channel() -> (Self, oneshot::Receiver<()>) {
        let (signal, observed) = oneshot::channel();
        (Self { signal }, observed)
    }

    /// Signal that the transition has finished.
    pub fn complete(self) {
        // The router may already have given up on this action.
        let _ = self.signal.send(());
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &!self.signal.is_closed())
            .finish()
    }
}

/// Capability implemented by objects that perform navigation transitions.
///
/// `push`, `pop` and `change` have no defaults: a handler that is ever asked
/// to perform one of them must implement it, or the UI and the navigation
/// state drift apart. Active-destination notifications are optional.
pub trait RouteHandler: Send + Sync {
    /// Kind of destination this handler realises.
    fn target_kind(&self) -> TargetKind;

    /// Show `destination` as a new child and return the handler created for it.
    fn push(&self, destination: &Destination, completion: Completion) -> HandlerRef;

    /// Remove the child showing `destination`.
    fn pop(&self, destination: &Destination, completion: Completion);

    /// Replace several children in one transition.
    ///
    /// `entering` lists the final children in order, including ones that
    /// were already shown. The returned bindings must contain a handler for
    /// every destination in `entering`.
    fn change(
        &self,
        leaving: &[Destination],
        entering: &[Destination],
        completion: Completion,
    ) -> HandlerBindings;

    /// `destination` became the active child. Completes immediately unless
    /// overridden.
    fn change_active_destination(&self, destination: &Destination, completion: Completion) {
        let _ = destination;
        completion.complete();
    }
}

/// Ordered destination → handler table.
///
/// [`Destination`] identity is not hashable, so lookups are linear. Tables
/// stay small: one entry per live destination.
#[derive(Clone, Default)]
pub struct HandlerBindings {
    entries: Vec<(Destination, HandlerRef)>,
}

impl HandlerBindings {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with one entry.
    pub fn single(destination: Destination, handler: HandlerRef) -> Self {
        Self {
            entries: vec![(destination, handler)],
        }
    }

    /// Bind `handler` to `destination`, replacing an existing binding.
    pub fn bind(&mut self, destination: Destination, handler: HandlerRef) {
        match self.entries.iter_mut().find(|(d, _)| *d == destination) {
            Some(entry) => entry.1 = handler,
            None => self.entries.push((destination, handler)),
        }
    }

    /// Builder-style [`bind`](Self::bind).
    #[must_use]
    pub fn with(mut self, destination: Destination, handler: HandlerRef) -> Self {
        self.bind(destination, handler);
        self
    }

    /// Handler bound to `destination`.
    pub fn get(&self, destination: &Destination) -> Option<&HandlerRef> {
        self.entries
            .iter()
            .find(|(d, _)| d == destination)
            .map(|(_, h)| h)
    }

    /// Whether `destination` has a binding.
    pub fn contains(&self, destination: &Destination) -> bool {
        self.get(destination).is_some()
    }

    /// Remove and return the binding for `destination`.
    pub fn remove(&mut self, destination: &Destination) -> Option<HandlerRef> {
        let index = self.entries.iter().position(|(d, _)| d == destination)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound destinations in insertion order.
    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.entries.iter().map(|(d, _)| d)
    }
}

impl fmt::Debug for HandlerBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(d, h)| format!("{d} -> {}", h.target_kind())))
            .finish()
    }
}
