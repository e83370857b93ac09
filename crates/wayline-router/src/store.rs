//! Navigation state container
//!
//! The router only needs three things from the application's state
//! container, captured by [`NavigationSource`]: the current tree, a change
//! subscription, and a way to install a root. [`NavigationStore`] is a
//! self-contained implementation for hosts without their own container.
//!
//! Change notifications are a version counter on a `watch` channel, so bursts
//! of changes coalesce into a single wake-up for the router.

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use wayline_tree::Destination;

use crate::handler::{HandlerRef, NavNode};
use crate::state::{NavigationAction, NavigationState};

/// What the router consumes from an application state container.
#[async_trait]
pub trait NavigationSource: Send + Sync {
    /// Root of the live navigation tree.
    async fn current_root(&self) -> Option<NavNode>;

    /// Version counter bumped after every change to the tree.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Replace the tree with a single root bound to `handler`.
    async fn install_root(&self, destination: Destination, handler: HandlerRef);
}

/// Navigation state behind an async lock, with change notifications.
#[derive(Debug)]
pub struct NavigationStore {
    state: RwLock<NavigationState>,
    version: watch::Sender<u64>,
}

impl Default for NavigationStore {
    fn default() -> Self {
        Self::new(NavigationState::default())
    }
}

impl NavigationStore {
    /// Store seeded with `state`.
    pub fn new(state: NavigationState) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(state),
            version,
        }
    }

    /// Apply `action` and notify subscribers if the tree changed.
    ///
    /// Returns the store version after the action.
    pub async fn dispatch(&self, action: NavigationAction) -> u64 {
        let mut state = self.state.write().await;
        tracing::debug!(?action, "dispatching navigation action");
        if state.apply(action) {
            self.version.send_modify(|v| *v += 1);
        }
        *self.version.borrow()
    }

    /// Snapshot of the current state. Later dispatches never alter it.
    pub async fn state(&self) -> NavigationState {
        self.state.read().await.clone()
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }
}

#[async_trait]
impl NavigationSource for NavigationStore {
    async fn current_root(&self) -> Option<NavNode> {
        self.state.read().await.root().cloned()
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    async fn install_root(&self, destination: Destination, handler: HandlerRef) {
        self.dispatch(NavigationAction::SetRoot {
            destination,
            handler,
        })
        .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wayline_tree::TargetKind;

    fn dest(label: &'static str) -> Destination {
        Destination::new(TargetKind::named(label)).with_user_identifier(label)
    }

    #[tokio::test]
    async fn test_dispatch_bumps_version_on_change() {
        let store = NavigationStore::default();
        let mut changes = store.subscribe();
        assert_eq!(store.version(), 0);

        let version = store.dispatch(NavigationAction::AddDestination(dest("home"))).await;
        assert_eq!(version, 1);
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 1);
    }

    #[tokio::test]
    async fn test_noop_dispatch_keeps_version() {
        let store = NavigationStore::default();
        store.dispatch(NavigationAction::AddDestination(dest("home"))).await;
        let version = store.dispatch(NavigationAction::RemoveActiveDestination).await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_state_snapshot_is_stable() {
        let store = NavigationStore::default();
        store.dispatch(NavigationAction::AddDestination(dest("home"))).await;
        let snapshot = store.state().await;

        store.dispatch(NavigationAction::AddDestination(dest("list"))).await;
        assert_eq!(snapshot.root().map(|r| r.len()), Some(1));
        assert_eq!(store.current_root().await.map(|r| r.len()), Some(2));
    }
}
