//! # Reconciler
//!
//! Turns successive navigation snapshots into handler calls.
//!
//! Each pass diffs the previous snapshot against the current tree and runs
//! the resulting actions strictly one at a time: an action's handler call is
//! scheduled on the [`UiExecutor`], and the next action starts only after the
//! handler has signalled its [`Completion`]. A missing or late completion, or
//! any other broken handler contract, halts the reconciler for good.
//!
//! The reconciler owns the destination → handler table. Handlers bound to
//! nodes in the live tree (for example the root installed by the router) are
//! harvested into the table at the start of every pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};
use wayline_tree::{diff, ActionKind, Destination, TraversalOrder};

use crate::config::RouterConfig;
use crate::errors::{RouterError, RouterResult};
use crate::executor::UiExecutor;
use crate::handler::{Completion, HandlerBindings, HandlerRef, NavAction, NavNode};

// ============================================================================
// Status
// ============================================================================

/// What the reconciler is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterPhase {
    /// Waiting for the next change.
    #[default]
    Idle,
    /// Computing the actions for a new snapshot.
    Diffing,
    /// Running action `index` (zero-based) of `total`.
    Executing {
        /// Position of the running action.
        index: usize,
        /// Number of actions in the batch.
        total: usize,
    },
    /// Stopped by a contract violation. Terminal.
    Halted,
}

/// Observable reconciler status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterStatus {
    /// Current phase.
    pub phase: RouterPhase,
    /// Store version the last finished pass reconciled.
    pub observed_version: Option<u64>,
    /// Number of finished passes.
    pub passes: u64,
    /// Error that halted the reconciler.
    pub last_error: Option<String>,
}

impl RouterStatus {
    /// Whether the reconciler has halted.
    pub fn is_halted(&self) -> bool {
        self.phase == RouterPhase::Halted
    }
}

/// Summary of one finished pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Store version the pass reconciled.
    pub version: u64,
    /// Kinds of the executed actions, in order.
    pub actions: Vec<ActionKind>,
    /// Wall time of the pass.
    pub elapsed: Duration,
}

// ============================================================================
// Handler invocation
// ============================================================================

/// A handler call, detached from the tree so it can cross to the UI context.
enum Invocation {
    Push(Destination),
    Pop(Destination),
    Change {
        leaving: Vec<Destination>,
        entering: Vec<Destination>,
    },
    Activate(Destination),
}

/// What a handler call returned.
enum Outcome {
    Pushed(HandlerRef),
    Changed(HandlerBindings),
    Done,
}

impl Invocation {
    fn run(self, handler: &HandlerRef, completion: Completion) -> Outcome {
        match self {
            Self::Push(destination) => Outcome::Pushed(handler.push(&destination, completion)),
            Self::Pop(destination) => {
                handler.pop(&destination, completion);
                Outcome::Done
            }
            Self::Change { leaving, entering } => {
                Outcome::Changed(handler.change(&leaving, &entering, completion))
            }
            Self::Activate(destination) => {
                handler.change_active_destination(&destination, completion);
                Outcome::Done
            }
        }
    }
}

fn destinations(nodes: &[NavNode]) -> Vec<Destination> {
    nodes.iter().map(|n| n.value().clone()).collect()
}

fn describe(action: &NavAction) -> String {
    action
        .subject()
        .map(|n| n.value().to_string())
        .unwrap_or_else(|| "<empty>".to_string())
}

// ============================================================================
// Reconciler
// ============================================================================

/// Sequential executor of reconciliation batches.
pub struct Reconciler {
    config: RouterConfig,
    executor: Arc<dyn UiExecutor>,
    bindings: HandlerBindings,
    previous: Option<NavNode>,
    status: watch::Sender<RouterStatus>,
}

impl Reconciler {
    /// Reconciler with an empty binding table and no previous snapshot.
    pub fn new(config: RouterConfig, executor: Arc<dyn UiExecutor>) -> Self {
        let (status, _) = watch::channel(RouterStatus::default());
        Self {
            config,
            executor,
            bindings: HandlerBindings::new(),
            previous: None,
            status,
        }
    }

    /// Subscribe to status updates.
    pub fn subscribe(&self) -> watch::Receiver<RouterStatus> {
        self.status.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> RouterStatus {
        self.status.borrow().clone()
    }

    /// Bind `handler` to `destination`.
    pub fn bind(&mut self, destination: Destination, handler: HandlerRef) {
        self.bindings.bind(destination, handler);
    }

    /// Current destination → handler table.
    pub fn bindings(&self) -> &HandlerBindings {
        &self.bindings
    }

    /// Snapshot the next pass will diff against.
    pub fn previous_snapshot(&self) -> Option<&NavNode> {
        self.previous.as_ref()
    }

    /// Reconcile the handlers with `current`, the tree at store `version`.
    ///
    /// Any error halts the reconciler; later calls fail with
    /// [`RouterError::Halted`].
    pub async fn reconcile(
        &mut self,
        current: Option<NavNode>,
        version: u64,
    ) -> RouterResult<ReconcileReport> {
        if self.status.borrow().is_halted() {
            return Err(RouterError::Halted);
        }

        let started = Instant::now();
        self.status.send_modify(|s| s.phase = RouterPhase::Diffing);
        if let Some(root) = &current {
            self.harvest(root);
        }

        // The old snapshot stays alive until the batch ends: leaving nodes
        // reach their parents through it.
        let previous = self.previous.take();
        let mut actions = diff(previous.as_ref(), current.as_ref());
        // A root that already has a handler is shown by that handler.
        actions.retain(|action| !self.is_bound_root_entry(action));
        self.previous = current.as_ref().map(NavNode::deep_copy);
        debug!(version, actions = actions.len(), "reconciling navigation snapshot");

        let total = actions.len();
        let mut kinds = Vec::with_capacity(total);
        for (index, action) in actions.iter().enumerate() {
            self.status
                .send_modify(|s| s.phase = RouterPhase::Executing { index, total });
            if let Err(err) = self.execute(action).await {
                error!(error = %err, action = %action.kind(), "navigation router halted");
                self.status.send_modify(|s| {
                    s.phase = RouterPhase::Halted;
                    s.last_error = Some(err.to_string());
                });
                return Err(err);
            }
            kinds.push(action.kind());
        }
        drop(previous);

        let elapsed = started.elapsed();
        self.status.send_modify(|s| {
            s.phase = RouterPhase::Idle;
            s.observed_version = Some(version);
            s.passes += 1;
        });
        debug!(version, ?elapsed, "navigation snapshot reconciled");

        Ok(ReconcileReport {
            version,
            actions: kinds,
            elapsed,
        })
    }

    /// Pull handlers bound directly on tree nodes into the table.
    fn harvest(&mut self, root: &NavNode) {
        let mut found = Vec::new();
        root.traverse(TraversalOrder::PreOrder, |node| {
            if let Some(handler) = node.bound_handler() {
                found.push((node.value().clone(), handler));
            }
        });
        for (destination, handler) in found {
            if !self.bindings.contains(&destination) {
                trace!(%destination, "harvested node binding");
                self.bindings.bind(destination, handler);
            }
        }
    }

    fn is_bound_root_entry(&self, action: &NavAction) -> bool {
        matches!(action, NavAction::Enter(node)
            if node.parent().is_none() && self.bindings.contains(node.value()))
    }

    fn handler_for(&self, node: &NavNode) -> Option<HandlerRef> {
        self.bindings
            .get(node.value())
            .cloned()
            .or_else(|| node.bound_handler())
    }

    async fn execute(&mut self, action: &NavAction) -> RouterResult<()> {
        let kind = action.kind();
        let subject = describe(action);

        let Some(parent) = action.parent() else {
            // Root-level changes have no handler above them.
            debug!(action = %kind, destination = %subject, "root-level action");
            self.apply(action, None)?;
            return Ok(());
        };

        let handler = self
            .handler_for(&parent)
            .ok_or_else(|| RouterError::UnboundParent {
                parent: parent.value().to_string(),
                destination: subject.clone(),
            })?;

        let invocation = match action {
            NavAction::Enter(node) => Invocation::Push(node.value().clone()),
            NavAction::Leave(node) => Invocation::Pop(node.value().clone()),
            NavAction::Replace { left, entered } => Invocation::Change {
                leaving: destinations(left),
                entering: destinations(entered),
            },
            NavAction::ActiveChildChanged(node) => Invocation::Activate(node.value().clone()),
        };

        debug!(action = %kind, destination = %subject, parent = %parent.value(), "invoking handler");
        let (completion, done) = Completion::channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.executor.execute(Box::new(move || {
            let outcome = invocation.run(&handler, completion);
            let _ = reply_tx.send(outcome);
        }));

        let started = Instant::now();
        let timeout = self.config.completion_timeout();
        let waited = tokio::time::timeout(timeout, async {
            let outcome = reply_rx.await.map_err(|_| RouterError::ExecutorDropped {
                action: kind,
                destination: subject.clone(),
            })?;
            done.await.map_err(|_| RouterError::CompletionDropped {
                action: kind,
                destination: subject.clone(),
            })?;
            Ok::<_, RouterError>(outcome)
        })
        .await
        .map_err(|_| RouterError::CompletionTimeout {
            action: kind,
            destination: subject.clone(),
            timeout,
        })??;

        let elapsed = started.elapsed();
        if let Some(threshold) = self.config.slow_transition_threshold() {
            if elapsed > threshold {
                warn!(action = %kind, destination = %subject, ?elapsed, "slow navigation transition");
            }
        }

        self.apply(action, Some(waited))
    }

    /// Update the binding table with what the handler returned.
    fn apply(&mut self, action: &NavAction, outcome: Option<Outcome>) -> RouterResult<()> {
        match (action, outcome) {
            (NavAction::Enter(node), Some(Outcome::Pushed(handler))) => {
                self.bind_entered(node, handler);
            }
            (NavAction::Replace { left, entered }, Some(Outcome::Changed(returned))) => {
                for node in left {
                    self.bindings.remove(node.value());
                }
                for node in entered {
                    let handler = returned
                        .get(node.value())
                        .cloned()
                        .ok_or_else(|| RouterError::MissingBinding {
                            destination: node.value().to_string(),
                        })?;
                    self.bind_entered(node, handler);
                }
            }
            (NavAction::Replace { left, .. }, None) => {
                for node in left {
                    self.bindings.remove(node.value());
                }
            }
            (NavAction::Leave(node), _) => {
                self.bindings.remove(node.value());
            }
            _ => {}
        }
        Ok(())
    }

    fn bind_entered(&mut self, node: &NavNode, handler: HandlerRef) {
        node.bind_handler(Arc::clone(&handler));
        self.bindings.bind(node.value().clone(), handler);
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("bindings", &self.bindings)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::executor::InlineExecutor;
    use crate::handler::RouteHandler;
    use parking_lot::Mutex;
    use wayline_tree::TargetKind;

    /// Handler that records calls and returns fresh recorders.
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        complete: bool,
    }

    impl Recorder {
        fn shared(log: &Arc<Mutex<Vec<String>>>) -> HandlerRef {
            Arc::new(Self {
                log: Arc::clone(log),
                complete: true,
            })
        }

        fn record(&self, entry: String) {
            self.log.lock().push(entry);
        }

        fn finish(&self, completion: Completion) {
            if self.complete {
                completion.complete();
            } else {
                std::mem::forget(completion);
            }
        }
    }

    impl RouteHandler for Recorder {
        fn target_kind(&self) -> TargetKind {
            TargetKind::named("recorder")
        }

        fn push(&self, destination: &Destination, completion: Completion) -> HandlerRef {
            self.record(format!("push {}", destination.user_identifier().unwrap_or("?")));
            self.finish(completion);
            Recorder::shared(&self.log)
        }

        fn pop(&self, destination: &Destination, completion: Completion) {
            self.record(format!("pop {}", destination.user_identifier().unwrap_or("?")));
            self.finish(completion);
        }

        fn change(
            &self,
            leaving: &[Destination],
            entering: &[Destination],
            completion: Completion,
        ) -> HandlerBindings {
            self.record(format!("change {} -> {}", leaving.len(), entering.len()));
            self.finish(completion);
            entering.iter().fold(HandlerBindings::new(), |b, d| {
                b.with(d.clone(), Recorder::shared(&self.log))
            })
        }

        fn change_active_destination(&self, destination: &Destination, completion: Completion) {
            self.record(format!("activate {}", destination.user_identifier().unwrap_or("?")));
            self.finish(completion);
        }
    }

    fn dest(label: &'static str) -> Destination {
        Destination::new(TargetKind::named(label)).with_user_identifier(label)
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(RouterConfig::default(), Arc::new(InlineExecutor))
    }

    #[tokio::test]
    async fn test_push_binds_returned_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let root = NavNode::new_active(dest("home"));
        root.bind_handler(Recorder::shared(&log));

        let mut reconciler = reconciler();
        let report = reconciler.reconcile(Some(root.clone()), 1).await.unwrap();
        assert!(report.actions.is_empty(), "bound root produced {:?}", report.actions);

        let current = root.deep_copy_with(wayline_tree::CopyBindings::Keep);
        current.mark_active_leaf(NavNode::new(dest("list")));
        let report = reconciler.reconcile(Some(current), 2).await.unwrap();
        assert_eq!(
            report.actions,
            vec![ActionKind::Enter, ActionKind::ActiveChildChanged]
        );
        assert_eq!(*log.lock(), vec!["push list", "activate list"]);
        assert!(reconciler.bindings().contains(&dest("list")));
        assert_eq!(reconciler.status().observed_version, Some(2));
    }

    #[tokio::test]
    async fn test_unbound_parent_halts() {
        let root = NavNode::new_active(dest("home"));
        let mut reconciler = reconciler();
        let report = reconciler.reconcile(Some(root.clone()), 1).await.unwrap();
        assert_eq!(report.actions, vec![ActionKind::Enter]);

        let current = root.deep_copy();
        current.mark_active_leaf(NavNode::new(dest("list")));
        let err = reconciler.reconcile(Some(current.clone()), 2).await.unwrap_err();
        assert!(matches!(err, RouterError::UnboundParent { .. }));
        assert!(reconciler.status().is_halted());
        assert_eq!(
            reconciler.reconcile(Some(current), 3).await.unwrap_err(),
            RouterError::Halted
        );
    }

    #[tokio::test]
    async fn test_root_swap_completes_without_handler() {
        let mut reconciler = reconciler();
        reconciler.reconcile(Some(NavNode::new_active(dest("a"))), 1).await.unwrap();
        reconciler.bind(dest("a"), Recorder::shared(&Arc::default()));

        let report = reconciler
            .reconcile(Some(NavNode::new_active(dest("b"))), 2)
            .await
            .unwrap();
        assert_eq!(report.actions, vec![ActionKind::Replace]);
        assert!(!reconciler.bindings().contains(&dest("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_completion_times_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let root = NavNode::new_active(dest("home"));
        root.bind_handler(Arc::new(Recorder {
            log: Arc::clone(&log),
            complete: false,
        }));
        let mut reconciler = reconciler();
        reconciler.reconcile(Some(root.clone()), 1).await.unwrap();

        let current = root.deep_copy_with(wayline_tree::CopyBindings::Keep);
        current.mark_active_leaf(NavNode::new(dest("list")));
        let err = reconciler.reconcile(Some(current), 2).await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::CompletionTimeout {
                action: ActionKind::Enter,
                ..
            }
        ));
        assert_eq!(reconciler.status().phase, RouterPhase::Halted);
        // The activation queued behind the push never ran.
        assert_eq!(*log.lock(), vec!["push list"]);
    }
}
