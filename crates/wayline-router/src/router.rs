//! # Router
//!
//! Long-running driver connecting a [`NavigationSource`] to the
//! [`Reconciler`].
//!
//! Starting the router binds the root handler, then spawns a task that
//! reconciles once and again after every change notification. Notifications
//! arriving while a batch runs are coalesced: the next pass diffs straight to
//! the newest tree. A contract violation ends the task with the error, which
//! the host observes through [`Router::join`] or [`Router::wait_for_version`].

use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wayline_tree::Destination;

use crate::config::RouterConfig;
use crate::errors::{RouterError, RouterResult};
use crate::executor::{InlineExecutor, UiExecutor};
use crate::handler::HandlerRef;
use crate::reconciler::{Reconciler, RouterStatus};
use crate::store::NavigationSource;

// ============================================================================
// Builder
// ============================================================================

/// Configures and starts a [`Router`].
pub struct RouterBuilder {
    source: Arc<dyn NavigationSource>,
    root_handler: HandlerRef,
    root_user_identifier: Option<String>,
    config: RouterConfig,
    executor: Arc<dyn UiExecutor>,
}

impl RouterBuilder {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Run handler calls through `executor`. Defaults to [`InlineExecutor`].
    pub fn executor(mut self, executor: Arc<dyn UiExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// User identifier for the synthesized root destination. Ignored, with a
    /// warning, when the navigation state already has a root.
    pub fn root_user_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.root_user_identifier = Some(identifier.into());
        self
    }

    /// Bind the root handler and spawn the reconciliation task.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn start(self) -> RouterResult<Router> {
        let Self {
            source,
            root_handler,
            root_user_identifier,
            config,
            executor,
        } = self;
        config.validate()?;

        let mut reconciler = Reconciler::new(config, executor);
        match source.current_root().await {
            Some(root) => {
                let existing = root.value().target_kind();
                let supplied = root_handler.target_kind();
                if existing != supplied {
                    return Err(RouterError::RootKindMismatch { existing, supplied });
                }
                if let Some(identifier) = root_user_identifier {
                    warn!(
                        %identifier,
                        root = %root.value(),
                        "navigation root already exists; ignoring root user identifier"
                    );
                }
                reconciler.bind(root.value().clone(), root_handler);
            }
            None => {
                let mut destination = Destination::new(root_handler.target_kind());
                if let Some(identifier) = root_user_identifier {
                    destination = destination.with_user_identifier(identifier);
                }
                info!(root = %destination, "installing navigation root");
                source
                    .install_root(destination.clone(), Arc::clone(&root_handler))
                    .await;
                reconciler.bind(destination, root_handler);
            }
        }

        let changes = source.subscribe();
        let status = reconciler.subscribe();
        let (shutdown, stop) = oneshot::channel();
        let task = tokio::spawn(drive(source, reconciler, changes, stop));

        Ok(Router {
            status,
            shutdown: Some(shutdown),
            task,
        })
    }
}

/// Reconcile until shutdown, source closure, or a contract violation.
async fn drive(
    source: Arc<dyn NavigationSource>,
    mut reconciler: Reconciler,
    mut changes: watch::Receiver<u64>,
    mut stop: oneshot::Receiver<()>,
) -> RouterResult<()> {
    info!("navigation router started");
    let mut attached = true;

    'run: loop {
        let version = *changes.borrow_and_update();
        let root = source.current_root().await;
        reconciler.reconcile(root, version).await?;

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        debug!("navigation source closed");
                        break 'run;
                    }
                    break;
                }
                requested = &mut stop, if attached => {
                    if requested.is_ok() {
                        break 'run;
                    }
                    // Handle dropped without a shutdown request.
                    attached = false;
                }
            }
        }
    }

    info!("navigation router stopped");
    Ok(())
}

// ============================================================================
// Router
// ============================================================================

/// Handle to a running navigation router.
///
/// Dropping the handle detaches the task; it keeps reconciling until the
/// source closes or a contract violation halts it.
#[derive(Debug)]
pub struct Router {
    status: watch::Receiver<RouterStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<RouterResult<()>>,
}

impl Router {
    /// Start configuring a router over `source`, with `root_handler` showing
    /// the root destination.
    pub fn builder(source: Arc<dyn NavigationSource>, root_handler: HandlerRef) -> RouterBuilder {
        RouterBuilder {
            source,
            root_handler,
            root_user_identifier: None,
            config: RouterConfig::default(),
            executor: Arc::new(InlineExecutor),
        }
    }

    /// Latest status.
    pub fn status(&self) -> RouterStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status updates.
    pub fn subscribe(&self) -> watch::Receiver<RouterStatus> {
        self.status.clone()
    }

    /// Wait until a pass has reconciled store `version` or newer.
    ///
    /// Fails with [`RouterError::Halted`] if the router halts first.
    pub async fn wait_for_version(&self, version: u64) -> RouterResult<RouterStatus> {
        let mut status = self.status.clone();
        let reached = status
            .wait_for(|s| s.is_halted() || s.observed_version.is_some_and(|v| v >= version))
            .await
            .map_err(|_| RouterError::Stopped(format!("stopped before version {version}")))?
            .clone();
        if reached.is_halted() {
            return Err(RouterError::Halted);
        }
        Ok(reached)
    }

    /// Ask the task to stop after the running batch.
    pub fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Wait for the task to end and return how it ended.
    pub async fn join(self) -> RouterResult<()> {
        self.task
            .await
            .map_err(|e| RouterError::Stopped(e.to_string()))?
    }

    /// Stop the task immediately, abandoning any running batch.
    pub fn abort(&self) {
        self.task.abort();
    }
}
