//! Wayline-Router: Navigation Reconciliation Driver
//!
//! Keeps externally owned UI handlers in step with a navigation tree. The
//! host application edits the tree through a state container; the router
//! diffs each new snapshot against the last one (see [`wayline_tree::diff`])
//! and asks the handler bound to each affected parent to push, pop or replace
//! children, one transition at a time.
//!
//! # Overview
//!
//! - [`RouteHandler`] / [`Completion`]: the handler contract
//! - [`NavigationState`] / [`NavigationStore`]: reducer-style state container
//! - [`NavigationSource`]: what the router needs from any container
//! - [`Reconciler`]: sequential batch execution with completion deadlines
//! - [`Router`]: the long-running task wiring a source to a reconciler
//! - [`UiExecutor`]: where handler calls run
//!
//! Handler contract violations (missing completions, missing bindings, a
//! mismatched root) are fatal: the router halts and reports the error instead
//! of running on with a half-reconciled UI.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wayline_router::{NavigationAction, NavigationStore, Router, RouterConfig};
//! # use wayline_router::{Completion, Destination, HandlerBindings, HandlerRef, RouteHandler, TargetKind};
//! # struct Shell;
//! # impl RouteHandler for Shell {
//! #     fn target_kind(&self) -> TargetKind { TargetKind::of::<Self>() }
//! #     fn push(&self, _: &Destination, c: Completion) -> HandlerRef { c.complete(); Arc::new(Shell) }
//! #     fn pop(&self, _: &Destination, c: Completion) { c.complete() }
//! #     fn change(&self, _: &[Destination], _: &[Destination], c: Completion) -> HandlerBindings {
//! #         c.complete();
//! #         HandlerBindings::new()
//! #     }
//! # }
//!
//! # async fn run() -> wayline_router::RouterResult<()> {
//! let store = Arc::new(NavigationStore::default());
//! let router = Router::builder(store.clone(), Arc::new(Shell))
//!     .config(RouterConfig::from_toml_str("completion_timeout_ms = 5000")?)
//!     .start()
//!     .await?;
//!
//! let detail = Destination::new(TargetKind::named("detail"));
//! let version = store.dispatch(NavigationAction::AddDestination(detail)).await;
//! router.wait_for_version(version).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod errors;
pub mod executor;
pub mod handler;
pub mod reconciler;
pub mod router;
pub mod state;
pub mod store;

pub use config::{RouterConfig, RouterConfigBuilder};
pub use errors::{RouterError, RouterResult};
pub use executor::{ChannelExecutor, InlineExecutor, TokioExecutor, UiExecutor, UiJob, UiJobQueue};
pub use handler::{Completion, HandlerBindings, HandlerRef, NavAction, NavNode, RouteHandler};
pub use reconciler::{ReconcileReport, Reconciler, RouterPhase, RouterStatus};
pub use router::{Router, RouterBuilder};
pub use state::{NavigationAction, NavigationState};
pub use store::{NavigationSource, NavigationStore};

pub use wayline_tree::{ActionKind, Destination, TargetKind};
