//! Router errors
//!
//! Two families:
//! - **Contract violations**: a handler broke the transition contract (no
//!   completion, missing binding, mismatched root). These halt the router.
//! - **Lifecycle/configuration**: the router was stopped, halted earlier, or
//!   configured with invalid values.

use std::time::Duration;

use thiserror::Error;
use wayline_tree::{ActionKind, TargetKind};

/// Errors raised by the navigation router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// A handler did not signal completion before the deadline.
    #[error("{action} handler for {destination} did not signal completion within {timeout:?}")]
    CompletionTimeout {
        /// Kind of the action being executed.
        action: ActionKind,
        /// Destination the action was about.
        destination: String,
        /// Configured completion deadline.
        timeout: Duration,
    },

    /// A handler dropped its completion without signalling it.
    #[error("{action} handler for {destination} dropped its completion without signalling")]
    CompletionDropped {
        /// Kind of the action being executed.
        action: ActionKind,
        /// Destination the action was about.
        destination: String,
    },

    /// An entered destination came back without a handler.
    #[error("no handler was returned for entered destination {destination}")]
    MissingBinding {
        /// The unbound destination.
        destination: String,
    },

    /// The parent responsible for an action has no bound handler.
    #[error("no handler is bound to {parent}, the parent of {destination}")]
    UnboundParent {
        /// The parent destination.
        parent: String,
        /// The destination the action was about.
        destination: String,
    },

    /// The supplied root handler does not match the existing root.
    #[error("root handler kind {supplied} does not match existing root kind {existing}")]
    RootKindMismatch {
        /// Kind of the root already in the navigation state.
        existing: TargetKind,
        /// Kind reported by the supplied handler.
        supplied: TargetKind,
    },

    /// The UI executor discarded a job without running it.
    #[error("UI executor dropped the {action} job for {destination}")]
    ExecutorDropped {
        /// Kind of the action being executed.
        action: ActionKind,
        /// Destination the action was about.
        destination: String,
    },

    /// A previous contract violation halted the router.
    #[error("router halted after a contract violation")]
    Halted,

    /// The router task is no longer running.
    #[error("router task stopped: {0}")]
    Stopped(String),

    /// Invalid configuration.
    #[error("invalid router configuration: {0}")]
    Config(String),
}

impl RouterError {
    /// Whether this error is a violated handler contract, which is fatal.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::CompletionTimeout { .. }
                | Self::CompletionDropped { .. }
                | Self::MissingBinding { .. }
                | Self::UnboundParent { .. }
                | Self::RootKindMismatch { .. }
                | Self::ExecutorDropped { .. }
        )
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
