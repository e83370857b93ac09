//! Test utilities for router scenarios
//!
//! A scripted navigation source that lets tests install arbitrary trees, and
//! a handler that journals every call it receives.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use wayline_router::{
    Completion, Destination, HandlerBindings, HandlerRef, NavNode, NavigationSource, RouteHandler,
    TargetKind,
};

/// Kind shared by every test destination and handler.
pub const SCREEN: TargetKind = TargetKind::named("screen");

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Destination labelled by its user identifier.
pub fn dest(label: &str) -> Destination {
    Destination::new(SCREEN).with_user_identifier(label)
}

/// Inactive node for `label`.
pub fn node(label: &str) -> NavNode {
    NavNode::new(dest(label))
}

/// Active node for `label`.
pub fn active(label: &str) -> NavNode {
    NavNode::new_active(dest(label))
}

fn label(destination: &Destination) -> String {
    destination.user_identifier().unwrap_or("?").to_string()
}

// ============================================================================
// Scripted source
// ============================================================================

/// Navigation source whose tree is replaced wholesale by the test.
#[derive(Debug)]
pub struct ScriptedSource {
    root: Mutex<Option<NavNode>>,
    version: watch::Sender<u64>,
}

impl ScriptedSource {
    pub fn new(root: Option<NavNode>) -> Arc<Self> {
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            root: Mutex::new(root),
            version,
        })
    }

    /// Replace the tree and return the new version.
    pub fn set(&self, root: Option<NavNode>) -> u64 {
        *self.root.lock() = root;
        self.version.send_modify(|v| *v += 1);
        *self.version.borrow()
    }

    pub fn root(&self) -> Option<NavNode> {
        self.root.lock().clone()
    }
}

#[async_trait]
impl NavigationSource for ScriptedSource {
    async fn current_root(&self) -> Option<NavNode> {
        self.root()
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    async fn install_root(&self, destination: Destination, handler: HandlerRef) {
        let root = NavNode::new_active(destination);
        root.bind_handler(handler);
        self.set(Some(root));
    }
}

// ============================================================================
// Recording handler
// ============================================================================

/// Shared, ordered record of handler calls.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Entries containing `verb`, e.g. "push".
    pub fn calls(&self, verb: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.split(' ').nth(1) == Some(verb))
            .collect()
    }

    fn record(&self, entry: String) {
        self.0.lock().push(entry);
    }
}

/// How a handler treats its completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// Signal before returning.
    Immediately,
    /// Park the completion until the test releases it, if ever.
    Never,
    /// Drop the completion unsignalled.
    Drop,
}

/// Completions parked by a [`Finish::Never`] handler.
#[derive(Debug, Clone, Default)]
pub struct Parked(Arc<Mutex<Vec<Completion>>>);

impl Parked {
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Signal every parked completion. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let parked: Vec<_> = self.0.lock().drain(..).collect();
        let released = parked.len();
        parked.into_iter().for_each(Completion::complete);
        released
    }

    /// Yield until `count` completions are parked.
    pub async fn wait_for(&self, count: usize) {
        for _ in 0..1_000 {
            if self.len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} parked completions, found {}", self.len());
    }

    fn park(&self, completion: Completion) {
        self.0.lock().push(completion);
    }
}

/// Handler journaling `"<name> <verb> <args>"` for every call.
pub struct RecordingHandler {
    name: String,
    kind: TargetKind,
    journal: Journal,
    finish: Finish,
    bind_changes: bool,
    parked: Parked,
}

impl RecordingHandler {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            kind: SCREEN,
            journal: journal.clone(),
            finish: Finish::Immediately,
            bind_changes: true,
            parked: Parked::default(),
        }
    }

    pub fn finishing(mut self, finish: Finish) -> Self {
        self.finish = finish;
        self
    }

    /// `change` returns no bindings at all.
    pub fn without_change_bindings(mut self) -> Self {
        self.bind_changes = false;
        self
    }

    pub fn with_kind(mut self, kind: TargetKind) -> Self {
        self.kind = kind;
        self
    }

    /// Handle on the completions this handler parks.
    pub fn parked(&self) -> Parked {
        self.parked.clone()
    }

    pub fn into_ref(self) -> HandlerRef {
        Arc::new(self)
    }

    /// Handler created for a child; it finishes immediately.
    fn child(&self, destination: &Destination) -> HandlerRef {
        RecordingHandler::new(&label(destination), &self.journal).into_ref()
    }

    fn finish(&self, completion: Completion) {
        match self.finish {
            Finish::Immediately => completion.complete(),
            Finish::Never => self.parked.park(completion),
            Finish::Drop => drop(completion),
        }
    }
}

impl RouteHandler for RecordingHandler {
    fn target_kind(&self) -> TargetKind {
        self.kind
    }

    fn push(&self, destination: &Destination, completion: Completion) -> HandlerRef {
        self.journal
            .record(format!("{} push {}", self.name, label(destination)));
        self.finish(completion);
        self.child(destination)
    }

    fn pop(&self, destination: &Destination, completion: Completion) {
        self.journal
            .record(format!("{} pop {}", self.name, label(destination)));
        self.finish(completion);
    }

    fn change(
        &self,
        leaving: &[Destination],
        entering: &[Destination],
        completion: Completion,
    ) -> HandlerBindings {
        let names = |ds: &[Destination]| ds.iter().map(label).collect::<Vec<_>>().join(",");
        self.journal.record(format!(
            "{} change [{}] -> [{}]",
            self.name,
            names(leaving),
            names(entering)
        ));
        self.finish(completion);

        if !self.bind_changes {
            return HandlerBindings::new();
        }
        entering.iter().fold(HandlerBindings::new(), |bindings, d| {
            bindings.with(d.clone(), self.child(d))
        })
    }

    fn change_active_destination(&self, destination: &Destination, completion: Completion) {
        self.journal
            .record(format!("{} activate {}", self.name, label(destination)));
        self.finish(completion);
    }
}
