//! UI executors
//!
//! Handler calls must run on whatever context owns the visual components,
//! which is rarely the router's own task. A [`UiExecutor`] hands each call to
//! that context.
//!
//! - [`InlineExecutor`]: run in place (tests, single-threaded hosts)
//! - [`TokioExecutor`]: spawn onto a Tokio runtime
//! - [`ChannelExecutor`] + [`UiJobQueue`]: queue jobs for a UI thread to drain

use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// A handler invocation packaged for the UI context.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run jobs on the UI context.
pub trait UiExecutor: Send + Sync {
    /// Schedule `job`. Dropping it without running counts as a broken
    /// executor and halts the router.
    fn execute(&self, job: UiJob);
}

/// Runs every job immediately on the calling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl UiExecutor for InlineExecutor {
    fn execute(&self, job: UiJob) {
        job();
    }
}

/// Spawns every job onto a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Executor spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl UiExecutor for TokioExecutor {
    fn execute(&self, job: UiJob) {
        self.handle.spawn(async move { job() });
    }
}

/// Sends jobs to a [`UiJobQueue`] owned by the UI thread.
#[derive(Debug, Clone)]
pub struct ChannelExecutor {
    jobs: mpsc::UnboundedSender<UiJob>,
}

impl ChannelExecutor {
    /// Create an executor and the queue its jobs land in.
    pub fn new() -> (Self, UiJobQueue) {
        let (jobs, pending) = mpsc::unbounded_channel();
        (Self { jobs }, UiJobQueue { pending })
    }
}

impl UiExecutor for ChannelExecutor {
    fn execute(&self, job: UiJob) {
        if self.jobs.send(job).is_err() {
            tracing::warn!("UI job queue closed; dropping handler invocation");
        }
    }
}

/// Receiving end of a [`ChannelExecutor`].
#[derive(Debug)]
pub struct UiJobQueue {
    pending: mpsc::UnboundedReceiver<UiJob>,
}

impl UiJobQueue {
    /// Run every job queued so far. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.pending.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs as they arrive until every executor is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.pending.recv().await {
            job();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_job(counter: &Arc<AtomicUsize>) -> UiJob {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_inline_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        InlineExecutor.execute(counting_job(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_defers_until_drained() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (executor, mut queue) = ChannelExecutor::new();
        executor.execute(counting_job(&counter));
        executor.execute(counting_job(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(queue.run_pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tokio_executor_spawns() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let executor = TokioExecutor::current().unwrap();
        let job_counter = Arc::clone(&counter);
        executor.execute(Box::new(move || {
            job_counter.fetch_add(1, Ordering::SeqCst);
            let _ = done_tx.send(());
        }));
        done_rx.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
