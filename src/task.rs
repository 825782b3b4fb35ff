//! Background execution of long-running actions.
//!
//! An action that cannot finish synchronously starts one or more units of work through
//! [`crate::Context::spawn`] and returns [`crate::Status::InProgress`]. The dispatcher hands
//! each unit to its [`Executor`] and watches for the unit's completion.

use crate::dispatcher::Dispatcher;
use crate::level::PublicationLevel;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::trace;

/// Identifier of one unit of background work, unique per dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Work item handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Asynchronous execution facility supplied by the embedding application.
pub trait Executor: Send + Sync {
    /// Starts `job` without waiting for it. `name` is a human-readable label.
    fn execute(&self, name: String, job: Job) -> std::io::Result<()>;
}

/// Runs every job on its own named OS thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, name: String, job: Job) -> std::io::Result<()> {
        thread::Builder::new().name(name).spawn(job).map(|_| ())
    }
}

/// Queues jobs until [`QueuedExecutor::run_pending`] is called on the embedder's own
/// thread, e.g. once per tick of an event loop.
#[derive(Default)]
pub struct QueuedExecutor {
    pending: Mutex<Vec<(String, Job)>>,
}

impl QueuedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Names of the queued jobs, oldest first.
    pub fn pending_names(&self) -> Vec<String> {
        self.pending.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Runs every queued job on the calling thread and returns how many ran. Jobs queued
    /// while running are left for the next call.
    pub fn run_pending(&self) -> usize {
        let jobs = std::mem::take(&mut *self.pending.lock());
        let count = jobs.len();
        for (name, job) in jobs {
            trace!(job = %name, "running queued job");
            job();
        }
        count
    }
}

impl Executor for QueuedExecutor {
    fn execute(&self, name: String, job: Job) -> std::io::Result<()> {
        self.pending.lock().push((name, job));
        Ok(())
    }
}

/// Cooperative cancellation flag shared between the dispatcher and one unit of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle given to a running unit of work.
pub struct Worker {
    id: TaskId,
    token: CancelToken,
    dispatcher: Dispatcher,
}

impl Worker {
    pub(crate) fn new(id: TaskId, token: CancelToken, dispatcher: Dispatcher) -> Self {
        Self {
            id,
            token,
            dispatcher,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// True once the dispatcher that started this unit cancelled it. Long loops should
    /// check this regularly and return early.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Publishes intermediate output; dropped once the unit has been cancelled.
    pub fn publish(&self, level: PublicationLevel, message: impl AsRef<str>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.dispatcher.publish(level, message)
    }
}

/// Reports the unit as finished when dropped, even if the job panicked.
pub(crate) struct CompletionGuard {
    pub(crate) id: TaskId,
    pub(crate) dispatcher: Dispatcher,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.dispatcher.complete(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let copy = token.clone();
        assert!(!copy.is_cancelled());
        token.cancel();
        assert!(copy.is_cancelled());
    }

    #[test]
    fn test_thread_executor_runs_job() {
        let (tx, rx) = mpsc::channel();
        ThreadExecutor
            .execute(
                "test-job".to_string(),
                Box::new(move || {
                    let name = thread::current().name().map(str::to_string);
                    tx.send(name).unwrap();
                }),
            )
            .unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("test-job"));
    }

    #[test]
    fn test_queued_executor_defers_jobs() {
        let (tx, rx) = mpsc::channel();
        let executor = QueuedExecutor::new();
        for n in 0..3 {
            let tx = tx.clone();
            executor
                .execute(format!("job-{n}"), Box::new(move || tx.send(n).unwrap()))
                .unwrap();
        }

        assert!(rx.try_recv().is_err());
        assert_eq!(executor.pending_names(), ["job-0", "job-1", "job-2"]);
        assert_eq!(executor.run_pending(), 3);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(executor.pending(), 0);
    }
}
