//! # Worker pool seam.
//!
//! The background and async posters hand blocking jobs to an [`Executor`].
//! The default [`TokioExecutor`] runs them on tokio's blocking thread pool,
//! which grows on demand and retires idle threads.

use tokio::runtime::Handle;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on threads other than the caller's.
///
/// Jobs may block (subscriber callbacks are synchronous).
pub trait Executor: Send + Sync + 'static {
    /// Submits `job`; it runs later on some worker thread.
    fn execute(&self, job: Job);
}

/// Executor backed by a tokio runtime's blocking pool.
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Creates an executor spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // The JoinHandle is dropped: completion is observed through the bus, not the pool.
        drop(self.handle.spawn_blocking(job));
    }
}
