//! # Designated ("main") thread.
//!
//! [`MainThread`] is the seam through which the bus reaches a host's event
//! loop: it answers "am I on it?" and accepts jobs to run there later.
//!
//! [`MainLoop`] is a ready-made implementation for hosts without a UI loop:
//! a dedicated OS thread running a current-thread tokio runtime.
//!
//! ```text
//! schedule(job) ──► mpsc (unbounded) ──► [main-loop thread]
//!                                          select! {
//!                                            token.cancelled() ─► exit
//!                                            rx.recv()         ─► job()
//!                                          }
//! ```
//!
//! ## Rules
//! - Jobs run one at a time in submission order.
//! - After [`MainLoop::shutdown`], scheduling fails with [`ScheduleError::Closed`];
//!   queued jobs that did not start are dropped.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Job;

/// Scheduling refusal by a [`MainThread`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// The loop has stopped accepting work.
    #[error("main thread loop is closed")]
    Closed,
}

/// Host event loop the bus can schedule work onto.
pub trait MainThread: Send + Sync + 'static {
    /// Returns true when called on the designated thread.
    fn is_main_thread(&self) -> bool;

    /// Schedules `job` to run once, later, on the designated thread (FIFO).
    ///
    /// Must not run `job` before returning.
    fn schedule(&self, job: Job) -> Result<(), ScheduleError>;
}

/// Dedicated designated thread backed by a current-thread tokio runtime.
pub struct MainLoop {
    thread_id: ThreadId,
    tx: mpsc::UnboundedSender<Job>,
    token: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl MainLoop {
    /// Spawns the loop thread under `name`.
    pub fn spawn(name: &str) -> io::Result<Arc<Self>> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let token = CancellationToken::new();

        let loop_token = token.clone();
        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            rt.block_on(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = loop_token.cancelled() => break,
                        job = rx.recv() => match job {
                            Some(job) => job(),
                            None => break,
                        },
                    }
                }
            });
            debug!("main loop stopped");
        })?;

        Ok(Arc::new(Self {
            thread_id: join.thread().id(),
            tx,
            token,
            join: Mutex::new(Some(join)),
        }))
    }

    /// Runs `job` on the loop; convenience for hosts and tests.
    pub fn run_on(&self, job: impl FnOnce() + Send + 'static) -> Result<(), ScheduleError> {
        self.schedule(Box::new(job))
    }

    /// Stops the loop after the running job and joins the thread.
    ///
    /// Called from the loop thread itself, it only requests the stop.
    pub fn shutdown(&self) {
        self.token.cancel();
        if self.is_main_thread() {
            return;
        }
        if let Some(join) = self.join.lock().take() {
            let _ = join.join();
        }
    }

    /// True once shutdown was requested.
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl MainThread for MainLoop {
    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn schedule(&self, job: Job) -> Result<(), ScheduleError> {
        if self.token.is_cancelled() {
            return Err(ScheduleError::Closed);
        }
        self.tx.send(job).map_err(|_| ScheduleError::Closed)
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
