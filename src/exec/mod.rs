//! Threads the bus delivers on besides the posting thread.
//!
//! - [`Executor`]: worker pool for background and async deliveries ([`TokioExecutor`]).
//! - [`MainThread`]: the designated thread ([`MainLoop`] when the host has none).

mod main_thread;
mod pool;

pub use main_thread::{MainLoop, MainThread, ScheduleError};
pub use pool::{Executor, Job, TokioExecutor};
