//! # Posters: queued delivery off the posting thread.
//!
//! Each poster owns its own [`PendingPostQueue`] and its own "draining" flag;
//! none of them shares a lock with the registry or with another poster.
//!
//! ```text
//!                         ┌──────────────────────┐  schedule(drain)   ┌──────────────┐
//!  ThreadMode::Main ─────►│  MainThreadPoster    │───────────────────►│ MainThread   │
//!                         └──────────────────────┘                    └──────────────┘
//!                         ┌──────────────────────┐  execute(run)      ┌──────────────┐
//!  ThreadMode::Background►│  BackgroundPoster    │───────────────────►│ Executor     │ (one worker at a time)
//!                         └──────────────────────┘                    │              │
//!                         ┌──────────────────────┐  execute(one)      │              │
//!  ThreadMode::Async ────►│  AsyncPoster         │───────────────────►│              │ (one job per post)
//!                         └──────────────────────┘                    └──────────────┘
//! ```
//!
//! ## Rules
//! - Consumers hand each post to [`Invoker::invoke_pending`], which drops it when
//!   the subscription was deactivated after enqueueing.
//! - Failures on these threads never reach the poster; the invoker logs them.

mod async_poster;
mod background;
mod main_thread;
mod pending;

use std::sync::Arc;

pub(crate) use async_poster::AsyncPoster;
pub(crate) use background::BackgroundPoster;
pub(crate) use main_thread::MainThreadPoster;
pub(crate) use pending::{PendingPost, PendingPostQueue};

/// Delivers a dequeued post (implemented by the dispatcher).
pub(crate) trait Invoker: Send + Sync + 'static {
    /// Releases `post` and invokes its subscription if it is still active.
    fn invoke_pending(self: &Arc<Self>, post: Box<PendingPost>);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{Invoker, PendingPost};
    use crate::events::Lineage;
    use crate::subscribers::{
        Subscriber, SubscriberHandle, SubscriberMethod, Subscription, ThreadMode,
    };

    pub(crate) struct Job(pub u32);
    impl Lineage for Job {}

    pub(crate) struct Worker;
    impl Subscriber for Worker {
        fn subscriber_methods() -> Vec<SubscriberMethod> {
            vec![SubscriberMethod::new("on_job", ThreadMode::Async, |_: &Self, _: &Job| Ok(()))]
        }
    }

    pub(crate) fn subscription(worker: &Arc<Worker>) -> Arc<Subscription> {
        Arc::new(Subscription::new(
            SubscriberHandle::new(worker),
            Worker::subscriber_methods()[0].clone(),
            0,
        ))
    }

    /// Records delivered job ids and the thread they ran on.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) seen: Mutex<Vec<(u32, std::thread::ThreadId)>>,
    }

    impl Invoker for Recorder {
        fn invoke_pending(self: &Arc<Self>, post: Box<PendingPost>) {
            if let Some((subscription, event)) = post.release() {
                if !subscription.is_active() {
                    return;
                }
                if let Some(job) = event.as_any().downcast_ref::<Job>() {
                    self.seen.lock().push((job.0, std::thread::current().id()));
                }
            }
        }
    }

    impl Recorder {
        pub(crate) fn ids(&self) -> Vec<u32> {
            self.seen.lock().iter().map(|(id, _)| *id).collect()
        }
    }

    /// Polls `cond` until it holds or five seconds pass.
    pub(crate) fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        cond()
    }
}
