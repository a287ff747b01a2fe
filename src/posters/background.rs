//! # Background poster.
//!
//! Delivers [`ThreadMode::Background`](crate::ThreadMode::Background) posts made
//! on the main thread through a single worker, in enqueue order.
//!
//! The worker is a job on the [`Executor`]. It waits up to `idle_timeout` for
//! more work and exits when none arrives; the next enqueue starts a new one.
//! Exit re-checks the queue under the `running` lock, so an enqueue that saw
//! `running == true` is always picked up.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Invoker, PendingPost, PendingPostQueue};
use crate::events::EventRef;
use crate::exec::Executor;
use crate::subscribers::Subscription;

pub(crate) struct BackgroundPoster {
    queue: PendingPostQueue,
    running: Mutex<bool>,
    idle_timeout: Duration,
    executor: Arc<dyn Executor>,
}

impl BackgroundPoster {
    pub(crate) fn new(executor: Arc<dyn Executor>, idle_timeout: Duration) -> Self {
        Self {
            queue: PendingPostQueue::new(),
            running: Mutex::new(false),
            idle_timeout,
            executor,
        }
    }

    pub(crate) fn enqueue<I: Invoker>(
        self: &Arc<Self>,
        invoker: &Arc<I>,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) {
        let post = PendingPost::obtain(subscription, event);
        let mut running = self.running.lock();
        self.queue.enqueue(post);
        if !*running {
            *running = true;
            let poster = Arc::clone(self);
            let invoker = Arc::clone(invoker);
            self.executor.execute(Box::new(move || poster.run(&invoker)));
        }
    }

    fn run<I: Invoker>(&self, invoker: &Arc<I>) {
        loop {
            let post = match self.queue.poll_timeout(self.idle_timeout) {
                Some(post) => post,
                None => {
                    let mut running = self.running.lock();
                    match self.queue.poll() {
                        Some(post) => post,
                        None => {
                            *running = false;
                            return;
                        }
                    }
                }
            };
            invoker.invoke_pending(post);
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        *self.running.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::TokioExecutor;
    use crate::posters::testing::{Job, Recorder, Worker, subscription, wait_until};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .expect("runtime")
    }

    #[test]
    fn test_single_worker_delivers_in_order() {
        let rt = runtime();
        let executor = Arc::new(TokioExecutor::new(rt.handle().clone()));
        let poster = Arc::new(BackgroundPoster::new(executor, Duration::from_secs(1)));
        let recorder = Arc::new(Recorder::default());
        let worker = Arc::new(Worker);
        let sub = subscription(&worker);

        for i in 0..100 {
            poster.enqueue(&recorder, Arc::clone(&sub), Arc::new(Job(i)));
        }

        assert!(wait_until(|| recorder.seen.lock().len() == 100));
        assert_eq!(recorder.ids(), (0..100).collect::<Vec<_>>());

        let seen = recorder.seen.lock();
        let first = seen[0].1;
        assert!(seen.iter().all(|(_, t)| *t == first));
        assert_ne!(first, std::thread::current().id());
    }

    #[test]
    fn test_idle_worker_exits_and_restarts() {
        let rt = runtime();
        let executor = Arc::new(TokioExecutor::new(rt.handle().clone()));
        let poster = Arc::new(BackgroundPoster::new(executor, Duration::from_millis(10)));
        let recorder = Arc::new(Recorder::default());
        let worker = Arc::new(Worker);
        let sub = subscription(&worker);

        poster.enqueue(&recorder, Arc::clone(&sub), Arc::new(Job(1)));
        assert!(wait_until(|| recorder.seen.lock().len() == 1));
        assert!(wait_until(|| !poster.is_running()));

        poster.enqueue(&recorder, sub, Arc::new(Job(2)));
        assert!(wait_until(|| recorder.seen.lock().len() == 2));
        assert_eq!(recorder.ids(), vec![1, 2]);
    }

    #[test]
    fn test_deactivated_subscription_is_dropped() {
        let rt = runtime();
        let executor = Arc::new(TokioExecutor::new(rt.handle().clone()));
        let poster = Arc::new(BackgroundPoster::new(executor, Duration::from_millis(10)));
        let recorder = Arc::new(Recorder::default());
        let worker = Arc::new(Worker);
        let live = subscription(&worker);
        let gone = subscription(&worker);
        gone.deactivate();

        poster.enqueue(&recorder, gone, Arc::new(Job(1)));
        poster.enqueue(&recorder, live, Arc::new(Job(2)));

        assert!(wait_until(|| recorder.seen.lock().len() == 1));
        assert!(wait_until(|| !poster.is_running()));
        assert_eq!(recorder.ids(), vec![2]);
    }
}
