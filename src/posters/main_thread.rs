//! # Main-thread poster.
//!
//! Queues deliveries for [`ThreadMode::Main`](crate::ThreadMode::Main) posted
//! from other threads and drains them on the designated thread in
//! time-sliced batches.
//!
//! ## Rules
//! - A drain is scheduled only when `active` flips from false to true.
//! - A delivery is queued only once a drain is scheduled; a refused schedule
//!   queues nothing.
//! - A drain that finds the queue empty re-checks under the `active` lock
//!   before clearing the flag, so a concurrent enqueue is never stranded.
//! - A drain that exceeds its budget schedules a follow-up drain and returns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::error;

use super::{Invoker, PendingPost, PendingPostQueue};
use crate::error::EventBusError;
use crate::events::EventRef;
use crate::exec::{MainThread, ScheduleError};
use crate::subscribers::Subscription;

pub(crate) struct MainThreadPoster {
    queue: PendingPostQueue,
    active: Mutex<bool>,
    budget: Duration,
    main: Arc<dyn MainThread>,
}

impl MainThreadPoster {
    pub(crate) fn new(main: Arc<dyn MainThread>, budget: Duration) -> Self {
        Self {
            queue: PendingPostQueue::new(),
            active: Mutex::new(false),
            budget,
            main,
        }
    }

    /// Queues a delivery and makes sure a drain is scheduled.
    pub(crate) fn enqueue<I: Invoker>(
        self: &Arc<Self>,
        invoker: &Arc<I>,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) -> Result<(), EventBusError> {
        let mut active = self.active.lock();
        if !*active {
            // A drain that runs before the enqueue below re-checks under `active`.
            self.schedule_drain(invoker)?;
            *active = true;
        }
        self.queue.enqueue(PendingPost::obtain(subscription, event));
        Ok(())
    }

    fn schedule_drain<I: Invoker>(
        self: &Arc<Self>,
        invoker: &Arc<I>,
    ) -> Result<(), ScheduleError> {
        let poster = Arc::clone(self);
        let invoker = Arc::clone(invoker);
        self.main.schedule(Box::new(move || poster.drain(&invoker)))
    }

    /// Runs on the designated thread.
    fn drain<I: Invoker>(self: &Arc<Self>, invoker: &Arc<I>) {
        let started = Instant::now();
        loop {
            let post = match self.queue.poll() {
                Some(post) => post,
                None => {
                    let mut active = self.active.lock();
                    match self.queue.poll() {
                        Some(post) => post,
                        None => {
                            *active = false;
                            return;
                        }
                    }
                }
            };
            invoker.invoke_pending(post);

            if started.elapsed() >= self.budget {
                if let Err(e) = self.schedule_drain(invoker) {
                    let mut active = self.active.lock();
                    let mut dropped = 0usize;
                    while let Some(post) = self.queue.poll() {
                        drop(post.release());
                        dropped += 1;
                    }
                    *active = false;
                    error!(error = %e, dropped, "could not reschedule main thread drain");
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::exec::MainLoop;
    use crate::posters::testing::{Job, Recorder, Worker, subscription, wait_until};

    #[test]
    fn test_drains_in_order_on_main_thread() {
        let main = MainLoop::spawn("poster-main").expect("spawn");
        let poster = Arc::new(MainThreadPoster::new(main.clone(), Duration::from_millis(10)));
        let recorder = Arc::new(Recorder::default());
        let worker = Arc::new(Worker);
        let sub = subscription(&worker);

        for i in 0..50 {
            poster
                .enqueue(&recorder, Arc::clone(&sub), Arc::new(Job(i)))
                .expect("scheduled");
        }

        assert!(wait_until(|| recorder.seen.lock().len() == 50));
        assert_eq!(recorder.ids(), (0..50).collect::<Vec<_>>());
        let main_id = recorder.seen.lock()[0].1;
        assert_ne!(main_id, std::thread::current().id());
        main.shutdown();
    }

    #[test]
    fn test_zero_budget_still_delivers_everything() {
        let main = MainLoop::spawn("poster-main-zero").expect("spawn");
        let poster = Arc::new(MainThreadPoster::new(main.clone(), Duration::ZERO));
        let recorder = Arc::new(Recorder::default());
        let worker = Arc::new(Worker);
        let sub = subscription(&worker);

        for i in 0..20 {
            poster
                .enqueue(&recorder, Arc::clone(&sub), Arc::new(Job(i)))
                .expect("scheduled");
        }

        assert!(wait_until(|| recorder.seen.lock().len() == 20));
        assert_eq!(recorder.ids(), (0..20).collect::<Vec<_>>());
        assert!(wait_until(|| !*poster.active.lock()));
        main.shutdown();
    }

    #[test]
    fn test_closed_main_thread_is_reported() {
        let main = MainLoop::spawn("poster-main-closed").expect("spawn");
        main.shutdown();
        let poster = Arc::new(MainThreadPoster::new(main, Duration::from_millis(10)));
        let recorder = Arc::new(Recorder::default());
        let worker = Arc::new(Worker);

        let job: EventRef = Arc::new(Job(1));

        for _ in 0..3 {
            let err = poster
                .enqueue(&recorder, subscription(&worker), Arc::clone(&job))
                .expect_err("loop is closed");
            assert_eq!(err.as_label(), "bus_schedule_failed");
        }
        assert!(!*poster.active.lock());
        assert_eq!(poster.queue.len(), 0);
        assert_eq!(Arc::strong_count(&job), 1);
    }

    /// Refuses work until `open` is set.
    #[derive(Default)]
    struct Gate {
        open: AtomicBool,
        jobs: Mutex<Vec<crate::exec::Job>>,
    }

    impl MainThread for Gate {
        fn is_main_thread(&self) -> bool {
            false
        }

        fn schedule(&self, job: crate::exec::Job) -> Result<(), ScheduleError> {
            if !self.open.load(Ordering::SeqCst) {
                return Err(ScheduleError::Closed);
            }
            self.jobs.lock().push(job);
            Ok(())
        }
    }

    #[test]
    fn test_refused_delivery_is_not_delivered_later() {
        let gate = Arc::new(Gate::default());
        let poster = Arc::new(MainThreadPoster::new(gate.clone(), Duration::from_secs(1)));
        let recorder = Arc::new(Recorder::default());
        let worker = Arc::new(Worker);
        let sub = subscription(&worker);

        assert!(poster.enqueue(&recorder, Arc::clone(&sub), Arc::new(Job(1))).is_err());

        gate.open.store(true, Ordering::SeqCst);
        poster
            .enqueue(&recorder, Arc::clone(&sub), Arc::new(Job(2)))
            .expect("scheduled");
        let jobs = std::mem::take(&mut *gate.jobs.lock());
        assert_eq!(jobs.len(), 1);
        for job in jobs {
            job();
        }
        assert_eq!(recorder.ids(), vec![2]);
        assert!(!*poster.active.lock());
    }
}
