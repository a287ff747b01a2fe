#![allow(dead_code)]

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use eventvisor::{Executor, Job, MainLoop};

/// Polls `cond` until it holds or five seconds pass.
pub fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Ordered record of deliveries shared by test subscribers.
#[derive(Default, Clone)]
pub struct Journal {
    entries: Arc<Mutex<Vec<(String, ThreadId)>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .push((entry.into(), thread::current().id()));
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.entries.lock().iter().map(|(_, t)| *t).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|(e, _)| e == entry).count()
    }
}

/// Executor that holds jobs until the test runs them.
#[derive(Default)]
pub struct ManualExecutor {
    jobs: Mutex<Vec<Job>>,
}

impl ManualExecutor {
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Runs queued jobs (and jobs they queue) on the calling thread.
    pub fn run_all(&self) {
        loop {
            let jobs: Vec<Job> = std::mem::take(&mut *self.jobs.lock());
            if jobs.is_empty() {
                return;
            }
            for job in jobs {
                job();
            }
        }
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        self.jobs.lock().push(job);
    }
}

/// Blocks the main loop until the returned sender is dropped or used.
pub fn block_main_loop(main: &MainLoop) -> mpsc::Sender<()> {
    let (tx, rx) = mpsc::channel::<()>();
    main.run_on(move || {
        let _ = rx.recv();
    })
    .expect("main loop accepts work");
    tx
}

/// Waits until every job scheduled on `main` so far has run.
pub fn flush_main_loop(main: &MainLoop) {
    let (tx, rx) = mpsc::channel::<()>();
    main.run_on(move || {
        let _ = tx.send(());
    })
    .expect("main loop accepts work");
    rx.recv_timeout(Duration::from_secs(5)).expect("main loop drained");
}

/// Runs `f` on the main loop and returns its result.
pub fn on_main<T: Send + 'static>(main: &MainLoop, f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = mpsc::channel();
    main.run_on(move || {
        let _ = tx.send(f());
    })
    .expect("main loop accepts work");
    rx.recv_timeout(Duration::from_secs(5)).expect("job ran on main loop")
}
