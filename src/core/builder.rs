use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};

use super::bus::EventBus;
use super::config::EventBusConfig;
use super::dispatcher::Dispatcher;
use crate::error::EventBusError;
use crate::exec::{Executor, MainThread, TokioExecutor};
use crate::subscribers::{CachedFinder, MethodFinder};

/// Builder for constructing an [`EventBus`] with optional collaborators.
pub struct EventBusBuilder {
    cfg: EventBusConfig,
    main_thread: Option<Arc<dyn MainThread>>,
    executor: Option<Arc<dyn Executor>>,
    runtime: Option<Handle>,
    finder: Option<Arc<dyn MethodFinder>>,
}

impl EventBusBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EventBusConfig) -> Self {
        Self {
            cfg,
            main_thread: None,
            executor: None,
            runtime: None,
            finder: None,
        }
    }

    /// Sets the designated thread for [`ThreadMode::Main`](crate::ThreadMode::Main) delivery.
    ///
    /// Without one, main-thread callbacks run on the posting thread.
    pub fn with_main_thread(mut self, main_thread: Arc<dyn MainThread>) -> Self {
        self.main_thread = Some(main_thread);
        self
    }

    /// Sets the worker pool for background and async delivery.
    ///
    /// Takes precedence over [`with_runtime`](Self::with_runtime).
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Runs background and async deliveries on the blocking pool of `handle`.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Replaces the default [`DeclaredMethodFinder`](crate::DeclaredMethodFinder) for this bus.
    ///
    /// Its results are cached separately from other buses' finders.
    pub fn with_method_finder(mut self, finder: Arc<dyn MethodFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    /// Builds the bus.
    ///
    /// Without an executor or runtime handle, the ambient tokio runtime is used;
    /// outside of one, the bus starts and owns a small runtime of its own.
    pub fn build(self) -> Result<EventBus, EventBusError> {
        let mut owned = None;
        let executor: Arc<dyn Executor> = match (self.executor, self.runtime) {
            (Some(executor), _) => executor,
            (None, Some(handle)) => Arc::new(TokioExecutor::new(handle)),
            (None, None) => match Handle::try_current() {
                Ok(handle) => Arc::new(TokioExecutor::new(handle)),
                Err(_) => {
                    let rt = Builder::new_multi_thread()
                        .worker_threads(1)
                        .thread_name("eventvisor-worker")
                        .build()
                        .map_err(EventBusError::Runtime)?;
                    let handle = rt.handle().clone();
                    owned = Some(Arc::new(RuntimeGuard(Some(rt))));
                    Arc::new(TokioExecutor::new(handle))
                }
            },
        };

        let finder = self
            .finder
            .map_or_else(CachedFinder::declared, CachedFinder::custom);
        let core = Dispatcher::new(self.cfg, finder, self.main_thread, executor);
        Ok(EventBus::from_parts(core, owned))
    }
}

/// Runtime owned by a bus; shut down without blocking when the last clone goes.
pub(crate) struct RuntimeGuard(Option<Runtime>);

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        if let Some(rt) = self.0.take() {
            rt.shutdown_background();
        }
    }
}
