//! # Async poster.
//!
//! Every [`ThreadMode::Async`](crate::ThreadMode::Async) post becomes its own
//! executor job. Jobs take the queue head, so no ordering holds across posts.

use std::sync::Arc;

use tracing::error;

use super::{Invoker, PendingPost, PendingPostQueue};
use crate::events::EventRef;
use crate::exec::Executor;
use crate::subscribers::Subscription;

pub(crate) struct AsyncPoster {
    queue: PendingPostQueue,
    executor: Arc<dyn Executor>,
}

impl AsyncPoster {
    pub(crate) fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            queue: PendingPostQueue::new(),
            executor,
        }
    }

    pub(crate) fn enqueue<I: Invoker>(
        self: &Arc<Self>,
        invoker: &Arc<I>,
        subscription: Arc<Subscription>,
        event: EventRef,
    ) {
        self.queue.enqueue(PendingPost::obtain(subscription, event));
        let poster = Arc::clone(self);
        let invoker = Arc::clone(invoker);
        self.executor.execute(Box::new(move || match poster.queue.poll() {
            Some(post) => invoker.invoke_pending(post),
            None => error!("async poster found no pending post"),
        }));
    }
}
