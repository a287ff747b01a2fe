//! # Pending posts and the blocking queue that carries them.
//!
//! A [`PendingPost`] pairs one subscription with one event while it waits for a
//! poster to deliver it. Boxes are recycled through a bounded process-wide
//! free-list so bursts of queued deliveries do not churn the allocator.
//!
//! ## Rules
//! - The pool never holds more than [`MAX_POOL_SIZE`] boxes; extras are freed.
//! - Released boxes have their fields cleared: the pool keeps no event or
//!   subscriber alive.
//! - [`PendingPostQueue`] is FIFO; `enqueue` wakes every waiting consumer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, const_mutex};

use crate::events::EventRef;
use crate::subscribers::Subscription;

/// Upper bound of the free-list.
pub(crate) const MAX_POOL_SIZE: usize = 10_000;

static POOL: Mutex<Vec<Box<PendingPost>>> = const_mutex(Vec::new());

/// One delivery waiting in a poster queue.
#[derive(Default)]
pub(crate) struct PendingPost {
    event: Option<EventRef>,
    subscription: Option<Arc<Subscription>>,
}

impl PendingPost {
    /// Takes a box from the pool (or allocates one) and fills it.
    pub(crate) fn obtain(subscription: Arc<Subscription>, event: EventRef) -> Box<Self> {
        let mut post = POOL.lock().pop().unwrap_or_default();
        post.event = Some(event);
        post.subscription = Some(subscription);
        post
    }

    /// Empties the box, returns it to the pool and hands back its contents.
    ///
    /// `None` means the box was already empty, which is a bookkeeping bug.
    pub(crate) fn release(mut self: Box<Self>) -> Option<(Arc<Subscription>, EventRef)> {
        let contents = match (self.subscription.take(), self.event.take()) {
            (Some(subscription), Some(event)) => Some((subscription, event)),
            _ => None,
        };
        let mut pool = POOL.lock();
        if pool.len() < MAX_POOL_SIZE {
            pool.push(self);
        }
        contents
    }
}

/// Blocking FIFO of pending posts.
#[derive(Default)]
pub(crate) struct PendingPostQueue {
    items: Mutex<VecDeque<Box<PendingPost>>>,
    available: Condvar,
}

impl PendingPostQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends `post` and wakes waiting consumers.
    pub(crate) fn enqueue(&self, post: Box<PendingPost>) {
        self.items.lock().push_back(post);
        self.available.notify_all();
    }

    /// Takes the head without waiting.
    pub(crate) fn poll(&self) -> Option<Box<PendingPost>> {
        self.items.lock().pop_front()
    }

    /// Takes the head, waiting up to `timeout` once if the queue is empty.
    pub(crate) fn poll_timeout(&self, timeout: Duration) -> Option<Box<PendingPost>> {
        let mut items = self.items.lock();
        if items.is_empty() {
            let _ = self.available.wait_for(&mut items, timeout);
        }
        items.pop_front()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }
}

#[cfg(test)]
pub(crate) fn pool_len() -> usize {
    POOL.lock().len()
}
