//! # Subscription: one registered callback of one subscriber.
//!
//! The registry only holds a [`Weak`] reference to the subscriber; the
//! application owns its lifetime. A subscription is **active** from
//! registration until unregistration. Queued deliveries check the flag right
//! before invoking, so unregistering never has to scan the posters' queues.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::events::EventType;
use crate::subscribers::{SubscriberMethod, ThreadMode};

/// Identity of a subscriber instance (address of its `Arc` allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    /// Identity of the subscriber behind `subscriber`.
    pub fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }
}

/// Weak handle to a registered subscriber instance.
#[derive(Clone)]
pub(crate) struct SubscriberHandle {
    id: SubscriberId,
    name: &'static str,
    instance: Weak<dyn Any + Send + Sync>,
}

impl SubscriberHandle {
    pub(crate) fn new<S: Any + Send + Sync>(subscriber: &Arc<S>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = Arc::clone(subscriber) as _;
        Self {
            id: SubscriberId::of(subscriber),
            name: std::any::type_name::<S>(),
            instance: Arc::downgrade(&erased),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    #[inline]
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

/// Registry record binding a subscriber, one callback, an event type and a priority.
pub(crate) struct Subscription {
    subscriber: SubscriberHandle,
    method: SubscriberMethod,
    priority: i32,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(subscriber: SubscriberHandle, method: SubscriberMethod, priority: i32) -> Self {
        Self {
            subscriber,
            method,
            priority,
            active: AtomicBool::new(true),
        }
    }

    #[inline]
    pub(crate) fn subscriber_id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    #[inline]
    pub(crate) fn subscriber_name(&self) -> &'static str {
        self.subscriber.name()
    }

    /// Upgrades the subscriber; `None` once the application dropped it.
    #[inline]
    pub(crate) fn subscriber(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.subscriber.instance.upgrade()
    }

    /// True while the subscriber instance is still alive.
    #[inline]
    pub(crate) fn is_alive(&self) -> bool {
        self.subscriber.instance.strong_count() > 0
    }

    #[inline]
    pub(crate) fn method(&self) -> &SubscriberMethod {
        &self.method
    }

    #[inline]
    pub(crate) fn event_type(&self) -> EventType {
        self.method.event_type()
    }

    #[inline]
    pub(crate) fn thread_mode(&self) -> ThreadMode {
        self.method.thread_mode()
    }

    #[inline]
    pub(crate) fn priority(&self) -> i32 {
        self.priority
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.subscriber_id() == other.subscriber_id() && self.method.same_method(&other.method)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber_name())
            .field("method", &self.method)
            .field("priority", &self.priority)
            .field("active", &self.is_active())
            .finish()
    }
}
