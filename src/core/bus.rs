//! # EventBus: the public face of the dispatcher.
//!
//! An [`EventBus`] is a cheap, cloneable handle. Clones share one registry,
//! one sticky store and one set of posters.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use eventvisor::{EventBus, Lineage, Subscriber, SubscriberMethod, ThreadMode};
//!
//! struct Deposit(u32);
//! impl Lineage for Deposit {}
//!
//! #[derive(Default)]
//! struct Ledger { total: AtomicU32 }
//!
//! impl Subscriber for Ledger {
//!     fn subscriber_methods() -> Vec<SubscriberMethod> {
//!         vec![SubscriberMethod::new("on_deposit", ThreadMode::Posting, |me: &Self, d: &Deposit| {
//!             me.total.fetch_add(d.0, Ordering::Relaxed);
//!             Ok(())
//!         })]
//!     }
//! }
//!
//! fn main() -> Result<(), eventvisor::EventBusError> {
//!     let bus = EventBus::new()?;
//!     let ledger = Arc::new(Ledger::default());
//!     bus.register(&ledger)?;
//!
//!     bus.post(Deposit(40))?;
//!     bus.post(Deposit(2))?;
//!     assert_eq!(ledger.total.load(Ordering::Relaxed), 42);
//!
//!     bus.unregister(&ledger)?;
//!     Ok(())
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use super::builder::{EventBusBuilder, RuntimeGuard};
use super::config::EventBusConfig;
use super::dispatcher::Dispatcher;
use crate::error::EventBusError;
use crate::events::{Event, EventRef, EventType, Lineage, hierarchy, same_event};
use crate::subscribers::{self, Subscriber};

/// In-process publish/subscribe event bus.
#[derive(Clone)]
pub struct EventBus {
    core: Arc<Dispatcher>,
    _runtime: Option<Arc<RuntimeGuard>>,
}

impl EventBus {
    /// Creates a builder for a bus with `cfg`.
    pub fn builder(cfg: EventBusConfig) -> EventBusBuilder {
        EventBusBuilder::new(cfg)
    }

    /// Creates a bus with the default configuration, no main thread and the default worker pool.
    pub fn new() -> Result<Self, EventBusError> {
        Self::builder(EventBusConfig::default()).build()
    }

    pub(crate) fn from_parts(core: Arc<Dispatcher>, runtime: Option<Arc<RuntimeGuard>>) -> Self {
        Self {
            core,
            _runtime: runtime,
        }
    }

    /// Configuration the bus was built with.
    pub fn config(&self) -> &EventBusConfig {
        self.core.config()
    }

    /// Registers every callback of `subscriber` with priority 0.
    ///
    /// # Errors
    /// - [`EventBusError::NoSubscriberMethods`] if the type declares no callbacks;
    /// - [`EventBusError::DuplicateSubscription`] if it is already registered
    ///   (nothing is registered in that case).
    pub fn register<S: Subscriber>(&self, subscriber: &Arc<S>) -> Result<(), EventBusError> {
        self.core.register(subscriber, 0, false)
    }

    /// Registers with an explicit priority; higher priorities receive events first.
    pub fn register_with_priority<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
        priority: i32,
    ) -> Result<(), EventBusError> {
        self.core.register(subscriber, priority, false)
    }

    /// Registers and immediately delivers matching sticky events to the new callbacks.
    ///
    /// Replayed deliveries follow the callbacks' thread modes and cannot be canceled.
    pub fn register_sticky<S: Subscriber>(&self, subscriber: &Arc<S>) -> Result<(), EventBusError> {
        self.core.register(subscriber, 0, true)
    }

    /// [`register_sticky`](Self::register_sticky) with an explicit priority.
    pub fn register_sticky_with_priority<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
        priority: i32,
    ) -> Result<(), EventBusError> {
        self.core.register(subscriber, priority, true)
    }

    /// Unregisters every callback of `subscriber`.
    ///
    /// Queued deliveries to it are dropped. Unknown subscribers produce the
    /// recoverable [`EventBusError::NotRegistered`] (also logged as a warning).
    pub fn unregister<S: ?Sized>(&self, subscriber: &Arc<S>) -> Result<(), EventBusError> {
        self.core.unregister(subscriber)
    }

    /// True while `subscriber` is registered.
    pub fn is_registered<S: ?Sized>(&self, subscriber: &Arc<S>) -> bool {
        self.core.is_registered(subscriber)
    }

    /// Posts `event` to every matching subscription.
    ///
    /// Returns after the posting-thread callbacks ran; queued deliveries happen later.
    ///
    /// # Errors
    /// [`EventBusError::SubscriberFailed`] from posting-thread callbacks when
    /// `throw_subscriber_exception` is set; [`EventBusError::Schedule`] when the
    /// main thread refuses work.
    pub fn post<E: Event>(&self, event: E) -> Result<(), EventBusError> {
        self.core.post(Arc::new(event))
    }

    /// Posts an already shared event.
    pub fn post_arc(&self, event: EventRef) -> Result<(), EventBusError> {
        self.core.post(event)
    }

    /// Stores `event` as the sticky event of its type, then posts it.
    pub fn post_sticky<E: Event>(&self, event: E) -> Result<(), EventBusError> {
        self.core.post_sticky(Arc::new(event))
    }

    /// [`post_sticky`](Self::post_sticky) for an already shared event.
    pub fn post_sticky_arc(&self, event: EventRef) -> Result<(), EventBusError> {
        self.core.post_sticky(event)
    }

    /// The most recent sticky event of type `T`.
    pub fn sticky_event<T: Lineage>(&self) -> Option<Arc<T>> {
        self.core
            .sticky_event(TypeId::of::<T>())
            .and_then(|e| e.into_any().downcast::<T>().ok())
    }

    /// Removes and returns the sticky event of type `T`.
    pub fn remove_sticky_event<T: Lineage>(&self) -> Option<Arc<T>> {
        self.core
            .remove_sticky_event(TypeId::of::<T>())
            .and_then(|e| e.into_any().downcast::<T>().ok())
    }

    /// Removes `event` if it is still the sticky event of its type.
    pub fn remove_sticky_event_ref(&self, event: &EventRef) -> bool {
        self.core.remove_sticky_event_ref(event)
    }

    /// Removes all sticky events.
    pub fn remove_all_sticky_events(&self) {
        self.core.remove_all_sticky_events();
    }

    /// True if posting an event of `event_type` would reach any subscription,
    /// counting subscriptions for its ancestors and interfaces.
    pub fn has_subscriber_for_event(&self, event_type: EventType) -> bool {
        self.core.has_subscriber_for_event(event_type)
    }

    /// Stops delivery of `event` to the remaining subscriptions.
    ///
    /// Only valid from a [`ThreadMode::Posting`](crate::ThreadMode::Posting)
    /// callback, for the event it is currently handling (the `&E` it received).
    ///
    /// # Errors
    /// [`EventBusError::InvalidCancellation`] outside of that contract.
    pub fn cancel_event_delivery<E: Event>(&self, event: &E) -> Result<(), EventBusError> {
        let addr = event as *const E;
        self.core.cancel_event_delivery(|current| {
            same_event(&**current, event)
                || current
                    .view(TypeId::of::<E>())
                    .is_some_and(|view| std::ptr::addr_eq(view as *const dyn Any, addr))
        })
    }

    /// [`cancel_event_delivery`](Self::cancel_event_delivery) for untyped callbacks.
    pub fn cancel_event_delivery_ref(&self, event: &EventRef) -> Result<(), EventBusError> {
        self.core
            .cancel_event_delivery(|current| same_event(&**current, &**event))
    }

    /// Clears the process-wide method discovery and event hierarchy caches.
    pub fn clear_caches() {
        subscribers::clear_cache();
        hierarchy::clear_cache();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", self.config())
            .field("owns_runtime", &self._runtime.is_some())
            .finish_non_exhaustive()
    }
}
