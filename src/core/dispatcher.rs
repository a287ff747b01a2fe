//! # Dispatcher: posting pipeline, routing and invocation.
//!
//! ```text
//! post(event)
//!   └─► PostingThreadState.queue ──(drained by the outermost post on this thread)──┐
//!                                                                                  ▼
//!   post_single_event ─► hierarchy::lookup_all_event_types (if event_inheritance)
//!        └─► for each type: post_for_type ─► registry snapshot (priority order)
//!                 └─► for each subscription: post_to_subscription
//!                        ├─ Posting    ─► invoke now
//!                        ├─ Main       ─► invoke now on the main thread, else MainThreadPoster
//!                        ├─ Background ─► BackgroundPoster from the main thread, else invoke now
//!                        └─ Async      ─► AsyncPoster
//! ```
//!
//! ## Rules
//! - Nested posts from a callback are queued behind the current event (breadth-first).
//! - Cancellation only stops the remaining subscriptions of the current event on
//!   the posting thread, and only from a `Posting` callback.
//! - A failure while handling a [`SubscriberExceptionEvent`] is logged, never republished.
//! - [`NoSubscriberEvent`] and [`SubscriberExceptionEvent`] never produce a [`NoSubscriberEvent`].

use std::any::TypeId;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, warn};

use super::config::EventBusConfig;
use super::posting::{self, PostingThreadState};
use super::registry::Registry;
use super::sticky::StickyStore;
use crate::error::{EventBusError, SubscriberFailure};
use crate::events::{
    EventRef, EventType, NoSubscriberEvent, SubscriberExceptionEvent, hierarchy,
};
use crate::exec::{Executor, MainThread};
use crate::posters::{AsyncPoster, BackgroundPoster, Invoker, MainThreadPoster, PendingPost};
use crate::subscribers::{
    CachedFinder, Subscriber, SubscriberClass, SubscriberHandle, SubscriberId, Subscription,
    ThreadMode,
};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct Dispatcher {
    id: u64,
    /// Dropped with the bus; threads prune their posting state once it is gone.
    alive: Arc<()>,
    cfg: EventBusConfig,
    registry: Registry,
    sticky: StickyStore,
    finder: CachedFinder,
    main_thread: Option<Arc<dyn MainThread>>,
    main_poster: Option<Arc<MainThreadPoster>>,
    background: Arc<BackgroundPoster>,
    async_poster: Arc<AsyncPoster>,
}

/// Resets the posting flags when the outermost `post` returns or unwinds.
struct PostingGuard<'a>(&'a PostingThreadState);

impl Drop for PostingGuard<'_> {
    fn drop(&mut self) {
        self.0.set_posting(false);
        self.0.set_main_thread(false);
    }
}

impl Dispatcher {
    pub(crate) fn new(
        cfg: EventBusConfig,
        finder: CachedFinder,
        main_thread: Option<Arc<dyn MainThread>>,
        executor: Arc<dyn Executor>,
    ) -> Arc<Self> {
        let main_poster = main_thread
            .as_ref()
            .map(|main| Arc::new(MainThreadPoster::new(Arc::clone(main), cfg.main_thread_budget)));
        Arc::new(Self {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            alive: Arc::new(()),
            background: Arc::new(BackgroundPoster::new(
                Arc::clone(&executor),
                cfg.background_idle_timeout,
            )),
            async_poster: Arc::new(AsyncPoster::new(executor)),
            registry: Registry::new(),
            sticky: StickyStore::new(),
            finder,
            main_thread,
            main_poster,
            cfg,
        })
    }

    pub(crate) fn config(&self) -> &EventBusConfig {
        &self.cfg
    }

    pub(crate) fn is_main_thread(&self) -> bool {
        self.main_thread.as_ref().is_some_and(|m| m.is_main_thread())
    }

    fn posting_state(&self) -> Rc<PostingThreadState> {
        PostingThreadState::current(self.id, &self.alive)
    }

    // ---- registry ----

    pub(crate) fn register<S: Subscriber>(
        self: &Arc<Self>,
        subscriber: &Arc<S>,
        priority: i32,
        sticky: bool,
    ) -> Result<(), EventBusError> {
        let methods = self.finder.find(&SubscriberClass::of::<S>())?;
        let created = self
            .registry
            .register(&SubscriberHandle::new(subscriber), &methods, priority)?;

        if sticky {
            // Replay runs outside the posting loop: with no current step it cannot
            // cancel anything, including an outer delivery on this thread.
            let state = self.posting_state();
            let _step = state.suspend_step();
            let is_main = self.is_main_thread();
            for subscription in &created {
                let replay = self
                    .sticky
                    .matching(subscription.event_type(), self.cfg.event_inheritance);
                for event in replay {
                    self.post_to_subscription(subscription, event, is_main)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn unregister<S: ?Sized>(&self, subscriber: &Arc<S>) -> Result<(), EventBusError> {
        let name = std::any::type_name::<S>();
        self.registry
            .unregister(SubscriberId::of(subscriber), name)
            .inspect_err(|_| warn!(subscriber = name, "subscriber to unregister was not registered before"))
    }

    pub(crate) fn is_registered<S: ?Sized>(&self, subscriber: &Arc<S>) -> bool {
        self.registry.is_registered(SubscriberId::of(subscriber))
    }

    pub(crate) fn has_subscriber_for_event(&self, event_type: EventType) -> bool {
        hierarchy::lookup_all_event_types(event_type)
            .iter()
            .any(|ty| self.registry.has_subscriptions_for(*ty))
    }

    // ---- sticky ----

    pub(crate) fn post_sticky(self: &Arc<Self>, event: EventRef) -> Result<(), EventBusError> {
        self.sticky.put(EventRef::clone(&event));
        self.post(event)
    }

    pub(crate) fn sticky_event(&self, ty: TypeId) -> Option<EventRef> {
        self.sticky.get(ty)
    }

    pub(crate) fn remove_sticky_event(&self, ty: TypeId) -> Option<EventRef> {
        self.sticky.remove(ty)
    }

    pub(crate) fn remove_sticky_event_ref(&self, event: &EventRef) -> bool {
        self.sticky.remove_instance(event)
    }

    pub(crate) fn remove_all_sticky_events(&self) {
        self.sticky.clear();
    }

    // ---- posting ----

    pub(crate) fn post(self: &Arc<Self>, event: EventRef) -> Result<(), EventBusError> {
        let state = self.posting_state();
        state.push(event);
        if state.is_posting() {
            return Ok(());
        }

        state.set_main_thread(self.is_main_thread());
        state.set_posting(true);
        let _guard = PostingGuard(&state);

        if state.is_canceled() {
            error!("cancel flag was not reset after the previous delivery");
            state.set_canceled(false);
            state.clear_queue();
            return Err(EventBusError::Internal {
                reason: "cancel state was not reset",
            });
        }

        let mut first_err = None;
        while let Some(event) = state.pop() {
            if let Err(e) = self.post_single_event(&state, event) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn post_single_event(
        self: &Arc<Self>,
        state: &PostingThreadState,
        event: EventRef,
    ) -> Result<(), EventBusError> {
        let event_type = event.event_type();
        let found = if self.cfg.event_inheritance {
            let mut found = false;
            for ty in hierarchy::lookup_all_event_types(event_type).iter() {
                found |= self.post_for_type(state, &event, *ty)?;
            }
            found
        } else {
            self.post_for_type(state, &event, event_type)?
        };

        if !found {
            if self.cfg.log_no_subscriber_messages {
                debug!(event = event_type.name(), "no subscribers registered for event");
            }
            if self.cfg.send_no_subscriber_event
                && !event_type.is::<NoSubscriberEvent>()
                && !event_type.is::<SubscriberExceptionEvent>()
            {
                self.post(Arc::new(NoSubscriberEvent::new(event)))?;
            }
        }
        Ok(())
    }

    /// Returns whether `ty` had any subscriptions.
    fn post_for_type(
        self: &Arc<Self>,
        state: &PostingThreadState,
        event: &EventRef,
        ty: EventType,
    ) -> Result<bool, EventBusError> {
        let Some(subscriptions) = self.registry.subscriptions_for(ty) else {
            return Ok(false);
        };
        if subscriptions.is_empty() {
            return Ok(false);
        }

        for subscription in subscriptions.iter() {
            state.begin(event, subscription);
            let outcome =
                self.post_to_subscription(subscription, EventRef::clone(event), state.is_main_thread());
            let aborted = state.is_canceled();
            state.end();
            outcome?;
            if aborted {
                break;
            }
        }
        Ok(true)
    }

    fn post_to_subscription(
        self: &Arc<Self>,
        subscription: &Arc<Subscription>,
        event: EventRef,
        is_main: bool,
    ) -> Result<(), EventBusError> {
        match subscription.thread_mode() {
            ThreadMode::Posting => self.invoke(subscription, &event),
            ThreadMode::Main => match &self.main_poster {
                Some(poster) if !is_main => poster.enqueue(self, Arc::clone(subscription), event),
                _ => self.invoke(subscription, &event),
            },
            ThreadMode::Background => {
                if is_main {
                    self.background.enqueue(self, Arc::clone(subscription), event);
                    Ok(())
                } else {
                    self.invoke(subscription, &event)
                }
            }
            ThreadMode::Async => {
                self.async_poster.enqueue(self, Arc::clone(subscription), event);
                Ok(())
            }
        }
    }

    // ---- cancellation ----

    /// Cancels delivery of the current event if `is_current` recognises it.
    pub(crate) fn cancel_event_delivery(
        &self,
        is_current: impl FnOnce(&EventRef) -> bool,
    ) -> Result<(), EventBusError> {
        let state = self.posting_state();
        if !state.is_posting() {
            return Err(EventBusError::InvalidCancellation {
                reason: "only callbacks running on the posting thread may cancel delivery",
            });
        }
        if !state.current_event().is_some_and(|current| is_current(&current)) {
            return Err(EventBusError::InvalidCancellation {
                reason: "only the event currently being delivered may be canceled",
            });
        }
        let posting_mode = state
            .current_subscription()
            .is_some_and(|s| s.thread_mode() == ThreadMode::Posting);
        if !posting_mode {
            return Err(EventBusError::InvalidCancellation {
                reason: "only ThreadMode::Posting callbacks may cancel delivery",
            });
        }
        state.set_canceled(true);
        Ok(())
    }

    // ---- invocation ----

    fn invoke(
        self: &Arc<Self>,
        subscription: &Arc<Subscription>,
        event: &EventRef,
    ) -> Result<(), EventBusError> {
        if !subscription.is_active() {
            return Ok(());
        }
        // Dropped without unregistering: nothing left to call.
        let Some(instance) = subscription.subscriber() else {
            return Ok(());
        };
        match subscription.method().call(&*instance, event) {
            Ok(()) => Ok(()),
            Err(failure) => self.handle_subscriber_exception(subscription, event, instance, failure),
        }
    }

    fn handle_subscriber_exception(
        self: &Arc<Self>,
        subscription: &Subscription,
        event: &EventRef,
        instance: Arc<dyn std::any::Any + Send + Sync>,
        failure: SubscriberFailure,
    ) -> Result<(), EventBusError> {
        let cause = Arc::new(failure);

        if let Some(report) = event.as_any().downcast_ref::<SubscriberExceptionEvent>() {
            if self.cfg.log_subscriber_exceptions {
                error!(
                    subscriber = subscription.subscriber_name(),
                    error = %cause,
                    original_event = report.causing_event.event_type().name(),
                    original_subscriber = report.subscriber_name,
                    original_error = %report.cause,
                    "subscriber failed while handling a subscriber exception event"
                );
            }
            return Ok(());
        }

        if self.cfg.throw_subscriber_exception {
            return Err(EventBusError::SubscriberFailed {
                subscriber: subscription.subscriber_name(),
                event_type: event.event_type().name(),
                cause,
            });
        }
        if self.cfg.log_subscriber_exceptions {
            error!(
                subscriber = subscription.subscriber_name(),
                method = subscription.method().name(),
                event = event.event_type().name(),
                kind = cause.as_label(),
                error = %cause,
                "could not dispatch event to subscriber"
            );
        }
        if self.cfg.send_subscriber_exception_event {
            self.post(Arc::new(SubscriberExceptionEvent {
                cause,
                causing_event: EventRef::clone(event),
                causing_subscriber: Some(instance),
                subscriber_name: subscription.subscriber_name(),
            }))?;
        }
        Ok(())
    }
}

impl Invoker for Dispatcher {
    fn invoke_pending(self: &Arc<Self>, post: Box<PendingPost>) {
        let Some((subscription, event)) = post.release() else {
            error!("pending post carried no delivery");
            return;
        };
        if let Err(e) = self.invoke(&subscription, &event) {
            error!(
                error = %e,
                label = e.as_label(),
                mode = subscription.thread_mode().as_label(),
                "queued delivery failed"
            );
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        posting::forget(self.id);
    }
}
