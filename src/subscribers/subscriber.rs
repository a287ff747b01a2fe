//! # Subscriber trait and subscriber methods.
//!
//! Provides [`Subscriber`], the registration-time adapter through which a type
//! declares its callbacks, and [`SubscriberMethod`], one declared callback.
//!
//! Each method binds:
//! - **Event type** the callback is matched under;
//! - **Thread mode** selecting which thread runs it (see [`ThreadMode`]);
//! - **Handler** a closure receiving the subscriber and the event.
//!
//! ## Rules
//! - Handlers report failures with `Err`; panics are caught and reported as
//!   [`SubscriberFailure::Panicked`].
//! - A typed handler (`SubscriberMethod::new::<S, E>`) receives the event viewed as `E`.
//!   An event that cannot be viewed as `E` is a subscriber failure.
//! - Untyped handlers (`SubscriberMethod::for_event_type`) receive the raw [`EventRef`];
//!   use them for marker interfaces.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use eventvisor::{Lineage, Subscriber, SubscriberMethod, ThreadMode};
//!
//! struct Tick;
//! impl Lineage for Tick {}
//!
//! #[derive(Default)]
//! struct Counter { ticks: AtomicU32 }
//!
//! impl Subscriber for Counter {
//!     fn subscriber_methods() -> Vec<SubscriberMethod> {
//!         vec![SubscriberMethod::new("on_tick", ThreadMode::Posting, |me: &Self, _: &Tick| {
//!             me.ticks.fetch_add(1, Ordering::Relaxed);
//!             Ok(())
//!         })]
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::Context;

use crate::error::SubscriberFailure;
use crate::events::{EventRef, EventType, Lineage};

/// Which thread runs a subscriber callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadMode {
    /// Invoked synchronously on the thread that called `post` (default).
    ///
    /// Only callbacks in this mode may cancel event delivery.
    #[default]
    Posting,
    /// Invoked on the main thread: synchronously when posting from it,
    /// otherwise queued and drained by the main thread's loop.
    Main,
    /// Invoked off the main thread: queued to the single background worker when
    /// posting from the main thread, otherwise synchronously.
    Background,
    /// Always handed to the worker pool; no ordering across events.
    Async,
}

impl ThreadMode {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ThreadMode::Posting => "posting",
            ThreadMode::Main => "main",
            ThreadMode::Background => "background",
            ThreadMode::Async => "async",
        }
    }
}

/// A type whose callbacks can be registered on an [`EventBus`](crate::EventBus).
pub trait Subscriber: Any + Send + Sync {
    /// Declares the callbacks of this subscriber type.
    ///
    /// Called once per type by the default method finder; the result is cached process-wide.
    fn subscriber_methods() -> Vec<SubscriberMethod>
    where
        Self: Sized;
}

type Handler = dyn Fn(&(dyn Any + Send + Sync), &EventRef) -> anyhow::Result<()> + Send + Sync;

/// One declared subscriber callback.
#[derive(Clone)]
pub struct SubscriberMethod {
    name: &'static str,
    declaring_type: &'static str,
    event_type: EventType,
    thread_mode: ThreadMode,
    handler: Arc<Handler>,
}

impl SubscriberMethod {
    /// Typed callback of subscriber `S` for events of type `E`.
    pub fn new<S, E, F>(name: &'static str, thread_mode: ThreadMode, handler: F) -> Self
    where
        S: Subscriber,
        E: Lineage,
        F: Fn(&S, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let erased = move |subscriber: &(dyn Any + Send + Sync), event: &EventRef| {
            let subscriber = downcast_subscriber::<S>(subscriber)?;
            let typed = event
                .view(TypeId::of::<E>())
                .and_then(|any| any.downcast_ref::<E>())
                .with_context(|| {
                    format!(
                        "event {} cannot be viewed as {}",
                        event.event_type().name(),
                        std::any::type_name::<E>()
                    )
                })?;
            handler(subscriber, typed)
        };
        Self {
            name,
            declaring_type: std::any::type_name::<S>(),
            event_type: EventType::of::<E>(),
            thread_mode,
            handler: Arc::new(erased),
        }
    }

    /// Untyped callback of subscriber `S` registered under `event_type`.
    pub fn for_event_type<S, F>(
        name: &'static str,
        event_type: EventType,
        thread_mode: ThreadMode,
        handler: F,
    ) -> Self
    where
        S: Subscriber,
        F: Fn(&S, &EventRef) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let erased = move |subscriber: &(dyn Any + Send + Sync), event: &EventRef| {
            handler(downcast_subscriber::<S>(subscriber)?, event)
        };
        Self {
            name,
            declaring_type: std::any::type_name::<S>(),
            event_type,
            thread_mode,
            handler: Arc::new(erased),
        }
    }

    /// Callback name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the subscriber that declared this callback.
    #[inline]
    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    /// Event type the callback is matched under.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Thread mode of the callback.
    #[inline]
    pub fn thread_mode(&self) -> ThreadMode {
        self.thread_mode
    }

    /// Runs the handler, classifying returned errors and panics.
    pub(crate) fn call(
        &self,
        subscriber: &(dyn Any + Send + Sync),
        event: &EventRef,
    ) -> Result<(), SubscriberFailure> {
        match catch_unwind(AssertUnwindSafe(|| (self.handler)(subscriber, event))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(SubscriberFailure::Error(err)),
            Err(payload) => Err(SubscriberFailure::from_panic(payload)),
        }
    }

    /// Logical identity: declaring type, method name and event type name.
    pub(crate) fn same_method(&self, other: &SubscriberMethod) -> bool {
        self.declaring_type == other.declaring_type
            && self.name == other.name
            && self.event_type.name() == other.event_type.name()
    }
}

impl fmt::Debug for SubscriberMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}({}) [{}]",
            self.declaring_type,
            self.name,
            self.event_type.name(),
            self.thread_mode.as_label()
        )
    }
}

fn downcast_subscriber<S: Subscriber>(subscriber: &(dyn Any + Send + Sync)) -> anyhow::Result<&S> {
    subscriber
        .downcast_ref::<S>()
        .with_context(|| format!("subscriber is not a {}", std::any::type_name::<S>()))
}
