//! # eventvisor
//!
//! **Eventvisor** is an in-process publish/subscribe event bus for Rust.
//!
//! Callers *post* typed events; registered *subscribers* declare callbacks
//! tagged with an event type, a priority and a [`ThreadMode`], and the bus
//! matches and invokes them on the right thread.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   register(&Arc<S>) ──► MethodFinder (cached per type) ──► Registry
//!                                                           (event type ─► subscriptions by priority)
//!
//!   post(event) ──► PostingThreadState (per thread, per bus)
//!                     └─► hierarchy::lookup_all_event_types   (if event_inheritance)
//!                           └─► Registry snapshot
//!                                 └─► route by ThreadMode
//! ┌──────────────────┬─────────────────────────┬──────────────────────────┬──────────────────────┐
//! │ Posting          │ Main                    │ Background               │ Async                │
//! │ invoke now       │ now if on main thread,  │ BackgroundPoster if on   │ AsyncPoster          │
//! │                  │ else MainThreadPoster   │ main thread, else now    │ (one job per post)   │
//! └──────────────────┴────────────┬────────────┴─────────────┬────────────┴──────────┬───────────┘
//!                                 ▼                          ▼                       ▼
//!                        MainThread::schedule        Executor::execute        Executor::execute
//!                        (time-sliced drain)         (single worker)          (worker pool)
//! ```
//!
//! ### Delivery of one event
//! ```text
//! post(e)
//!   ├─► queue e on this thread; return if this thread is already posting (breadth-first)
//!   └─► while let Some(e) = queue.pop():
//!         for ty in [type of e, its interfaces, its parent, ...]:
//!           for sub in subscriptions(ty) (highest priority first):
//!             ├─ deliver (see table above)
//!             ├─ callback Err/panic ─► log / return (throw mode) / post SubscriberExceptionEvent
//!             └─ cancel_event_delivery(e) called? ─► skip remaining subscriptions
//!         no subscription at all ─► post NoSubscriberEvent(e)
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                                    |
//! |-------------------|------------------------------------------------------------------|-------------------------------------------------------|
//! | **Bus**           | Register, post, sticky events, cancellation.                     | [`EventBus`], [`EventBusBuilder`]                     |
//! | **Events**        | Typed events with declared parents and interfaces.               | [`Lineage`], [`Event`], [`EventType`]                 |
//! | **Subscribers**   | Declare callbacks per type; pluggable discovery.                 | [`Subscriber`], [`SubscriberMethod`], [`MethodFinder`] |
//! | **Threads**       | Designated thread and worker pool seams.                         | [`MainThread`], [`MainLoop`], [`Executor`]            |
//! | **Errors**        | Typed errors for bus operations and callback failures.           | [`EventBusError`], [`SubscriberFailure`]              |
//! | **Configuration** | Failure reporting, hierarchy matching, poster timing.            | [`EventBusConfig`]                                    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{EventBus, EventBusConfig, Lineage, MainLoop, Subscriber, SubscriberMethod, ThreadMode};
//!
//! struct Progress(u8);
//! impl Lineage for Progress {}
//!
//! struct ProgressBar;
//!
//! impl Subscriber for ProgressBar {
//!     fn subscriber_methods() -> Vec<SubscriberMethod> {
//!         vec![SubscriberMethod::new("render", ThreadMode::Main, |_: &Self, p: &Progress| {
//!             println!("progress: {}%", p.0);
//!             Ok(())
//!         })]
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let main = MainLoop::spawn("ui")?;
//!     let bus = EventBus::builder(EventBusConfig::default())
//!         .with_main_thread(main.clone())
//!         .build()?;
//!
//!     let bar = Arc::new(ProgressBar);
//!     bus.register(&bar)?;
//!
//!     // Posted from this thread, rendered on the "ui" thread.
//!     bus.post(Progress(50))?;
//!     bus.post_sticky(Progress(100))?;
//!
//!     main.shutdown();
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod exec;
mod posters;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{EventBus, EventBusBuilder, EventBusConfig};
pub use error::{EventBusError, SubscriberFailure};
pub use events::hierarchy;
pub use events::{
    Event, EventRef, EventType, FailureEvent, Lineage, NoSubscriberEvent, SubscriberExceptionEvent,
};
pub use exec::{Executor, Job, MainLoop, MainThread, ScheduleError, TokioExecutor};
pub use subscribers::{
    DeclaredMethodFinder, MethodFinder, Subscriber, SubscriberClass, SubscriberId,
    SubscriberMethod, ThreadMode,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
