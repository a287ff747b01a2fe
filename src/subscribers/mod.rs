//! # Subscribers of the event bus.
//!
//! This module provides the [`Subscriber`] trait, the callback descriptors it
//! returns, method discovery and the registry's per-callback record.
//!
//! ## Architecture
//! ```text
//! register(&Arc<S>)
//!     │
//!     ├──► MethodFinder::find_methods(SubscriberClass::of::<S>())   (cached per type)
//!     │         └─► Vec<SubscriberMethod { event_type, thread_mode, handler }>
//!     │
//!     └──► one Subscription per method ──► Registry (ordered by priority)
//!                                              │
//!                              post(event) ────┴──► SubscriberMethod::call(&S, &event)
//! ```
//!
//! ## Implementing subscribers
//! ```no_run
//! use eventvisor::{Lineage, Subscriber, SubscriberMethod, ThreadMode};
//!
//! struct Saved { id: u64 }
//! impl Lineage for Saved {}
//!
//! struct Indexer;
//!
//! impl Subscriber for Indexer {
//!     fn subscriber_methods() -> Vec<SubscriberMethod> {
//!         vec![SubscriberMethod::new("reindex", ThreadMode::Background, |_: &Self, ev: &Saved| {
//!             println!("reindex {}", ev.id);
//!             Ok(())
//!         })]
//!     }
//! }
//! ```

mod finder;
#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscription;

pub(crate) use finder::CachedFinder;
pub use finder::{DeclaredMethodFinder, MethodFinder, SubscriberClass, clear_cache};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::{Subscriber, SubscriberMethod, ThreadMode};
pub(crate) use subscription::{SubscriberHandle, Subscription};
pub use subscription::SubscriberId;
