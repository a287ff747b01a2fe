//! Bus core: configuration, registry and the posting pipeline.
//!
//! The only public API from this module is [`EventBus`] (with its
//! [`EventBusBuilder`] and [`EventBusConfig`]).
//!
//! Internal modules:
//! - [`dispatcher`]: posting pipeline, thread-mode routing, invocation and failure handling;
//! - [`registry`]: event type → subscriptions (priority ordered) and subscriber → event types;
//! - [`sticky`]: latest event per type for sticky registration;
//! - [`posting`]: per-thread posting state (queue, current event, cancel flag).

mod builder;
mod bus;
mod config;
mod dispatcher;
mod posting;
mod registry;
mod sticky;

pub use builder::EventBusBuilder;
pub use bus::EventBus;
pub use config::EventBusConfig;
