//! Events: typing, hierarchy resolution and built-in event types.
//!
//! This module groups the event **data model** used by the bus:
//!
//! ## Contents
//! - [`Event`], [`Lineage`], [`EventType`], [`EventRef`] event typing and identity
//! - [`hierarchy`] process-wide resolver of the types an event is matched under
//! - [`NoSubscriberEvent`], [`SubscriberExceptionEvent`] events posted by the bus itself
//! - [`FailureEvent`] generic failure carrier for applications
//!
//! ## Quick reference
//! - **Producers**: application code via `EventBus::post`; the dispatcher for the built-in events.
//! - **Consumers**: subscriptions whose event type is the concrete type or, with
//!   `event_inheritance`, any type returned by [`hierarchy::lookup_all_event_types`].

mod builtin;
mod event;
pub mod hierarchy;

pub use builtin::{FailureEvent, NoSubscriberEvent, SubscriberExceptionEvent};
pub(crate) use event::same_event;
pub use event::{Event, EventRef, EventType, Lineage};
