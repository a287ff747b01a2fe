//! # Events posted by the bus itself, plus a generic failure event for applications.
//!
//! - [`NoSubscriberEvent`]: an event was posted but no subscription matched it.
//! - [`SubscriberExceptionEvent`]: a subscriber callback failed.
//! - [`FailureEvent`]: application-level failure carrier (never posted by the bus).
//!
//! The bus never reports a missing subscriber for the first two types, and a
//! failure while handling a [`SubscriberExceptionEvent`] is only logged. Both
//! rules keep failure reporting from recursing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::SubscriberFailure;
use crate::events::{EventRef, Lineage};

/// Posted when an event had no matching subscription.
pub struct NoSubscriberEvent {
    /// The event nobody subscribed to.
    pub original_event: EventRef,
}

impl NoSubscriberEvent {
    pub(crate) fn new(original_event: EventRef) -> Self {
        Self { original_event }
    }
}

impl Lineage for NoSubscriberEvent {}

impl fmt::Debug for NoSubscriberEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoSubscriberEvent")
            .field("original_event", &self.original_event.event_type())
            .finish()
    }
}

/// Posted when a subscriber callback failed and republication is enabled.
pub struct SubscriberExceptionEvent {
    /// What went wrong.
    pub cause: Arc<SubscriberFailure>,
    /// The event whose delivery failed.
    pub causing_event: EventRef,
    /// The failing subscriber, if it is still alive.
    pub causing_subscriber: Option<Arc<dyn Any + Send + Sync>>,
    /// Type name of the failing subscriber.
    pub subscriber_name: &'static str,
}

impl Lineage for SubscriberExceptionEvent {}

impl fmt::Debug for SubscriberExceptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberExceptionEvent")
            .field("cause", &self.cause)
            .field("causing_event", &self.causing_event.event_type())
            .field("subscriber", &self.subscriber_name)
            .finish()
    }
}

/// Generic failure event applications can post to propagate errors.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    /// The failure being reported.
    pub error: Arc<anyhow::Error>,
    /// Tells receivers not to surface the failure to the user (e.g. no error dialog).
    pub suppress_error_ui: bool,
    execution_scope: Option<Arc<dyn Any + Send + Sync>>,
}

impl FailureEvent {
    /// Wraps `error`; error UI is not suppressed.
    pub fn new(error: anyhow::Error) -> Self {
        Self {
            error: Arc::new(error),
            suppress_error_ui: false,
            execution_scope: None,
        }
    }

    /// Marks the failure as silent.
    #[inline]
    pub fn suppressing_error_ui(mut self) -> Self {
        self.suppress_error_ui = true;
        self
    }

    /// Attaches the scope (screen, request, job...) the failure happened in.
    #[inline]
    pub fn with_execution_scope(mut self, scope: Arc<dyn Any + Send + Sync>) -> Self {
        self.execution_scope = Some(scope);
        self
    }

    /// The attached execution scope, if any.
    pub fn execution_scope(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.execution_scope.as_ref()
    }
}

impl Lineage for FailureEvent {}
