//! Error types used by the event bus and by subscriber invocation.
//!
//! This module defines two main error enums:
//!
//! - [`EventBusError`]: errors raised by bus operations (registration, posting, cancellation).
//! - [`SubscriberFailure`]: the classified failure of a single subscriber callback.
//!
//! [`EventBusError`] provides helper methods (`as_label`, `is_recoverable`) for logging/metrics.

use std::sync::Arc;

use thiserror::Error;

use crate::exec::ScheduleError;

/// # Errors produced by the event bus.
///
/// Registry and pipeline errors surface synchronously to the caller of the
/// failing operation. Failures on background, async and main-thread deliveries
/// never reach the poster; they are logged or republished as
/// [`SubscriberExceptionEvent`](crate::SubscriberExceptionEvent).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EventBusError {
    /// The same callback of the same subscriber is already registered for the event type.
    #[error("subscriber {subscriber} already registered to event {event_type}")]
    DuplicateSubscription {
        /// Subscriber type name.
        subscriber: &'static str,
        /// Event type name.
        event_type: &'static str,
    },

    /// Unregister was called for a subscriber the bus does not know.
    #[error("subscriber {subscriber} was not registered before")]
    NotRegistered {
        /// Subscriber type name.
        subscriber: &'static str,
    },

    /// The subscriber type declares no subscriber methods.
    #[error("subscriber {subscriber} has no subscriber methods")]
    NoSubscriberMethods {
        /// Subscriber type name.
        subscriber: &'static str,
    },

    /// `cancel_event_delivery` was called outside of its contract.
    #[error("invalid cancellation: {reason}")]
    InvalidCancellation {
        /// What was violated.
        reason: &'static str,
    },

    /// A subscriber callback failed and the bus is configured to rethrow.
    #[error("invoking subscriber {subscriber} for event {event_type} failed")]
    SubscriberFailed {
        /// Subscriber type name.
        subscriber: &'static str,
        /// Type name of the event being delivered.
        event_type: &'static str,
        /// The classified callback failure.
        #[source]
        cause: Arc<SubscriberFailure>,
    },

    /// The main thread refused to schedule a drain.
    #[error("could not schedule main thread delivery")]
    Schedule(#[from] ScheduleError),

    /// The worker runtime backing background/async delivery could not be started.
    #[error("failed to start worker runtime")]
    Runtime(#[source] std::io::Error),

    /// An internal invariant was violated; indicates a bug.
    #[error("internal error: {reason}")]
    Internal {
        /// The violated invariant.
        reason: &'static str,
    },
}

impl EventBusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::EventBusError;
    ///
    /// let err = EventBusError::NotRegistered { subscriber: "demo" };
    /// assert_eq!(err.as_label(), "bus_not_registered");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventBusError::DuplicateSubscription { .. } => "bus_duplicate_subscription",
            EventBusError::NotRegistered { .. } => "bus_not_registered",
            EventBusError::NoSubscriberMethods { .. } => "bus_no_subscriber_methods",
            EventBusError::InvalidCancellation { .. } => "bus_invalid_cancellation",
            EventBusError::SubscriberFailed { .. } => "bus_subscriber_failed",
            EventBusError::Schedule(_) => "bus_schedule_failed",
            EventBusError::Runtime(_) => "bus_runtime_failed",
            EventBusError::Internal { .. } => "bus_internal",
        }
    }

    /// Indicates whether the caller may safely ignore the error.
    ///
    /// Only [`EventBusError::NotRegistered`] is recoverable; everything else
    /// aborts the operation that returned it.
    ///
    /// # Example
    /// ```
    /// use eventvisor::EventBusError;
    ///
    /// assert!(EventBusError::NotRegistered { subscriber: "s" }.is_recoverable());
    /// assert!(!EventBusError::Internal { reason: "boom" }.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EventBusError::NotRegistered { .. })
    }
}

/// # Failure of a single subscriber callback.
///
/// Callbacks report failures by returning `Err`; panics are caught at the
/// invocation boundary and classified as [`SubscriberFailure::Panicked`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SubscriberFailure {
    /// The callback returned an error.
    #[error("{0:#}")]
    Error(anyhow::Error),

    /// The callback panicked.
    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

impl SubscriberFailure {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriberFailure::Error(_) => "subscriber_error",
            SubscriberFailure::Panicked(_) => "subscriber_panicked",
        }
    }

    /// Builds a failure from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let any = &*payload;
        let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = any.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        SubscriberFailure::Panicked(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let err = EventBusError::DuplicateSubscription {
            subscriber: "a",
            event_type: "b",
        };
        assert_eq!(err.as_label(), "bus_duplicate_subscription");
        assert_eq!(
            err.to_string(),
            "subscriber a already registered to event b"
        );
    }

    #[test]
    fn test_panic_payload_is_classified() {
        let failure = SubscriberFailure::from_panic(Box::new("boom"));
        assert!(matches!(failure, SubscriberFailure::Panicked(ref m) if m == "boom"));

        let failure = SubscriberFailure::from_panic(Box::new(String::from("owned")));
        assert_eq!(failure.to_string(), "subscriber panicked: owned");

        let failure = SubscriberFailure::from_panic(Box::new(42_u8));
        assert_eq!(failure.as_label(), "subscriber_panicked");
    }

    #[test]
    fn test_failed_error_exposes_source() {
        use std::error::Error as _;

        let err = EventBusError::SubscriberFailed {
            subscriber: "s",
            event_type: "e",
            cause: Arc::new(SubscriberFailure::Error(anyhow::anyhow!("bad input"))),
        };
        assert!(!err.is_recoverable());
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("bad input"));
    }
}
