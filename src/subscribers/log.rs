//! # LogWriter: logs the bus's own diagnostic events
//!
//! A minimal subscriber that writes [`NoSubscriberEvent`]s and
//! [`SubscriberExceptionEvent`]s to `tracing`. Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO eventvisor: no subscriber for event event=demo::Orphan
//! WARN eventvisor: subscriber failed subscriber=demo::Flaky event=demo::Tick cause=boom
//! ```

use tracing::{info, warn};

use crate::events::{NoSubscriberEvent, SubscriberExceptionEvent};
use crate::subscribers::{Subscriber, SubscriberMethod, ThreadMode};

/// Diagnostic event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscriber for LogWriter {
    fn subscriber_methods() -> Vec<SubscriberMethod> {
        vec![
            SubscriberMethod::new(
                "on_no_subscriber",
                ThreadMode::Posting,
                |_: &Self, e: &NoSubscriberEvent| {
                    info!(
                        event = e.original_event.event_type().name(),
                        "no subscriber for event"
                    );
                    Ok(())
                },
            ),
            SubscriberMethod::new(
                "on_subscriber_exception",
                ThreadMode::Posting,
                |_: &Self, e: &SubscriberExceptionEvent| {
                    warn!(
                        subscriber = e.subscriber_name,
                        event = e.causing_event.event_type().name(),
                        cause = %e.cause,
                        "subscriber failed"
                    );
                    Ok(())
                },
            ),
        ]
    }
}
