//! # Event bus configuration.
//!
//! [`EventBusConfig`] controls failure reporting, hierarchy matching and the
//! timing of the queued posters.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use eventvisor::EventBusConfig;
//!
//! let mut cfg = EventBusConfig::default();
//! cfg.throw_subscriber_exception = true;
//! cfg.event_inheritance = false;
//! cfg.main_thread_budget = Duration::from_millis(4);
//!
//! assert!(cfg.log_subscriber_exceptions);
//! ```

use std::time::Duration;

/// Configuration of an [`EventBus`](crate::EventBus).
#[derive(Clone, Debug)]
pub struct EventBusConfig {
    /// Log subscriber failures at `error` level.
    pub log_subscriber_exceptions: bool,
    /// Log events that found no subscriber at `debug` level.
    pub log_no_subscriber_messages: bool,
    /// Republish subscriber failures as [`SubscriberExceptionEvent`](crate::SubscriberExceptionEvent).
    pub send_subscriber_exception_event: bool,
    /// Post a [`NoSubscriberEvent`](crate::NoSubscriberEvent) for events nobody receives.
    pub send_no_subscriber_event: bool,
    /// Return posting-thread subscriber failures from `post` as [`EventBusError::SubscriberFailed`](crate::EventBusError::SubscriberFailed).
    pub throw_subscriber_exception: bool,
    /// Match subscribers registered for any ancestor or interface of the posted type.
    pub event_inheritance: bool,
    /// Longest a single main-thread drain runs before yielding back to the loop.
    pub main_thread_budget: Duration,
    /// How long the idle background worker waits for work before exiting.
    pub background_idle_timeout: Duration,
}

impl Default for EventBusConfig {
    /// Provides a default configuration:
    /// - `log_subscriber_exceptions = true`
    /// - `log_no_subscriber_messages = true`
    /// - `send_subscriber_exception_event = true`
    /// - `send_no_subscriber_event = true`
    /// - `throw_subscriber_exception = false`
    /// - `event_inheritance = true`
    /// - `main_thread_budget = 10ms`
    /// - `background_idle_timeout = 1s`
    fn default() -> Self {
        Self {
            log_subscriber_exceptions: true,
            log_no_subscriber_messages: true,
            send_subscriber_exception_event: true,
            send_no_subscriber_event: true,
            throw_subscriber_exception: false,
            event_inheritance: true,
            main_thread_budget: Duration::from_millis(10),
            background_idle_timeout: Duration::from_secs(1),
        }
    }
}
