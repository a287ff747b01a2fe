//! # Basic example
//!
//! Wires a bus to a dedicated main loop and shows each thread mode, sticky
//! replay, cancellation and failure reporting through the built-in `LogWriter`.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use eventvisor::{
    EventBus, EventBusConfig, Lineage, LogWriter, MainLoop, Subscriber, SubscriberMethod,
    ThreadMode,
};
use tracing_subscriber::EnvFilter;

struct Download {
    file: &'static str,
    percent: u8,
}
impl Lineage for Download {}

struct Unwatched;
impl Lineage for Unwatched {}

struct ProgressView {
    renders: AtomicU32,
}

impl Subscriber for ProgressView {
    fn subscriber_methods() -> Vec<SubscriberMethod> {
        vec![SubscriberMethod::new("render", ThreadMode::Main, |me: &Self, d: &Download| {
            me.renders.fetch_add(1, Ordering::Relaxed);
            println!(
                "[{}] {} at {}%",
                thread::current().name().unwrap_or("?"),
                d.file,
                d.percent
            );
            Ok(())
        })]
    }
}

struct Quota {
    bus: EventBus,
}

impl Subscriber for Quota {
    fn subscriber_methods() -> Vec<SubscriberMethod> {
        vec![
            SubscriberMethod::new("check", ThreadMode::Posting, |me: &Self, d: &Download| {
                if d.file.ends_with(".iso") {
                    println!("quota: blocking {}", d.file);
                    me.bus.cancel_event_delivery(d)?;
                }
                Ok(())
            }),
            SubscriberMethod::new("archive", ThreadMode::Async, |_: &Self, d: &Download| {
                if d.percent == 100 {
                    anyhow::bail!("archive of {} is full", d.file);
                }
                Ok(())
            }),
        ]
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let main = MainLoop::spawn("ui")?;
    let bus = EventBus::builder(EventBusConfig::default())
        .with_main_thread(main.clone())
        .build()?;

    let log = Arc::new(LogWriter::new());
    bus.register(&log)?;

    let view = Arc::new(ProgressView {
        renders: AtomicU32::new(0),
    });
    let quota = Arc::new(Quota { bus: bus.clone() });
    bus.register_with_priority(&quota, 10)?;

    bus.post_sticky(Download {
        file: "notes.txt",
        percent: 40,
    })?;
    // Receives the sticky download on registration.
    bus.register_sticky(&view)?;

    bus.post(Download {
        file: "distro.iso",
        percent: 10,
    })?;
    bus.post(Download {
        file: "notes.txt",
        percent: 100,
    })?;
    bus.post(Unwatched)?;

    thread::sleep(Duration::from_millis(200));
    println!("renders: {}", view.renders.load(Ordering::Relaxed));

    bus.unregister(&view)?;
    bus.unregister(&quota)?;
    main.shutdown();
    Ok(())
}
