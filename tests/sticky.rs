mod common;

use std::any::{Any, TypeId};
use std::sync::Arc;

use parking_lot::Mutex;

use common::Journal;
use eventvisor::{
    Event, EventBus, EventBusConfig, EventRef, EventType, Lineage, Subscriber,
    SubscriberMethod, ThreadMode,
};

struct Location {
    city: &'static str,
}
impl Lineage for Location {}

struct PreciseLocation {
    base: Location,
    meters: u32,
}
impl Lineage for PreciseLocation {
    fn parent() -> Option<EventType> {
        Some(EventType::of::<Location>())
    }
    fn project(&self, target: TypeId) -> Option<&dyn Any> {
        self.base.view(target)
    }
}

struct Map {
    journal: Journal,
}

impl Subscriber for Map {
    fn subscriber_methods() -> Vec<SubscriberMethod> {
        vec![SubscriberMethod::new(
            "on_location",
            ThreadMode::Posting,
            |me: &Self, l: &Location| {
                me.journal.record(l.city);
                Ok(())
            },
        )]
    }
}

fn map(journal: &Journal) -> Arc<Map> {
    Arc::new(Map {
        journal: journal.clone(),
    })
}

#[test]
fn test_sticky_event_is_replayed_once_before_register_returns() {
    let bus = EventBus::new().expect("bus");
    bus.post_sticky(Location { city: "Lisbon" }).expect("post");

    let journal = Journal::default();
    let late = map(&journal);
    bus.register_sticky(&late).expect("register");
    assert_eq!(journal.entries(), vec!["Lisbon"]);

    // Plain registration does not replay.
    let plain_journal = Journal::default();
    let plain = map(&plain_journal);
    bus.register(&plain).expect("register");
    assert!(plain_journal.entries().is_empty());

    // Later posts reach both once.
    bus.post(Location { city: "Porto" }).expect("post");
    assert_eq!(journal.entries(), vec!["Lisbon", "Porto"]);
    assert_eq!(plain_journal.entries(), vec!["Porto"]);
}

#[test]
fn test_last_sticky_event_wins() {
    let bus = EventBus::new().expect("bus");
    bus.post_sticky(Location { city: "Oslo" }).expect("post");
    bus.post_sticky(Location { city: "Bergen" }).expect("post");

    assert_eq!(bus.sticky_event::<Location>().map(|l| l.city), Some("Bergen"));

    let journal = Journal::default();
    let late = map(&journal);
    bus.register_sticky_with_priority(&late, 3).expect("register");
    assert_eq!(journal.entries(), vec!["Bergen"]);
}

#[test]
fn test_sticky_replay_follows_inheritance_setting() {
    let bus = EventBus::new().expect("bus");
    bus.post_sticky(PreciseLocation {
        base: Location { city: "Kyoto" },
        meters: 5,
    })
    .expect("post");
    assert_eq!(bus.sticky_event::<PreciseLocation>().map(|p| p.meters), Some(5));
    // Stored under its concrete type only.
    assert!(bus.sticky_event::<Location>().is_none());

    let journal = Journal::default();
    let late = map(&journal);
    bus.register_sticky(&late).expect("register");
    assert_eq!(journal.entries(), vec!["Kyoto"]);

    let cfg = EventBusConfig {
        event_inheritance: false,
        ..EventBusConfig::default()
    };
    let strict = EventBus::builder(cfg).build().expect("bus");
    strict
        .post_sticky(PreciseLocation {
            base: Location { city: "Nara" },
            meters: 1,
        })
        .expect("post");
    let strict_journal = Journal::default();
    let strict_map = map(&strict_journal);
    strict.register_sticky(&strict_map).expect("register");
    assert!(strict_journal.entries().is_empty());
}

#[test]
fn test_sticky_removal() {
    let bus = EventBus::new().expect("bus");

    let event: EventRef = Arc::new(Location { city: "Rome" });
    bus.post_sticky_arc(Arc::clone(&event)).expect("post");

    let other: EventRef = Arc::new(Location { city: "Rome" });
    assert!(!bus.remove_sticky_event_ref(&other));
    assert!(bus.remove_sticky_event_ref(&event));
    assert!(bus.sticky_event::<Location>().is_none());

    bus.post_sticky(Location { city: "Milan" }).expect("post");
    assert_eq!(bus.remove_sticky_event::<Location>().map(|l| l.city), Some("Milan"));
    assert!(bus.remove_sticky_event::<Location>().is_none());

    bus.post_sticky(Location { city: "Turin" }).expect("post");
    bus.remove_all_sticky_events();

    let journal = Journal::default();
    let late = map(&journal);
    bus.register_sticky(&late).expect("register");
    assert!(journal.entries().is_empty());
}

/// Tries to cancel whatever it receives.
struct Canceller {
    bus: EventBus,
    outcomes: Mutex<Vec<&'static str>>,
}

impl Subscriber for Canceller {
    fn subscriber_methods() -> Vec<SubscriberMethod> {
        vec![SubscriberMethod::new(
            "on_location",
            ThreadMode::Posting,
            |me: &Self, l: &Location| {
                let outcome = match me.bus.cancel_event_delivery(l) {
                    Ok(()) => "canceled",
                    Err(e) => e.as_label(),
                };
                me.outcomes.lock().push(outcome);
                Ok(())
            },
        )]
    }
}

#[test]
fn test_sticky_replay_cannot_be_canceled() {
    let bus = EventBus::new().expect("bus");
    bus.post_sticky(Location { city: "Cairo" }).expect("post");

    let canceller = Arc::new(Canceller {
        bus: bus.clone(),
        outcomes: Mutex::new(Vec::new()),
    });
    bus.register_sticky(&canceller).expect("register");
    bus.post(Location { city: "Giza" }).expect("post");

    assert_eq!(
        *canceller.outcomes.lock(),
        vec!["bus_invalid_cancellation", "canceled"]
    );
}

/// Registers `late` for sticky replay from inside its own delivery.
struct Recruiter {
    bus: EventBus,
    late: Arc<Canceller>,
    journal: Journal,
}

impl Subscriber for Recruiter {
    fn subscriber_methods() -> Vec<SubscriberMethod> {
        vec![SubscriberMethod::new(
            "on_location",
            ThreadMode::Posting,
            |me: &Self, l: &Location| {
                me.journal.record(format!("recruiter:{}", l.city));
                me.bus.register_sticky(&me.late)?;
                Ok(())
            },
        )]
    }
}

#[test]
fn test_replay_inside_delivery_cannot_cancel_outer_event() {
    let bus = EventBus::new().expect("bus");
    let journal = Journal::default();
    let late = Arc::new(Canceller {
        bus: bus.clone(),
        outcomes: Mutex::new(Vec::new()),
    });
    let recruiter = Arc::new(Recruiter {
        bus: bus.clone(),
        late: Arc::clone(&late),
        journal: journal.clone(),
    });
    let low = map(&journal);

    bus.register_with_priority(&recruiter, 10).expect("register");
    bus.register_with_priority(&low, 1).expect("register");
    bus.post_sticky(Location { city: "Accra" }).expect("post");

    assert_eq!(*late.outcomes.lock(), vec!["bus_invalid_cancellation"]);
    assert_eq!(journal.entries(), vec!["recruiter:Accra", "Accra"]);
}
