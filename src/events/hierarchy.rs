//! # Event-type hierarchy resolver.
//!
//! Expands a concrete event type into every type it can be matched under:
//! the type itself, its interfaces (recursively through their own interfaces),
//! then its parent, repeating until the chain ends.
//!
//! ```text
//! LoginEvent ─► [LoginEvent, Auditable, Tracked, UserEvent, Root]
//!   ├─ interfaces: Auditable ─► interfaces: Tracked
//!   └─ parent: UserEvent ─► parent: Root
//! ```
//!
//! ## Rules
//! - Results contain no duplicates and are cached per concrete type for the
//!   process lifetime (until [`clear_cache`]).
//! - The cache is process-wide: lineages are facts about types, not about a bus.
//! - Cyclic lineages terminate at the first repeated type.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use super::event::EventType;

static EVENT_TYPES_CACHE: LazyLock<Mutex<HashMap<TypeId, Arc<[EventType]>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Returns `event_type` followed by all of its ancestors and interfaces.
pub fn lookup_all_event_types(event_type: EventType) -> Arc<[EventType]> {
    let mut cache = EVENT_TYPES_CACHE.lock();
    if let Some(types) = cache.get(&event_type.id()) {
        return Arc::clone(types);
    }

    let mut types: Vec<EventType> = Vec::new();
    let mut current = Some(event_type);
    while let Some(ty) = current {
        if types.contains(&ty) {
            break;
        }
        types.push(ty);
        add_interfaces(&mut types, ty.interfaces());
        current = ty.parent();
    }

    let types: Arc<[EventType]> = types.into();
    cache.insert(event_type.id(), Arc::clone(&types));
    types
}

/// Returns true if an event of type `candidate` can be delivered to a subscription for `target`.
pub fn is_assignable(target: EventType, candidate: EventType) -> bool {
    target == candidate || lookup_all_event_types(candidate).contains(&target)
}

/// Drops every cached hierarchy.
pub fn clear_cache() {
    EVENT_TYPES_CACHE.lock().clear();
}

/// Recurses through super-interfaces.
fn add_interfaces(types: &mut Vec<EventType>, interfaces: Vec<EventType>) {
    for iface in interfaces {
        if !types.contains(&iface) {
            types.push(iface);
            add_interfaces(types, iface.interfaces());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Lineage;

    struct Tracked;
    impl Lineage for Tracked {}

    struct Auditable;
    impl Lineage for Auditable {
        fn interfaces() -> Vec<EventType> {
            vec![EventType::of::<Tracked>()]
        }
    }

    struct Root;
    impl Lineage for Root {
        fn interfaces() -> Vec<EventType> {
            vec![EventType::of::<Tracked>()]
        }
    }

    struct UserEvent;
    impl Lineage for UserEvent {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<Root>())
        }
    }

    struct LoginEvent;
    impl Lineage for LoginEvent {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<UserEvent>())
        }
        fn interfaces() -> Vec<EventType> {
            vec![EventType::of::<Auditable>()]
        }
    }

    struct Ping;
    impl Lineage for Ping {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<Pong>())
        }
    }

    struct Pong;
    impl Lineage for Pong {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<Ping>())
        }
    }

    #[test]
    fn test_order_is_type_interfaces_then_parent() {
        let types = lookup_all_event_types(EventType::of::<LoginEvent>());
        let expected = [
            EventType::of::<LoginEvent>(),
            EventType::of::<Auditable>(),
            EventType::of::<Tracked>(),
            EventType::of::<UserEvent>(),
            EventType::of::<Root>(),
        ];
        assert_eq!(&*types, &expected[..]);
    }

    #[test]
    fn test_root_resolves_to_itself_and_interfaces() {
        let types = lookup_all_event_types(EventType::of::<Root>());
        assert_eq!(
            &*types,
            &[EventType::of::<Root>(), EventType::of::<Tracked>()][..]
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let types = lookup_all_event_types(EventType::of::<Ping>());
        assert_eq!(
            &*types,
            &[EventType::of::<Ping>(), EventType::of::<Pong>()][..]
        );
    }

    #[test]
    fn test_cached_result_is_shared() {
        let first = lookup_all_event_types(EventType::of::<UserEvent>());
        let second = lookup_all_event_types(EventType::of::<UserEvent>());
        assert_eq!(first, second);
        assert!(is_assignable(
            EventType::of::<Root>(),
            EventType::of::<UserEvent>()
        ));
        assert!(!is_assignable(
            EventType::of::<LoginEvent>(),
            EventType::of::<Root>()
        ));
    }
}
