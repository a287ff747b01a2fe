//! # Sticky event store: the latest event per concrete type.

use std::any::TypeId;
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::events::{EventRef, EventType, hierarchy, same_event};

#[derive(Default)]
pub(crate) struct StickyStore {
    events: Mutex<HashMap<TypeId, EventRef>>,
}

impl StickyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `event`, replacing the previous event of its type.
    pub(crate) fn put(&self, event: EventRef) {
        self.events.lock().insert(event.event_type().id(), event);
    }

    pub(crate) fn get(&self, ty: TypeId) -> Option<EventRef> {
        self.events.lock().get(&ty).cloned()
    }

    pub(crate) fn remove(&self, ty: TypeId) -> Option<EventRef> {
        self.events.lock().remove(&ty)
    }

    /// Removes `event` only if it is still the stored instance of its type.
    pub(crate) fn remove_instance(&self, event: &EventRef) -> bool {
        let mut events = self.events.lock();
        let key = event.event_type().id();
        match events.get(&key) {
            Some(stored) if same_event(&**stored, &**event) => {
                events.remove(&key);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&self) {
        self.events.lock().clear();
    }

    /// Stored events to replay to a new subscription for `target`.
    ///
    /// With `inheritance`, every stored event assignable to `target` matches.
    pub(crate) fn matching(&self, target: EventType, inheritance: bool) -> Vec<EventRef> {
        let events = self.events.lock();
        if inheritance {
            events
                .values()
                .filter(|e| hierarchy::is_assignable(target, e.event_type()))
                .cloned()
                .collect()
        } else {
            events.get(&target.id()).cloned().into_iter().collect()
        }
    }
}
