//! # Subscription registry.
//!
//! Two maps:
//! - `by_subscriber`: subscriber id → event types it registered for. Its mutex
//!   is the registry lock; every mutation runs under it.
//! - `by_event_type`: event type → subscriptions ordered by priority. Lists are
//!   immutable snapshots (`Arc<[_]>`) replaced on write, so posting threads
//!   iterate without holding any lock.
//!
//! ```text
//! insert priority 5 into [9, 5, 5, 1]  ─►  [9, 5, 5, (5), 1]
//!                                              first index with priority < 5
//! ```
//!
//! ## Rules
//! - Higher priority first; equal priorities keep registration order.
//! - Registration is all-or-nothing: duplicates are rejected before any insert.
//! - Removed subscriptions are deactivated before they leave the list.
//! - Empty per-type lists are dropped.
//! - A subscriber dropped without unregistering is forgotten the next time its
//!   id is looked up, since a new instance may reuse its address.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::EventBusError;
use crate::events::EventType;
use crate::subscribers::{SubscriberHandle, SubscriberId, SubscriberMethod, Subscription};

pub(crate) type Snapshot = Arc<[Arc<Subscription>]>;

#[derive(Default)]
pub(crate) struct Registry {
    by_subscriber: Mutex<HashMap<SubscriberId, HashSet<EventType>>>,
    by_event_type: RwLock<HashMap<TypeId, Snapshot>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds one subscription per method and returns them in method order.
    pub(crate) fn register(
        &self,
        subscriber: &SubscriberHandle,
        methods: &[SubscriberMethod],
        priority: i32,
    ) -> Result<Vec<Arc<Subscription>>, EventBusError> {
        let mut by_subscriber = self.by_subscriber.lock();
        self.prune_dead(&mut by_subscriber, subscriber.id());

        let created: Vec<Arc<Subscription>> = methods
            .iter()
            .map(|m| Arc::new(Subscription::new(subscriber.clone(), m.clone(), priority)))
            .collect();

        {
            let by_event_type = self.by_event_type.read();
            for (i, sub) in created.iter().enumerate() {
                let registered = by_event_type
                    .get(&sub.event_type().id())
                    .is_some_and(|list| list.iter().any(|s| s.is_alive() && **s == **sub));
                if registered || created[..i].iter().any(|s| **s == **sub) {
                    return Err(EventBusError::DuplicateSubscription {
                        subscriber: subscriber.name(),
                        event_type: sub.event_type().name(),
                    });
                }
            }
        }

        let mut by_event_type = self.by_event_type.write();
        for sub in &created {
            let key = sub.event_type().id();
            let current = by_event_type.get(&key).map(|l| &l[..]).unwrap_or(&[]);
            // Dead subscriptions sharing the new subscriber's address are leftovers
            // of a dropped instance that never unregistered.
            let mut next: Vec<Arc<Subscription>> = current
                .iter()
                .filter(|s| s.is_alive() || s.subscriber_id() != sub.subscriber_id())
                .cloned()
                .collect();
            let at = next
                .iter()
                .position(|s| s.priority() < sub.priority())
                .unwrap_or(next.len());
            next.insert(at, Arc::clone(sub));
            by_event_type.insert(key, next.into());
        }
        drop(by_event_type);

        by_subscriber
            .entry(subscriber.id())
            .or_default()
            .extend(created.iter().map(|s| s.event_type()));
        Ok(created)
    }

    /// Removes and deactivates every subscription of `id`.
    pub(crate) fn unregister(&self, id: SubscriberId, name: &'static str) -> Result<(), EventBusError> {
        let mut by_subscriber = self.by_subscriber.lock();
        self.prune_dead(&mut by_subscriber, id);
        let Some(types) = by_subscriber.remove(&id) else {
            return Err(EventBusError::NotRegistered { subscriber: name });
        };
        detach(&mut self.by_event_type.write(), id, types);
        Ok(())
    }

    pub(crate) fn is_registered(&self, id: SubscriberId) -> bool {
        let mut by_subscriber = self.by_subscriber.lock();
        self.prune_dead(&mut by_subscriber, id);
        by_subscriber.contains_key(&id)
    }

    /// Forgets `id` if none of its subscriptions has a live subscriber.
    fn prune_dead(&self, by_subscriber: &mut HashMap<SubscriberId, HashSet<EventType>>, id: SubscriberId) {
        let Some(types) = by_subscriber.get(&id) else {
            return;
        };
        let alive = {
            let by_event_type = self.by_event_type.read();
            types.iter().any(|ty| {
                by_event_type
                    .get(&ty.id())
                    .is_some_and(|list| list.iter().any(|s| s.subscriber_id() == id && s.is_alive()))
            })
        };
        if alive {
            return;
        }
        if let Some(types) = by_subscriber.remove(&id) {
            detach(&mut self.by_event_type.write(), id, types);
        }
    }

    /// Current subscriptions for `event_type`, highest priority first.
    pub(crate) fn subscriptions_for(&self, event_type: EventType) -> Option<Snapshot> {
        self.by_event_type.read().get(&event_type.id()).cloned()
    }

    pub(crate) fn has_subscriptions_for(&self, event_type: EventType) -> bool {
        self.by_event_type
            .read()
            .get(&event_type.id())
            .is_some_and(|list| !list.is_empty())
    }
}

/// Deactivates and removes the subscriptions of `id` for `types`.
fn detach(
    by_event_type: &mut HashMap<TypeId, Snapshot>,
    id: SubscriberId,
    types: impl IntoIterator<Item = EventType>,
) {
    for ty in types {
        let Some(current) = by_event_type.get(&ty.id()) else {
            continue;
        };
        let mut kept = Vec::with_capacity(current.len());
        for sub in current.iter() {
            if sub.subscriber_id() == id {
                sub.deactivate();
            } else {
                kept.push(Arc::clone(sub));
            }
        }
        if kept.is_empty() {
            by_event_type.remove(&ty.id());
        } else {
            by_event_type.insert(ty.id(), kept.into());
        }
    }
}
