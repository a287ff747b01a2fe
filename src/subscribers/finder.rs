//! # Subscriber method discovery.
//!
//! [`MethodFinder`] is the pluggable seam that turns a subscriber type into its
//! list of [`SubscriberMethod`]s. The default [`DeclaredMethodFinder`] asks the
//! type itself through [`Subscriber::subscriber_methods`].
//!
//! ## Rules
//! - Discovery runs at most once per (finder, subscriber type); results are
//!   cached process-wide until [`clear_cache`].
//! - Every bus using [`DeclaredMethodFinder`] shares one cache slot; each custom
//!   finder gets a slot of its own, dropped together with its bus.
//! - An empty result fails with [`EventBusError::NoSubscriberMethods`] and is not cached.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::error::EventBusError;
use crate::subscribers::{Subscriber, SubscriberMethod};

type CacheKey = (u64, TypeId);

static METHOD_CACHE: LazyLock<Mutex<HashMap<CacheKey, Arc<[SubscriberMethod]>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Cache slot of [`DeclaredMethodFinder`].
const DECLARED_SLOT: u64 = 0;
static NEXT_SLOT: AtomicU64 = AtomicU64::new(DECLARED_SLOT + 1);

/// Identity of a subscriber type handed to a [`MethodFinder`].
#[derive(Clone, Copy)]
pub struct SubscriberClass {
    id: TypeId,
    name: &'static str,
    declared: fn() -> Vec<SubscriberMethod>,
}

impl SubscriberClass {
    /// Class of subscriber type `S`.
    pub fn of<S: Subscriber>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
            declared: S::subscriber_methods,
        }
    }

    /// Type id of the subscriber type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name of the subscriber type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Methods the type declares through [`Subscriber::subscriber_methods`].
    pub fn declared_methods(&self) -> Vec<SubscriberMethod> {
        (self.declared)()
    }
}

/// Discovers the callbacks of a subscriber type.
///
/// Implementations must be deterministic per type: results are cached.
pub trait MethodFinder: Send + Sync + 'static {
    /// Returns the callbacks of `class`.
    fn find_methods(&self, class: &SubscriberClass) -> Vec<SubscriberMethod>;
}

/// Uses the methods each type declares itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredMethodFinder;

impl MethodFinder for DeclaredMethodFinder {
    fn find_methods(&self, class: &SubscriberClass) -> Vec<SubscriberMethod> {
        class.declared_methods()
    }
}

/// A bus's finder bound to its slot in the discovery cache.
pub(crate) struct CachedFinder {
    slot: u64,
    finder: Arc<dyn MethodFinder>,
}

impl CachedFinder {
    /// The default finder; its results are shared by every bus.
    pub(crate) fn declared() -> Self {
        Self {
            slot: DECLARED_SLOT,
            finder: Arc::new(DeclaredMethodFinder),
        }
    }

    /// A custom finder with a cache slot of its own.
    pub(crate) fn custom(finder: Arc<dyn MethodFinder>) -> Self {
        Self {
            slot: NEXT_SLOT.fetch_add(1, Ordering::Relaxed),
            finder,
        }
    }

    /// Returns the cached methods of `class`, running the finder on first use.
    pub(crate) fn find(&self, class: &SubscriberClass) -> Result<Arc<[SubscriberMethod]>, EventBusError> {
        let key = (self.slot, class.id());
        if let Some(methods) = METHOD_CACHE.lock().get(&key) {
            return Ok(Arc::clone(methods));
        }

        // Discovery runs unlocked; concurrent first registrations may both compute it.
        let methods = self.finder.find_methods(class);
        if methods.is_empty() {
            return Err(EventBusError::NoSubscriberMethods {
                subscriber: class.name(),
            });
        }

        let methods: Arc<[SubscriberMethod]> = methods.into();
        METHOD_CACHE
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::clone(&methods));
        Ok(methods)
    }
}

impl Drop for CachedFinder {
    fn drop(&mut self) {
        if self.slot != DECLARED_SLOT {
            METHOD_CACHE.lock().retain(|(slot, _), _| *slot != self.slot);
        }
    }
}

/// Drops every cached discovery result.
pub fn clear_cache() {
    METHOD_CACHE.lock().clear();
}
