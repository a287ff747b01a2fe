//! # Event typing.
//!
//! Rust has no runtime class hierarchy, so each event type describes its own
//! lineage through [`Lineage`]:
//! - an optional **parent** type (single inheritance chain);
//! - a list of **interfaces** (marker types an event can be matched under);
//! - an optional **projection** that views a concrete event as one of its ancestors.
//!
//! Every [`Lineage`] type is an [`Event`] (blanket impl). Posted events travel as
//! [`EventRef`] (`Arc<dyn Event>`); identity of an event instance is the identity
//! of that allocation.
//!
//! ## Example
//! ```rust
//! use std::any::{Any, TypeId};
//! use eventvisor::{Event, EventType, Lineage};
//!
//! /// Marker "interface".
//! struct Auditable;
//! impl Lineage for Auditable {}
//!
//! struct UserEvent { user: u64 }
//! impl Lineage for UserEvent {}
//!
//! struct UserLoggedIn { base: UserEvent }
//! impl Lineage for UserLoggedIn {
//!     fn parent() -> Option<EventType> { Some(EventType::of::<UserEvent>()) }
//!     fn interfaces() -> Vec<EventType> { vec![EventType::of::<Auditable>()] }
//!     fn project(&self, target: TypeId) -> Option<&dyn Any> {
//!         self.base.view(target)
//!     }
//! }
//!
//! let ev = UserLoggedIn { base: UserEvent { user: 7 } };
//! let as_user = ev.view(TypeId::of::<UserEvent>()).and_then(|a| a.downcast_ref::<UserEvent>());
//! assert_eq!(as_user.map(|u| u.user), Some(7));
//! assert!(ev.event_type().is::<UserLoggedIn>());
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared handle to a posted event.
pub type EventRef = Arc<dyn Event>;

/// Declares where an event type sits in the event hierarchy.
///
/// All methods have defaults, so a root event type only needs `impl Lineage for T {}`.
pub trait Lineage: Send + Sync + 'static {
    /// Direct parent type, if any.
    fn parent() -> Option<EventType>
    where
        Self: Sized,
    {
        None
    }

    /// Interfaces (marker types) this type is matched under.
    fn interfaces() -> Vec<EventType>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Views this event as the ancestor identified by `target`.
    ///
    /// Override when the type embeds its parent; the identity case is handled by [`Event::view`].
    fn project(&self, target: TypeId) -> Option<&dyn Any> {
        let _ = target;
        None
    }
}

/// Object-safe view of a postable event.
///
/// Implemented for every [`Lineage`] type; do not implement it by hand.
pub trait Event: Any + Send + Sync {
    /// Runtime type descriptor of this event.
    fn event_type(&self) -> EventType;

    /// Upcast to `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcast a shared event for `Arc::downcast`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Views this event as `target`: itself when the ids match, otherwise its projection.
    fn view(&self, target: TypeId) -> Option<&dyn Any>;
}

impl<T: Lineage> Event for T {
    fn event_type(&self) -> EventType {
        EventType::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn view(&self, target: TypeId) -> Option<&dyn Any> {
        if target == TypeId::of::<T>() {
            Some(self)
        } else {
            self.project(target)
        }
    }
}

impl fmt::Debug for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type().name())
            .finish_non_exhaustive()
    }
}

/// Returns true if both handles point at the same event instance.
#[inline]
pub(crate) fn same_event(a: &dyn Event, b: &dyn Event) -> bool {
    std::ptr::addr_eq(a as *const dyn Event, b as *const dyn Event)
}

/// Copyable descriptor of an event type.
///
/// Equality and hashing use the [`TypeId`] only.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    parent: fn() -> Option<EventType>,
    interfaces: fn() -> Vec<EventType>,
}

impl EventType {
    /// Descriptor of `T`.
    pub fn of<T: Lineage>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            parent: T::parent,
            interfaces: T::interfaces,
        }
    }

    /// Type id of the described type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name (for logs and errors).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared parent type.
    pub fn parent(&self) -> Option<EventType> {
        (self.parent)()
    }

    /// Declared interfaces.
    pub fn interfaces(&self) -> Vec<EventType> {
        (self.interfaces)()
    }

    /// Returns true if this descriptor describes `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
