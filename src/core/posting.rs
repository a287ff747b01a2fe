//! # Per-thread posting state.
//!
//! Each thread keeps one [`PostingThreadState`] per bus, created on first post.
//! It holds the thread's queue of events awaiting dispatch plus what is being
//! dispatched right now, which is what cancellation checks against.
//!
//! Entries hold a weak token of their bus; a thread drops the entries of dead
//! buses whenever it creates a new one.
//!
//! Fields use `Cell`/`RefCell`; no borrow outlives a single field access, so
//! subscriber callbacks may re-enter `post` and `cancel_event_delivery`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Weak};

use crate::events::EventRef;
use crate::subscribers::Subscription;

thread_local! {
    static STATES: RefCell<HashMap<u64, Entry>> = RefCell::new(HashMap::new());
}

struct Entry {
    alive: Weak<()>,
    state: Rc<PostingThreadState>,
}

#[derive(Default)]
pub(crate) struct PostingThreadState {
    queue: RefCell<VecDeque<EventRef>>,
    posting: Cell<bool>,
    main_thread: Cell<bool>,
    subscription: RefCell<Option<Arc<Subscription>>>,
    event: RefCell<Option<EventRef>>,
    canceled: Cell<bool>,
}

impl PostingThreadState {
    /// State of the calling thread for bus `bus_id`, kept while `alive` is.
    pub(crate) fn current(bus_id: u64, alive: &Arc<()>) -> Rc<Self> {
        STATES.with(|states| {
            if let Some(entry) = states.borrow().get(&bus_id) {
                return Rc::clone(&entry.state);
            }

            let state = Rc::new(Self::default());
            let stale: Vec<Entry> = {
                let mut states = states.borrow_mut();
                let dead: Vec<u64> = states
                    .iter()
                    .filter(|(_, entry)| entry.alive.strong_count() == 0)
                    .map(|(id, _)| *id)
                    .collect();
                states.insert(
                    bus_id,
                    Entry {
                        alive: Arc::downgrade(alive),
                        state: Rc::clone(&state),
                    },
                );
                dead.iter().filter_map(|id| states.remove(id)).collect()
            };
            // Dropped outside the borrow: queued events may own a bus.
            drop(stale);
            state
        })
    }

    pub(crate) fn push(&self, event: EventRef) {
        self.queue.borrow_mut().push_back(event);
    }

    pub(crate) fn pop(&self) -> Option<EventRef> {
        self.queue.borrow_mut().pop_front()
    }

    pub(crate) fn clear_queue(&self) {
        self.queue.borrow_mut().clear();
    }

    pub(crate) fn is_posting(&self) -> bool {
        self.posting.get()
    }

    pub(crate) fn set_posting(&self, posting: bool) {
        self.posting.set(posting);
    }

    pub(crate) fn is_main_thread(&self) -> bool {
        self.main_thread.get()
    }

    pub(crate) fn set_main_thread(&self, main: bool) {
        self.main_thread.set(main);
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.get()
    }

    pub(crate) fn set_canceled(&self, canceled: bool) {
        self.canceled.set(canceled);
    }

    /// Records the step being dispatched.
    pub(crate) fn begin(&self, event: &EventRef, subscription: &Arc<Subscription>) {
        *self.event.borrow_mut() = Some(EventRef::clone(event));
        *self.subscription.borrow_mut() = Some(Arc::clone(subscription));
    }

    /// Clears the current step and the cancel flag.
    pub(crate) fn end(&self) {
        self.event.borrow_mut().take();
        self.subscription.borrow_mut().take();
        self.canceled.set(false);
    }

    pub(crate) fn current_event(&self) -> Option<EventRef> {
        self.event.borrow().clone()
    }

    pub(crate) fn current_subscription(&self) -> Option<Arc<Subscription>> {
        self.subscription.borrow().clone()
    }

    /// Sets the current step aside until the returned guard drops.
    ///
    /// Work run meanwhile sees no current event, so it cannot cancel the step.
    pub(crate) fn suspend_step(&self) -> SuspendedStep<'_> {
        SuspendedStep {
            state: self,
            event: self.event.borrow_mut().take(),
            subscription: self.subscription.borrow_mut().take(),
        }
    }
}

/// Step set aside by [`PostingThreadState::suspend_step`]; restored on drop.
pub(crate) struct SuspendedStep<'a> {
    state: &'a PostingThreadState,
    event: Option<EventRef>,
    subscription: Option<Arc<Subscription>>,
}

impl Drop for SuspendedStep<'_> {
    fn drop(&mut self) {
        *self.state.event.borrow_mut() = self.event.take();
        *self.state.subscription.borrow_mut() = self.subscription.take();
    }
}

/// Removes this thread's state for a dropped bus.
pub(crate) fn forget(bus_id: u64) {
    // Thread-locals may already be gone during thread teardown.
    let _ = STATES.try_with(|states| {
        let removed = states
            .try_borrow_mut()
            .ok()
            .and_then(|mut states| states.remove(&bus_id));
        drop(removed);
    });
}

#[cfg(test)]
fn is_tracked(bus_id: u64) -> bool {
    STATES.with(|states| states.borrow().contains_key(&bus_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Lineage;
    use crate::subscribers::{Subscriber, SubscriberHandle, SubscriberMethod, ThreadMode};

    struct Note;
    impl Lineage for Note {}

    struct Reader;
    impl Subscriber for Reader {
        fn subscriber_methods() -> Vec<SubscriberMethod> {
            vec![SubscriberMethod::new("on_note", ThreadMode::Posting, |_: &Self, _: &Note| Ok(()))]
        }
    }

    #[test]
    fn test_state_is_per_thread_and_per_bus() {
        let alive = Arc::new(());
        let a = PostingThreadState::current(1, &alive);
        let again = PostingThreadState::current(1, &alive);
        let b = PostingThreadState::current(2, &alive);
        assert!(Rc::ptr_eq(&a, &again));
        assert!(!Rc::ptr_eq(&a, &b));

        let token = Arc::clone(&alive);
        let other_thread_posting =
            std::thread::spawn(move || PostingThreadState::current(1, &token).is_posting())
                .join()
                .expect("thread");
        a.set_posting(true);
        assert!(!other_thread_posting);
        assert!(again.is_posting());

        a.set_posting(false);
        forget(1);
        assert!(!Rc::ptr_eq(&a, &PostingThreadState::current(1, &alive)));
        forget(1);
        forget(2);
    }

    #[test]
    fn test_states_of_dropped_buses_are_pruned() {
        let gone = Arc::new(());
        let kept = Arc::new(());
        PostingThreadState::current(101, &gone);
        PostingThreadState::current(102, &kept);
        drop(gone);
        assert!(is_tracked(101));

        let fresh = Arc::new(());
        PostingThreadState::current(103, &fresh);
        assert!(!is_tracked(101));
        assert!(is_tracked(102));
        assert!(is_tracked(103));
    }

    #[test]
    fn test_queue_is_fifo_and_end_resets_step() {
        let state = PostingThreadState::default();
        let first: EventRef = Arc::new(Note);
        state.push(Arc::clone(&first));
        state.push(Arc::new(Note));

        let popped = state.pop().expect("queued");
        assert!(Arc::ptr_eq(&popped, &first));

        state.set_canceled(true);
        state.end();
        assert!(!state.is_canceled());
        assert!(state.current_event().is_none());
        assert!(state.current_subscription().is_none());

        state.clear_queue();
        assert!(state.pop().is_none());
    }

    #[test]
    fn test_suspended_step_is_restored() {
        let state = PostingThreadState::default();
        let worker = Arc::new(Reader);
        let subscription = Arc::new(Subscription::new(
            SubscriberHandle::new(&worker),
            Reader::subscriber_methods()[0].clone(),
            0,
        ));
        let event: EventRef = Arc::new(Note);
        state.begin(&event, &subscription);

        {
            let _step = state.suspend_step();
            assert!(state.current_event().is_none());
            assert!(state.current_subscription().is_none());
        }

        let current = state.current_event().expect("restored");
        assert!(Arc::ptr_eq(&current, &event));
        assert!(state.current_subscription().is_some());
    }
}
