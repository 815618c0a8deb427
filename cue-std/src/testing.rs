//! Testing utilities for Cue.
//!
//! # Features
//!
//! - [`TestOwner`]: An [`Owner`] that can be killed on demand
//! - [`RecordingHandler`]: A handler that records every notification
//! - [`WakeCounter`]: A waker that counts how often it was woken
//! - [`poll_once`]: Poll a future a single time without an executor

use crate::trigger::Owner;
use cue_core::{Links, SharedError, TriggerHandler};
use futures::task::{ArcWake, noop_waker_ref, waker};
use std::{
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll, Waker},
};

// ============================================================================
// Polling
// ============================================================================

/// Poll `future` once with a no-op waker.
///
/// # Example
///
/// ```rust,ignore
/// let mut wait = hub.wait_once(&CancelToken::none());
/// assert!(poll_once(&mut wait).is_pending());
/// hub.publish(&1);
/// assert!(poll_once(&mut wait).is_ready());
/// ```
pub fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
    let mut cx = Context::from_waker(noop_waker_ref());
    Pin::new(future).poll(&mut cx)
}

/// Poll `future` once with `waker`.
pub fn poll_with<F: Future + Unpin>(future: &mut F, waker: &Waker) -> Poll<F::Output> {
    let mut cx = Context::from_waker(waker);
    Pin::new(future).poll(&mut cx)
}

// ============================================================================
// Wake Counter
// ============================================================================

/// Counts wake-ups.
#[derive(Debug, Default)]
pub struct WakeCounter {
    wakes: AtomicUsize,
}

impl WakeCounter {
    /// A counter and a waker feeding it.
    pub fn new() -> (Arc<Self>, Waker) {
        let counter = Arc::new(Self::default());
        let waker = waker(counter.clone());
        (counter, waker)
    }

    /// Wake-ups so far.
    pub fn count(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl ArcWake for WakeCounter {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Test Owner
// ============================================================================

/// An [`Owner`] that stays alive until [`kill`](Self::kill)ed.
#[derive(Debug)]
pub struct TestOwner {
    alive: Cell<bool>,
}

impl TestOwner {
    /// A live owner.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            alive: Cell::new(true),
        })
    }

    /// Mark the owner dead.
    pub fn kill(&self) {
        self.alive.set(false);
    }

    /// Weak handle suitable for [`TriggerBase::new`](crate::TriggerBase::new).
    pub fn weak(self: &Rc<Self>) -> Weak<dyn Owner> {
        let weak = Rc::downgrade(self);
        weak
    }
}

impl Owner for TestOwner {
    fn is_alive(&self) -> bool {
        self.alive.get()
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

/// One notification seen by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded<T> {
    /// `on_next`
    Next(T),
    /// `on_error`, with the error's display string.
    Error(String),
    /// `on_completed`
    Completed,
}

/// A handler that records every notification it receives.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new();
/// hub.add_handler(recorder.clone());
/// hub.publish(&1);
/// assert_eq!(recorder.events(), [Recorded::Next(1)]);
/// ```
pub struct RecordingHandler<T: 'static> {
    links: Links<T>,
    events: RefCell<Vec<Recorded<T>>>,
}

impl<T: Clone + 'static> RecordingHandler<T> {
    /// An empty recorder.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            links: Links::new(),
            events: RefCell::new(Vec::new()),
        })
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<Recorded<T>> {
        self.events.borrow().clone()
    }

    /// Only the published values.
    pub fn values(&self) -> Vec<T> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Recorded::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` while linked into a hub.
    pub fn is_linked(&self) -> bool {
        self.links.is_linked()
    }
}

impl<T: Clone + 'static> TriggerHandler<T> for RecordingHandler<T> {
    fn on_next(&self, value: &T) {
        self.events.borrow_mut().push(Recorded::Next(value.clone()));
    }

    fn on_error(&self, error: &SharedError) {
        self.events.borrow_mut().push(Recorded::Error(error.to_string()));
    }

    fn on_completed(&self) {
        self.events.borrow_mut().push(Recorded::Completed);
    }

    fn links(&self) -> &Links<T> {
        &self.links
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for RecordingHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingHandler")
            .field("events", &self.events.borrow())
            .field("links", &self.links)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cue_core::Hub;

    #[test]
    fn test_recording_handler() {
        let hub: Rc<Hub<&'static str>> = Rc::new(Hub::new());
        let recorder = RecordingHandler::<&'static str>::new();
        hub.add_handler(recorder.clone());
        hub.publish(&"a");
        hub.fault(Arc::new(std::io::Error::other("x")));

        assert_eq!(recorder.values(), ["a"]);
        assert_eq!(
            recorder.events(),
            [Recorded::Next("a"), Recorded::Error("x".into())]
        );
        assert!(!recorder.is_linked());
    }

    #[test]
    fn test_wake_counter() {
        let (counter, waker) = WakeCounter::new();
        waker.wake_by_ref();
        waker.wake();
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_test_owner() {
        let owner = TestOwner::new();
        let weak = owner.weak();
        assert!(weak.upgrade().is_some_and(|o| o.is_alive()));
        owner.kill();
        assert!(!owner.is_alive());
    }
}
