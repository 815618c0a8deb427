//! # Completion Core
//!
//! A reusable, version-stamped, single-slot promise.
//!
//! One `CompletionCore` backs one outstanding awaitable at a time. Instead of
//! allocating a new promise per wait, the owner calls [`reset`] which bumps
//! the version; every awaitable carries the version (its *token*) it was
//! created with, and presenting an older token is detected as misuse.
//!
//! The continuation slot holds a [`Waker`], which is exactly a callback plus
//! opaque state. Registering a continuation on a core that has already
//! completed wakes it inline, before [`on_completed`] returns.
//!
//! [`reset`]: CompletionCore::reset
//! [`on_completed`]: CompletionCore::on_completed

use crate::error::{SharedError, StaleToken, TriggerError};
use std::{
    cell::{Cell, RefCell},
    fmt,
    task::{Context, Poll, Waker},
};

/// Observable state of a [`CompletionCore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// No result yet.
    Pending,
    /// Completed with a value.
    Succeeded,
    /// Completed with an error.
    Faulted,
    /// Completed by cancellation.
    Canceled,
}

impl TaskStatus {
    /// Returns `true` once the core has left [`TaskStatus::Pending`].
    pub fn is_completed(self) -> bool {
        self != TaskStatus::Pending
    }
}

/// A reusable single-slot promise guarded by a version stamp.
pub struct CompletionCore<T> {
    version: Cell<u32>,
    status: Cell<TaskStatus>,
    outcome: RefCell<Option<Result<T, TriggerError>>>,
    continuation: RefCell<Option<Waker>>,
}

impl<T> CompletionCore<T> {
    /// Create a pending core at version 0.
    pub const fn new() -> Self {
        Self {
            version: Cell::new(0),
            status: Cell::new(TaskStatus::Pending),
            outcome: RefCell::new(None),
            continuation: RefCell::new(None),
        }
    }

    /// The current version; awaitables created now should carry it as their token.
    pub fn version(&self) -> u32 {
        self.version.get()
    }

    /// Start a new generation: bump the version, clear the slot, go back to pending.
    ///
    /// Returns the new token.
    pub fn reset(&self) -> u32 {
        let version = self.version.get().wrapping_add(1);
        self.version.set(version);
        self.status.set(TaskStatus::Pending);
        let _stale = self.outcome.take();
        let _stale_waker = self.continuation.take();
        version
    }

    /// Complete with a value. Returns `false` if the core is not pending.
    pub fn try_set_result(&self, value: T) -> bool {
        self.try_complete(TaskStatus::Succeeded, Ok(value))
    }

    /// Complete with an error. Returns `false` if the core is not pending.
    pub fn try_set_exception(&self, error: SharedError) -> bool {
        self.try_complete(TaskStatus::Faulted, Err(TriggerError::Faulted(error)))
    }

    /// Complete as canceled. Returns `false` if the core is not pending.
    pub fn try_set_canceled(&self) -> bool {
        self.try_complete(TaskStatus::Canceled, Err(TriggerError::Canceled))
    }

    fn try_complete(&self, status: TaskStatus, outcome: Result<T, TriggerError>) -> bool {
        if self.status.get() != TaskStatus::Pending {
            return false;
        }
        *self.outcome.borrow_mut() = Some(outcome);
        self.status.set(status);

        // Take the waker out before waking so a re-entrant poll finds the slot free.
        let continuation = self.continuation.take();
        if let Some(waker) = continuation {
            waker.wake();
        }
        true
    }

    /// Check `token` against the current version without panicking.
    pub fn check_token(&self, token: u32) -> Result<(), StaleToken> {
        let current = self.version.get();
        if token == current {
            Ok(())
        } else {
            Err(StaleToken {
                presented: token,
                current,
            })
        }
    }

    #[track_caller]
    fn validate(&self, token: u32) {
        if let Err(stale) = self.check_token(token) {
            panic!("{stale}");
        }
    }

    /// Status for the generation identified by `token`.
    ///
    /// # Panics
    ///
    /// Panics if `token` is stale.
    #[track_caller]
    pub fn get_status(&self, token: u32) -> TaskStatus {
        self.validate(token);
        self.status.get()
    }

    /// Status of the current generation, without a token check.
    pub fn unchecked_status(&self) -> TaskStatus {
        self.status.get()
    }

    /// Take the result of the generation identified by `token`.
    ///
    /// # Panics
    ///
    /// Panics if `token` is stale, if the core is still pending, or if the
    /// result of this generation was already taken.
    #[track_caller]
    pub fn get_result(&self, token: u32) -> Result<T, TriggerError> {
        self.validate(token);
        if self.status.get() == TaskStatus::Pending {
            panic!("completion core {token} read before it completed");
        }
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => panic!("completion core {token} result was already taken"),
        }
    }

    /// Register `continuation` to be woken when the core leaves pending.
    ///
    /// If the core has already completed, the continuation is woken inline.
    /// Only one continuation is kept; registering again replaces it.
    ///
    /// # Panics
    ///
    /// Panics if `token` is stale.
    #[track_caller]
    pub fn on_completed(&self, continuation: &Waker, token: u32) {
        self.validate(token);
        if self.status.get().is_completed() {
            continuation.wake_by_ref();
            return;
        }
        let mut slot = self.continuation.borrow_mut();
        match slot.as_ref() {
            Some(existing) if existing.will_wake(continuation) => {}
            _ => *slot = Some(continuation.clone()),
        }
    }

    /// Poll the generation identified by `token`.
    #[track_caller]
    pub fn poll_result(&self, cx: &mut Context<'_>, token: u32) -> Poll<Result<T, TriggerError>> {
        if self.get_status(token) == TaskStatus::Pending {
            self.on_completed(cx.waker(), token);
            return Poll::Pending;
        }
        Poll::Ready(self.get_result(token))
    }
}

impl<T> Default for CompletionCore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CompletionCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCore")
            .field("version", &self.version.get())
            .field("status", &self.status.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::{ArcWake, waker};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_waker() -> (Arc<CountingWaker>, Waker) {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = waker(counter.clone());
        (counter, waker)
    }

    #[test]
    fn test_single_transition_per_version() {
        let core = CompletionCore::new();
        let token = core.version();

        assert!(core.try_set_result(1));
        assert!(!core.try_set_result(2));
        assert!(!core.try_set_canceled());
        assert_eq!(core.get_status(token), TaskStatus::Succeeded);
        assert_eq!(core.get_result(token).unwrap(), 1);
    }

    #[test]
    fn test_reset_starts_new_generation() {
        let core = CompletionCore::new();
        let first = core.version();
        core.try_set_canceled();

        let second = core.reset();
        assert_ne!(first, second);
        assert_eq!(core.get_status(second), TaskStatus::Pending);
        assert!(core.try_set_result("late"));
        assert_eq!(core.get_result(second).unwrap(), "late");
    }

    #[test]
    #[should_panic(expected = "stale completion token")]
    fn test_stale_token_fails_fast() {
        let core = CompletionCore::<u8>::new();
        let old = core.version();
        core.reset();
        core.try_set_result(9);
        let _ = core.get_result(old);
    }

    #[test]
    #[should_panic(expected = "already taken")]
    fn test_double_read_fails_fast() {
        let core = CompletionCore::new();
        let token = core.version();
        core.try_set_result(5u8);
        let _ = core.get_result(token);
        let _ = core.get_result(token);
    }

    #[test]
    fn test_check_token_reports_versions() {
        let core = CompletionCore::<()>::new();
        core.reset();
        assert_eq!(
            core.check_token(0),
            Err(StaleToken {
                presented: 0,
                current: 1
            })
        );
        assert!(core.check_token(1).is_ok());
    }

    #[test]
    fn test_continuation_woken_on_completion() {
        let core = CompletionCore::<u8>::new();
        let token = core.version();
        let (counter, waker) = counting_waker();

        core.on_completed(&waker, token);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        core.try_set_exception(Arc::new(std::fmt::Error));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(matches!(core.get_result(token), Err(TriggerError::Faulted(_))));
    }

    #[test]
    fn test_continuation_runs_inline_when_already_completed() {
        let core = CompletionCore::new();
        let token = core.version();
        core.try_set_result(());
        let (counter, waker) = counting_waker();

        core.on_completed(&waker, token);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_drops_pending_continuation() {
        let core = CompletionCore::new();
        let (counter, waker) = counting_waker();
        core.on_completed(&waker, core.version());

        core.reset();
        core.try_set_result(3);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_poll_result() {
        let core = CompletionCore::<u8>::new();
        let token = core.version();
        let (counter, waker) = counting_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(core.poll_result(&mut cx, token).is_pending());
        core.try_set_canceled();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        match core.poll_result(&mut cx, token) {
            Poll::Ready(Err(err)) => assert!(err.is_canceled()),
            other => panic!("unexpected poll result: {other:?}"),
        }
    }
}
