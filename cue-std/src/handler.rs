//! # Single-Awaiter Adapter
//!
//! Bridges one [`EventSource`] to one awaiter. The adapter is itself the
//! [`TriggerHandler`] linked into the source's hub and the [`OnCancel`]
//! callback registered on the caller's token, so a wait costs one allocation
//! for the adapter and none per value.
//!
//! Two flavors share the implementation:
//!
//! - **One-shot** ([`EventSourceExt::wait_once`]): resolves with the next
//!   value and unregisters itself.
//! - **Reusable** ([`EventSourceExt::get_handle`]): stays registered; each
//!   [`ReusableWaiter::wait`] starts a new generation of the same
//!   [`CompletionCore`].
//!
//! Values published while nobody is waiting are dropped.

use crate::{stream::TriggerStream, tracker::Tracked};
use bitflags::bitflags;
use cue_core::{
    CancelRegistration, CancelToken, CompletionCore, EventSource, Hub, Links, OnCancel,
    SharedError, TaskStatus, TriggerError, TriggerHandler,
};
use std::{
    any::type_name,
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
};

bitflags! {
    /// Lifecycle flags shared by the adapters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct AdapterState: u8 {
        /// Stays registered across waits.
        const REUSABLE = 1;
        /// Unregistered for good.
        const DISPOSED = 1 << 1;
        /// The source completed or faulted.
        const ENDED = 1 << 2;
    }
}

/// The handler behind [`Wait`] and [`ReusableWaiter`].
pub struct AwaitHandler<T: 'static> {
    links: Links<T>,
    core: CompletionCore<T>,
    hub: Weak<Hub<T>>,
    state: Cell<AdapterState>,
    registration: RefCell<Option<CancelRegistration>>,
    tracked: Tracked,
}

impl<T: Clone + 'static> AwaitHandler<T> {
    pub(crate) fn register<S>(source: &S, cancel: &CancelToken, reusable: bool) -> Rc<Self>
    where
        S: EventSource<T> + ?Sized,
    {
        let mut state = AdapterState::empty();
        state.set(AdapterState::REUSABLE, reusable);
        let handler = Rc::new(Self {
            links: Links::new(),
            core: CompletionCore::new(),
            hub: Rc::downgrade(source.hub()),
            state: Cell::new(state),
            registration: RefCell::new(None),
            tracked: Tracked::default(),
        });

        if cancel.is_canceled() {
            // Never touches the source.
            handler.state.set(state | AdapterState::DISPOSED);
            handler.core.try_set_canceled();
            return handler;
        }

        handler.tracked.start(if reusable {
            type_name::<ReusableWaiter<T>>()
        } else {
            type_name::<Wait<T>>()
        });
        source.add_handler(handler.clone());

        // A terminal source may already have disposed a one-shot handler.
        if cancel.can_be_canceled() && !handler.is_disposed() {
            let weak = Rc::downgrade(&handler);
            let callback: Weak<dyn OnCancel> = weak;
            let registration = cancel.register(callback);
            *handler.registration.borrow_mut() = Some(registration);
        }
        handler
    }

    fn is_reusable(&self) -> bool {
        self.state.get().contains(AdapterState::REUSABLE)
    }

    fn insert(&self, flag: AdapterState) {
        self.state.set(self.state.get() | flag);
    }

    /// Returns `true` once the handler is permanently unregistered.
    pub fn is_disposed(&self) -> bool {
        self.state.get().contains(AdapterState::DISPOSED)
    }

    /// Returns `true` while linked into the source's hub.
    pub fn is_registered(&self) -> bool {
        self.links.is_linked()
    }

    /// Token for the awaitable about to be handed out.
    fn begin_wait(&self) -> u32 {
        if !self.is_reusable() {
            return self.core.version();
        }
        let token = self.core.reset();
        if self.state.get().intersects(AdapterState::DISPOSED | AdapterState::ENDED) {
            self.core.try_set_canceled();
        }
        token
    }

    /// Unlink, release the cancellation registration and resolve any pending
    /// wait as canceled. Idempotent.
    pub(crate) fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.insert(AdapterState::DISPOSED);

        if let Some(hub) = self.hub.upgrade() {
            hub.remove_handler(self);
        }
        let registration = self.registration.take();
        if let Some(mut registration) = registration {
            registration.dispose();
        }
        self.tracked.release();
        self.core.try_set_canceled();
    }
}

impl<T: Clone + 'static> TriggerHandler<T> for AwaitHandler<T> {
    fn on_next(&self, value: &T) {
        if self.core.unchecked_status() != TaskStatus::Pending {
            return;
        }
        self.core.try_set_result(value.clone());
        if !self.is_reusable() {
            self.dispose();
        }
    }

    fn on_error(&self, error: &SharedError) {
        self.insert(AdapterState::ENDED);
        self.core.try_set_exception(error.clone());
        if !self.is_reusable() {
            self.dispose();
        }
    }

    fn on_completed(&self) {
        self.insert(AdapterState::ENDED);
        self.core.try_set_canceled();
        if !self.is_reusable() {
            self.dispose();
        }
    }

    fn links(&self) -> &Links<T> {
        &self.links
    }
}

impl<T: Clone + 'static> OnCancel for AwaitHandler<T> {
    fn on_cancel(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(adapter = type_name::<Self>(), "wait canceled");
        self.dispose();
    }
}

impl<T: 'static> fmt::Debug for AwaitHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitHandler")
            .field("state", &self.state.get())
            .field("status", &self.core.unchecked_status())
            .field("links", &self.links)
            .finish()
    }
}

/// A single wait on an [`AwaitHandler`].
///
/// Resolves to the next published value, to [`TriggerError::Canceled`] if the
/// token fires or the source completes first, or to
/// [`TriggerError::Faulted`] if the source faults.
///
/// Dropping an unresolved one-shot `Wait` unregisters its handler.
///
/// # Panics
///
/// Polling after the future returned `Ready` panics, as does polling a
/// `Wait` whose generation was superseded by a later
/// [`ReusableWaiter::wait`].
#[must_use = "futures do nothing unless polled"]
pub struct Wait<T: Clone + 'static> {
    handler: Option<Rc<AwaitHandler<T>>>,
    token: u32,
}

impl<T: Clone + 'static> Wait<T> {
    fn new(handler: Rc<AwaitHandler<T>>) -> Self {
        let token = handler.begin_wait();
        Self {
            handler: Some(handler),
            token,
        }
    }

    /// The completion token this wait presents.
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Status of this wait, or `None` once its result has been taken.
    pub fn status(&self) -> Option<TaskStatus> {
        self.handler
            .as_ref()
            .map(|handler| handler.core.get_status(self.token))
    }
}

impl<T: Clone + 'static> Future for Wait<T> {
    type Output = Result<T, TriggerError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(handler) = this.handler.as_ref() else {
            panic!("`Wait` polled after completion");
        };
        let outcome = futures::ready!(handler.core.poll_result(cx, this.token));
        if let Some(handler) = this.handler.take() {
            if !handler.is_reusable() {
                handler.dispose();
            }
        }
        Poll::Ready(outcome)
    }
}

impl<T: Clone + 'static> Drop for Wait<T> {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            if !handler.is_reusable() {
                handler.dispose();
            }
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Wait<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("token", &self.token)
            .field("handler", &self.handler)
            .finish()
    }
}

/// A registration that can be awaited repeatedly.
///
/// At most one wait may be outstanding: calling [`wait`](Self::wait) again
/// starts a new generation and the previous `Wait` panics if polled.
/// Dropping the waiter disposes it.
pub struct ReusableWaiter<T: Clone + 'static> {
    handler: Rc<AwaitHandler<T>>,
}

impl<T: Clone + 'static> ReusableWaiter<T> {
    /// Wait for the next value.
    ///
    /// Once the waiter is disposed, or the source has ended, the returned
    /// future resolves as canceled.
    pub fn wait(&self) -> Wait<T> {
        Wait::new(self.handler.clone())
    }

    /// Unregister from the source and resolve a pending wait as canceled.
    pub fn dispose(&self) {
        self.handler.dispose();
    }

    /// Returns `true` once disposed, explicitly or through cancellation.
    pub fn is_disposed(&self) -> bool {
        self.handler.is_disposed()
    }

    /// Returns `true` while linked into the source's hub.
    pub fn is_registered(&self) -> bool {
        self.handler.is_registered()
    }
}

impl<T: Clone + 'static> Drop for ReusableWaiter<T> {
    fn drop(&mut self) {
        self.handler.dispose();
    }
}

impl<T: Clone + 'static> fmt::Debug for ReusableWaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReusableWaiter").field(&self.handler).finish()
    }
}

/// Awaitable views over any [`EventSource`].
pub trait EventSourceExt<T: Clone + 'static>: EventSource<T> {
    /// Register a one-shot handler now and wait for the next value.
    ///
    /// An already-canceled token yields a canceled wait without registering.
    fn wait_once(&self, cancel: &CancelToken) -> Wait<T> {
        Wait::new(AwaitHandler::register(self, cancel, false))
    }

    /// Register a handler that can be awaited repeatedly.
    fn get_handle(&self, cancel: &CancelToken) -> ReusableWaiter<T> {
        ReusableWaiter {
            handler: AwaitHandler::register(self, cancel, true),
        }
    }

    /// Pull published values one at a time.
    ///
    /// Nothing is registered until the first pull.
    fn as_stream(&self, cancel: &CancelToken) -> TriggerStream<T, Self>
    where
        Self: Clone + Sized,
    {
        TriggerStream::new(self.clone(), cancel.clone())
    }
}

impl<T: Clone + 'static, S: EventSource<T> + ?Sized> EventSourceExt<T> for S {}
