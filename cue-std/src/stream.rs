//! # Stream Adapter
//!
//! Exposes an [`EventSource`] as a pull-based sequence. Each pull awaits the
//! next published value; values published while no pull is outstanding are
//! dropped, not buffered.
//!
//! The handler is registered lazily on the first pull and reuses one
//! [`CompletionCore`] for every pull after that.

use crate::{handler::AdapterState, tracker::Tracked};
use cue_core::{
    CancelRegistration, CancelToken, CompletionCore, EventSource, Hub, Links, OnCancel,
    SharedError, TaskStatus, TriggerError, TriggerHandler,
};
use futures::stream::{FusedStream, Stream};
use std::{
    any::type_name,
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
};

/// How the source ended, remembered for the next pull.
#[derive(Debug, Clone)]
enum End {
    Completed,
    Faulted(SharedError),
}

struct StreamHandler<T: 'static> {
    links: Links<T>,
    core: CompletionCore<Option<T>>,
    hub: Weak<Hub<T>>,
    state: Cell<AdapterState>,
    end: RefCell<Option<End>>,
    registration: RefCell<Option<CancelRegistration>>,
    tracked: Tracked,
}

impl<T: Clone + 'static> StreamHandler<T> {
    fn new(hub: &Rc<Hub<T>>) -> Rc<Self> {
        Rc::new(Self {
            links: Links::new(),
            core: CompletionCore::new(),
            hub: Rc::downgrade(hub),
            state: Cell::new(AdapterState::empty()),
            end: RefCell::new(None),
            registration: RefCell::new(None),
            tracked: Tracked::default(),
        })
    }

    fn attach<S: EventSource<T> + ?Sized>(self: &Rc<Self>, source: &S, cancel: &CancelToken) {
        self.tracked.start(type_name::<Self>());
        source.add_handler(self.clone());
        if cancel.can_be_canceled() && !self.is_disposed() {
            let weak = Rc::downgrade(self);
            let callback: Weak<dyn OnCancel> = weak;
            let registration = cancel.register(callback);
            *self.registration.borrow_mut() = Some(registration);
        }
    }

    fn is_disposed(&self) -> bool {
        self.state.get().contains(AdapterState::DISPOSED)
    }

    fn finish(&self, end: End) {
        self.state.set(self.state.get() | AdapterState::ENDED);
        let delivered = match &end {
            End::Completed => self.core.try_set_result(None),
            End::Faulted(error) => self.core.try_set_exception(error.clone()),
        };
        if !delivered {
            *self.end.borrow_mut() = Some(end);
        }
    }

    fn dispose(&self) {
        let state = self.state.get();
        if state.contains(AdapterState::DISPOSED) {
            return;
        }
        self.state.set(state | AdapterState::DISPOSED);

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

impl<T: Clone + 'static> TriggerHandler<T> for StreamHandler<T> {
    fn on_next(&self, value: &T) {
        if self.core.unchecked_status() == TaskStatus::Pending {
            self.core.try_set_result(Some(value.clone()));
        }
    }

    fn on_error(&self, error: &SharedError) {
        self.finish(End::Faulted(error.clone()));
    }

    fn on_completed(&self) {
        self.finish(End::Completed);
    }

    fn links(&self) -> &Links<T> {
        &self.links
    }
}

impl<T: Clone + 'static> OnCancel for StreamHandler<T> {
    fn on_cancel(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(adapter = type_name::<Self>(), "stream canceled");
        self.dispose();
    }
}

/// Result of starting a pull.
enum Start<T> {
    Ready(Result<Option<T>, TriggerError>),
    Waiting(u32),
}

/// A pull-based view of an [`EventSource`].
///
/// Pull with [`pull`](Self::pull), or drive it as a [`Stream`] of
/// `Result<T, TriggerError>`. Cancellation surfaces once as
/// `Err(TriggerError::Canceled)`; the stream is finished afterwards.
///
/// ```rust,ignore
/// let mut clicks = button.as_stream(&cancel);
/// while let Some(click) = clicks.pull().await? {
///     handle(click);
/// }
/// ```
pub struct TriggerStream<T: Clone + 'static, S: EventSource<T>> {
    source: S,
    cancel: CancelToken,
    handler: Option<Rc<StreamHandler<T>>>,
    outstanding: Option<u32>,
    finished: bool,
}

impl<T: Clone + 'static, S: EventSource<T>> TriggerStream<T, S> {
    pub(crate) fn new(source: S, cancel: CancelToken) -> Self {
        Self {
            source,
            cancel,
            handler: None,
            outstanding: None,
            finished: false,
        }
    }

    /// Await the next value; `Ok(None)` once the source has completed.
    ///
    /// The pull starts eagerly: a canceled token is reported on the first
    /// poll without registering anything. Dropping an unresolved pull keeps
    /// its generation, and the next pull continues it.
    pub fn pull(&mut self) -> Pull<'_, T, S> {
        let immediate = match self.start() {
            Start::Ready(outcome) => Some(outcome),
            Start::Waiting(_) => None,
        };
        Pull {
            stream: self,
            immediate,
        }
    }

    /// Unregister and finish the stream. Idempotent.
    pub fn dispose(&mut self) {
        self.finished = true;
        self.outstanding = None;
        if let Some(handler) = &self.handler {
            handler.dispose();
        }
    }

    /// Returns `true` while the handler is linked into the source's hub.
    pub fn is_registered(&self) -> bool {
        self.handler
            .as_ref()
            .is_some_and(|handler| handler.links.is_linked())
    }

    /// Returns `true` once the stream will yield nothing more.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn start(&mut self) -> Start<T> {
        if let Some(token) = self.outstanding {
            return Start::Waiting(token);
        }
        if self.finished {
            return Start::Ready(Ok(None));
        }
        if self.cancel.is_canceled() {
            self.dispose();
            return Start::Ready(Err(TriggerError::Canceled));
        }

        let token = match self.handler.clone() {
            Some(handler) => {
                let ended = handler.end.take();
                if let Some(end) = ended {
                    self.dispose();
                    return Start::Ready(match end {
                        End::Completed => Ok(None),
                        End::Faulted(error) => Err(TriggerError::Faulted(error)),
                    });
                }
                handler.core.reset()
            }
            None => {
                // Open the generation before registering so a terminal
                // source can answer it right away.
                let handler = StreamHandler::new(self.source.hub());
                let token = handler.core.reset();
                handler.attach(&self.source, &self.cancel);
                self.handler = Some(handler);
                token
            }
        };
        self.outstanding = Some(token);
        Start::Waiting(token)
    }

    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<T>, TriggerError>> {
        let token = match self.start() {
            Start::Ready(outcome) => return Poll::Ready(outcome),
            Start::Waiting(token) => token,
        };
        let Some(handler) = self.handler.as_ref() else {
            return Poll::Ready(Ok(None));
        };
        let outcome = futures::ready!(handler.core.poll_result(cx, token));
        self.outstanding = None;
        if !matches!(outcome, Ok(Some(_))) {
            self.dispose();
        }
        Poll::Ready(outcome)
    }
}

impl<T: Clone + 'static, S: EventSource<T>> Drop for TriggerStream<T, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

// Nothing is structurally pinned.
impl<T: Clone + 'static, S: EventSource<T>> Unpin for TriggerStream<T, S> {}

impl<T: Clone + 'static, S: EventSource<T>> Stream for TriggerStream<T, S> {
    type Item = Result<T, TriggerError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let outcome = futures::ready!(self.get_mut().poll_pull(cx));
        Poll::Ready(outcome.transpose())
    }
}

impl<T: Clone + 'static, S: EventSource<T>> FusedStream for TriggerStream<T, S> {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<T: Clone + 'static, S: EventSource<T>> fmt::Debug for TriggerStream<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerStream")
            .field("outstanding", &self.outstanding)
            .field("finished", &self.finished)
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// One pull on a [`TriggerStream`].
#[must_use = "futures do nothing unless polled"]
pub struct Pull<'a, T: Clone + 'static, S: EventSource<T>> {
    stream: &'a mut TriggerStream<T, S>,
    immediate: Option<Result<Option<T>, TriggerError>>,
}

impl<T: Clone + 'static, S: EventSource<T>> Unpin for Pull<'_, T, S> {}

impl<T: Clone + 'static, S: EventSource<T>> Future for Pull<'_, T, S> {
    type Output = Result<Option<T>, TriggerError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.immediate.take() {
            return Poll::Ready(outcome);
        }
        this.stream.poll_pull(cx)
    }
}
