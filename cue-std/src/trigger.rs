//! # Lifecycle Triggers
//!
//! A trigger is the per-entity, per-event source a host attaches lazily the
//! first time someone subscribes. [`TriggerBase`] carries what every trigger
//! needs: the [`Hub`], a weak link back to its [`Owner`], and the
//! [`Scheduler`] used for deferred-registration monitoring.
//!
//! # Lifecycle
//!
//! 1. Created on first subscription. Not yet *awake*.
//! 2. The host calls [`TriggerBase::awake`] once the owner becomes active.
//! 3. The host calls [`TriggerBase::raise`] for every event.
//! 4. The host calls [`TriggerBase::destroy`] on teardown, completing every
//!    handler; later registrations complete immediately.
//!
//! A host only delivers teardown to triggers that were awakened. Handlers
//! registered before that point are covered by an
//! [`AwakeMonitor`](crate::monitor::AwakeMonitor), which forces the teardown
//! if the owner dies first.

use crate::monitor::AwakeMonitor;
use cue_core::{EventSource, Hub, Phase, Scheduler, SharedError, TriggerHandler};
use std::{
    cell::Cell,
    fmt,
    rc::{Rc, Weak},
};

/// The entity a trigger belongs to.
pub trait Owner {
    /// Returns `false` once the owner has been torn down or dropped.
    fn is_alive(&self) -> bool;
}

/// Readiness and teardown of a trigger, independent of its value type.
pub trait TriggerLifecycle {
    /// Mark the trigger ready. Idempotent.
    fn awake(&self);

    /// Complete the trigger. Idempotent.
    fn destroy(&self);

    /// Returns `true` once [`awake`](Self::awake) ran.
    fn is_awake(&self) -> bool;

    /// Returns `true` once [`destroy`](Self::destroy) ran.
    fn is_destroyed(&self) -> bool;

    /// Returns `true` while the owner is alive.
    fn is_owner_alive(&self) -> bool;
}

struct TriggerInner<T: 'static> {
    hub: Rc<Hub<T>>,
    owner: Weak<dyn Owner>,
    scheduler: Rc<dyn Scheduler>,
    awake: Cell<bool>,
    destroyed: Cell<bool>,
}

impl<T: 'static> TriggerLifecycle for TriggerInner<T> {
    fn awake(&self) {
        self.awake.set(true);
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(hub = %self.hub.id(), handlers = self.hub.len(), "trigger destroyed");
        self.hub.complete();
    }

    fn is_awake(&self) -> bool {
        self.awake.get()
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn is_owner_alive(&self) -> bool {
        self.owner.upgrade().is_some_and(|owner| owner.is_alive())
    }
}

/// Shared state behind every trigger. Clones refer to the same trigger.
pub struct TriggerBase<T: 'static> {
    inner: Rc<TriggerInner<T>>,
}

impl<T: 'static> TriggerBase<T> {
    /// Create a trigger owned by `owner`, not yet awake.
    pub fn new(owner: Weak<dyn Owner>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(TriggerInner {
                hub: Rc::new(Hub::new()),
                owner,
                scheduler,
                awake: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// The owner became active.
    pub fn awake(&self) {
        self.inner.awake();
    }

    /// Deliver `value` to every registered handler.
    pub fn raise(&self, value: T) {
        self.inner.hub.publish(&value);
    }

    /// Fault every registered handler. The trigger is destroyed afterwards.
    pub fn raise_error(&self, error: SharedError) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.inner.hub.fault(error);
    }

    /// The owner was torn down.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    /// Returns `true` once awakened.
    pub fn is_awake(&self) -> bool {
        self.inner.awake.get()
    }

    /// Returns `true` once destroyed or faulted.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.hub.len()
    }

    /// Type-erased lifecycle handle.
    pub fn lifecycle(&self) -> Rc<dyn TriggerLifecycle> {
        self.inner.clone()
    }
}

impl<T: 'static> EventSource<T> for TriggerBase<T> {
    fn hub(&self) -> &Rc<Hub<T>> {
        &self.inner.hub
    }

    fn add_handler(&self, handler: Rc<dyn TriggerHandler<T>>) {
        let inner = &self.inner;
        if !inner.awake.get() && !inner.destroyed.get() {
            let weak = Rc::downgrade(inner);
            let lifecycle: Weak<dyn TriggerLifecycle> = weak;
            inner
                .scheduler
                .enqueue(Phase::Update, Box::new(AwakeMonitor::new(lifecycle)));
        }
        Hub::add_handler(&inner.hub, handler);
    }
}

impl<T: 'static> Clone for TriggerBase<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for TriggerBase<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerBase")
            .field("hub", &self.inner.hub)
            .field("awake", &self.inner.awake.get())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

/// A typed lifecycle event source.
///
/// Usually derived:
///
/// ```rust,ignore
/// #[derive(Trigger)]
/// #[trigger(event = "click")]
/// pub struct ClickTrigger {
///     base: TriggerBase<Click>,
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Trigger`",
    label = "missing `Trigger` implementation",
    note = "Add `#[derive(Trigger)]` to a struct with one `TriggerBase<T>` field."
)]
pub trait Trigger: 'static {
    /// The value delivered to awaiters.
    type Value: Clone + 'static;

    /// Event name, as used in generated method names.
    const EVENT: &'static str;

    /// Wrap a freshly created base.
    fn from_base(base: TriggerBase<Self::Value>) -> Self;

    /// The shared trigger state.
    fn base(&self) -> &TriggerBase<Self::Value>;
}
