//! Single-threaded cooperative cancellation.
//!
//! A [`CancelSource`] hands out [`CancelToken`]s. Consumers register an
//! [`OnCancel`] callback through [`CancelToken::register`] and get a
//! [`CancelRegistration`] back; releasing the registration (explicitly or by
//! dropping it) unhooks the callback. Callbacks are held as `Weak`
//! references to the consumer itself, so a registration captures no closure
//! state and does not keep the consumer alive.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

/// Receives the cancellation signal.
pub trait OnCancel {
    /// Called once, synchronously, when the token is canceled.
    fn on_cancel(&self);
}

struct Slot {
    id: u64,
    callback: Weak<dyn OnCancel>,
}

#[derive(Default)]
struct CancelState {
    canceled: Cell<bool>,
    next_id: Cell<u64>,
    slots: RefCell<Vec<Option<Slot>>>,
    free: RefCell<Vec<usize>>,
}

impl CancelState {
    fn insert(&self, callback: Weak<dyn OnCancel>) -> (usize, u64) {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let slot = Some(Slot { id, callback });

        let mut slots = self.slots.borrow_mut();
        let index = match self.free.borrow_mut().pop() {
            Some(index) => {
                slots[index] = slot;
                index
            }
            None => {
                slots.push(slot);
                slots.len() - 1
            }
        };
        (index, id)
    }

    fn release(&self, index: usize, id: u64) -> bool {
        let mut slots = self.slots.borrow_mut();
        let Some(entry) = slots.get_mut(index) else {
            return false;
        };
        if !entry.as_ref().is_some_and(|slot| slot.id == id) {
            return false;
        }
        *entry = None;
        self.free.borrow_mut().push(index);
        true
    }

    fn cancel(&self) {
        if self.canceled.replace(true) {
            return;
        }
        // Detach the whole table first; callbacks may release their own
        // registrations while we iterate.
        let slots = self.slots.take();
        self.free.borrow_mut().clear();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            registrations = slots.iter().flatten().count(),
            "cancellation requested"
        );

        for slot in slots.into_iter().flatten() {
            if let Some(callback) = slot.callback.upgrade() {
                callback.on_cancel();
            }
        }
    }
}

/// The owning side of a cancellation signal.
pub struct CancelSource {
    state: Rc<CancelState>,
}

impl CancelSource {
    /// Create a source that has not been canceled.
    pub fn new() -> Self {
        Self {
            state: Rc::new(CancelState::default()),
        }
    }

    /// A token observing this source.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            state: Some(self.state.clone()),
        }
    }

    /// Cancel, running every live registration once. Later calls do nothing.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_canceled(&self) -> bool {
        self.state.canceled.get()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSource")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

/// The observing side of a cancellation signal.
///
/// [`CancelToken::none`] (also the `Default`) can never be canceled.
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Option<Rc<CancelState>>,
}

impl CancelToken {
    /// A token that is never canceled.
    pub const fn none() -> Self {
        Self { state: None }
    }

    /// A token that is already canceled.
    pub fn canceled() -> Self {
        let source = CancelSource::new();
        source.cancel();
        source.token()
    }

    /// Returns `true` if the source has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.canceled.get())
    }

    /// Returns `false` for tokens that can never fire.
    pub fn can_be_canceled(&self) -> bool {
        self.state.is_some()
    }

    /// Register `callback` to run on cancellation.
    ///
    /// If the token is already canceled the callback runs inline and the
    /// returned registration is empty.
    pub fn register(&self, callback: Weak<dyn OnCancel>) -> CancelRegistration {
        let Some(state) = &self.state else {
            return CancelRegistration::empty();
        };
        if state.canceled.get() {
            if let Some(callback) = callback.upgrade() {
                callback.on_cancel();
            }
            return CancelRegistration::empty();
        }
        let (index, id) = state.insert(callback);
        CancelRegistration {
            state: Rc::downgrade(state),
            index,
            id,
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("can_be_canceled", &self.can_be_canceled())
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

/// A live callback registration on a [`CancelToken`].
///
/// Released on [`dispose`](Self::dispose) or drop, whichever comes first.
#[must_use = "dropping a registration unhooks the callback immediately"]
pub struct CancelRegistration {
    state: Weak<CancelState>,
    index: usize,
    id: u64,
}

impl CancelRegistration {
    fn empty() -> Self {
        Self {
            state: Weak::new(),
            index: 0,
            id: 0,
        }
    }

    /// Unhook the callback. Returns `true` only for the call that released it.
    pub fn dispose(&mut self) -> bool {
        let state = std::mem::take(&mut self.state);
        match state.upgrade() {
            Some(state) => state.release(self.index, self.id),
            None => false,
        }
    }
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for CancelRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelRegistration")
            .field("live", &(self.state.strong_count() > 0))
            .finish()
    }
}
