//! # Event Hub
//!
//! An intrusive, doubly-linked multicast list of [`TriggerHandler`]s.
//!
//! Every handler carries its own [`Links`], so linking and unlinking are
//! O(1) and need no allocation beyond the handler itself. A handler is
//! linked into at most one hub at a time.
//!
//! # Delivery rules
//!
//! - [`Hub::publish`] visits handlers in registration order. A handler removed
//!   before it is visited is skipped; a handler added while a publish is in
//!   flight is not visited by that publish.
//! - [`Hub::complete`] and [`Hub::fault`] make the hub terminal, detach the
//!   whole list and notify every detached handler. Handlers added to a
//!   terminal hub are notified immediately and never linked.
//! - Dropping a hub completes it first.
//! - Callbacks are infallible. A panic inside a callback unwinds out of
//!   `publish`/`complete` and skips the handlers after it in that call; the
//!   hub itself stays consistent and keeps working.

use crate::error::SharedError;
use std::{
    cell::{Cell, RefCell},
    fmt, ptr,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

/// A consumer that can be linked into a [`Hub`].
pub trait TriggerHandler<T: 'static>: 'static {
    /// A value was published.
    fn on_next(&self, value: &T);

    /// The source faulted. The hub is terminal afterwards.
    fn on_error(&self, error: &SharedError);

    /// The source completed. The hub is terminal afterwards.
    fn on_completed(&self);

    /// The intrusive links owned by this handler.
    fn links(&self) -> &Links<T>;
}

type Node<T> = Rc<dyn TriggerHandler<T>>;
type WeakNode<T> = Weak<dyn TriggerHandler<T>>;

/// Identity of a [`Hub`], unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HubId(u64);

impl HubId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        HubId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hub-{}", self.0)
    }
}

/// Intrusive list links embedded in every handler.
///
/// The hub owns the forward (`next`) references; `prev` is weak.
pub struct Links<T: 'static> {
    hub: Cell<Option<HubId>>,
    seq: Cell<u64>,
    prev: RefCell<Option<WeakNode<T>>>,
    next: RefCell<Option<Node<T>>>,
}

impl<T: 'static> Links<T> {
    /// Unlinked links.
    pub const fn new() -> Self {
        Self {
            hub: Cell::new(None),
            seq: Cell::new(0),
            prev: RefCell::new(None),
            next: RefCell::new(None),
        }
    }

    /// Returns `true` while linked into any hub.
    pub fn is_linked(&self) -> bool {
        self.hub.get().is_some()
    }

    /// The hub currently holding these links.
    pub fn hub_id(&self) -> Option<HubId> {
        self.hub.get()
    }

    /// Reset to the unlinked state, returning the forward reference.
    fn detach(&self) -> Option<Node<T>> {
        self.hub.set(None);
        let _prev = self.prev.take();
        self.next.take()
    }
}

impl<T: 'static> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links").field("hub", &self.hub.get()).finish()
    }
}

/// A chain cut off from its hub, unlinked one node at a time.
///
/// Dropping it unlinks whatever is left, so an unwinding callback cannot
/// leave handlers that believe they are still linked.
struct Detached<T: 'static> {
    next: Option<Node<T>>,
}

impl<T: 'static> Detached<T> {
    fn pop(&mut self) -> Option<Node<T>> {
        let node = self.next.take()?;
        self.next = node.links().detach();
        Some(node)
    }
}

impl<T: 'static> Drop for Detached<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

/// Pops one publish cursor when a publish returns or unwinds.
struct CursorGuard<'a, T: 'static> {
    cursors: &'a RefCell<Vec<Option<Node<T>>>>,
    depth: usize,
}

impl<T: 'static> Drop for CursorGuard<'_, T> {
    fn drop(&mut self) {
        loop {
            let popped = {
                let mut cursors = self.cursors.borrow_mut();
                if cursors.len() <= self.depth {
                    break;
                }
                cursors.pop()
            };
            drop(popped);
        }
    }
}

/// Multicast list of handlers for one event source.
pub struct Hub<T: 'static> {
    id: HubId,
    head: RefCell<Option<Node<T>>>,
    tail: RefCell<Option<WeakNode<T>>>,
    len: Cell<usize>,
    seq: Cell<u64>,
    terminal: Cell<bool>,
    // One cursor per in-flight publish (publishes may nest).
    cursors: RefCell<Vec<Option<Node<T>>>>,
}

impl<T: 'static> Hub<T> {
    /// Create an empty, non-terminal hub.
    pub fn new() -> Self {
        Self {
            id: HubId::next(),
            head: RefCell::new(None),
            tail: RefCell::new(None),
            len: Cell::new(0),
            seq: Cell::new(0),
            terminal: Cell::new(false),
            cursors: RefCell::new(Vec::new()),
        }
    }

    /// This hub's identity.
    pub fn id(&self) -> HubId {
        self.id
    }

    /// Number of linked handlers.
    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Returns `true` if no handler is linked.
    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    /// Returns `true` once [`complete`](Self::complete) or [`fault`](Self::fault) ran.
    pub fn is_terminal(&self) -> bool {
        self.terminal.get()
    }

    /// Returns `true` if `handler` is linked into this hub.
    pub fn contains(&self, handler: &dyn TriggerHandler<T>) -> bool {
        handler.links().hub.get() == Some(self.id)
    }

    /// Append `handler` to the list.
    ///
    /// On a terminal hub the handler receives `on_completed` immediately and
    /// is not linked. Adding a handler that is already linked here is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `handler` is linked into a different hub.
    pub fn add_handler(&self, handler: Node<T>) {
        if self.terminal.get() {
            handler.on_completed();
            return;
        }

        let links = handler.links();
        match links.hub.get() {
            Some(id) if id == self.id => return,
            Some(other) => panic!("handler is already linked into {other}, cannot add it to {}", self.id),
            None => {}
        }

        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        links.seq.set(seq);
        links.hub.set(Some(self.id));

        let last = self
            .tail
            .replace(Some(Rc::downgrade(&handler)))
            .and_then(|tail| tail.upgrade());
        match last {
            Some(last) => {
                links.prev.replace(Some(Rc::downgrade(&last)));
                last.links().next.replace(Some(handler));
            }
            None => {
                self.head.replace(Some(handler));
            }
        }
        self.len.set(self.len.get() + 1);

        #[cfg(feature = "tracing")]
        tracing::trace!(hub = %self.id, handlers = self.len.get(), "handler linked");
    }

    /// Unlink `handler`. Returns `false` if it was not linked into this hub.
    pub fn remove_handler(&self, handler: &dyn TriggerHandler<T>) -> bool {
        let links = handler.links();
        if links.hub.get() != Some(self.id) {
            return false;
        }
        links.hub.set(None);
        let prev = links.prev.take();
        let next = links.next.take();

        // An in-flight publish that was about to visit this node moves on to its successor.
        for cursor in self.cursors.borrow_mut().iter_mut() {
            if cursor
                .as_ref()
                .is_some_and(|node| ptr::eq(node.links(), links))
            {
                *cursor = next.clone();
            }
        }

        match &next {
            Some(next) => {
                next.links().prev.replace(prev.clone());
            }
            None => {
                self.tail.replace(prev.clone());
            }
        }
        // Replacing the predecessor's forward reference releases the hub's
        // ownership of `handler`; the old value drops after the borrow ends.
        let _released = match prev.and_then(|prev| prev.upgrade()) {
            Some(prev) => prev.links().next.replace(next),
            None => self.head.replace(next),
        };
        self.len.set(self.len.get() - 1);

        #[cfg(feature = "tracing")]
        tracing::trace!(hub = %self.id, handlers = self.len.get(), "handler unlinked");
        true
    }

    /// Deliver `value` to every linked handler, in registration order.
    pub fn publish(&self, value: &T) {
        let depth = {
            let mut cursors = self.cursors.borrow_mut();
            cursors.push(self.head.borrow().clone());
            cursors.len() - 1
        };
        let _guard = CursorGuard {
            cursors: &self.cursors,
            depth,
        };
        let newest = self.seq.get();

        loop {
            let node = {
                let mut cursors = self.cursors.borrow_mut();
                let Some(node) = cursors[depth].take() else {
                    break;
                };
                // Capture the successor before the callback: a one-shot
                // handler unlinks itself inside `on_next`.
                cursors[depth] = node.links().next.borrow().clone();
                node
            };
            if node.links().seq.get() > newest {
                // Linked during this publish, and so is everything after it.
                break;
            }
            node.on_next(value);
        }
    }

    /// Mark the hub terminal and deliver `on_completed` to every handler.
    ///
    /// The list is empty afterwards. Calling this on a terminal hub does nothing.
    pub fn complete(&self) {
        if self.terminal.replace(true) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(hub = %self.id, handlers = self.len.get(), "hub completed");

        let mut chain = self.detach_all();
        while let Some(node) = chain.pop() {
            node.on_completed();
        }
    }

    /// Mark the hub terminal and deliver `on_error` to every handler.
    ///
    /// Calling this on a terminal hub does nothing.
    pub fn fault(&self, error: SharedError) {
        if self.terminal.replace(true) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(hub = %self.id, handlers = self.len.get(), %error, "hub faulted");

        let mut chain = self.detach_all();
        while let Some(node) = chain.pop() {
            node.on_error(&error);
        }
    }

    // Every detached node is marked unlinked up front, so a callback that
    // removes a handler further down the chain finds nothing to unlink.
    fn detach_all(&self) -> Detached<T> {
        for cursor in self.cursors.borrow_mut().iter_mut() {
            *cursor = None;
        }
        self.tail.replace(None);
        self.len.set(0);
        let head = self.head.take();
        let mut node = head.clone();
        while let Some(current) = node {
            current.links().hub.set(None);
            node = current.links().next.borrow().clone();
        }
        Detached { next: head }
    }
}

impl<T: 'static> Default for Hub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Drop for Hub<T> {
    // A hub dropped with handlers still linked completes them, so no awaiter
    // is left waiting on a source that no longer exists.
    fn drop(&mut self) {
        self.complete();
    }
}

impl<T: 'static> fmt::Debug for Hub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("id", &self.id)
            .field("len", &self.len.get())
            .field("terminal", &self.terminal.get())
            .finish()
    }
}

/// Something that fans values out through a [`Hub`].
///
/// Sources with their own registration rules (for example a readiness phase)
/// override [`add_handler`](Self::add_handler); removal always goes straight
/// to the hub.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an event source for `{T}`",
    label = "missing `EventSource<{T}>` implementation",
    note = "Expose the `Hub<{T}>` values are published through."
)]
pub trait EventSource<T: 'static> {
    /// The hub values are published through.
    fn hub(&self) -> &Rc<Hub<T>>;

    /// Register `handler` with this source.
    fn add_handler(&self, handler: Rc<dyn TriggerHandler<T>>) {
        Hub::add_handler(self.hub(), handler);
    }
}

impl<T: 'static> EventSource<T> for Rc<Hub<T>> {
    fn hub(&self) -> &Rc<Hub<T>> {
        self
    }
}
