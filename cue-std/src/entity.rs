//! # Entity
//!
//! A minimal host object: it owns lazily attached triggers, drives their
//! readiness and teardown, and exposes a token canceled on destruction.
//!
//! ```rust,ignore
//! let runner = Rc::new(CooperativeLoop::new());
//! let player = Entity::builder().name("player").inactive().build(runner.clone());
//!
//! let started = player.trigger::<StartTrigger>().start_async(&CancelToken::none());
//! player.activate();
//! player.raise::<StartTrigger>(());
//! ```

use crate::trigger::{Owner, Trigger, TriggerBase, TriggerLifecycle};
use cue_core::{CancelSource, CancelToken, Scheduler};
use std::{
    any::{Any, TypeId},
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

struct Attached {
    kind: TypeId,
    trigger: Rc<dyn Any>,
    lifecycle: Rc<dyn TriggerLifecycle>,
}

struct EntityInner {
    name: String,
    active: Cell<bool>,
    alive: Cell<bool>,
    scheduler: Rc<dyn Scheduler>,
    triggers: RefCell<Vec<Attached>>,
    on_destroy: RefCell<Option<CancelSource>>,
}

impl Owner for EntityInner {
    fn is_alive(&self) -> bool {
        self.alive.get()
    }
}

/// Builder for [`Entity`].
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: Option<String>,
    active: bool,
}

impl EntityBuilder {
    /// Name used in logs and `Debug` output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Start inactive; triggers stay asleep until [`Entity::activate`].
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Build the entity on `scheduler`.
    pub fn build(self, scheduler: Rc<dyn Scheduler>) -> Entity {
        Entity {
            inner: Rc::new(EntityInner {
                name: self.name.unwrap_or_else(|| "entity".to_owned()),
                active: Cell::new(self.active),
                alive: Cell::new(true),
                scheduler,
                triggers: RefCell::new(Vec::new()),
                on_destroy: RefCell::new(None),
            }),
        }
    }
}

/// A host object with lazily attached triggers. Clones share the object.
///
/// Dropping the last clone without calling [`destroy`](Self::destroy)
/// models a host that never delivered teardown.
#[derive(Clone)]
pub struct Entity {
    inner: Rc<EntityInner>,
}

impl Entity {
    /// Start building an entity. Active by default.
    pub fn builder() -> EntityBuilder {
        EntityBuilder {
            name: None,
            active: true,
        }
    }

    /// An active, unnamed entity.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self::builder().build(scheduler)
    }

    /// The entity's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` once activated and not yet destroyed.
    pub fn is_active(&self) -> bool {
        self.inner.active.get() && self.inner.alive.get()
    }

    /// Returns `true` until [`destroy`](Self::destroy).
    pub fn is_alive(&self) -> bool {
        self.inner.alive.get()
    }

    /// The trigger of kind `K`, attaching it on first use.
    ///
    /// On an active entity a new trigger is awakened immediately; on a
    /// destroyed one it is created already destroyed, so every wait on it
    /// resolves as canceled.
    pub fn trigger<K: Trigger>(&self) -> Rc<K> {
        if let Some(existing) = self.find_trigger::<K>() {
            return existing;
        }

        let inner = Rc::downgrade(&self.inner);
        let owner: Weak<dyn Owner> = inner;
        let base = TriggerBase::new(owner, self.inner.scheduler.clone());
        if !self.is_alive() {
            base.destroy();
        } else if self.inner.active.get() {
            base.awake();
        }
        let lifecycle = base.lifecycle();
        let trigger = Rc::new(K::from_base(base));

        #[cfg(feature = "tracing")]
        tracing::trace!(entity = %self.inner.name, event = K::EVENT, "trigger attached");

        self.inner.triggers.borrow_mut().push(Attached {
            kind: TypeId::of::<K>(),
            trigger: trigger.clone(),
            lifecycle,
        });
        trigger
    }

    /// The trigger of kind `K`, if attached.
    pub fn find_trigger<K: Trigger>(&self) -> Option<Rc<K>> {
        let triggers = self.inner.triggers.borrow();
        let attached = triggers.iter().find(|a| a.kind == TypeId::of::<K>())?;
        attached.trigger.clone().downcast::<K>().ok()
    }

    /// Deliver an event of kind `K`. Does nothing if no trigger of that kind
    /// is attached or the entity is destroyed.
    pub fn raise<K: Trigger>(&self, value: K::Value) {
        if !self.is_alive() {
            return;
        }
        if let Some(trigger) = self.find_trigger::<K>() {
            trigger.base().raise(value);
        }
    }

    /// Make the entity active, awakening every attached trigger.
    pub fn activate(&self) {
        if !self.is_alive() || self.inner.active.replace(true) {
            return;
        }
        for lifecycle in self.lifecycles() {
            lifecycle.awake();
        }
    }

    /// Tear the entity down.
    ///
    /// Cancels [`cancel_on_destroy`](Self::cancel_on_destroy) and destroys
    /// every trigger that was awakened. Triggers still asleep are left to
    /// their deferred-registration monitors.
    pub fn destroy(&self) {
        if !self.inner.alive.replace(false) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(entity = %self.inner.name, "entity destroyed");

        let source = self.inner.on_destroy.borrow_mut().take();
        if let Some(source) = source {
            source.cancel();
        }
        for lifecycle in self.lifecycles() {
            if lifecycle.is_awake() {
                lifecycle.destroy();
            }
        }
    }

    /// A token canceled when the entity is destroyed.
    pub fn cancel_on_destroy(&self) -> CancelToken {
        if !self.is_alive() {
            return CancelToken::canceled();
        }
        self.inner
            .on_destroy
            .borrow_mut()
            .get_or_insert_with(CancelSource::new)
            .token()
    }

    // Snapshot, so callbacks may attach triggers while we iterate.
    fn lifecycles(&self) -> Vec<Rc<dyn TriggerLifecycle>> {
        self.inner
            .triggers
            .borrow()
            .iter()
            .map(|attached| attached.lifecycle.clone())
            .collect()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.inner.name)
            .field("active", &self.inner.active.get())
            .field("alive", &self.inner.alive.get())
            .field("triggers", &self.inner.triggers.borrow().len())
            .finish()
    }
}
