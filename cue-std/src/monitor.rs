//! Deferred-registration watchdog.
//!
//! A handler registered on a trigger that is not yet awake depends on the
//! host delivering teardown, which it only does for awakened triggers. The
//! [`AwakeMonitor`] polls once per tick until the trigger is awakened or
//! destroyed, and forces the teardown itself if the owner dies first.

use crate::trigger::TriggerLifecycle;
use cue_core::LoopItem;
use std::{fmt, rc::Weak};

/// Watches one not-yet-awake trigger from the host loop.
pub struct AwakeMonitor {
    trigger: Weak<dyn TriggerLifecycle>,
}

impl AwakeMonitor {
    /// Watch `trigger`.
    pub fn new(trigger: Weak<dyn TriggerLifecycle>) -> Self {
        Self { trigger }
    }
}

impl LoopItem for AwakeMonitor {
    fn tick(&mut self) -> bool {
        let Some(trigger) = self.trigger.upgrade() else {
            return false;
        };
        if trigger.is_awake() || trigger.is_destroyed() {
            return false;
        }
        if !trigger.is_owner_alive() {
            #[cfg(feature = "tracing")]
            tracing::warn!("owner destroyed before its trigger became ready, forcing teardown");
            trigger.destroy();
            return false;
        }
        true
    }
}

impl fmt::Debug for AwakeMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwakeMonitor")
            .field("live", &(self.trigger.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    #[derive(Default)]
    struct Probe {
        awake: Cell<bool>,
        destroyed: Cell<bool>,
        owner_alive: Cell<bool>,
    }

    impl TriggerLifecycle for Probe {
        fn awake(&self) {
            self.awake.set(true);
        }
        fn destroy(&self) {
            self.destroyed.set(true);
        }
        fn is_awake(&self) -> bool {
            self.awake.get()
        }
        fn is_destroyed(&self) -> bool {
            self.destroyed.get()
        }
        fn is_owner_alive(&self) -> bool {
            self.owner_alive.get()
        }
    }

    fn monitor(probe: &Rc<Probe>) -> AwakeMonitor {
        let weak = Rc::downgrade(probe);
        AwakeMonitor::new(weak)
    }

    #[test]
    fn test_keeps_polling_while_owner_lives() {
        let probe = Rc::new(Probe {
            owner_alive: Cell::new(true),
            ..Default::default()
        });
        let mut monitor = monitor(&probe);
        assert!(monitor.tick());
        assert!(monitor.tick());

        probe.awake();
        assert!(!monitor.tick());
        assert!(!probe.is_destroyed());
    }

    #[test]
    fn test_forces_teardown_when_owner_dies() {
        let probe = Rc::new(Probe::default());
        let mut monitor = monitor(&probe);
        assert!(!monitor.tick());
        assert!(probe.is_destroyed());
    }

    #[test]
    fn test_stops_when_trigger_is_gone() {
        let probe = Rc::new(Probe::default());
        let mut monitor = monitor(&probe);
        drop(probe);
        assert!(!monitor.tick());
    }

    #[test]
    fn test_stops_after_normal_teardown() {
        let probe = Rc::new(Probe {
            owner_alive: Cell::new(true),
            ..Default::default()
        });
        let mut monitor = monitor(&probe);
        probe.destroy();
        assert!(!monitor.tick());
    }
}
