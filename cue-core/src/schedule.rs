//! Cooperative scheduling capability.
//!
//! The host owns a single-threaded loop that runs queued work in discrete,
//! non-preemptive phases once per tick. Components that need to poll across
//! ticks receive that loop as an injected [`Scheduler`] rather than reaching
//! for a global.

use std::{fmt, rc::Rc};

/// A phase of the host loop, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Before anything else in the tick.
    Initialization,
    /// Input and platform events.
    EarlyUpdate,
    /// Fixed-timestep simulation.
    FixedUpdate,
    /// Right before the main update.
    PreUpdate,
    /// The main update.
    Update,
    /// Right before late update.
    PreLateUpdate,
    /// After rendering has been scheduled.
    PostLateUpdate,
    /// Clock bookkeeping at the end of the tick.
    TimeUpdate,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Phase; 8] = [
        Phase::Initialization,
        Phase::EarlyUpdate,
        Phase::FixedUpdate,
        Phase::PreUpdate,
        Phase::Update,
        Phase::PreLateUpdate,
        Phase::PostLateUpdate,
        Phase::TimeUpdate,
    ];

    /// Position of this phase within [`Phase::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Work that runs once per tick of its phase.
pub trait LoopItem: 'static {
    /// Run one step. Return `false` to be dropped from the loop.
    fn tick(&mut self) -> bool;
}

impl<F> LoopItem for F
where
    F: FnMut() -> bool + 'static,
{
    fn tick(&mut self) -> bool {
        self()
    }
}

/// Accepts [`LoopItem`]s into a phase of the host loop.
pub trait Scheduler {
    /// Queue `item` to run in `phase`, starting with the next run of that phase.
    fn enqueue(&self, phase: Phase, item: Box<dyn LoopItem>);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn enqueue(&self, phase: Phase, item: Box<dyn LoopItem>) {
        (**self).enqueue(phase, item);
    }
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn enqueue(&self, phase: Phase, item: Box<dyn LoopItem>) {
        (**self).enqueue(phase, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Queue(RefCell<Vec<(Phase, Box<dyn LoopItem>)>>);

    impl Scheduler for Queue {
        fn enqueue(&self, phase: Phase, item: Box<dyn LoopItem>) {
            self.0.borrow_mut().push((phase, item));
        }
    }

    #[test]
    fn test_phase_order_matches_index() {
        for (position, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), position);
        }
        assert!(Phase::EarlyUpdate < Phase::Update);
        assert_eq!(Phase::PreLateUpdate.to_string(), "PreLateUpdate");
    }

    #[test]
    fn test_closures_are_loop_items() {
        let queue = Rc::new(Queue::default());
        let mut remaining = 2;
        queue.enqueue(
            Phase::Update,
            Box::new(move || {
                remaining -= 1;
                remaining > 0
            }),
        );

        let (phase, mut item) = queue.0.borrow_mut().pop().unwrap();
        assert_eq!(phase, Phase::Update);
        assert!(item.tick());
        assert!(!item.tick());
    }
}
