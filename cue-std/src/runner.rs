//! # Cooperative Loop
//!
//! A minimal host loop implementing [`Scheduler`]. Each [`Phase`] keeps its
//! own queue of [`LoopItem`]s; [`CooperativeLoop::tick`] runs every phase in
//! order, once.
//!
//! Items enqueued while a phase is running (including by an item of that
//! same phase) first run on the next run of their phase.

use cue_core::{LoopItem, Phase, Scheduler};
use std::{
    cell::{Cell, RefCell},
    fmt,
};

#[derive(Default)]
struct PhaseQueue {
    running: RefCell<Vec<Box<dyn LoopItem>>>,
    incoming: RefCell<Vec<Box<dyn LoopItem>>>,
}

impl PhaseQueue {
    fn len(&self) -> usize {
        self.running.borrow().len() + self.incoming.borrow().len()
    }
}

/// Single-threaded phase-ordered loop.
pub struct CooperativeLoop {
    phases: [PhaseQueue; Phase::ALL.len()],
    ticks: Cell<u64>,
}

impl CooperativeLoop {
    /// An idle loop.
    pub fn new() -> Self {
        Self {
            phases: std::array::from_fn(|_| PhaseQueue::default()),
            ticks: Cell::new(0),
        }
    }

    /// Run every item of `phase` once. Returns the number still queued.
    ///
    /// A panicking item unwinds out of this call; the other items of the run
    /// are dropped with it.
    pub fn run_phase(&self, phase: Phase) -> usize {
        let queue = &self.phases[phase.index()];
        let mut items = queue.running.take();
        items.append(&mut queue.incoming.borrow_mut());

        items.retain_mut(|item| item.tick());

        // Anything enqueued during the run is already in `incoming`.
        let remaining = items.len();
        queue.running.borrow_mut().append(&mut items);
        remaining + queue.incoming.borrow().len()
    }

    /// Run every phase once, in order.
    pub fn tick(&self) {
        for phase in Phase::ALL {
            self.run_phase(phase);
        }
        self.ticks.set(self.ticks.get() + 1);

        #[cfg(feature = "tracing")]
        tracing::trace!(tick = self.ticks.get(), queued = self.len(), "loop tick finished");
    }

    /// Completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.ticks.get()
    }

    /// Items queued for `phase`.
    pub fn pending(&self, phase: Phase) -> usize {
        self.phases[phase.index()].len()
    }

    /// Items queued across all phases.
    pub fn len(&self) -> usize {
        self.phases.iter().map(PhaseQueue::len).sum()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued item.
    pub fn clear(&self) {
        for queue in &self.phases {
            let running = queue.running.take();
            let incoming = queue.incoming.take();
            drop((running, incoming));
        }
    }
}

impl Default for CooperativeLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for CooperativeLoop {
    fn enqueue(&self, phase: Phase, item: Box<dyn LoopItem>) {
        self.phases[phase.index()].incoming.borrow_mut().push(item);
    }
}

impl fmt::Debug for CooperativeLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooperativeLoop")
            .field("ticks", &self.ticks.get())
            .field("queued", &self.len())
            .finish()
    }
}
