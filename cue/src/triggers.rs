//! Built-in lifecycle triggers.
//!
//! Hosts raise these through [`Entity::raise`](crate::Entity::raise) or the
//! generated `on_*` methods.

use crate::TriggerBase;
use std::time::Duration;

/// Per-tick data delivered by the update triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    /// Tick counter of the host loop.
    pub index: u64,
    /// Time since the previous tick.
    pub delta: Duration,
}

impl Frame {
    /// Frame `index` with a `delta` step.
    pub const fn new(index: u64, delta: Duration) -> Self {
        Self { index, delta }
    }
}

/// The entity ran its first update.
#[derive(crate::Trigger)]
pub struct StartTrigger {
    base: TriggerBase<()>,
}

/// Every tick.
#[derive(crate::Trigger)]
pub struct UpdateTrigger {
    base: TriggerBase<Frame>,
}

/// Every tick, after all updates.
#[derive(crate::Trigger)]
pub struct LateUpdateTrigger {
    base: TriggerBase<Frame>,
}

/// Every fixed-timestep step.
#[derive(crate::Trigger)]
pub struct FixedUpdateTrigger {
    base: TriggerBase<Frame>,
}

/// The entity was enabled.
#[derive(crate::Trigger)]
#[trigger(event = "enable")]
pub struct EnableTrigger {
    base: TriggerBase<()>,
}

/// The entity was disabled.
#[derive(crate::Trigger)]
#[trigger(event = "disable")]
pub struct DisableTrigger {
    base: TriggerBase<()>,
}
