#![allow(dead_code)]

use cue::{CooperativeLoop, Entity, Hub, TriggerBase};
use std::{
    rc::Rc,
    sync::Arc,
};

// ============================================================================
// Test Triggers
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hit {
    pub damage: u32,
}

#[derive(cue::Trigger)]
#[trigger(event = "hit")]
pub struct HitTrigger {
    base: TriggerBase<Hit>,
}

#[derive(cue::Trigger)]
pub struct ScoreChangedTrigger {
    base: TriggerBase<i64>,
    label: String,
}

impl ScoreChangedTrigger {
    pub fn label(&self) -> &str {
        &self.label
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn hub<T: 'static>() -> Rc<Hub<T>> {
    Rc::new(Hub::new())
}

pub fn runner() -> Rc<CooperativeLoop> {
    Rc::new(CooperativeLoop::new())
}

pub fn entity(runner: &Rc<CooperativeLoop>) -> Entity {
    Entity::builder().name("test-entity").build(runner.clone())
}

pub fn fault(message: &str) -> cue::SharedError {
    Arc::new(std::io::Error::other(message.to_owned()))
}
