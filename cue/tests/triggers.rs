//! Derived triggers, entities and the trigger catalog.

mod common;

use common::{Hit, HitTrigger, ScoreChangedTrigger, entity, runner};
use cue::{
    CancelToken, Phase, Trigger, TriggerError,
    testing::poll_once,
    triggers::{Frame, StartTrigger, UpdateTrigger},
};
use std::{task::Poll, time::Duration};

#[test]
fn test_derive_generates_trigger_surface() {
    let runner = runner();
    let entity = entity(&runner);
    let hits = entity.trigger::<HitTrigger>();
    assert_eq!(HitTrigger::EVENT, "hit");

    let mut once = hits.hit_async(&CancelToken::none());
    let waiter = hits.hit_handler(&CancelToken::none());
    let mut repeated = waiter.wait();
    let mut stream = hits.hit_stream(&CancelToken::none());
    let mut pull = stream.pull();
    assert!(poll_once(&mut pull).is_pending());

    hits.on_hit(Hit { damage: 3 });
    assert!(matches!(poll_once(&mut once), Poll::Ready(Ok(Hit { damage: 3 }))));
    assert!(matches!(poll_once(&mut repeated), Poll::Ready(Ok(Hit { damage: 3 }))));
    assert!(matches!(poll_once(&mut pull), Poll::Ready(Ok(Some(Hit { damage: 3 })))));
    assert_eq!(hits.base().handler_count(), 2);
}

#[test]
fn test_default_event_name_and_extra_fields() {
    let runner = runner();
    let entity = entity(&runner);
    let scores = entity.trigger::<ScoreChangedTrigger>();
    assert_eq!(ScoreChangedTrigger::EVENT, "score_changed");
    assert_eq!(scores.label(), "");

    let mut next = scores.score_changed_async(&CancelToken::none());
    entity.raise::<ScoreChangedTrigger>(-5);
    assert!(matches!(poll_once(&mut next), Poll::Ready(Ok(-5))));
}

#[test]
fn test_built_in_triggers() {
    let runner = runner();
    let entity = entity(&runner);

    let mut started = entity.trigger::<StartTrigger>().start_async(&CancelToken::none());
    entity.raise::<StartTrigger>(());
    assert!(matches!(poll_once(&mut started), Poll::Ready(Ok(()))));

    let update = entity.trigger::<UpdateTrigger>();
    let frames = update.update_handler(&entity.cancel_on_destroy());
    for index in 0..3 {
        let mut frame = frames.wait();
        update.on_update(Frame::new(index, Duration::from_millis(16)));
        match poll_once(&mut frame) {
            Poll::Ready(Ok(frame)) => assert_eq!(frame.index, index),
            other => panic!("frame {index} resolved as {other:?}"),
        }
    }

    let mut pending = frames.wait();
    entity.destroy();
    assert!(frames.is_disposed());
    assert!(matches!(
        poll_once(&mut pending),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
}

#[test]
fn test_entity_teardown_cancels_everything() {
    let runner = runner();
    let entity = entity(&runner);
    let hits = entity.trigger::<HitTrigger>();
    let mut once = hits.hit_async(&CancelToken::none());
    let mut stream = hits.hit_stream(&CancelToken::none());
    let mut pull = stream.pull();
    assert!(poll_once(&mut pull).is_pending());

    entity.destroy();
    assert!(!entity.is_alive());
    assert!(hits.base().is_destroyed());
    assert!(matches!(
        poll_once(&mut once),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
    assert!(matches!(poll_once(&mut pull), Poll::Ready(Ok(None))));

    // Late subscribers are answered right away.
    let mut late = hits.hit_async(&CancelToken::none());
    assert!(matches!(
        poll_once(&mut late),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
}

#[test]
fn test_deferred_registration_without_teardown() {
    let runner = runner();
    let entity = cue::Entity::builder().inactive().build(runner.clone());
    let hits = entity.trigger::<HitTrigger>();
    let mut wait = hits.hit_async(&CancelToken::none());
    assert_eq!(runner.pending(Phase::Update), 1);

    // Still alive: the monitor keeps watching.
    runner.tick();
    runner.tick();
    assert_eq!(runner.pending(Phase::Update), 1);
    assert!(poll_once(&mut wait).is_pending());

    // Dropped without teardown being delivered.
    drop(entity);
    runner.tick();
    assert!(runner.is_empty());
    assert!(hits.base().is_destroyed());
    assert!(matches!(
        poll_once(&mut wait),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
}

#[test]
fn test_deferred_registration_then_activation() {
    let runner = runner();
    let entity = cue::Entity::builder().inactive().build(runner.clone());
    let hits = entity.trigger::<HitTrigger>();
    let mut wait = hits.hit_async(&CancelToken::none());

    entity.activate();
    runner.tick();
    assert!(runner.is_empty());

    entity.raise::<HitTrigger>(Hit { damage: 9 });
    assert!(matches!(poll_once(&mut wait), Poll::Ready(Ok(Hit { damage: 9 }))));
}

#[test]
fn test_catalog_lists_derived_triggers() {
    let hit = cue::find_trigger("hit").expect("HitTrigger is registered");
    assert_eq!(hit.type_name, "HitTrigger");
    assert_eq!(hit.value_type, "Hit");
    assert!(hit.module.ends_with("common"));

    // Built-in triggers used by this binary are listed too.
    let _ = (StartTrigger::EVENT, UpdateTrigger::EVENT);
    let events: Vec<_> = cue::catalog().map(|d| d.event).collect();
    for event in ["hit", "score_changed", "start", "update"] {
        assert!(events.contains(&event), "missing {event}");
    }
}
