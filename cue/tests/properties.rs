//! Delivery, reuse, cancellation and teardown guarantees of the adapters.

mod common;

use common::hub;
use cue::{
    CancelSource, CancelToken, EventSourceExt, Links, SharedError, TriggerError, TriggerHandler,
    testing::{RecordingHandler, Recorded, poll_once},
};
use futures::StreamExt;
use std::{rc::Rc, task::Poll};

/// Cancels `source` when its hub ends.
struct CancelOnEnd {
    links: Links<u32>,
    source: CancelSource,
}

impl TriggerHandler<u32> for CancelOnEnd {
    fn on_next(&self, _: &u32) {}

    fn on_error(&self, _: &SharedError) {
        self.source.cancel();
    }

    fn on_completed(&self) {
        self.source.cancel();
    }

    fn links(&self) -> &Links<u32> {
        &self.links
    }
}

#[test]
fn test_one_shot_resolves_once_and_self_disposes() {
    let hub = hub::<i32>();
    let mut a = hub.wait_once(&CancelToken::none());
    assert_eq!(hub.len(), 1);

    hub.publish(&42);
    assert!(hub.is_empty());
    assert!(matches!(poll_once(&mut a), Poll::Ready(Ok(42))));

    // Nobody is left to observe this.
    hub.publish(&7);
    assert!(hub.is_empty());
}

#[test]
fn test_reusable_waiter_resolves_each_wait() {
    let hub = hub::<u32>();
    let waiter = hub.get_handle(&CancelToken::none());

    for value in 1..=5 {
        let mut wait = waiter.wait();
        assert!(poll_once(&mut wait).is_pending());
        hub.publish(&value);
        match poll_once(&mut wait) {
            Poll::Ready(Ok(got)) => assert_eq!(got, value),
            other => panic!("wait {value} resolved as {other:?}"),
        }
        assert!(waiter.is_registered());
        assert!(!waiter.is_disposed());
    }

    waiter.dispose();
    assert!(waiter.is_disposed());
    assert!(hub.is_empty());
}

#[test]
fn test_cancel_before_publish_unlinks() {
    let hub = hub::<u32>();
    let observer = RecordingHandler::<u32>::new();
    let source = CancelSource::new();
    let mut wait = hub.wait_once(&source.token());
    hub.add_handler(observer.clone());
    assert_eq!(hub.len(), 2);

    source.cancel();
    assert_eq!(hub.len(), 1);
    assert!(matches!(
        poll_once(&mut wait),
        Poll::Ready(Err(TriggerError::Canceled))
    ));

    hub.publish(&1);
    assert_eq!(observer.events(), [Recorded::Next(1)]);
}

#[test]
fn test_complete_ends_every_kind_of_adapter() {
    let hub = hub::<u32>();
    let mut one_shot = hub.wait_once(&CancelToken::none());
    let waiter = hub.get_handle(&CancelToken::none());
    let mut reusable = waiter.wait();
    let mut stream = hub.as_stream(&CancelToken::none());
    let mut pull = stream.pull();
    assert!(poll_once(&mut pull).is_pending());
    assert_eq!(hub.len(), 3);

    hub.complete();
    assert!(hub.is_empty());
    assert!(matches!(
        poll_once(&mut one_shot),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
    assert!(matches!(
        poll_once(&mut reusable),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
    assert!(matches!(poll_once(&mut pull), Poll::Ready(Ok(None))));
}

#[test]
fn test_stream_drops_values_without_pull() {
    let hub = hub::<u32>();
    let mut stream = hub.as_stream(&CancelToken::none());

    let mut first = stream.next();
    assert!(poll_once(&mut first).is_pending());
    hub.publish(&1);
    assert!(matches!(poll_once(&mut first), Poll::Ready(Some(Ok(1)))));

    hub.publish(&2);
    hub.publish(&3);

    let mut second = stream.next();
    assert!(poll_once(&mut second).is_pending());
    hub.publish(&4);
    assert!(matches!(poll_once(&mut second), Poll::Ready(Some(Ok(4)))));
}

#[test]
fn test_double_dispose_is_harmless() {
    let hub = hub::<u32>();
    let waiter = hub.get_handle(&CancelToken::none());
    waiter.dispose();
    waiter.dispose();
    assert!(hub.is_empty());

    let mut stream = hub.as_stream(&CancelToken::none());
    let _ = poll_once(&mut stream.pull());
    stream.dispose();
    stream.dispose();
    assert!(hub.is_empty());

    let source = CancelSource::new();
    let wait = hub.wait_once(&source.token());
    drop(wait);
    source.cancel();
    assert!(hub.is_empty());
}

#[test]
fn test_reusable_waiter_survives_completion() {
    let hub = hub::<&'static str>();
    let b = hub.get_handle(&CancelToken::none());

    let mut first = b.wait();
    assert!(poll_once(&mut first).is_pending());
    hub.publish(&"x");
    assert!(matches!(poll_once(&mut first), Poll::Ready(Ok("x"))));

    let mut second = b.wait();
    assert!(poll_once(&mut second).is_pending());
    hub.complete();
    assert!(matches!(
        poll_once(&mut second),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
    assert!(!b.is_disposed());

    b.dispose();
    assert!(b.is_disposed());
}

#[test]
fn test_fault_reaches_every_adapter() {
    let hub = hub::<u32>();
    let mut one_shot = hub.wait_once(&CancelToken::none());
    let mut stream = hub.as_stream(&CancelToken::none());
    let mut pull = stream.pull();
    assert!(poll_once(&mut pull).is_pending());

    hub.fault(common::fault("sensor offline"));
    match poll_once(&mut one_shot) {
        Poll::Ready(Err(error)) => {
            assert!(error.is_faulted());
            assert_eq!(error.to_string(), "trigger faulted: sensor offline");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        poll_once(&mut pull),
        Poll::Ready(Err(TriggerError::Faulted(_)))
    ));
}

#[test]
fn test_cancel_during_complete_reaches_later_adapters() {
    let hub = hub::<u32>();
    let canceler = Rc::new(CancelOnEnd {
        links: Links::new(),
        source: CancelSource::new(),
    });
    hub.add_handler(canceler.clone());
    let mut canceled = hub.wait_once(&canceler.source.token());
    let mut later = hub.wait_once(&CancelToken::none());
    assert_eq!(hub.len(), 3);

    hub.complete();
    assert!(hub.is_empty());
    assert!(canceler.source.is_canceled());
    assert!(matches!(
        poll_once(&mut canceled),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
    assert!(matches!(
        poll_once(&mut later),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
}

#[test]
fn test_cancel_during_fault_reaches_later_adapters() {
    let hub = hub::<u32>();
    let canceler = Rc::new(CancelOnEnd {
        links: Links::new(),
        source: CancelSource::new(),
    });
    hub.add_handler(canceler.clone());
    let mut canceled = hub.wait_once(&canceler.source.token());
    let mut later = hub.wait_once(&CancelToken::none());

    hub.fault(common::fault("bus reset"));
    assert!(hub.is_empty());
    assert!(matches!(
        poll_once(&mut canceled),
        Poll::Ready(Err(TriggerError::Canceled))
    ));
    assert!(matches!(
        poll_once(&mut later),
        Poll::Ready(Err(TriggerError::Faulted(_)))
    ));
}
