//! Adapters register with the diagnostic tracker while outstanding.

mod common;

use common::hub;
use cue::{
    CancelSource, CancelToken, EventSourceExt,
    testing::poll_once,
    tracker::{self, TrackerConfig},
};

// One test per binary: the tracker configuration is process-wide.
#[test]
fn test_outstanding_adapters_are_tracked() {
    tracker::configure(TrackerConfig::new().enabled(true));
    tracker::clear();
    let kinds = || -> Vec<&'static str> { tracker::snapshot().into_iter().map(|t| t.kind).collect() };

    let hub = hub::<u32>();
    let mut once = hub.wait_once(&CancelToken::none());
    let waiter = hub.get_handle(&CancelToken::none());
    let mut stream = hub.as_stream(&CancelToken::none());
    assert_eq!(tracker::active_count(), 2);

    let _ = poll_once(&mut stream.pull());
    assert_eq!(tracker::active_count(), 3);
    assert!(kinds().iter().any(|kind| kind.contains("ReusableWaiter")));

    hub.publish(&1);
    assert!(poll_once(&mut once).is_ready());
    assert_eq!(tracker::active_count(), 2);

    waiter.dispose();
    drop(stream);
    assert_eq!(tracker::active_count(), 0);

    // Canceled before registering: never tracked.
    let source = CancelSource::new();
    source.cancel();
    let _canceled = hub.wait_once(&source.token());
    assert_eq!(tracker::active_count(), 0);

    tracker::configure(TrackerConfig::new());
}
