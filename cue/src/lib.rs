//! # cue - Callbacks You Can Await
//!
//! `cue` bridges a single-threaded, callback-driven host (a game loop, a UI
//! toolkit, an embedded event pump) to `async` code. Each host callback is
//! exposed as an awaitable event source:
//!
//! - await the next occurrence once,
//! - await it repeatedly through one reusable handle,
//! - or pull occurrences as a [`Stream`](futures::Stream),
//!
//! all cancelable through a [`CancelToken`] and without a new allocation per
//! wait.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cue::prelude::*;
//! use cue::triggers::UpdateTrigger;
//!
//! let runner = Rc::new(CooperativeLoop::new());
//! let player = Entity::new(runner.clone());
//! let update = player.trigger::<UpdateTrigger>();
//!
//! let waiter = update.update_handler(&player.cancel_on_destroy());
//! loop {
//!     let frame = waiter.wait().await?;
//!     // ...
//! }
//! ```
//!
//! ## Custom triggers
//!
//! ```rust,ignore
//! #[derive(cue::Trigger)]
//! #[trigger(event = "click")]
//! pub struct ClickTrigger {
//!     base: TriggerBase<Click>,
//! }
//! // generates on_click, click_async, click_handler, click_stream
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

extern crate self as cue;

pub use cue_core::{
    // Cancellation
    CancelRegistration,
    CancelSource,
    CancelToken,
    // Completion
    CompletionCore,
    // Hub
    EventSource,
    Hub,
    HubId,
    Links,
    // Scheduling
    LoopItem,
    OnCancel,
    Phase,
    Scheduler,
    // Errors
    BoxError,
    SharedError,
    StaleToken,
    TaskStatus,
    TriggerError,
    TriggerHandler,
};

pub use cue_std::{
    // Adapters
    AwaitHandler,
    AwakeMonitor,
    // Hosts
    CooperativeLoop,
    Entity,
    EntityBuilder,
    EventSourceExt,
    Owner,
    Pull,
    ReusableWaiter,
    // Triggers
    Trigger,
    TriggerBase,
    TriggerLifecycle,
    TriggerStream,
    Wait,
};

pub mod triggers;

/// Diagnostic registry of outstanding adapters.
pub mod tracker {
    pub use cue_std::tracker::{
        TrackId, TrackedTask, TrackerConfig, active_count, clear, config, configure, snapshot,
    };
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use cue_std::testing::*;
}

/// Prelude module - common imports for Cue.
///
/// # Usage
///
/// ```rust,ignore
/// use cue::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Cancellation
        CancelSource,
        CancelToken,
        // Hosts
        CooperativeLoop,
        Entity,
        // Sources
        EventSource,
        EventSourceExt,
        Phase,
        Scheduler,
        // Triggers
        Trigger,
        TriggerBase,
        // Errors
        TriggerError,
    };
    pub use futures::{Stream, StreamExt};
}

pub use cue_macros::Trigger;

#[cfg(feature = "inventory")]
pub use cue_std::{
    TriggerDescriptor,
    catalog::{catalog, find_trigger},
    inventory,
};

#[doc(hidden)]
#[cfg(feature = "inventory")]
#[macro_export]
macro_rules! __submit_trigger {
    ($($descriptor:tt)*) => {
        $crate::inventory::submit! { $($descriptor)* }
    };
}

#[doc(hidden)]
#[cfg(not(feature = "inventory"))]
#[macro_export]
macro_rules! __submit_trigger {
    ($($descriptor:tt)*) => {};
}
