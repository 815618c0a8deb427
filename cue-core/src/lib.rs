//! # cue-core
//!
//! Core primitives for the Cue callback-to-awaitable bridge.
//!
//! A host runtime calls its event and lifecycle callbacks synchronously and
//! expects nothing back. Cue turns those callbacks into values that async
//! code can `.await`, cancel, and await again, without allocating a new
//! promise for every wait.
//!
//! This crate has no runtime dependencies beyond `thiserror` and is meant to
//! be imported by hosts and adapters that only need the building blocks.
//!
//! # Building Blocks
//!
//! ## [`CompletionCore`]
//!
//! A reusable single-slot promise. Each generation is identified by a version
//! stamp; awaitables carry the stamp as their token so a late completion or a
//! double await is detected instead of silently resolving the wrong wait.
//!
//! ## [`Hub`]
//!
//! An intrusive multicast list. The host calls [`Hub::publish`] once per
//! callback and [`Hub::complete`] on teardown; every linked
//! [`TriggerHandler`] is notified in registration order.
//!
//! ## [`CancelToken`]
//!
//! Single-threaded cancellation whose registrations hold a weak reference to
//! the consumer and nothing else.
//!
//! ## [`Scheduler`]
//!
//! The injected cooperative loop capability, split into [`Phase`]s.
//!
//! # Threading
//!
//! Everything here is `!Send`: all mutation happens on the one thread that
//! drives the host loop, which is why no locking is needed.
//!
//! # Error Types
//!
//! - [`TriggerError`] - Canceled or faulted outcomes
//! - [`StaleToken`] - Token misuse, raised as a panic

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod cancel;
mod completion;
mod error;
mod hub;
mod schedule;

// Re-exports
pub use cancel::{CancelRegistration, CancelSource, CancelToken, OnCancel};
pub use completion::{CompletionCore, TaskStatus};
pub use error::{BoxError, SharedError, StaleToken, TriggerError};
pub use hub::{EventSource, Hub, HubId, Links, TriggerHandler};
pub use schedule::{LoopItem, Phase, Scheduler};
