//! # cue-std
//!
//! Standard adapters and hosts for the Cue callback-to-awaitable bridge.
//!
//! This crate provides:
//! - **Single-awaiter adapters**: [`Wait`] and [`ReusableWaiter`], via [`EventSourceExt`]
//! - **Stream adapter**: [`TriggerStream`]
//! - **Triggers**: [`TriggerBase`], [`Trigger`] and the [`AwakeMonitor`] watchdog
//! - **Hosts**: [`CooperativeLoop`] and [`Entity`]
//! - **Diagnostics**: the [`tracker`] registry and, with `inventory`, the trigger [`catalog`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core
pub use cue_core;

// Modules
#[cfg(feature = "inventory")]
pub mod catalog;
pub mod entity;
pub mod handler;
pub mod monitor;
pub mod runner;
pub mod stream;
pub mod testing;
pub mod tracker;
pub mod trigger;

pub use entity::{Entity, EntityBuilder};
pub use handler::{AwaitHandler, EventSourceExt, ReusableWaiter, Wait};
pub use monitor::AwakeMonitor;
pub use runner::CooperativeLoop;
pub use stream::{Pull, TriggerStream};
pub use trigger::{Owner, Trigger, TriggerBase, TriggerLifecycle};

#[cfg(feature = "inventory")]
pub use catalog::TriggerDescriptor;
#[cfg(feature = "inventory")]
pub use inventory;
