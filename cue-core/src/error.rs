//! Error types for Cue.
//!
//! - [`TriggerError`] - How an awaited trigger operation can fail to produce a value
//! - [`StaleToken`] - Misuse of a completion token (raised as a panic, never returned)

use std::sync::Arc;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A shared error type.
///
/// One fault is delivered to every handler linked into a hub, so the error
/// must be cheap to clone.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a wait or pull that did not produce a value.
#[derive(Error, Debug, Clone)]
pub enum TriggerError {
    /// The cancellation token fired, or the owning entity was torn down
    /// before a value arrived.
    #[error("operation was canceled")]
    Canceled,

    /// The event source failed.
    #[error("trigger faulted: {0}")]
    Faulted(#[source] SharedError),
}

impl TriggerError {
    /// Wrap an arbitrary error as a fault.
    pub fn faulted<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TriggerError::Faulted(Arc::new(error))
    }

    /// Returns `true` for [`TriggerError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, TriggerError::Canceled)
    }

    /// Returns `true` for [`TriggerError::Faulted`].
    pub fn is_faulted(&self) -> bool {
        matches!(self, TriggerError::Faulted(_))
    }
}

impl From<BoxError> for TriggerError {
    fn from(err: BoxError) -> Self {
        TriggerError::Faulted(Arc::from(err))
    }
}

/// A completion token that does not match the core's current version.
///
/// Presenting a stale token is a programming error: the awaitable it came
/// from has been reset or was awaited twice.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stale completion token {presented} (current version is {current})")]
pub struct StaleToken {
    /// The token that was presented.
    pub presented: u32,
    /// The core's current version.
    pub current: u32,
}
