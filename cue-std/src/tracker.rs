//! Process-wide registry of outstanding adapters.
//!
//! Purely diagnostic: adapters register themselves when they start waiting
//! and remove themselves when they are disposed. Nothing in Cue reads the
//! registry back, so enabling or disabling it never changes behavior.
//!
//! Tracking is off by default; turn it on with [`configure`].
//!
//! ```rust,ignore
//! tracker::configure(TrackerConfig::new().enabled(true));
//! for task in tracker::snapshot() {
//!     println!("{} outstanding for {:?}", task.kind, task.age());
//! }
//! ```

use std::{
    backtrace::Backtrace,
    cell::Cell,
    collections::BTreeMap,
    fmt,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

static ENABLED: AtomicBool = AtomicBool::new(false);
static CAPTURE_BACKTRACE: AtomicBool = AtomicBool::new(false);
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static TASKS: Mutex<BTreeMap<TrackId, TrackedTask>> = Mutex::new(BTreeMap::new());

fn tasks() -> MutexGuard<'static, BTreeMap<TrackId, TrackedTask>> {
    TASKS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerConfig {
    /// Record adapters as they start waiting.
    pub enabled: bool,
    /// Capture a backtrace for each recorded adapter.
    pub capture_backtrace: bool,
}

impl TrackerConfig {
    /// Tracking disabled, no backtraces.
    pub const fn new() -> Self {
        Self {
            enabled: false,
            capture_backtrace: false,
        }
    }

    /// Set whether tracking is enabled.
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set whether backtraces are captured.
    pub const fn with_backtrace(mut self, capture: bool) -> Self {
        self.capture_backtrace = capture;
        self
    }
}

/// Apply `config` process-wide. Already-recorded entries are kept.
pub fn configure(config: TrackerConfig) {
    ENABLED.store(config.enabled, Ordering::Release);
    CAPTURE_BACKTRACE.store(config.capture_backtrace, Ordering::Release);
}

/// The active configuration.
pub fn config() -> TrackerConfig {
    TrackerConfig {
        enabled: ENABLED.load(Ordering::Acquire),
        capture_backtrace: CAPTURE_BACKTRACE.load(Ordering::Acquire),
    }
}

/// Identifier of a recorded adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// One outstanding adapter.
#[derive(Debug, Clone)]
pub struct TrackedTask {
    /// Registry key.
    pub id: TrackId,
    /// Adapter type name.
    pub kind: &'static str,
    /// When the adapter was recorded.
    pub created: Instant,
    /// Where the adapter was created, if backtraces are enabled.
    pub backtrace: Option<String>,
}

impl TrackedTask {
    /// Time since the adapter was recorded.
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}

/// Record an adapter of type `kind`. Returns `None` while tracking is disabled.
pub fn track(kind: &'static str) -> Option<TrackId> {
    if !ENABLED.load(Ordering::Acquire) {
        return None;
    }
    let id = TrackId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let backtrace = CAPTURE_BACKTRACE
        .load(Ordering::Acquire)
        .then(|| Backtrace::force_capture().to_string());
    tasks().insert(
        id,
        TrackedTask {
            id,
            kind,
            created: Instant::now(),
            backtrace,
        },
    );
    Some(id)
}

/// Forget `id`. Returns `false` if it was not recorded.
pub fn untrack(id: TrackId) -> bool {
    tasks().remove(&id).is_some()
}

/// Number of recorded adapters.
pub fn active_count() -> usize {
    tasks().len()
}

/// Copy of every recorded adapter, oldest first.
pub fn snapshot() -> Vec<TrackedTask> {
    tasks().values().cloned().collect()
}

/// Drop every recorded entry.
pub fn clear() {
    tasks().clear();
}

/// An adapter's slot in the registry; released on drop.
#[derive(Debug, Default)]
pub(crate) struct Tracked(Cell<Option<TrackId>>);

impl Tracked {
    pub(crate) fn start(&self, kind: &'static str) {
        if let Some(previous) = self.0.replace(track(kind)) {
            untrack(previous);
        }
    }

    pub(crate) fn release(&self) {
        if let Some(id) = self.0.take() {
            untrack(id);
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.release();
    }
}
