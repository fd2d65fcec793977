use packrat_types::Session;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Worker and yield profile for one scan.
///
/// Batch size doubles as the hard cap on simultaneous in-flight parses.
/// Yields keep a single-process UI responsive during large scans; they have
/// no correctness effect and may be zero in headless configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyProfile {
    pub worker_count: usize,
    /// Items processed between cooperative yields; the counter spans batches.
    pub slice_size: usize,
    pub inter_slice_yield: Duration,
}

impl ConcurrencyProfile {
    /// Foregrounded, power-connected scanning.
    pub fn interactive() -> Self {
        Self {
            worker_count: 8,
            slice_size: 64,
            inter_slice_yield: Duration::from_millis(2),
        }
    }

    /// Single worker with long yields, for idle or battery-powered hosts.
    pub fn light_background() -> Self {
        Self {
            worker_count: 1,
            slice_size: 16,
            inter_slice_yield: Duration::from_millis(25),
        }
    }

    /// No yielding at all, for tests and one-shot batch runs.
    pub fn headless(worker_count: usize) -> Self {
        Self {
            worker_count,
            slice_size: usize::MAX,
            inter_slice_yield: Duration::ZERO,
        }
    }
}

pub type DiscoverFn = Box<dyn FnOnce() -> anyhow::Result<Vec<PathBuf>> + Send>;
pub type ParseFn = Arc<dyn Fn(&Path) -> Option<Session> + Send + Sync>;
pub type ContinueFn = Arc<dyn Fn() -> bool + Send + Sync>;
pub type ProgressFn = Box<dyn FnMut(usize, usize) + Send>;
pub type SessionHookFn = Arc<dyn Fn(&Session) + Send + Sync>;
pub type MergeFn = Box<dyn FnOnce(Vec<Session>) -> Vec<Session> + Send>;

/// Configuration bundle for one engine invocation.
///
/// Constructed once per refresh and consumed by [`crate::hydrate_or_scan`].
pub struct ScanConfig {
    /// File list producer; upstream delta discovery has already narrowed it
    /// to changed files. Failure here is the one terminal scan error.
    pub discover_files: DiscoverFn,
    /// Per-file lightweight parse; `None` results are skipped.
    pub parse_lightweight: ParseFn,
    pub profile: ConcurrencyProfile,
    /// Polled between batches; returning false abandons remaining files
    /// without error.
    pub should_continue: ContinueFn,
    pub on_progress: Option<ProgressFn>,
    /// Route progress through the throttler instead of emitting every batch.
    pub throttle_progress: bool,
    /// Side effect invoked for each parsed session, in output order.
    pub on_session: Option<SessionHookFn>,
    /// Final merge hook (survivors + archive fallbacks); applied to the
    /// scanned result before it is returned.
    pub merge: Option<MergeFn>,
}

impl ScanConfig {
    /// Minimal config over a fixed file list; callers replace fields as
    /// needed.
    pub fn new(files: Vec<PathBuf>, parse_lightweight: ParseFn) -> Self {
        Self {
            discover_files: Box::new(move || Ok(files)),
            parse_lightweight,
            profile: ConcurrencyProfile::interactive(),
            should_continue: Arc::new(|| true),
            on_progress: None,
            throttle_progress: false,
            on_session: None,
            merge: None,
        }
    }
}
