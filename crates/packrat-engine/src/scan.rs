use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use packrat_types::{sort_most_recent_first, Session};
use std::time::Duration;

use crate::config::ScanConfig;
use crate::progress::ProgressThrottler;

/// Minimum spacing between throttled progress updates.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Optional warm-cache read. `None` or an empty list means the cache had
/// nothing usable and the scan path runs instead.
pub type HydrateFn = Box<dyn Fn() -> BoxFuture<'static, Option<Vec<Session>>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Hydrated,
    Scanned,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub kind: ScanKind,
    pub sessions: Vec<Session>,
    pub total_files: usize,
}

/// Populate sessions from a warm cache when possible, otherwise scan.
///
/// The cache is tried twice with one `retry_delay` between attempts, since
/// a cold start can race the writer mid-flush. A non-empty hydration returns
/// immediately and the scan path is skipped entirely.
///
/// The scan processes files in `worker_count`-sized batches, one concurrent
/// parse per file. Completed work is re-sorted by original index before it
/// is appended, so output order matches the input file order no matter
/// which worker finished first.
pub async fn hydrate_or_scan(
    hydrate: Option<HydrateFn>,
    retry_delay: Duration,
    config: ScanConfig,
) -> anyhow::Result<ScanOutcome> {
    if let Some(hydrate) = hydrate {
        if let Some(sessions) = run_hydrate(&hydrate, retry_delay).await {
            return Ok(ScanOutcome {
                kind: ScanKind::Hydrated,
                total_files: sessions.len(),
                sessions,
            });
        }
    }

    scan(config).await
}

async fn run_hydrate(hydrate: &HydrateFn, retry_delay: Duration) -> Option<Vec<Session>> {
    match hydrate().await {
        Some(sessions) if !sessions.is_empty() => return Some(sessions),
        _ => {}
    }
    tokio::time::sleep(retry_delay).await;
    match hydrate().await {
        Some(sessions) if !sessions.is_empty() => Some(sessions),
        _ => None,
    }
}

async fn scan(mut config: ScanConfig) -> anyhow::Result<ScanOutcome> {
    let files = (config.discover_files)()?;
    let total = files.len();

    if let Some(on_progress) = config.on_progress.as_mut() {
        on_progress(0, total);
    }
    let mut throttler = ProgressThrottler::new(PROGRESS_INTERVAL);

    let worker_count = config.profile.worker_count.max(1);
    let mut sessions: Vec<Session> = Vec::new();
    let mut processed = 0usize;
    let mut since_yield = 0usize;

    for batch in files.chunks(worker_count) {
        if !(config.should_continue)() {
            // Stale scan; abandon the rest without error.
            break;
        }

        let mut in_flight = FuturesUnordered::new();
        for (offset, file) in batch.iter().enumerate() {
            let parse = config.parse_lightweight.clone();
            let file = file.clone();
            in_flight.push(async move {
                let parsed = tokio::task::spawn_blocking(move || parse(&file))
                    .await
                    .ok()
                    .flatten();
                (offset, parsed)
            });
        }

        let mut completed: Vec<(usize, Option<Session>)> = Vec::with_capacity(batch.len());
        while let Some(item) = in_flight.next().await {
            completed.push(item);
        }
        // Workers finish in arbitrary order; restore input order before
        // anything observes the results.
        completed.sort_by_key(|(offset, _)| *offset);

        for (_, parsed) in completed {
            processed += 1;
            since_yield += 1;
            if let Some(session) = parsed {
                if let Some(on_session) = &config.on_session {
                    on_session(&session);
                }
                sessions.push(session);
            }
        }

        if let Some(on_progress) = config.on_progress.as_mut() {
            let is_terminal = processed == total;
            if !config.throttle_progress || throttler.should_emit(is_terminal) {
                on_progress(processed, total);
            }
        }

        if since_yield >= config.profile.slice_size && processed < total {
            since_yield = 0;
            if !config.profile.inter_slice_yield.is_zero() {
                tokio::time::sleep(config.profile.inter_slice_yield).await;
            }
        }
    }

    sort_most_recent_first(&mut sessions);
    if let Some(merge) = config.merge.take() {
        sessions = merge(sessions);
    }

    Ok(ScanOutcome {
        kind: ScanKind::Scanned,
        sessions,
        total_files: total,
    })
}
