use chrono::Utc;
use packrat_archive::{merge_archive_fallbacks, Archiver};
use packrat_engine::{hydrate_or_scan, ConcurrencyProfile, HydrateFn, ScanConfig, ScanKind};
use packrat_index::{
    discover_delta, DiscoveryScope, SessionCacheFile, SignatureMap,
};
use packrat_providers::{RecentWindow, SourceAdapter};
use packrat_types::{Session, SessionSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::events::RefreshEvent;
use crate::{Error, Result};

/// One retry covers a session cache that is mid-write on cold start.
const HYDRATE_RETRY_DELAY: Duration = Duration::from_millis(400);

struct IndexerState {
    /// Baseline for the next delta pass. Mutated only by the refresh that
    /// owns this source; no two passes run concurrently (see `gate`).
    signatures: SignatureMap,
    /// Path-keyed live sessions; last writer wins on re-parse.
    known: HashMap<PathBuf, Session>,
    /// Last published list, kept visible when a refresh fails.
    published: Vec<Session>,
    /// A capped window may have missed changes; promote the next pass to
    /// full scope.
    drift_pending: bool,
    hydrated_once: bool,
}

struct GateState {
    in_flight: bool,
    queued: bool,
}

/// Incremental indexer for one source.
///
/// Owns the stat cache and the session list for its source. At most one
/// refresh runs at a time, with at most one more queued; a newer refresh
/// bumps the generation counter and any stale pass discards its results
/// before publishing.
pub struct SourceIndexer {
    source: SessionSource,
    adapter: SourceAdapter,
    log_root: PathBuf,
    cache_path: PathBuf,
    window: RecentWindow,
    archiver: Arc<Archiver>,
    generation: AtomicU64,
    state: Mutex<IndexerState>,
    gate: Mutex<GateState>,
}

impl SourceIndexer {
    pub fn new(
        adapter: SourceAdapter,
        log_root: PathBuf,
        cache_path: PathBuf,
        archiver: Arc<Archiver>,
    ) -> Self {
        Self {
            source: adapter.source(),
            adapter,
            log_root,
            cache_path,
            window: RecentWindow::default(),
            archiver,
            generation: AtomicU64::new(0),
            state: Mutex::new(IndexerState {
                signatures: SignatureMap::new(),
                known: HashMap::new(),
                published: Vec::new(),
                drift_pending: false,
                hydrated_once: false,
            }),
            gate: Mutex::new(GateState {
                in_flight: false,
                queued: false,
            }),
        }
    }

    pub fn source(&self) -> SessionSource {
        self.source
    }

    pub fn log_root(&self) -> &Path {
        &self.log_root
    }

    /// Last published session list for this source.
    pub fn published(&self) -> Vec<Session> {
        self.state.lock().unwrap().published.clone()
    }

    /// Run one delta-discovery + hydrate-or-scan pass and publish the
    /// merged result. Returns `Ok(None)` when another refresh was already
    /// in flight (this one was queued behind it).
    pub async fn refresh(
        self: &Arc<Self>,
        scope: DiscoveryScope,
        profile: ConcurrencyProfile,
        events: &Sender<RefreshEvent>,
    ) -> Result<Option<Vec<Session>>> {
        {
            let mut gate = self.gate.lock().unwrap();
            if gate.in_flight {
                // At most one queued pass; further requests collapse into it.
                gate.queued = true;
                return Ok(None);
            }
            gate.in_flight = true;
        }

        let mut outcome = self.refresh_inner(scope, profile, events).await;
        loop {
            let run_again = {
                let mut gate = self.gate.lock().unwrap();
                if gate.queued {
                    gate.queued = false;
                    true
                } else {
                    gate.in_flight = false;
                    false
                }
            };
            if !run_again {
                return outcome;
            }
            outcome = self.refresh_inner(scope, profile, events).await;
        }
    }

    async fn refresh_inner(
        self: &Arc<Self>,
        requested_scope: DiscoveryScope,
        profile: ConcurrencyProfile,
        events: &Sender<RefreshEvent>,
    ) -> Result<Option<Vec<Session>>> {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let scope = {
            let mut state = self.state.lock().unwrap();
            if state.drift_pending {
                state.drift_pending = false;
                DiscoveryScope::Full
            } else {
                requested_scope
            }
        };

        let _ = events.send(RefreshEvent::SourceStarted {
            source: self.source,
            scope,
        });

        let enumeration = {
            let this = Arc::clone(self);
            tokio::task::spawn_blocking(move || {
                this.adapter
                    .discovery
                    .enumerate(&this.log_root, scope, this.window)
            })
            .await
            .map_err(|err| Error::Scan(anyhow::anyhow!(err)))?
        };
        let enumeration = match enumeration {
            Ok(enumeration) => enumeration,
            Err(err) => {
                // Discovery-root failure is the one terminal refresh error;
                // the previous published list stays visible.
                let _ = events.send(RefreshEvent::SourceFailed {
                    source: self.source,
                    message: format!("{err:#}"),
                });
                return Err(Error::Scan(err));
            }
        };

        let (previous, cold_start) = {
            let state = self.state.lock().unwrap();
            (
                state.signatures.clone(),
                state.known.is_empty() && !state.hydrated_once,
            )
        };
        let delta = discover_delta(&previous, &enumeration);

        if delta.drift_detected {
            self.state.lock().unwrap().drift_pending = true;
            let _ = events.send(RefreshEvent::DriftDetected {
                source: self.source,
            });
        }

        let hydrate: Option<HydrateFn> = if cold_start && self.cache_path.exists() {
            let cache_path = self.cache_path.clone();
            Some(Box::new(move || {
                let cache_path = cache_path.clone();
                Box::pin(async move {
                    tokio::task::spawn_blocking(move || {
                        SessionCacheFile::load(&cache_path)
                            .ok()
                            .map(|cache| cache.sessions)
                    })
                    .await
                    .ok()
                    .flatten()
                })
            }))
        } else {
            None
        };

        let config = self.scan_config(&delta, profile, my_generation, events.clone());
        let outcome = hydrate_or_scan(hydrate, HYDRATE_RETRY_DELAY, config)
            .await
            .map_err(|err| {
                let _ = events.send(RefreshEvent::SourceFailed {
                    source: self.source,
                    message: format!("{err:#}"),
                });
                Error::Scan(err)
            })?;

        // Check-before-publish: a newer refresh owns this source now.
        if self.generation.load(Ordering::SeqCst) != my_generation {
            return Ok(None);
        }

        let published = match outcome.kind {
            ScanKind::Hydrated => self.install_hydrated(outcome.sessions).await,
            ScanKind::Scanned => {
                self.install_scanned(scope, &previous, &delta, outcome.sessions)
                    .await?
            }
        };

        let _ = events.send(RefreshEvent::SourceCompleted {
            source: self.source,
            kind: outcome.kind,
            sessions: published.len(),
        });
        Ok(Some(published))
    }

    fn scan_config(
        self: &Arc<Self>,
        delta: &packrat_index::DiscoveryDelta,
        profile: ConcurrencyProfile,
        my_generation: u64,
        events: Sender<RefreshEvent>,
    ) -> ScanConfig {
        let mut config = ScanConfig::new(delta.changed_files.clone(), {
            let this = Arc::clone(self);
            Arc::new(move |path: &Path| this.adapter.parser.parse_lightweight(path))
        });
        config.profile = profile;
        config.throttle_progress = true;

        config.should_continue = {
            let this = Arc::clone(self);
            Arc::new(move || this.generation.load(Ordering::SeqCst) == my_generation)
        };

        config.on_progress = {
            let source = self.source;
            Some(Box::new(move |processed, total| {
                let _ = events.send(RefreshEvent::Progress {
                    source,
                    processed,
                    total,
                });
            }))
        };

        // Survivors + fresh results + archive fallbacks, re-sorted inside
        // the fallback merge.
        config.merge = {
            let survivors: HashMap<PathBuf, Session> = {
                let state = self.state.lock().unwrap();
                let mut known = state.known.clone();
                for removed in &delta.removed_paths {
                    known.remove(removed);
                }
                known
            };
            let archiver = Arc::clone(&self.archiver);
            let source = self.source;
            Some(Box::new(move |fresh: Vec<Session>| {
                let mut by_path = survivors;
                for session in fresh {
                    by_path.insert(session.file_path.clone(), session);
                }
                merge_archive_fallbacks(
                    archiver.store(),
                    source,
                    by_path.into_values().collect(),
                )
            }))
        };

        config
    }

    /// A warm cache replaced the scan: install its sessions and signatures
    /// so the next pass has a real delta baseline.
    async fn install_hydrated(self: &Arc<Self>, sessions: Vec<Session>) -> Vec<Session> {
        let cached_signatures = {
            let cache_path = self.cache_path.clone();
            tokio::task::spawn_blocking(move || {
                SessionCacheFile::load(&cache_path)
                    .ok()
                    .map(|cache| cache.signatures)
            })
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
        };

        let published = merge_archive_fallbacks(self.archiver.store(), self.source, sessions);

        let mut state = self.state.lock().unwrap();
        state.signatures = cached_signatures;
        state.known = published
            .iter()
            .filter(|s| !s.archived)
            .map(|s| (s.file_path.clone(), s.clone()))
            .collect();
        state.hydrated_once = true;
        state.published = published.clone();
        published
    }

    async fn install_scanned(
        self: &Arc<Self>,
        scope: DiscoveryScope,
        previous: &SignatureMap,
        delta: &packrat_index::DiscoveryDelta,
        sessions: Vec<Session>,
    ) -> Result<Vec<Session>> {
        let signatures = delta.next_baseline(scope, previous);
        let known: HashMap<PathBuf, Session> = sessions
            .iter()
            .filter(|s| !s.archived)
            .map(|s| (s.file_path.clone(), s.clone()))
            .collect();

        {
            let mut state = self.state.lock().unwrap();
            state.signatures = signatures.clone();
            state.known = known.clone();
            state.published = sessions.clone();
        }

        // Persist the warm-start cache. Losing this write only costs the
        // next cold start a scan.
        let cache = SessionCacheFile::new(
            self.source,
            Utc::now(),
            signatures,
            {
                let mut live: Vec<Session> = known.into_values().collect();
                packrat_types::sort_most_recent_first(&mut live);
                live
            },
        );
        let cache_path = self.cache_path.clone();
        let _ = tokio::task::spawn_blocking(move || cache.save(&cache_path)).await;

        Ok(sessions)
    }
}
