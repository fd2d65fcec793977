use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;

use crate::info::{ArchiveInfo, ArchiveStatus};
use crate::manifest::ArchiveManifest;
use crate::store::{ArchiveStore, DATA_DIR, MANIFEST_FILE, METADATA_FILE};

/// Tunables for the sync protocol and the periodic service.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveSettings {
    /// No detected upstream change for this long promotes a consistent
    /// archive to `Final`.
    pub quiescence: Duration,
    /// Snapshot-compare-and-retry ceiling before a best-effort commit.
    pub max_copy_attempts: u32,
    /// Files at or below this size get a manifest content hash.
    pub hash_threshold_bytes: u64,
    /// Delay before the service's first periodic pass.
    pub startup_delay: Duration,
    /// Steady interval between periodic passes.
    pub sync_interval: Duration,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_secs(30 * 60),
            max_copy_attempts: 4,
            hash_threshold_bytes: 4 * 1024 * 1024,
            startup_delay: Duration::from_secs(10),
            sync_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Progress of one sync attempt, reported through a callback the same way
/// scan progress is.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Started {
        session_id: String,
    },
    /// Upstream is gone; the archive is now the only copy.
    UpstreamMissing {
        session_id: String,
    },
    /// Committed manifest already matches upstream; no copy needed.
    UpToDate {
        session_id: String,
        finalized: bool,
    },
    CopyAttempt {
        session_id: String,
        attempt: u32,
    },
    /// Copy finished, post-copy snapshot not yet taken.
    Copied {
        session_id: String,
        attempt: u32,
    },
    /// Upstream changed mid-copy; retrying with the new snapshot.
    UnstableRetry {
        session_id: String,
        attempt: u32,
    },
    Committed {
        session_id: String,
        consistent: bool,
    },
    Failed {
        session_id: String,
        message: String,
    },
}

/// Bring one pinned session's archive up to date.
///
/// Never returns an error: IO failures are recorded as `status = Error`
/// with the underlying message and retried on the next periodic tick. The
/// caller persists nothing; this function owns every write.
pub fn ensure_synced(
    store: &ArchiveStore,
    info: &mut ArchiveInfo,
    settings: &ArchiveSettings,
    now: DateTime<Utc>,
    on_event: &mut dyn FnMut(SyncEvent),
) {
    on_event(SyncEvent::Started {
        session_id: info.session_id.clone(),
    });

    if let Err(err) = sync_inner(store, info, settings, now, on_event) {
        info.status = ArchiveStatus::Error;
        info.last_error = Some(format!("{err:#}"));
        // Best effort; if even the metadata write fails the next tick
        // starts from the previous persisted state.
        let _ = store.save_info(info);
        on_event(SyncEvent::Failed {
            session_id: info.session_id.clone(),
            message: format!("{err:#}"),
        });
    }
}

fn sync_inner(
    store: &ArchiveStore,
    info: &mut ArchiveInfo,
    settings: &ArchiveSettings,
    now: DateTime<Utc>,
    on_event: &mut dyn FnMut(SyncEvent),
) -> Result<()> {
    let canonical = store.session_dir(info.source, &info.session_id);

    if !info.upstream_path.exists() {
        info.upstream_missing = true;
        if store.is_data_committed(info) {
            // Not an error: the archive is the only remaining copy. Leave
            // the data untouched.
            info.status = ArchiveStatus::Final;
            info.last_error = None;
            store.save_info(info)?;
            on_event(SyncEvent::UpstreamMissing {
                session_id: info.session_id.clone(),
            });
            return Ok(());
        }
        anyhow::bail!(
            "upstream {} disappeared before a sync completed",
            info.upstream_path.display()
        );
    }
    info.upstream_missing = false;

    let snapshot_before =
        ArchiveManifest::snapshot(&info.upstream_path, settings.hash_threshold_bytes)?;
    let committed = store.load_manifest(info.source, &info.session_id)?;

    if committed.as_ref() == Some(&snapshot_before) && store.is_data_committed(info) {
        // Idle upstream. Final vs Syncing is purely a function of elapsed
        // time since the last detected change.
        let last_change = info.last_upstream_change_at.unwrap_or(info.pinned_at);
        let quiesced = now.signed_duration_since(last_change)
            >= chrono::Duration::from_std(settings.quiescence).unwrap_or(chrono::Duration::MAX);
        info.status = if quiesced {
            ArchiveStatus::Final
        } else {
            ArchiveStatus::Syncing
        };
        info.last_synced_at = Some(now);
        info.last_error = None;
        store.save_info(info)?;
        on_event(SyncEvent::UpToDate {
            session_id: info.session_id.clone(),
            finalized: info.status == ArchiveStatus::Final,
        });
        return Ok(());
    }

    info.last_upstream_change_at = Some(now);

    let max_attempts = settings.max_copy_attempts.max(1);
    let mut expected = snapshot_before;
    let mut staged: Option<(std::path::PathBuf, ArchiveManifest, bool)> = None;

    for attempt in 1..=max_attempts {
        on_event(SyncEvent::CopyAttempt {
            session_id: info.session_id.clone(),
            attempt,
        });

        let staging = store.new_staging_dir(info.source, &info.session_id)?;
        let staging_data = staging.join(DATA_DIR);
        copy_upstream(&info.upstream_path, &staging_data)?;

        on_event(SyncEvent::Copied {
            session_id: info.session_id.clone(),
            attempt,
        });

        let snapshot_after =
            ArchiveManifest::snapshot(&info.upstream_path, settings.hash_threshold_bytes)?;

        if snapshot_after == expected {
            // Both snapshots agree: the copy saw one coherent upstream.
            staged = Some((staging, expected, true));
            break;
        }

        if attempt == max_attempts {
            // Upstream is being continuously written. Commit what was
            // actually copied, described by its own manifest, with an
            // advisory recorded.
            let best_effort =
                ArchiveManifest::snapshot(&staging_data, settings.hash_threshold_bytes)?;
            staged = Some((staging, best_effort, false));
            break;
        }

        std::fs::remove_dir_all(&staging)
            .with_context(|| format!("Failed to discard {}", staging.display()))?;
        expected = snapshot_after;
        on_event(SyncEvent::UnstableRetry {
            session_id: info.session_id.clone(),
            attempt,
        });
    }

    let (staging, manifest, consistent) =
        staged.context("sync loop ended without a staged copy")?;

    info.status = ArchiveStatus::Syncing;
    info.last_synced_at = Some(now);
    info.last_error = None;
    info.advisory = if consistent {
        None
    } else {
        Some(format!(
            "upstream changed during all {max_attempts} copy attempts; committed a best-effort snapshot"
        ))
    };

    // Full tree goes into staging before the swap: data, manifest, metadata.
    manifest.save(&staging.join(MANIFEST_FILE))?;
    crate::store::write_info_file(&staging.join(METADATA_FILE), info)?;
    store.commit(&staging, &canonical)?;

    on_event(SyncEvent::Committed {
        session_id: info.session_id.clone(),
        consistent,
    });
    Ok(())
}

/// Mirror the upstream file or directory into `data_dir`.
fn copy_upstream(upstream: &Path, data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    if upstream.is_dir() {
        for entry in WalkDir::new(upstream).follow_links(false) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(upstream)
                .context("walked outside the upstream root")?;
            let target = data_dir.join(relative);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)
                    .with_context(|| format!("Failed to create {}", target.display()))?;
            } else if entry.file_type().is_file() {
                std::fs::copy(entry.path(), &target).with_context(|| {
                    format!("Failed to copy {}", entry.path().display())
                })?;
            }
        }
    } else {
        let name = upstream
            .file_name()
            .context("upstream path has no file name")?;
        std::fs::copy(upstream, data_dir.join(name))
            .with_context(|| format!("Failed to copy {}", upstream.display()))?;
    }
    Ok(())
}
