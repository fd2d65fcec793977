use chrono::{DateTime, Utc};
use packrat_types::{Session, SessionSource};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sync lifecycle for one pinned session.
///
/// `None → Staging → Syncing → (Final | Error)`, with `Syncing → Syncing`
/// on every unfinalized re-sync and `Final → Syncing` when a later pass
/// sees the upstream change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    None,
    Staging,
    Syncing,
    Final,
    Error,
}

impl Default for ArchiveStatus {
    fn default() -> Self {
        ArchiveStatus::None
    }
}

/// Persisted per-pin metadata (`archive.json`).
///
/// Display fields are denormalized from the session at pin time so the UI
/// never needs to re-parse an archived-only session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub session_id: String,
    pub source: SessionSource,
    pub upstream_path: PathBuf,
    pub upstream_is_dir: bool,
    /// Primary data file inside the archive's `data/` tree.
    pub primary_relative_path: String,
    pub pinned_at: DateTime<Utc>,
    /// False after an unpin that kept the data on disk.
    #[serde(default = "default_pinned")]
    pub pinned: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_upstream_change_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upstream_missing: bool,
    #[serde(default)]
    pub status: ArchiveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Non-fatal caveat, e.g. a best-effort commit after retry exhaustion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,

    // Denormalized display fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_size: Option<u64>,
}

fn default_pinned() -> bool {
    true
}

impl ArchiveInfo {
    /// Build the initial record for a freshly pinned session.
    pub fn for_session(session: &Session, pinned_at: DateTime<Utc>) -> Self {
        let primary_relative_path = session
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());

        Self {
            session_id: session.id.clone(),
            source: session.source,
            upstream_path: session.file_path.clone(),
            upstream_is_dir: session.file_path.is_dir(),
            primary_relative_path,
            pinned_at,
            pinned: true,
            last_synced_at: None,
            last_upstream_change_at: None,
            upstream_missing: false,
            status: ArchiveStatus::Staging,
            last_error: None,
            advisory: None,
            title: Some(session.display_title()),
            model: session.model.clone(),
            cwd: session.cwd.clone(),
            start_time: session.start_time,
            end_time: session.end_time.or(session.last_modified),
            estimated_size: session.file_size,
        }
    }
}
