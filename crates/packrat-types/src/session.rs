use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::event::AgentEvent;
use crate::source::SessionSource;

/// Exact or estimated number of events in a session log.
///
/// Lightweight parsing estimates the count from the file shape instead of
/// materializing every event; a full parse replaces it with an exact count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EventCount {
    Exact(usize),
    Estimated(usize),
}

impl EventCount {
    pub fn value(&self) -> usize {
        match self {
            EventCount::Exact(n) | EventCount::Estimated(n) => *n,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, EventCount::Exact(_))
    }
}

impl Default for EventCount {
    fn default() -> Self {
        EventCount::Estimated(0)
    }
}

/// One session log as seen by the catalog.
///
/// Owned by the indexer that produced it; replaced wholesale on re-parse.
/// Consumers never mutate fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable identifier, unique within a source.
    pub id: String,
    pub source: SessionSource,
    pub file_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Most recent write to the backing file; the catalog sort key.
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub event_count: EventCount,
    /// Empty for lightweight entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<AgentEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// True only for placeholders synthesized from a committed archive
    /// after the upstream file disappeared.
    #[serde(default)]
    pub archived: bool,
}

impl Session {
    /// Display title derived from the richest available field.
    pub fn display_title(&self) -> String {
        if let Some(snippet) = &self.snippet {
            let line = snippet.lines().next().unwrap_or("").trim();
            if !line.is_empty() {
                return truncate_chars(line, 80);
            }
        }
        if let Some(repo) = &self.repo_name {
            return repo.clone();
        }
        if let Some(cwd) = &self.cwd
            && let Some(base) = Path::new(cwd).file_name()
        {
            return base.to_string_lossy().into_owned();
        }
        self.id.clone()
    }

    /// Timestamp used for "most recently modified first" ordering.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.last_modified
            .or(self.end_time)
            .or(self.start_time)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Derive a repository label from a working-directory hint.
pub fn repo_name_from_cwd(cwd: &str) -> Option<String> {
    let base = Path::new(cwd).file_name()?.to_string_lossy();
    let trimmed = base.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Stable sort, newest first. Entries with equal keys keep their order,
/// which is what preserves file-discovery order for same-instant sessions.
pub fn sort_most_recent_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}
