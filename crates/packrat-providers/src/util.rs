use chrono::{DateTime, Utc};
use packrat_types::{EventCount, FileSignature};
use std::path::{Path, PathBuf};

/// Files at or below this size get an exact line count; larger files get a
/// size-based estimate so lightweight parsing stays cheap.
const EXACT_COUNT_LIMIT: u64 = 512 * 1024;

/// Average bytes per JSONL record, observed across agent logs.
const ESTIMATED_BYTES_PER_EVENT: u64 = 1400;

pub(crate) fn signature_for(path: &Path) -> Option<FileSignature> {
    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() == 0 {
        return None;
    }
    Some(FileSignature::from_metadata(&metadata))
}

/// Subdirectories of `root`, most recently modified first.
pub(crate) fn subdirs_most_recent_first(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<(u128, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let mtime = entry
            .metadata()
            .ok()
            .map(|m| FileSignature::from_metadata(&m).mtime_nanos)
            .unwrap_or(0);
        dirs.push((mtime, path));
    }
    dirs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(dirs.into_iter().map(|(_, p)| p).collect())
}

/// Sort `(path, signature)` entries newest-first by mtime, path as
/// tie-break so the order is stable across passes.
pub(crate) fn sort_files_most_recent_first(files: &mut [(PathBuf, FileSignature)]) {
    files.sort_by(|a, b| {
        b.1.mtime_nanos
            .cmp(&a.1.mtime_nanos)
            .then_with(|| b.0.cmp(&a.0))
    });
}

pub(crate) fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Exact line count for small files, size-derived estimate for large ones.
pub(crate) fn estimate_event_count(path: &Path, size: u64) -> EventCount {
    if size <= EXACT_COUNT_LIMIT
        && let Ok(text) = std::fs::read_to_string(path)
    {
        return EventCount::Exact(text.lines().filter(|l| !l.trim().is_empty()).count());
    }
    EventCount::Estimated((size / ESTIMATED_BYTES_PER_EVENT).max(1) as usize)
}

/// First non-empty line of a possibly multi-line text, trimmed.
pub(crate) fn snippet_from_text(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(line.to_string())
}
