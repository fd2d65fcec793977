mod io;
mod schema;

pub use io::{extract_codex_header, CodexHeader};

use anyhow::{Context, Result};
use packrat_index::{DiscoveryScope, Enumeration};
use packrat_types::{repo_name_from_cwd, FileSignature, Session, SessionSource};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::traits::{LightweightParser, RecentWindow, SourceDiscovery};
use crate::util::{estimate_event_count, parse_rfc3339, signature_for};

/// Codex shards rollouts by date: `~/.codex/sessions/YYYY/MM/DD/rollout-*.jsonl`.
pub struct CodexDiscovery;

impl CodexDiscovery {
    /// Day directories, newest first. Zero-padded date components make
    /// lexicographic order chronological.
    fn day_dirs_newest_first(log_root: &Path) -> Vec<PathBuf> {
        let mut days: Vec<PathBuf> = WalkDir::new(log_root)
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();
        days.sort_by(|a, b| b.cmp(a));
        days
    }

    fn list_day(&self, day_dir: &Path) -> Vec<(PathBuf, FileSignature)> {
        let Ok(entries) = std::fs::read_dir(day_dir) else {
            return Vec::new();
        };
        let mut files: Vec<(PathBuf, FileSignature)> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.probe(p))
            .filter_map(|p| signature_for(&p).map(|sig| (p, sig)))
            .collect();
        // Natural order for this source is the timestamped filename.
        files.sort_by(|a, b| b.0.cmp(&a.0));
        files
    }
}

impl SourceDiscovery for CodexDiscovery {
    fn source(&self) -> SessionSource {
        SessionSource::Codex
    }

    fn default_log_root(&self) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".codex").join("sessions"))
    }

    fn probe(&self, path: &Path) -> bool {
        let is_jsonl = path.extension().is_some_and(|e| e == "jsonl");
        let filename = path.file_name().and_then(|f| f.to_str()).unwrap_or("");
        is_jsonl && filename.starts_with("rollout-")
    }

    fn enumerate(
        &self,
        log_root: &Path,
        scope: DiscoveryScope,
        window: RecentWindow,
    ) -> Result<Enumeration> {
        if !log_root.exists() {
            return Ok(Enumeration::empty(scope));
        }
        std::fs::read_dir(log_root)
            .with_context(|| format!("Failed to read {}", log_root.display()))?;

        let mut day_dirs = Self::day_dirs_newest_first(log_root);
        if scope == DiscoveryScope::Recent {
            day_dirs.truncate(window.max_dirs);
        }

        let mut files = Vec::new();
        let mut truncated = false;

        for day_dir in &day_dirs {
            let mut day_files = self.list_day(day_dir);
            if scope == DiscoveryScope::Recent && day_files.len() > window.per_dir_cap {
                day_files.truncate(window.per_dir_cap);
                truncated = true;
            }
            files.extend(day_files);
        }

        Ok(Enumeration {
            scope,
            files,
            scanned_dirs: day_dirs,
            truncated,
        })
    }
}

pub struct CodexLightweightParser;

impl LightweightParser for CodexLightweightParser {
    fn parse_lightweight(&self, path: &Path) -> Option<Session> {
        let signature = signature_for(path)?;
        let header = extract_codex_header(path).ok()?;

        let id = header
            .session_id
            .or_else(|| io::session_id_from_filename(path))?;

        let cwd = header.cwd;
        Some(Session {
            id,
            source: SessionSource::Codex,
            file_path: path.to_path_buf(),
            file_size: Some(signature.size),
            start_time: header.timestamp.as_deref().and_then(parse_rfc3339),
            end_time: None,
            last_modified: signature.modified_utc(),
            model: header.model,
            event_count: estimate_event_count(path, signature.size),
            events: Vec::new(),
            repo_name: cwd.as_deref().and_then(repo_name_from_cwd),
            cwd,
            snippet: header.snippet,
            archived: false,
        })
    }
}
