mod io;
mod schema;

pub use io::{extract_claude_header, ClaudeHeader};

use anyhow::{Context, Result};
use packrat_index::{DiscoveryScope, Enumeration};
use packrat_types::{repo_name_from_cwd, FileSignature, Session, SessionSource};
use std::path::{Path, PathBuf};

use crate::traits::{LightweightParser, RecentWindow, SourceDiscovery};
use crate::util::{
    estimate_event_count, parse_rfc3339, signature_for, sort_files_most_recent_first,
    subdirs_most_recent_first,
};

/// Claude Code keeps one directory per project under `~/.claude/projects`,
/// with one JSONL file per session inside it.
pub struct ClaudeDiscovery;

impl SourceDiscovery for ClaudeDiscovery {
    fn source(&self) -> SessionSource {
        SessionSource::ClaudeCode
    }

    fn default_log_root(&self) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".claude").join("projects"))
    }

    fn probe(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "jsonl")
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

        let mut project_dirs = subdirs_most_recent_first(log_root)
            .with_context(|| format!("Failed to read {}", log_root.display()))?;

        if scope == DiscoveryScope::Recent {
            project_dirs.truncate(window.max_dirs);
        }

        let mut files = Vec::new();
        let mut truncated = false;

        for dir in &project_dirs {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            let mut dir_files: Vec<(PathBuf, FileSignature)> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && self.probe(p))
                .filter_map(|p| signature_for(&p).map(|sig| (p, sig)))
                .collect();
            sort_files_most_recent_first(&mut dir_files);

            if scope == DiscoveryScope::Recent && dir_files.len() > window.per_dir_cap {
                dir_files.truncate(window.per_dir_cap);
                truncated = true;
            }
            files.extend(dir_files);
        }

        sort_files_most_recent_first(&mut files);

        Ok(Enumeration {
            scope,
            files,
            scanned_dirs: project_dirs,
            truncated,
        })
    }
}

pub struct ClaudeLightweightParser;

impl LightweightParser for ClaudeLightweightParser {
    fn parse_lightweight(&self, path: &Path) -> Option<Session> {
        let signature = signature_for(path)?;
        let header = extract_claude_header(path).ok()?;

        // Session files are named by their id; the header wins when present.
        let id = header.session_id.or_else(|| {
            path.file_stem().map(|s| s.to_string_lossy().into_owned())
        })?;

        let cwd = header.cwd;
        Some(Session {
            id,
            source: SessionSource::ClaudeCode,
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
