mod io;
mod schema;

pub use io::{extract_gemini_header, GeminiHeader};

use anyhow::{Context, Result};
use packrat_index::{DiscoveryScope, Enumeration};
use packrat_types::{EventCount, FileSignature, Session, SessionSource};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::traits::{LightweightParser, RecentWindow, SourceDiscovery};
use crate::util::{parse_rfc3339, signature_for, sort_files_most_recent_first, subdirs_most_recent_first};

/// Gemini CLI writes one chat document per session under
/// `~/.gemini/tmp/<project-hash>/chats/`.
pub struct GeminiDiscovery;

impl SourceDiscovery for GeminiDiscovery {
    fn source(&self) -> SessionSource {
        SessionSource::Gemini
    }

    fn default_log_root(&self) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".gemini").join("tmp"))
    }

    fn probe(&self, path: &Path) -> bool {
        let filename = path.file_name().and_then(|f| f.to_str()).unwrap_or("");
        filename.starts_with("session-") && filename.ends_with(".json")
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

        let mut hash_dirs = subdirs_most_recent_first(log_root)
            .with_context(|| format!("Failed to read {}", log_root.display()))?;

        if scope == DiscoveryScope::Recent {
            hash_dirs.truncate(window.max_dirs);
        }

        let mut files = Vec::new();
        let mut truncated = false;

        for dir in &hash_dirs {
            let mut dir_files: Vec<(PathBuf, FileSignature)> = WalkDir::new(dir)
                .max_depth(2)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| self.probe(p))
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
            scanned_dirs: hash_dirs,
            truncated,
        })
    }
}

pub struct GeminiLightweightParser;

impl LightweightParser for GeminiLightweightParser {
    fn parse_lightweight(&self, path: &Path) -> Option<Session> {
        let signature = signature_for(path)?;
        let header = extract_gemini_header(path)?;

        let id = header
            .session_id
            .or_else(|| io::session_id_from_filename(path))?;

        Some(Session {
            id,
            source: SessionSource::Gemini,
            file_path: path.to_path_buf(),
            file_size: Some(signature.size),
            start_time: header.start_time.as_deref().and_then(parse_rfc3339),
            end_time: header.last_updated.as_deref().and_then(parse_rfc3339),
            last_modified: signature.modified_utc(),
            model: header.model,
            event_count: EventCount::Exact(header.message_count),
            events: Vec::new(),
            cwd: None,
            repo_name: None,
            snippet: header.snippet,
            archived: false,
        })
    }
}
