use anyhow::{Context, Result};
use packrat_types::SessionSource;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use walkdir::WalkDir;

use crate::info::ArchiveInfo;
use crate::manifest::ArchiveManifest;

pub const METADATA_FILE: &str = "archive.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DATA_DIR: &str = "data";
const STAGING_DIR: &str = ".staging";

/// On-disk archive tree.
///
/// Layout (read by other tooling, so the names are compatibility-relevant):
///
/// ```text
/// root/<source>/<session-id>/archive.json
/// root/<source>/<session-id>/manifest.json
/// root/<source>/<session-id>/data/...
/// root/.staging/...            transient, never read
/// ```
///
/// Every data mutation goes through stage-then-atomic-replace, so a
/// canonical session directory is either fully absent or fully committed.
/// A crash mid-sync leaves the old state or nothing, never a torn tree.
pub struct ArchiveStore {
    root: PathBuf,
    swap_counter: AtomicU64,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            swap_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(self.root.join(STAGING_DIR))
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        Ok(())
    }

    pub fn session_dir(&self, source: SessionSource, session_id: &str) -> PathBuf {
        self.root
            .join(source.as_str())
            .join(sanitize_component(session_id))
    }

    pub fn data_dir(&self, source: SessionSource, session_id: &str) -> PathBuf {
        self.session_dir(source, session_id).join(DATA_DIR)
    }

    /// Canonical path of the archive's primary data file.
    pub fn primary_data_path(&self, info: &ArchiveInfo) -> PathBuf {
        self.data_dir(info.source, &info.session_id)
            .join(&info.primary_relative_path)
    }

    /// Fresh, unique staging directory for one copy attempt.
    pub fn new_staging_dir(&self, source: SessionSource, session_id: &str) -> Result<PathBuf> {
        let nonce = self.swap_counter.fetch_add(1, Ordering::Relaxed);
        let dir = self.root.join(STAGING_DIR).join(format!(
            "{}-{}-{}-{}",
            source.as_str(),
            sanitize_component(session_id),
            std::process::id(),
            nonce,
        ));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }

    /// Atomically replace `canonical` with `staging`.
    ///
    /// The old directory is renamed aside first and removed only after the
    /// new tree is in place; a concurrent reader sees the old complete
    /// state, nothing, or the new complete state.
    pub fn commit(&self, staging: &Path, canonical: &Path) -> Result<()> {
        if let Some(parent) = canonical.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let nonce = self.swap_counter.fetch_add(1, Ordering::Relaxed);
        let displaced = self.root.join(STAGING_DIR).join(format!(
            "displaced-{}-{}",
            std::process::id(),
            nonce
        ));

        let had_previous = canonical.exists();
        if had_previous {
            std::fs::rename(canonical, &displaced).with_context(|| {
                format!("Failed to displace {}", canonical.display())
            })?;
        }

        match std::fs::rename(staging, canonical) {
            Ok(()) => {
                if had_previous {
                    // Cleanup failure leaves garbage in .staging, not a torn
                    // archive; ignore it.
                    let _ = std::fs::remove_dir_all(&displaced);
                }
                Ok(())
            }
            Err(err) => {
                if had_previous {
                    let _ = std::fs::rename(&displaced, canonical);
                }
                Err(err).with_context(|| {
                    format!("Failed to commit staging into {}", canonical.display())
                })
            }
        }
    }

    pub fn load_info(
        &self,
        source: SessionSource,
        session_id: &str,
    ) -> Result<Option<ArchiveInfo>> {
        let path = self.session_dir(source, session_id).join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let info = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(info))
    }

    /// Rewrite `archive.json` in place (metadata-only change, no data swap).
    pub fn save_info(&self, info: &ArchiveInfo) -> Result<()> {
        let dir = self.session_dir(info.source, &info.session_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_info_file(&dir.join(METADATA_FILE), info)
    }

    pub fn load_manifest(
        &self,
        source: SessionSource,
        session_id: &str,
    ) -> Result<Option<ArchiveManifest>> {
        let path = self.session_dir(source, session_id).join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(ArchiveManifest::load(&path)?))
    }

    /// Whether this pin has a committed archive whose primary data file is
    /// actually present.
    pub fn is_data_committed(&self, info: &ArchiveInfo) -> bool {
        let dir = self.session_dir(info.source, &info.session_id);
        dir.join(MANIFEST_FILE).exists() && self.primary_data_path(info).exists()
    }

    pub fn list(&self) -> Result<Vec<ArchiveInfo>> {
        let mut infos = Vec::new();
        for source in SessionSource::ALL {
            infos.extend(self.list_for_source(source)?);
        }
        Ok(infos)
    }

    pub fn list_for_source(&self, source: SessionSource) -> Result<Vec<ArchiveInfo>> {
        let source_dir = self.root.join(source.as_str());
        if !source_dir.exists() {
            return Ok(Vec::new());
        }

        let mut infos = Vec::new();
        for entry in WalkDir::new(&source_dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let metadata_path = entry.path().join(METADATA_FILE);
            if !metadata_path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&metadata_path)
                .with_context(|| format!("Failed to read {}", metadata_path.display()))?;
            match serde_json::from_str::<ArchiveInfo>(&content) {
                Ok(info) => infos.push(info),
                // One corrupt record must not hide every other archive.
                Err(_) => continue,
            }
        }
        Ok(infos)
    }

    /// Recursive removal; not subject to the sync protocol.
    pub fn remove(&self, source: SessionSource, session_id: &str) -> Result<bool> {
        let dir = self.session_dir(source, session_id);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
        Ok(true)
    }
}

pub(crate) fn write_info_file(path: &Path, info: &ArchiveInfo) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(info)?)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Session ids become path components; keep them boring.
fn sanitize_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    if out.is_empty() {
        out.push_str("session");
    }
    out
}
