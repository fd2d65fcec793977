use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Byte-level shape of an archived snapshot.
///
/// Two snapshots comparing equal means the upstream presented one coherent
/// view across the copy window; that structural equality is the whole
/// consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub relative_path: String,
    pub size_bytes: u64,
    pub mtime_seconds: i64,
    /// Content hash, computed only for files at or below the size
    /// threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl ArchiveManifest {
    /// Snapshot a file or directory. Directory entries are sorted by
    /// relative path so equality does not depend on traversal order.
    pub fn snapshot(upstream: &Path, hash_threshold: u64) -> Result<Self> {
        let metadata = std::fs::metadata(upstream)
            .with_context(|| format!("Failed to stat {}", upstream.display()))?;

        let mut entries = Vec::new();
        if metadata.is_dir() {
            for entry in WalkDir::new(upstream).follow_links(false) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(upstream)
                    .context("walked outside the upstream root")?
                    .to_string_lossy()
                    .into_owned();
                entries.push(entry_for(entry.path(), relative, hash_threshold)?);
            }
            entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        } else {
            let name = upstream
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "data".to_string());
            entries.push(entry_for(upstream, name, hash_threshold)?);
        }

        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.iter().any(|e| e.relative_path == relative_path)
    }
}

fn entry_for(path: &Path, relative_path: String, hash_threshold: u64) -> Result<ManifestEntry> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let mtime_seconds = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let hash = if metadata.len() <= hash_threshold {
        Some(hash_file(path)?)
    } else {
        None
    };

    Ok(ManifestEntry {
        relative_path,
        size_bytes: metadata.len(),
        mtime_seconds,
        hash,
    })
}

fn hash_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
