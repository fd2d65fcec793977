use chrono::{DateTime, Utc};
use packrat_types::{Session, SessionSource};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::delta::SignatureMap;
use crate::Result;

/// Persisted per-source catalog snapshot, used as the hydrate path on a
/// warm start. Carrying the signature map along with the sessions means a
/// hydrated catalog still has a delta baseline, so the first refresh after
/// hydration only parses real changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCacheFile {
    pub source: SessionSource,
    pub generated_at: DateTime<Utc>,
    pub signatures: SignatureMap,
    pub sessions: Vec<Session>,
}

impl SessionCacheFile {
    pub fn new(
        source: SessionSource,
        generated_at: DateTime<Utc>,
        signatures: SignatureMap,
        sessions: Vec<Session>,
    ) -> Self {
        Self {
            source,
            generated_at,
            signatures,
            sessions,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write-then-rename so a reader never observes a half-written cache.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
