use crate::{Error, Result};
use packrat_archive::ArchiveSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve the workspace data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. PACKRAT_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.packrat (fallback for systems without XDG)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("PACKRAT_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("packrat"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".packrat"));
    }

    Err(Error::Config(
        "Could not determine workspace path: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub enabled: bool,
    /// Overrides the tool's default log root.
    #[serde(default)]
    pub log_root: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_root: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub quiescence_minutes: u64,
    pub sync_interval_seconds: u64,
    pub startup_delay_seconds: u64,
    pub max_copy_attempts: u32,
    pub hash_threshold_bytes: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        let defaults = ArchiveSettings::default();
        Self {
            quiescence_minutes: defaults.quiescence.as_secs() / 60,
            sync_interval_seconds: defaults.sync_interval.as_secs(),
            startup_delay_seconds: defaults.startup_delay.as_secs(),
            max_copy_attempts: defaults.max_copy_attempts,
            hash_threshold_bytes: defaults.hash_threshold_bytes,
        }
    }
}

impl ArchiveConfig {
    pub fn settings(&self) -> ArchiveSettings {
        ArchiveSettings {
            quiescence: Duration::from_secs(self.quiescence_minutes * 60),
            sync_interval: Duration::from_secs(self.sync_interval_seconds),
            startup_delay: Duration::from_secs(self.startup_delay_seconds),
            max_copy_attempts: self.max_copy_attempts,
            hash_threshold_bytes: self.hash_threshold_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sources: HashMap<String, SourceConfig>,
    pub archive: ArchiveConfig,
}

impl Config {
    pub fn load(workspace_root: &Path) -> Result<Self> {
        Self::load_from(&workspace_root.join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn source(&self, name: &str) -> SourceConfig {
        self.sources.get(name).cloned().unwrap_or_default()
    }
}
