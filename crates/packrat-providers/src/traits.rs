use anyhow::Result;
use packrat_index::{DiscoveryScope, Enumeration};
use packrat_types::{Session, SessionSource};
use std::path::{Path, PathBuf};

/// Bounds for `Recent`-scope enumeration.
#[derive(Debug, Clone, Copy)]
pub struct RecentWindow {
    /// Most-recently-modified subdirectories (or dated folders) to visit.
    pub max_dirs: usize,
    /// Hard cap on files listed per directory; hitting it flags drift.
    pub per_dir_cap: usize,
}

impl Default for RecentWindow {
    fn default() -> Self {
        Self {
            max_dirs: 8,
            per_dir_cap: 250,
        }
    }
}

/// Source-specific file discovery
///
/// Responsibilities:
/// - Locate the tool's log root on this host
/// - Identify candidate session files by name/shape
/// - Enumerate them full-tree or within a bounded recency window
pub trait SourceDiscovery: Send + Sync {
    fn source(&self) -> SessionSource;

    /// Default log root for this tool, if the host has one.
    fn default_log_root(&self) -> Option<PathBuf>;

    /// Cheap name/shape check; files failing it are never listed.
    fn probe(&self, path: &Path) -> bool;

    /// Enumerate candidate files in the source's natural newest-first
    /// order. Errors only when the root itself cannot be read; a missing
    /// root yields an empty enumeration.
    fn enumerate(
        &self,
        log_root: &Path,
        scope: DiscoveryScope,
        window: RecentWindow,
    ) -> Result<Enumeration>;
}

/// Fast partial parse producing summary fields only
///
/// Returns `None` on unparsable input; the file is skipped, never fatal
/// to the batch that contained it.
pub trait LightweightParser: Send + Sync {
    fn parse_lightweight(&self, path: &Path) -> Option<Session>;
}

/// Adapter bundling the two trait implementations for one tool.
pub struct SourceAdapter {
    pub discovery: Box<dyn SourceDiscovery>,
    pub parser: Box<dyn LightweightParser>,
}

impl SourceAdapter {
    pub fn new(discovery: Box<dyn SourceDiscovery>, parser: Box<dyn LightweightParser>) -> Self {
        Self { discovery, parser }
    }

    pub fn claude() -> Self {
        Self::new(
            Box::new(crate::claude::ClaudeDiscovery),
            Box::new(crate::claude::ClaudeLightweightParser),
        )
    }

    pub fn codex() -> Self {
        Self::new(
            Box::new(crate::codex::CodexDiscovery),
            Box::new(crate::codex::CodexLightweightParser),
        )
    }

    pub fn gemini() -> Self {
        Self::new(
            Box::new(crate::gemini::GeminiDiscovery),
            Box::new(crate::gemini::GeminiLightweightParser),
        )
    }

    pub fn for_source(source: SessionSource) -> Self {
        match source {
            SessionSource::ClaudeCode => Self::claude(),
            SessionSource::Codex => Self::codex(),
            SessionSource::Gemini => Self::gemini(),
        }
    }

    pub fn all() -> Vec<Self> {
        SessionSource::ALL.into_iter().map(Self::for_source).collect()
    }

    pub fn source(&self) -> SessionSource {
        self.discovery.source()
    }
}
