use packrat_engine::ScanKind;
use packrat_index::DiscoveryScope;
use packrat_types::SessionSource;

/// Progress of one refresh, reported through a channel the caller drains.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    SourceStarted {
        source: SessionSource,
        scope: DiscoveryScope,
    },
    Progress {
        source: SessionSource,
        processed: usize,
        total: usize,
    },
    /// A recency-window cap was hit; the next refresh of this source is
    /// promoted to a full pass.
    DriftDetected {
        source: SessionSource,
    },
    SourceCompleted {
        source: SessionSource,
        kind: ScanKind,
        sessions: usize,
    },
    /// Discovery itself failed; the previous known-good list stays
    /// published.
    SourceFailed {
        source: SessionSource,
        message: String,
    },
}
