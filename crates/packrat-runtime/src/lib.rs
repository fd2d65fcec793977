pub mod config;
pub mod error;
pub mod events;
pub mod indexer;
pub mod workspace;

pub use config::{resolve_workspace_path, ArchiveConfig, Config, SourceConfig};
pub use error::{Error, Result};
pub use events::RefreshEvent;
pub use indexer::SourceIndexer;
pub use workspace::Workspace;

pub use packrat_engine::{ConcurrencyProfile, ScanKind};
pub use packrat_index::DiscoveryScope;
