pub mod archiver;
pub mod fallback;
pub mod info;
pub mod manifest;
pub mod service;
pub mod store;
pub mod sync;

pub use archiver::Archiver;
pub use fallback::merge_archive_fallbacks;
pub use info::{ArchiveInfo, ArchiveStatus};
pub use manifest::{ArchiveManifest, ManifestEntry};
pub use service::{ArchiveCommand, ArchiveEvent, ArchiveService};
pub use store::ArchiveStore;
pub use sync::{ensure_synced, ArchiveSettings, SyncEvent};
