use packrat_archive::{ArchiveService, ArchiveStore, Archiver, SyncEvent};
use packrat_engine::ConcurrencyProfile;
use packrat_index::DiscoveryScope;
use packrat_providers::SourceAdapter;
use packrat_types::{sort_most_recent_first, Session, SessionSource};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::config::Config;
use crate::events::RefreshEvent;
use crate::indexer::SourceIndexer;
use crate::{Error, Result};

/// One packrat data directory: config, per-source session caches, and the
/// archive tree.
///
/// ```text
/// <root>/config.toml
/// <root>/cache/<source>.json
/// <root>/archives/<source>/<session-id>/...
/// ```
pub struct Workspace {
    root: PathBuf,
    config: Config,
    archiver: Arc<Archiver>,
    indexers: Vec<Arc<SourceIndexer>>,
}

impl Workspace {
    /// Open (creating on first use) the workspace at `root`.
    pub fn open(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        let config = Config::load(&root)?;

        let archiver = Arc::new(
            Archiver::new(
                ArchiveStore::new(root.join("archives")),
                config.archive.settings(),
            )
            .map_err(Error::Archive)?,
        );

        let mut indexers = Vec::new();
        for source in SessionSource::ALL {
            let source_config = config.source(source.as_str());
            if !source_config.enabled {
                continue;
            }
            let adapter = SourceAdapter::for_source(source);
            let Some(log_root) = source_config
                .log_root
                .clone()
                .or_else(|| adapter.discovery.default_log_root())
            else {
                continue;
            };
            let cache_path = root
                .join("cache")
                .join(format!("{}.json", source.as_str()));
            indexers.push(Arc::new(SourceIndexer::new(
                adapter,
                log_root,
                cache_path,
                Arc::clone(&archiver),
            )));
        }

        Ok(Self {
            root,
            config,
            archiver,
            indexers,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn archiver(&self) -> &Archiver {
        &self.archiver
    }

    pub fn indexers(&self) -> &[Arc<SourceIndexer>] {
        &self.indexers
    }

    /// Refresh every enabled source and publish one merged, sorted list.
    ///
    /// A source whose discovery fails keeps its previously published
    /// sessions in the result; per-file failures never surface here at all.
    pub async fn refresh(
        &self,
        scope: DiscoveryScope,
        profile: ConcurrencyProfile,
        events: &Sender<RefreshEvent>,
    ) -> Result<Vec<Session>> {
        let mut all = Vec::new();
        for indexer in &self.indexers {
            match indexer.refresh(scope, profile, events).await {
                Ok(Some(sessions)) => all.extend(sessions),
                // Queued behind an in-flight pass, or superseded: fall back
                // to what that pass published.
                Ok(None) => all.extend(indexer.published()),
                Err(_) => all.extend(indexer.published()),
            }
        }
        sort_most_recent_first(&mut all);
        Ok(all)
    }

    /// Merged snapshot of the last published lists, without scanning.
    pub fn sessions(&self) -> Vec<Session> {
        let mut all = Vec::new();
        for indexer in &self.indexers {
            all.extend(indexer.published());
        }
        sort_most_recent_first(&mut all);
        all
    }

    /// Find a published session by id or unique id prefix.
    pub fn find_session(&self, id_or_prefix: &str) -> Option<Session> {
        let sessions = self.sessions();
        if let Some(exact) = sessions.iter().find(|s| s.id == id_or_prefix) {
            return Some(exact.clone());
        }
        let mut matches = sessions.iter().filter(|s| s.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }

    /// Pin a session and run its first sync on the calling thread.
    pub fn pin(&self, session: &Session) -> Result<()> {
        let mut sink = |_event: SyncEvent| {};
        self.archiver
            .pin(session, &mut sink)
            .map(|_| ())
            .map_err(Error::Archive)
    }

    pub fn unpin(
        &self,
        source: SessionSource,
        session_id: &str,
        remove_archive: bool,
    ) -> Result<bool> {
        self.archiver
            .unpin(source, session_id, remove_archive)
            .map_err(Error::Archive)
    }

    /// Start the periodic archive service on its own worker thread. The
    /// service owns an independent `Archiver` over the same on-disk tree;
    /// all of its IO is serialized on that one thread.
    pub fn start_archive_service(&self) -> Result<ArchiveService> {
        let archiver = Archiver::new(
            ArchiveStore::new(self.root.join("archives")),
            self.config.archive.settings(),
        )
        .map_err(Error::Archive)?;
        ArchiveService::start(archiver).map_err(Error::Archive)
    }
}
