use anyhow::Result;
use chrono::Utc;
use packrat_types::{Session, SessionSource};

use crate::info::ArchiveInfo;
use crate::store::ArchiveStore;
use crate::sync::{ensure_synced, ArchiveSettings, SyncEvent};

/// Synchronous facade over the store and the sync protocol.
///
/// All mutation funnels through here; the periodic service wraps one of
/// these in its worker thread so syncs for different sessions never run
/// concurrently.
pub struct Archiver {
    store: ArchiveStore,
    settings: ArchiveSettings,
}

impl Archiver {
    pub fn new(store: ArchiveStore, settings: ArchiveSettings) -> Result<Self> {
        store.init()?;
        Ok(Self { store, settings })
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    /// Pin a session and run its first sync immediately.
    pub fn pin(
        &self,
        session: &Session,
        on_event: &mut dyn FnMut(SyncEvent),
    ) -> Result<ArchiveInfo> {
        // Re-pinning an already archived session keeps its history.
        let mut info = match self.store.load_info(session.source, &session.id)? {
            Some(mut existing) => {
                existing.pinned = true;
                existing.upstream_path = session.file_path.clone();
                existing
            }
            None => ArchiveInfo::for_session(session, Utc::now()),
        };

        ensure_synced(&self.store, &mut info, &self.settings, Utc::now(), on_event);
        Ok(info)
    }

    /// Unpin a session. With `remove_data` the whole archive tree is
    /// deleted; otherwise the archive stays on disk but stops being synced
    /// and merged.
    pub fn unpin(
        &self,
        source: SessionSource,
        session_id: &str,
        remove_data: bool,
    ) -> Result<bool> {
        if remove_data {
            return self.store.remove(source, session_id);
        }
        match self.store.load_info(source, session_id)? {
            Some(mut info) => {
                info.pinned = false;
                self.store.save_info(&info)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// One pass over every pinned session. Failures stay local to their
    /// session; the pass itself always completes.
    pub fn sync_all(&self, on_event: &mut dyn FnMut(SyncEvent)) -> Result<usize> {
        let mut synced = 0;
        for mut info in self.store.list()? {
            if !info.pinned {
                continue;
            }
            ensure_synced(&self.store, &mut info, &self.settings, Utc::now(), on_event);
            synced += 1;
        }
        Ok(synced)
    }

    pub fn sync_one(
        &self,
        source: SessionSource,
        session_id: &str,
        on_event: &mut dyn FnMut(SyncEvent),
    ) -> Result<bool> {
        match self.store.load_info(source, session_id)? {
            Some(mut info) => {
                ensure_synced(&self.store, &mut info, &self.settings, Utc::now(), on_event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Pin state for display, regardless of status.
    pub fn list(&self) -> Result<Vec<ArchiveInfo>> {
        self.store.list()
    }
}
