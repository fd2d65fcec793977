use packrat_types::{
    repo_name_from_cwd, sort_most_recent_first, EventCount, Session, SessionSource,
};
use std::collections::HashSet;

use crate::info::ArchiveInfo;
use crate::store::ArchiveStore;

/// Keep pinned sessions visible after their upstream file disappears.
///
/// For every pinned id of `source` not already present in `sessions`, if a
/// committed archive with its primary data file exists, a lightweight
/// placeholder is synthesized from the denormalized metadata and appended.
/// The result is re-sorted newest first.
pub fn merge_archive_fallbacks(
    store: &ArchiveStore,
    source: SessionSource,
    mut sessions: Vec<Session>,
) -> Vec<Session> {
    let infos = match store.list_for_source(source) {
        Ok(infos) => infos,
        // A broken archive root must not break the live catalog.
        Err(_) => return sessions,
    };

    let present: HashSet<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    let mut placeholders = Vec::new();

    for info in &infos {
        if !info.pinned || present.contains(info.session_id.as_str()) {
            continue;
        }
        if !store.is_data_committed(info) {
            continue;
        }
        placeholders.push(placeholder_session(store, info));
    }

    sessions.extend(placeholders);
    sort_most_recent_first(&mut sessions);
    sessions
}

fn placeholder_session(store: &ArchiveStore, info: &ArchiveInfo) -> Session {
    Session {
        id: info.session_id.clone(),
        source: info.source,
        file_path: store.primary_data_path(info),
        file_size: info.estimated_size,
        start_time: info.start_time,
        end_time: info.end_time,
        last_modified: info
            .end_time
            .or(info.last_upstream_change_at)
            .or(Some(info.pinned_at)),
        model: info.model.clone(),
        event_count: EventCount::Estimated(0),
        events: Vec::new(),
        cwd: info.cwd.clone(),
        repo_name: info.cwd.as_deref().and_then(repo_name_from_cwd),
        snippet: info.title.clone(),
        archived: true,
    }
}
