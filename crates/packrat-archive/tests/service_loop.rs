use packrat_archive::{
    ArchiveEvent, ArchiveSettings, ArchiveStatus, ArchiveStore, ArchiveService, Archiver,
    SyncEvent,
};
use packrat_types::{EventCount, Session, SessionSource};
use std::fs;
use std::time::{Duration, Instant};

fn fast_settings() -> ArchiveSettings {
    ArchiveSettings {
        startup_delay: Duration::from_millis(20),
        sync_interval: Duration::from_millis(100),
        ..ArchiveSettings::default()
    }
}

fn wait_for<F>(service: &ArchiveService, timeout: Duration, mut predicate: F) -> bool
where
    F: FnMut(&ArchiveEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match service.events().recv_timeout(Duration::from_millis(50)) {
            Ok(event) if predicate(&event) => return true,
            Ok(_) => {}
            Err(_) => {}
        }
    }
    false
}

#[test]
fn service_processes_commands_and_runs_periodic_passes() {
    let workspace = tempfile::tempdir().unwrap();
    let upstream = workspace.path().join("a.jsonl");
    fs::write(&upstream, "one\n").unwrap();

    let archiver = Archiver::new(
        ArchiveStore::new(workspace.path().join("archives")),
        fast_settings(),
    )
    .unwrap();
    let probe = Archiver::new(
        ArchiveStore::new(workspace.path().join("archives")),
        fast_settings(),
    )
    .unwrap();

    let service = ArchiveService::start(archiver).unwrap();

    let session = Session {
        id: "sess-1".to_string(),
        source: SessionSource::ClaudeCode,
        file_path: upstream.clone(),
        file_size: Some(4),
        start_time: None,
        end_time: None,
        last_modified: None,
        model: None,
        event_count: EventCount::Estimated(1),
        events: Vec::new(),
        cwd: None,
        repo_name: None,
        snippet: None,
        archived: false,
    };
    service.pin(session);

    assert!(
        wait_for(&service, Duration::from_secs(5), |event| matches!(
            event,
            ArchiveEvent::Pinned { session_id, .. } if session_id == "sess-1"
        )),
        "pin command was not processed"
    );

    // Grow the upstream; the periodic pass picks it up without any command.
    fs::write(&upstream, "one\ntwo\n").unwrap();
    assert!(
        wait_for(&service, Duration::from_secs(5), |event| matches!(
            event,
            ArchiveEvent::Sync(SyncEvent::Committed { .. })
        )),
        "periodic pass never re-synced the archive"
    );

    service.shutdown();

    let info = probe
        .store()
        .load_info(SessionSource::ClaudeCode, "sess-1")
        .unwrap()
        .unwrap();
    assert_eq!(info.status, ArchiveStatus::Syncing);
    let data = probe.store().primary_data_path(&info);
    assert_eq!(fs::read_to_string(data).unwrap(), "one\ntwo\n");
}

#[test]
fn unpin_with_removal_deletes_through_the_service() {
    let workspace = tempfile::tempdir().unwrap();
    let upstream = workspace.path().join("a.jsonl");
    fs::write(&upstream, "one\n").unwrap();

    let archiver = Archiver::new(
        ArchiveStore::new(workspace.path().join("archives")),
        fast_settings(),
    )
    .unwrap();
    let canonical = archiver
        .store()
        .session_dir(SessionSource::ClaudeCode, "sess-1");

    let service = ArchiveService::start(archiver).unwrap();
    let session = Session {
        id: "sess-1".to_string(),
        source: SessionSource::ClaudeCode,
        file_path: upstream.clone(),
        file_size: Some(4),
        start_time: None,
        end_time: None,
        last_modified: None,
        model: None,
        event_count: EventCount::Estimated(1),
        events: Vec::new(),
        cwd: None,
        repo_name: None,
        snippet: None,
        archived: false,
    };
    service.pin(session);
    assert!(wait_for(&service, Duration::from_secs(5), |event| {
        matches!(event, ArchiveEvent::Pinned { .. })
    }));

    service.unpin(SessionSource::ClaudeCode, "sess-1".to_string(), true);
    assert!(wait_for(&service, Duration::from_secs(5), |event| matches!(
        event,
        ArchiveEvent::Unpinned { removed: true, .. }
    )));

    service.shutdown();
    assert!(!canonical.exists());
}
