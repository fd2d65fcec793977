use packrat_runtime::{
    Config, ConcurrencyProfile, DiscoveryScope, RefreshEvent, ScanKind, SourceConfig, Workspace,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

fn claude_line(session_id: &str, text: &str) -> String {
    format!(
        r#"{{"type":"user","sessionId":"{session_id}","cwd":"/home/dev/widget","timestamp":"2026-03-01T10:00:00Z","message":{{"role":"user","content":"{text}"}}}}"#
    )
}

fn write_session(logs_root: &Path, session_id: &str, lines: usize) -> PathBuf {
    let project = logs_root.join("proj-widget");
    fs::create_dir_all(&project).unwrap();
    let mut content = String::new();
    for i in 0..lines {
        content.push_str(&claude_line(session_id, &format!("message {i}")));
        content.push('\n');
    }
    let path = project.join(format!("{session_id}.jsonl"));
    fs::write(&path, content).unwrap();
    path
}

fn open_workspace(root: &Path, logs_root: &Path) -> Workspace {
    let mut config = Config::default();
    config.sources.insert(
        "claude_code".to_string(),
        SourceConfig {
            enabled: true,
            log_root: Some(logs_root.to_path_buf()),
        },
    );
    config.sources.insert(
        "codex".to_string(),
        SourceConfig {
            enabled: false,
            log_root: None,
        },
    );
    config.sources.insert(
        "gemini".to_string(),
        SourceConfig {
            enabled: false,
            log_root: None,
        },
    );
    fs::create_dir_all(root).unwrap();
    config.save_to(&root.join("config.toml")).unwrap();
    Workspace::open(root.to_path_buf()).unwrap()
}

fn drain(rx: &Receiver<RefreshEvent>) -> Vec<RefreshEvent> {
    rx.try_iter().collect()
}

#[tokio::test]
async fn append_delete_pin_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let logs_root = tmp.path().join("logs");
    let session_file = write_session(&logs_root, "sess-a", 2);

    let workspace = open_workspace(&tmp.path().join("workspace"), &logs_root);
    let (tx, rx) = channel();

    // First full refresh indexes the one session.
    let sessions = workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "sess-a");
    let first_size = sessions[0].file_size.unwrap();
    assert!(drain(&rx).iter().any(|e| matches!(
        e,
        RefreshEvent::SourceCompleted {
            kind: ScanKind::Scanned,
            sessions: 1,
            ..
        }
    )));

    // Unchanged tree: the next pass parses nothing but the session stays
    // published.
    let sessions = workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    let events = drain(&rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, RefreshEvent::Progress { total: 0, .. })));

    // Append: the recent-scope pass re-parses and replaces the entry.
    let mut content = fs::read_to_string(&session_file).unwrap();
    content.push_str(&claude_line("sess-a", "appended"));
    content.push('\n');
    fs::write(&session_file, content).unwrap();
    filetime::set_file_mtime(&session_file, filetime::FileTime::from_unix_time(1_900_000_000, 0))
        .unwrap();

    let sessions = workspace
        .refresh(DiscoveryScope::Recent, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].file_size.unwrap() > first_size);
    assert_eq!(sessions[0].event_count.value(), 3);

    // Pin, then delete the upstream: the session survives as an archived
    // placeholder.
    workspace.pin(&sessions[0]).unwrap();
    fs::remove_file(&session_file).unwrap();

    let sessions = workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].archived);
    assert_eq!(sessions[0].id, "sess-a");
    assert!(sessions[0].events.is_empty());
    assert!(sessions[0].file_path.exists());

    // Unpin with removal: nothing left to show.
    workspace
        .unpin(sessions[0].source, "sess-a", true)
        .unwrap();
    let sessions = workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn unpinned_session_disappears_with_its_upstream() {
    let tmp = tempfile::tempdir().unwrap();
    let logs_root = tmp.path().join("logs");
    let session_file = write_session(&logs_root, "sess-b", 2);

    let workspace = open_workspace(&tmp.path().join("workspace"), &logs_root);
    let (tx, _rx) = channel();

    let sessions = workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);

    fs::remove_file(&session_file).unwrap();
    let sessions = workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn cold_start_hydrates_from_the_session_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let logs_root = tmp.path().join("logs");
    let session_file = write_session(&logs_root, "sess-c", 2);
    let workspace_root = tmp.path().join("workspace");

    // First process run scans and writes the cache.
    {
        let workspace = open_workspace(&workspace_root, &logs_root);
        let (tx, _rx) = channel();
        let sessions = workspace
            .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
    }
    assert!(workspace_root.join("cache").join("claude_code.json").exists());

    // Second process run hydrates instead of scanning.
    let workspace = Workspace::open(workspace_root.clone()).unwrap();
    let (tx, rx) = channel();
    let sessions = workspace
        .refresh(DiscoveryScope::Recent, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "sess-c");
    assert!(drain(&rx).iter().any(|e| matches!(
        e,
        RefreshEvent::SourceCompleted {
            kind: ScanKind::Hydrated,
            ..
        }
    )));

    // The hydrated baseline still detects the next real change.
    let mut content = fs::read_to_string(&session_file).unwrap();
    content.push_str(&claude_line("sess-c", "late append"));
    content.push('\n');
    fs::write(&session_file, content).unwrap();
    filetime::set_file_mtime(&session_file, filetime::FileTime::from_unix_time(1_900_000_100, 0))
        .unwrap();

    let sessions = workspace
        .refresh(DiscoveryScope::Recent, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].event_count.value(), 3);
    let events = drain(&rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, RefreshEvent::Progress { total: 1, .. })));
}

#[tokio::test]
async fn archive_service_heals_pinned_archives_on_its_timer() {
    use packrat_archive::ArchiveEvent;
    use std::time::{Duration, Instant};

    let tmp = tempfile::tempdir().unwrap();
    let logs_root = tmp.path().join("logs");
    let session_file = write_session(&logs_root, "sess-d", 2);
    let root = tmp.path().join("workspace");

    let mut config = Config::default();
    config.sources.insert(
        "claude_code".to_string(),
        SourceConfig {
            enabled: true,
            log_root: Some(logs_root.clone()),
        },
    );
    for name in ["codex", "gemini"] {
        config.sources.insert(
            name.to_string(),
            SourceConfig {
                enabled: false,
                log_root: None,
            },
        );
    }
    config.archive.startup_delay_seconds = 0;
    config.archive.sync_interval_seconds = 1;
    fs::create_dir_all(&root).unwrap();
    config.save_to(&root.join("config.toml")).unwrap();

    let workspace = Workspace::open(root).unwrap();
    let (tx, _rx) = channel();
    let sessions = workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();
    workspace.pin(&sessions[0]).unwrap();

    // Grow the upstream, then let the timer pick it up with no commands.
    let mut content = fs::read_to_string(&session_file).unwrap();
    content.push_str(&claude_line("sess-d", "appended later"));
    content.push('\n');
    fs::write(&session_file, content.clone()).unwrap();

    let service = workspace.start_archive_service().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut healed = false;
    while Instant::now() < deadline && !healed {
        if let Ok(ArchiveEvent::PassCompleted { synced }) = service
            .events()
            .recv_timeout(Duration::from_millis(200))
        {
            assert_eq!(synced, 1);
            let info = workspace
                .archiver()
                .store()
                .load_info(sessions[0].source, "sess-d")
                .unwrap()
                .unwrap();
            let data = workspace.archiver().store().primary_data_path(&info);
            if fs::read_to_string(&data).unwrap() == content {
                healed = true;
            }
        }
    }
    service.shutdown();
    assert!(healed, "periodic pass never re-synced the archive");
}

#[tokio::test]
async fn find_session_matches_unique_prefixes() {
    let tmp = tempfile::tempdir().unwrap();
    let logs_root = tmp.path().join("logs");
    write_session(&logs_root, "abc-111", 1);
    write_session(&logs_root, "abd-222", 1);

    let workspace = open_workspace(&tmp.path().join("workspace"), &logs_root);
    let (tx, _rx) = channel();
    workspace
        .refresh(DiscoveryScope::Full, ConcurrencyProfile::headless(2), &tx)
        .await
        .unwrap();

    assert_eq!(workspace.find_session("abc-111").unwrap().id, "abc-111");
    assert_eq!(workspace.find_session("abd").unwrap().id, "abd-222");
    // Ambiguous prefix resolves to nothing.
    assert!(workspace.find_session("ab").is_none());
    assert!(workspace.find_session("zzz").is_none());
}
