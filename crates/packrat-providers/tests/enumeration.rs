use filetime::{set_file_mtime, FileTime};
use packrat_index::{discover_delta, DiscoveryScope, SignatureMap};
use packrat_providers::{RecentWindow, SourceAdapter};
use std::fs;
use std::path::Path;

fn claude_line(session_id: &str, text: &str) -> String {
    format!(
        r#"{{"type":"user","sessionId":"{session_id}","cwd":"/home/dev/widget","timestamp":"2026-03-01T10:00:00Z","message":{{"role":"user","content":"{text}"}}}}"#
    )
}

fn write_claude_session(project_dir: &Path, session_id: &str, lines: usize) {
    fs::create_dir_all(project_dir).unwrap();
    let mut content = String::new();
    for i in 0..lines {
        content.push_str(&claude_line(session_id, &format!("message {i}")));
        content.push('\n');
    }
    fs::write(project_dir.join(format!("{session_id}.jsonl")), content).unwrap();
}

fn set_mtime_secs(path: &Path, secs: i64) {
    set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[test]
fn unchanged_tree_yields_empty_delta_on_second_pass() {
    let root = tempfile::tempdir().unwrap();
    write_claude_session(&root.path().join("proj-a"), "s-one", 3);
    write_claude_session(&root.path().join("proj-b"), "s-two", 2);

    let adapter = SourceAdapter::claude();
    let window = RecentWindow::default();

    let first_pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, window)
        .unwrap();
    let first = discover_delta(&SignatureMap::new(), &first_pass);
    assert_eq!(first.changed_files.len(), 2);

    let second_pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, window)
        .unwrap();
    let second = discover_delta(&first.current_by_path, &second_pass);
    assert!(second.is_empty());
    assert!(!second.drift_detected);
}

#[test]
fn size_and_mtime_changes_are_rediscovered() {
    let root = tempfile::tempdir().unwrap();
    let project = root.path().join("proj-a");
    write_claude_session(&project, "s-one", 3);
    let file = project.join("s-one.jsonl");
    set_mtime_secs(&file, 1_700_000_000);

    let adapter = SourceAdapter::claude();
    let window = RecentWindow::default();

    let pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, window)
        .unwrap();
    let baseline = discover_delta(&SignatureMap::new(), &pass).current_by_path;

    // Append a line and bump the mtime, as the live tool would.
    let mut content = fs::read_to_string(&file).unwrap();
    content.push_str(&claude_line("s-one", "one more"));
    content.push('\n');
    fs::write(&file, content).unwrap();
    set_mtime_secs(&file, 1_700_000_060);

    let pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, window)
        .unwrap();
    let delta = discover_delta(&baseline, &pass);
    assert_eq!(delta.changed_files, vec![file.clone()]);

    // mtime-only change (same size) is still a change.
    let baseline = delta.current_by_path;
    set_mtime_secs(&file, 1_700_000_120);
    let pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, window)
        .unwrap();
    let delta = discover_delta(&baseline, &pass);
    assert_eq!(delta.changed_files, vec![file]);
}

#[test]
fn deleted_file_lands_in_removed_paths() {
    let root = tempfile::tempdir().unwrap();
    let project = root.path().join("proj-a");
    write_claude_session(&project, "s-one", 2);
    write_claude_session(&project, "s-two", 2);

    let adapter = SourceAdapter::claude();
    let window = RecentWindow::default();

    let pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, window)
        .unwrap();
    let baseline = discover_delta(&SignatureMap::new(), &pass).current_by_path;

    let doomed = project.join("s-two.jsonl");
    fs::remove_file(&doomed).unwrap();

    let pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, window)
        .unwrap();
    let delta = discover_delta(&baseline, &pass);
    assert_eq!(delta.removed_paths, vec![doomed]);
    assert!(delta.changed_files.is_empty());
}

#[test]
fn recent_scope_caps_files_and_flags_drift() {
    let root = tempfile::tempdir().unwrap();
    let hot = root.path().join("proj-hot");
    let cold = root.path().join("proj-cold");
    for i in 0..5 {
        write_claude_session(&hot, &format!("hot-{i}"), 1);
    }
    write_claude_session(&cold, "cold-0", 1);

    // Make `hot` the most recently touched directory.
    set_mtime_secs(&cold, 1_700_000_000);
    set_mtime_secs(&hot, 1_700_000_600);

    let adapter = SourceAdapter::claude();
    let window = RecentWindow {
        max_dirs: 1,
        per_dir_cap: 3,
    };

    let pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Recent, window)
        .unwrap();
    assert_eq!(pass.files.len(), 3);
    assert!(pass.truncated);
    assert_eq!(pass.scanned_dirs, vec![hot.clone()]);

    let delta = discover_delta(&SignatureMap::new(), &pass);
    assert!(delta.drift_detected);

    // A baseline entry in the unscanned directory must not be declared
    // removed by a window that never looked there.
    let mut baseline = SignatureMap::new();
    baseline.insert(
        cold.join("cold-0.jsonl"),
        packrat_types::FileSignature {
            size: 1,
            mtime_nanos: 1,
        },
    );
    let delta = discover_delta(&baseline, &pass);
    assert!(delta.removed_paths.is_empty());
}

#[test]
fn codex_dated_layout_enumerates_newest_day_first() {
    let root = tempfile::tempdir().unwrap();
    let old_day = root.path().join("2026").join("02").join("27");
    let new_day = root.path().join("2026").join("03").join("01");
    fs::create_dir_all(&old_day).unwrap();
    fs::create_dir_all(&new_day).unwrap();

    let meta = r#"{"timestamp":"2026-03-01T10:00:00Z","type":"session_meta","payload":{"id":"550e8400-e29b-41d4-a716-446655440000","timestamp":"2026-03-01T10:00:00Z","cwd":"/home/dev","originator":"codex_cli_rs","cli_version":"0.28.0","source":"cli"}}"#;
    let old_file = old_day.join("rollout-2026-02-27T09-00-00-550e8400-e29b-41d4-a716-446655440001.jsonl");
    let new_file = new_day.join("rollout-2026-03-01T10-00-00-550e8400-e29b-41d4-a716-446655440000.jsonl");
    fs::write(&old_file, format!("{meta}\n")).unwrap();
    fs::write(&new_file, format!("{meta}\n")).unwrap();

    let adapter = SourceAdapter::codex();
    let pass = adapter
        .discovery
        .enumerate(root.path(), DiscoveryScope::Full, RecentWindow::default())
        .unwrap();
    let paths: Vec<_> = pass.files.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(paths, vec![new_file, old_file]);

    let recent = adapter
        .discovery
        .enumerate(
            root.path(),
            DiscoveryScope::Recent,
            RecentWindow {
                max_dirs: 1,
                per_dir_cap: 10,
            },
        )
        .unwrap();
    assert_eq!(recent.scanned_dirs, vec![new_day]);
    assert_eq!(recent.files.len(), 1);
}

#[test]
fn lightweight_parse_builds_catalog_entry() {
    let root = tempfile::tempdir().unwrap();
    let project = root.path().join("proj-a");
    write_claude_session(&project, "s-one", 4);

    let adapter = SourceAdapter::claude();
    let session = adapter
        .parser
        .parse_lightweight(&project.join("s-one.jsonl"))
        .expect("parsable session");

    assert_eq!(session.id, "s-one");
    assert_eq!(session.cwd.as_deref(), Some("/home/dev/widget"));
    assert_eq!(session.repo_name.as_deref(), Some("widget"));
    assert_eq!(session.snippet.as_deref(), Some("message 0"));
    assert!(session.events.is_empty());
    assert_eq!(session.event_count.value(), 4);
    assert!(session.event_count.is_exact());
    assert!(session.last_modified.is_some());

    // Unparsable input is skipped, not fatal.
    let junk = project.join("junk.jsonl");
    fs::write(&junk, "").unwrap();
    assert!(adapter.parser.parse_lightweight(&junk).is_none());
}
