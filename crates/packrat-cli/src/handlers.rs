use anyhow::{bail, Context, Result};
use packrat_archive::SyncEvent;
use packrat_runtime::{ConcurrencyProfile, DiscoveryScope, RefreshEvent, Workspace};
use packrat_types::{Session, SessionSource};
use std::sync::mpsc::channel;

/// Refresh every enabled source, narrating progress to stderr.
pub async fn refresh(
    workspace: &Workspace,
    scope: DiscoveryScope,
    profile: ConcurrencyProfile,
    quiet: bool,
) -> Result<Vec<Session>> {
    let (tx, rx) = channel();

    let printer = std::thread::spawn(move || {
        for event in rx {
            if quiet {
                continue;
            }
            match event {
                RefreshEvent::SourceStarted { source, scope } => {
                    eprintln!("{source}: discovering ({scope:?})");
                }
                RefreshEvent::Progress {
                    source,
                    processed,
                    total,
                } => {
                    if total > 0 {
                        eprintln!("{source}: {processed}/{total}");
                    }
                }
                RefreshEvent::DriftDetected { source } => {
                    eprintln!("{source}: window capped, scheduling a full pass");
                }
                RefreshEvent::SourceCompleted {
                    source,
                    kind,
                    sessions,
                } => {
                    eprintln!("{source}: {sessions} sessions ({kind:?})");
                }
                RefreshEvent::SourceFailed { source, message } => {
                    eprintln!("{source}: refresh failed: {message}");
                }
            }
        }
    });

    let result = workspace.refresh(scope, profile, &tx).await;
    drop(tx);
    let _ = printer.join();

    result.context("refresh failed")
}

pub fn print_sessions(sessions: &[Session], limit: usize, json: bool) -> Result<()> {
    let visible: Vec<&Session> = sessions.iter().take(limit).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    for session in visible {
        let when = session
            .sort_key()
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let marker = if session.archived { "*" } else { " " };
        let model = session.model.as_deref().unwrap_or("-");
        println!(
            "{marker} {:<12} {:<12} {when}  {:<24} {}",
            short_id(&session.id),
            session.source,
            model,
            session.display_title(),
        );
    }
    Ok(())
}

pub fn print_session(session: &Session, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session)?);
        return Ok(());
    }

    println!("id:      {}", session.id);
    println!("source:  {}", session.source);
    println!("title:   {}", session.display_title());
    println!("file:    {}", session.file_path.display());
    if let Some(size) = session.file_size {
        println!("size:    {size} bytes");
    }
    if let Some(model) = &session.model {
        println!("model:   {model}");
    }
    if let Some(cwd) = &session.cwd {
        println!("cwd:     {cwd}");
    }
    if let Some(start) = session.start_time {
        println!("started: {}", start.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("events:  ~{}", session.event_count.value());
    if session.archived {
        println!("archived placeholder (upstream is gone)");
    }
    Ok(())
}

pub fn find_session_or_bail(workspace: &Workspace, id: &str) -> Result<Session> {
    match workspace.find_session(id) {
        Some(session) => Ok(session),
        None => bail!("no session matches '{id}' (try `packrat list` first)"),
    }
}

pub fn pin(workspace: &Workspace, session: &Session) -> Result<()> {
    workspace
        .pin(session)
        .with_context(|| format!("failed to pin {}", session.id))?;
    let info = workspace
        .archiver()
        .store()
        .load_info(session.source, &session.id)
        .ok()
        .flatten();
    match info {
        Some(info) => {
            eprintln!("pinned {} ({:?})", session.id, info.status);
            if let Some(advisory) = info.advisory {
                eprintln!("note: {advisory}");
            }
            if let Some(error) = info.last_error {
                eprintln!("warning: {error}");
            }
        }
        None => eprintln!("pinned {}", session.id),
    }
    Ok(())
}

pub fn unpin(workspace: &Workspace, session_id: &str, remove: bool) -> Result<()> {
    let mut removed_any = false;
    for source in SessionSource::ALL {
        if workspace.unpin(source, session_id, remove)? {
            removed_any = true;
        }
    }
    if !removed_any {
        bail!("no archive found for '{session_id}'");
    }
    eprintln!(
        "unpinned {session_id}{}",
        if remove { " and removed its archive" } else { "" }
    );
    Ok(())
}

pub fn archives(workspace: &Workspace, json: bool) -> Result<()> {
    let infos = workspace.archiver().list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if infos.is_empty() {
        println!("no archives");
        return Ok(());
    }
    for info in infos {
        let synced = info
            .last_synced_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        let pin_marker = if info.pinned { "pinned" } else { "kept" };
        println!(
            "{:<12} {:<12} {:<8} {:?}  synced {synced}  {}",
            short_id(&info.session_id),
            info.source,
            pin_marker,
            info.status,
            info.title.as_deref().unwrap_or(""),
        );
        if let Some(advisory) = &info.advisory {
            println!("             note: {advisory}");
        }
        if let Some(error) = &info.last_error {
            println!("             error: {error}");
        }
    }
    Ok(())
}

pub fn sync(workspace: &Workspace) -> Result<()> {
    let mut on_event = |event: SyncEvent| match event {
        SyncEvent::Committed {
            session_id,
            consistent,
        } => {
            if consistent {
                eprintln!("{session_id}: synced");
            } else {
                eprintln!("{session_id}: synced (best effort)");
            }
        }
        SyncEvent::UpToDate {
            session_id,
            finalized,
        } => {
            if finalized {
                eprintln!("{session_id}: final");
            } else {
                eprintln!("{session_id}: up to date");
            }
        }
        SyncEvent::UpstreamMissing { session_id } => {
            eprintln!("{session_id}: upstream gone, archive preserved");
        }
        SyncEvent::Failed {
            session_id,
            message,
        } => {
            eprintln!("{session_id}: sync failed: {message}");
        }
        _ => {}
    };

    let synced = workspace.archiver().sync_all(&mut on_event)?;
    eprintln!("synced {synced} pinned session(s)");
    Ok(())
}

fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}
