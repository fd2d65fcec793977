use anyhow::Result;
use packrat_types::{Session, SessionSource};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::archiver::Archiver;
use crate::sync::SyncEvent;

const COMMAND_POLL: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum ArchiveCommand {
    Pin(Box<Session>),
    Unpin {
        source: SessionSource,
        session_id: String,
        remove_data: bool,
    },
    SyncOne {
        source: SessionSource,
        session_id: String,
    },
    SyncAll,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum ArchiveEvent {
    Sync(SyncEvent),
    Pinned {
        source: SessionSource,
        session_id: String,
    },
    Unpinned {
        source: SessionSource,
        session_id: String,
        removed: bool,
    },
    PassCompleted {
        synced: usize,
    },
    Error {
        message: String,
    },
}

/// Single-threaded sequential queue for all archive IO.
///
/// One worker drains the command channel, so syncs for different pinned
/// sessions never run concurrently and the atomic-replace step stays
/// simple. The same thread doubles as the periodic timer: a
/// short delay after start, then a steady interval, it re-syncs every pin
/// so archives self-heal without user interaction. Commands have no
/// cancellation; a started sync always reaches a terminal state.
pub struct ArchiveService {
    tx: Sender<ArchiveCommand>,
    events: Receiver<ArchiveEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ArchiveService {
    pub fn start(archiver: Archiver) -> Result<Self> {
        let (tx, rx) = channel::<ArchiveCommand>();
        let (tx_events, rx_events) = channel::<ArchiveEvent>();

        let handle = std::thread::Builder::new()
            .name("archive-sync".to_string())
            .spawn(move || {
                let settings = *archiver.settings();
                let mut next_pass = Instant::now() + settings.startup_delay;

                loop {
                    match rx.recv_timeout(COMMAND_POLL) {
                        Ok(ArchiveCommand::Shutdown) => break,
                        Ok(command) => handle_command(&archiver, command, &tx_events),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    if Instant::now() >= next_pass {
                        run_pass(&archiver, &tx_events);
                        next_pass = Instant::now() + settings.sync_interval;
                    }
                }
            })?;

        Ok(Self {
            tx,
            events: rx_events,
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> Sender<ArchiveCommand> {
        self.tx.clone()
    }

    pub fn events(&self) -> &Receiver<ArchiveEvent> {
        &self.events
    }

    pub fn pin(&self, session: Session) {
        let _ = self.tx.send(ArchiveCommand::Pin(Box::new(session)));
    }

    pub fn unpin(&self, source: SessionSource, session_id: String, remove_data: bool) {
        let _ = self.tx.send(ArchiveCommand::Unpin {
            source,
            session_id,
            remove_data,
        });
    }

    pub fn sync_all(&self) {
        let _ = self.tx.send(ArchiveCommand::SyncAll);
    }

    pub fn shutdown(mut self) {
        let _ = self.tx.send(ArchiveCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ArchiveService {
    fn drop(&mut self) {
        let _ = self.tx.send(ArchiveCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_command(archiver: &Archiver, command: ArchiveCommand, events: &Sender<ArchiveEvent>) {
    let mut forward = |event: SyncEvent| {
        let _ = events.send(ArchiveEvent::Sync(event));
    };

    match command {
        ArchiveCommand::Pin(session) => match archiver.pin(&session, &mut forward) {
            Ok(info) => {
                let _ = events.send(ArchiveEvent::Pinned {
                    source: info.source,
                    session_id: info.session_id,
                });
            }
            Err(err) => {
                let _ = events.send(ArchiveEvent::Error {
                    message: format!("{err:#}"),
                });
            }
        },
        ArchiveCommand::Unpin {
            source,
            session_id,
            remove_data,
        } => match archiver.unpin(source, &session_id, remove_data) {
            Ok(removed) => {
                let _ = events.send(ArchiveEvent::Unpinned {
                    source,
                    session_id,
                    removed: removed && remove_data,
                });
            }
            Err(err) => {
                let _ = events.send(ArchiveEvent::Error {
                    message: format!("{err:#}"),
                });
            }
        },
        ArchiveCommand::SyncOne { source, session_id } => {
            if let Err(err) = archiver.sync_one(source, &session_id, &mut forward) {
                let _ = events.send(ArchiveEvent::Error {
                    message: format!("{err:#}"),
                });
            }
        }
        ArchiveCommand::SyncAll => run_pass(archiver, events),
        ArchiveCommand::Shutdown => {}
    }
}

fn run_pass(archiver: &Archiver, events: &Sender<ArchiveEvent>) {
    let mut forward = |event: SyncEvent| {
        let _ = events.send(ArchiveEvent::Sync(event));
    };
    match archiver.sync_all(&mut forward) {
        Ok(synced) => {
            let _ = events.send(ArchiveEvent::PassCompleted { synced });
        }
        Err(err) => {
            let _ = events.send(ArchiveEvent::Error {
                message: format!("{err:#}"),
            });
        }
    }
}
