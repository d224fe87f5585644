//! Message protocol shared by the session service, the engine, and the UI.
//!
//! Inputs to the session service (user commands, playlist edits, engine
//! events) travel in one `Message` queue so they are applied in delivery
//! order. Directives to the engine and notifications to the UI each have
//! their own type.

use std::path::PathBuf;

use crate::{progress::Progress, session::SessionSnapshot};

/// Top-level envelope for everything consumed by the session service.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Transport(TransportCommand),
    Playlist(PlaylistCommand),
    Engine(EngineEvent),
    Shutdown,
}

/// User-issued transport commands.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Start playback. With a selection, play that entry once and resume
    /// auto-advance after it; without one, fall through from the current
    /// position (or from the first entry when idle).
    Play { selection: Option<usize> },
    Stop,
    FastForwardPressed(u32),
    FastForwardReleased,
    SetTempo(u32),
    /// Seek to a fraction of the current track, in [0, 1].
    Scrub(f64),
}

/// Playlist edits and persistence requests.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistCommand {
    Append(Vec<String>),
    InsertAt { index: usize, track: String },
    RemoveAt(usize),
    MoveUp(usize),
    MoveDown(usize),
    Clear,
    LoadFile(PathBuf),
    SaveFile(PathBuf),
}

/// Events raised asynchronously by the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The current track ended or failed to load.
    Finished,
    TimeChanged {
        elapsed_nanos: u64,
        total_seconds: u32,
    },
    TempoChanged(u32),
}

/// Fire-and-forget requests sent to the playback engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineDirective {
    Start(String),
    Stop,
    /// Seek position in permille of the track length.
    Jump(u32),
    SetFastForwardFactor(u32),
    SetTempo(u32),
}

/// State published for presentation after each handled input.
#[derive(Debug, Clone)]
pub enum Notification {
    SessionChanged(SessionSnapshot),
    ProgressChanged(Progress),
    TempoChanged(u32),
    PlaylistChanged {
        tracks: Vec<String>,
        /// Entry the UI should keep selected after a reorder or insert.
        selected: Option<usize>,
    },
    CommandRejected(String),
}
