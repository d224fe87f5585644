//! Text renderer for session notifications.
//!
//! Keeps the last published playlist and session snapshot so the terminal
//! can redraw them on request.

use std::{
    fmt::Write as _,
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

use log::{debug, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    error::Result,
    progress::Progress,
    protocol::Notification,
    session::{SessionSnapshot, SessionState},
};

#[derive(Debug, Default)]
pub struct ViewState {
    pub tracks: Vec<String>,
    pub selected: Option<usize>,
    pub session: Option<SessionSnapshot>,
    pub progress: Progress,
    pub engine_tempo: Option<u32>,
}

impl ViewState {
    /// Folds one notification into the view. Returns a line worth printing,
    /// if any; progress ticks update silently.
    pub fn apply(&mut self, notification: Notification) -> Option<String> {
        match notification {
            Notification::SessionChanged(snapshot) => {
                let changed = self.session.as_ref().map_or(true, |previous| {
                    previous.active_index != snapshot.active_index
                        || previous.state != snapshot.state
                        || previous.rate_multiplier != snapshot.rate_multiplier
                        || previous.tempo_override != snapshot.tempo_override
                });
                self.progress = snapshot.progress;
                self.session = Some(snapshot);
                changed.then(|| self.render_status())
            }
            Notification::ProgressChanged(progress) => {
                self.progress = progress;
                None
            }
            Notification::TempoChanged(tempo) => {
                let changed = self.engine_tempo != Some(tempo);
                self.engine_tempo = Some(tempo);
                if let Some(session) = self.session.as_mut() {
                    session.display_tempo = tempo;
                }
                changed.then(|| format!("tempo {} bpm", tempo))
            }
            Notification::PlaylistChanged { tracks, selected } => {
                self.tracks = tracks;
                self.selected = selected;
                Some(self.render_playlist())
            }
            Notification::CommandRejected(reason) => Some(format!("error: {}", reason)),
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.session.as_ref().and_then(|session| session.active_index)
    }

    pub fn render_playlist(&self) -> String {
        if self.tracks.is_empty() {
            return "playlist is empty".to_string();
        }
        let active = self.active_index();
        let mut out = String::new();
        for (index, track) in self.tracks.iter().enumerate() {
            let marker = if Some(index) == active {
                '>'
            } else if Some(index) == self.selected {
                '*'
            } else {
                ' '
            };
            let _ = writeln!(out, "{} {:>3}. {}", marker, index + 1, track);
        }
        out.pop();
        out
    }

    pub fn render_status(&self) -> String {
        let Some(session) = self.session.as_ref() else {
            return "stopped".to_string();
        };
        match (session.state, session.active_index) {
            (SessionState::Playing, Some(index)) => {
                let track = self
                    .tracks
                    .get(index)
                    .map(String::as_str)
                    .unwrap_or("<removed>");
                let mut line = format!(
                    "playing {}/{}: {}  {}  {} bpm",
                    index + 1,
                    self.tracks.len(),
                    track,
                    self.progress,
                    session.display_tempo
                );
                if session.rate_multiplier > 0 {
                    let _ = write!(line, "  x{}", session.rate_multiplier);
                }
                line
            }
            _ => format!("stopped  {} bpm", session.display_tempo),
        }
    }
}

/// Spawns the renderer thread. It prints until the bus closes.
pub fn spawn_renderer(
    mut receiver: broadcast::Receiver<Notification>,
    view: Arc<Mutex<ViewState>>,
) -> Result<JoinHandle<()>> {
    let join_handle = thread::Builder::new()
        .name("terminal-view".to_string())
        .spawn(move || loop {
            match receiver.blocking_recv() {
                Ok(notification) => {
                    let line = view
                        .lock()
                        .expect("view state lock poisoned")
                        .apply(notification);
                    if let Some(line) = line {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Renderer lagged, skipped {} notifications", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Renderer: notification bus closed");
                    break;
                }
            }
        })?;
    Ok(join_handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress;

    fn snapshot(state: SessionState, active_index: Option<usize>) -> SessionSnapshot {
        SessionSnapshot {
            state,
            active_index,
            auto_advance: true,
            rate_multiplier: 0,
            tempo_override: None,
            display_tempo: 120,
            progress: Progress::default(),
        }
    }

    fn view_with_tracks() -> ViewState {
        let mut view = ViewState::default();
        view.apply(Notification::PlaylistChanged {
            tracks: vec!["a.mid".to_string(), "b.mid".to_string()],
            selected: None,
        });
        view
    }

    #[test]
    fn test_playlist_marks_active_and_selected_entries() {
        let mut view = view_with_tracks();
        view.apply(Notification::SessionChanged(snapshot(
            SessionState::Playing,
            Some(1),
        )));
        view.selected = Some(0);
        assert_eq!(view.render_playlist(), "*   1. a.mid\n>   2. b.mid");
    }

    #[test]
    fn test_status_shows_progress_and_tempo() {
        let mut view = view_with_tracks();
        view.apply(Notification::SessionChanged(snapshot(
            SessionState::Playing,
            Some(0),
        )));
        view.apply(Notification::ProgressChanged(progress::format(
            90_000_000_000,
            180,
        )));
        let line = view.apply(Notification::TempoChanged(96));
        assert_eq!(line.as_deref(), Some("tempo 96 bpm"));
        assert_eq!(
            view.render_status(),
            "playing 1/2: a.mid  01:30 / 03:00  96 bpm"
        );
    }

    #[test]
    fn test_repeated_snapshot_is_not_reprinted() {
        let mut view = view_with_tracks();
        let first = view.apply(Notification::SessionChanged(snapshot(
            SessionState::Playing,
            Some(0),
        )));
        assert!(first.is_some());
        let again = view.apply(Notification::SessionChanged(snapshot(
            SessionState::Playing,
            Some(0),
        )));
        assert!(again.is_none());
        assert!(view
            .apply(Notification::ProgressChanged(Progress::default()))
            .is_none());
    }

    #[test]
    fn test_stopped_and_rejected_lines() {
        let mut view = view_with_tracks();
        let line = view.apply(Notification::SessionChanged(snapshot(SessionState::Idle, None)));
        assert_eq!(line.as_deref(), Some("stopped  120 bpm"));
        let line = view.apply(Notification::CommandRejected("play: playlist is empty".into()));
        assert_eq!(line.as_deref(), Some("error: play: playlist is empty"));
    }
}
