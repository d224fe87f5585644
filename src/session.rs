//! Playback session state machine.
//!
//! The session decides which playlist entry the engine plays next and
//! reconciles transport commands with the engine's asynchronous reports.
//! It owns the engine handle but not the playlist; callers pass the current
//! playlist into the operations that need to resolve a track.
//!
//! Play and natural end-of-track share one resolution path: with
//! auto-advance on, the next entry after the active one starts; with it off
//! (a track was picked explicitly), the active entry itself starts and
//! auto-advance turns back on for everything after it.

use log::{debug, info};

use crate::{
    engine::PlaybackEngine,
    error::{Error, Result},
    playlist::Playlist,
    progress::{self, Progress},
};

pub const DEFAULT_TEMPO_BPM: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing,
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub active_index: Option<usize>,
    pub auto_advance: bool,
    pub rate_multiplier: u32,
    pub tempo_override: Option<u32>,
    pub display_tempo: u32,
    pub progress: Progress,
}

pub struct PlaybackSession<E: PlaybackEngine> {
    engine: E,
    active_index: Option<usize>,
    auto_advance: bool,
    rate_multiplier: u32,
    tempo_override: Option<u32>,
    display_tempo: u32,
    default_tempo: u32,
    progress: Progress,
}

impl<E: PlaybackEngine> PlaybackSession<E> {
    pub fn new(engine: E) -> Self {
        Self::with_default_tempo(engine, DEFAULT_TEMPO_BPM)
    }

    pub fn with_default_tempo(engine: E, default_tempo: u32) -> Self {
        Self {
            engine,
            active_index: None,
            auto_advance: false,
            rate_multiplier: 0,
            tempo_override: None,
            display_tempo: default_tempo,
            default_tempo,
            progress: Progress::default(),
        }
    }

    pub fn play(&mut self, playlist: &Playlist, selection: Option<usize>) -> Result<()> {
        if playlist.is_empty() {
            return Err(Error::EmptyPlaylist);
        }
        if let Some(index) = selection {
            playlist.get(index)?;
        }

        debug!("PlaybackSession: play, selection={:?}", selection);
        if self.is_playing() {
            self.engine.stop();
        }
        if selection.is_some() {
            self.active_index = selection;
        }
        self.auto_advance = selection.is_none();
        self.start_next(playlist);
        Ok(())
    }

    pub fn stop(&mut self) {
        debug!("PlaybackSession: stop");
        if self.is_playing() {
            self.engine.stop();
        }
        self.enter_idle();
    }

    pub fn fast_forward_pressed(&mut self, multiplier: u32) {
        self.rate_multiplier = multiplier;
        self.engine.set_fast_forward_factor(multiplier);
    }

    pub fn fast_forward_released(&mut self) {
        self.rate_multiplier = 0;
        self.engine.set_fast_forward_factor(0);
    }

    pub fn set_tempo(&mut self, beats_per_minute: u32) {
        self.tempo_override = Some(beats_per_minute);
        self.display_tempo = beats_per_minute;
        self.engine.set_tempo(beats_per_minute);
    }

    pub fn scrub(&mut self, position_fraction: f64) {
        self.engine
            .jump(progress::fraction_to_permille(position_fraction));
    }

    /// Handles end of track (or a failed load, which the engine reports the
    /// same way). Returns whether the event was applied; a finish reported
    /// while idle is stale and ignored.
    pub fn on_finished(&mut self, playlist: &Playlist) -> bool {
        if self.active_index.is_none() {
            debug!("PlaybackSession: ignoring finished event while idle");
            return false;
        }
        self.start_next(playlist);
        true
    }

    pub fn on_time_changed(&mut self, elapsed_nanos: u64, total_seconds: u32) -> Progress {
        self.progress = progress::format(elapsed_nanos, total_seconds);
        self.progress
    }

    /// Engine-reported tempo only updates the display; the user's override
    /// and the engine directive stream are left alone.
    pub fn on_tempo_changed(&mut self, tempo: u32) {
        self.display_tempo = tempo;
    }

    fn start_next(&mut self, playlist: &Playlist) {
        let next = match (self.auto_advance, self.active_index) {
            (true, Some(index)) => index + 1,
            (true, None) => 0,
            (false, Some(index)) => index,
            (false, None) => 0,
        };
        self.auto_advance = true;

        match playlist.get(next) {
            Ok(track) => {
                info!("PlaybackSession: starting entry {}: {}", next, track);
                self.active_index = Some(next);
                self.reset_tempo();
                self.progress = Progress::default();
                self.engine.start(track);
            }
            Err(_) => {
                info!(
                    "PlaybackSession: end of playlist reached at entry {} of {}",
                    next,
                    playlist.len()
                );
                self.enter_idle();
            }
        }
    }

    fn enter_idle(&mut self) {
        self.active_index = None;
        self.progress = Progress::default();
        self.reset_tempo();
    }

    fn reset_tempo(&mut self) {
        self.tempo_override = None;
        self.display_tempo = self.default_tempo;
    }

    pub fn state(&self) -> SessionState {
        if self.active_index.is_some() {
            SessionState::Playing
        } else {
            SessionState::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn rate_multiplier(&self) -> u32 {
        self.rate_multiplier
    }

    pub fn tempo_override(&self) -> Option<u32> {
        self.tempo_override
    }

    /// Tempo the user has in effect: the override, or the default.
    pub fn effective_tempo(&self) -> u32 {
        self.tempo_override.unwrap_or(self.default_tempo)
    }

    pub fn display_tempo(&self) -> u32 {
        self.display_tempo
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            active_index: self.active_index,
            auto_advance: self.auto_advance,
            rate_multiplier: self.rate_multiplier,
            tempo_override: self.tempo_override,
            display_tempo: self.display_tempo,
            progress: self.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;
    use crate::protocol::EngineDirective;

    fn session() -> PlaybackSession<RecordingEngine> {
        PlaybackSession::new(RecordingEngine::default())
    }

    fn tracks(names: &[&str]) -> Playlist {
        Playlist::from_tracks(names.iter().copied())
    }

    #[test]
    fn test_play_without_selection_starts_first_entry() {
        let playlist = tracks(&["a.mid", "b.mid", "c.mid"]);
        let mut session = session();

        session.play(&playlist, None).unwrap();

        assert_eq!(session.active_index(), Some(0));
        assert!(session.auto_advance());
        assert_eq!(session.engine().started(), vec!["a.mid"]);
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn test_finished_advances_one_entry_at_a_time_then_idles() {
        let playlist = tracks(&["a.mid", "b.mid", "c.mid"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();

        for expected in 1..3 {
            assert!(session.on_finished(&playlist));
            assert_eq!(session.active_index(), Some(expected));
        }
        assert!(session.on_finished(&playlist));
        assert_eq!(session.active_index(), None);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.engine().started(), vec!["a.mid", "b.mid", "c.mid"]);
    }

    #[test]
    fn test_two_entry_playlist_plays_through_and_stops_starting() {
        let playlist = tracks(&["A", "B"]);
        let mut session = session();

        session.play(&playlist, None).unwrap();
        assert_eq!(
            session.engine().directives,
            vec![EngineDirective::Start("A".to_string())]
        );
        session.on_finished(&playlist);
        assert_eq!(
            session.engine().directives.last(),
            Some(&EngineDirective::Start("B".to_string()))
        );
        session.on_finished(&playlist);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.engine().directives.len(), 2);
    }

    #[test]
    fn test_play_with_selection_skips_to_entry_then_resumes_auto_advance() {
        let playlist = tracks(&["A", "B"]);
        let mut session = session();

        session.play(&playlist, Some(1)).unwrap();
        assert_eq!(session.engine().started(), vec!["B"]);
        assert_eq!(session.active_index(), Some(1));
        assert!(session.auto_advance());

        session.on_finished(&playlist);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.engine().started(), vec!["B"]);
    }

    #[test]
    fn test_play_with_selection_mid_list_continues_after_it() {
        let playlist = tracks(&["a", "b", "c", "d"]);
        let mut session = session();

        session.play(&playlist, Some(1)).unwrap();
        session.on_finished(&playlist);
        assert_eq!(session.active_index(), Some(2));
        assert_eq!(session.engine().started(), vec!["b", "c"]);
    }

    #[test]
    fn test_play_while_playing_stops_engine_first() {
        let playlist = tracks(&["a", "b", "c"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();

        session.play(&playlist, Some(2)).unwrap();
        assert_eq!(
            session.engine().directives,
            vec![
                EngineDirective::Start("a".to_string()),
                EngineDirective::Stop,
                EngineDirective::Start("c".to_string()),
            ]
        );
        assert_eq!(session.active_index(), Some(2));
    }

    #[test]
    fn test_play_without_selection_while_playing_moves_to_next_entry() {
        let playlist = tracks(&["a", "b"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();

        session.play(&playlist, None).unwrap();
        assert_eq!(session.active_index(), Some(1));
        assert_eq!(session.engine().started(), vec!["a", "b"]);
    }

    #[test]
    fn test_play_on_empty_playlist_is_rejected_and_stays_idle() {
        let mut session = session();
        let err = session.play(&Playlist::new(), None).unwrap_err();
        assert!(matches!(err, Error::EmptyPlaylist));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.engine().directives.is_empty());
    }

    #[test]
    fn test_play_with_out_of_range_selection_changes_nothing() {
        let playlist = tracks(&["a", "b"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();

        let err = session.play(&playlist, Some(5)).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { index: 5, len: 2 }));
        assert_eq!(session.active_index(), Some(0));
        assert_eq!(session.engine().directives.len(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let playlist = tracks(&["a", "b"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();
        session.set_tempo(90);

        session.stop();
        let once = session.snapshot();
        session.stop();
        let twice = session.snapshot();

        assert_eq!(once, twice);
        assert_eq!(twice.state, SessionState::Idle);
        assert_eq!(twice.tempo_override, None);
        assert_eq!(twice.display_tempo, DEFAULT_TEMPO_BPM);
        let stops = session
            .engine()
            .directives
            .iter()
            .filter(|directive| **directive == EngineDirective::Stop)
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_play_after_stop_starts_from_first_entry() {
        let playlist = tracks(&["a", "b", "c"]);
        let mut session = session();
        session.play(&playlist, Some(2)).unwrap();
        session.stop();

        session.play(&playlist, None).unwrap();
        assert_eq!(session.active_index(), Some(0));
    }

    #[test]
    fn test_finished_while_idle_is_ignored() {
        let playlist = tracks(&["a", "b"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();
        session.stop();

        assert!(!session.on_finished(&playlist));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.engine().started(), vec!["a"]);
    }

    #[test]
    fn test_failed_load_is_skipped_like_completion() {
        let playlist = tracks(&["broken.mid", "good.mid"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();

        // The engine reports a failed load as an immediate finish.
        session.on_finished(&playlist);
        assert_eq!(session.active_index(), Some(1));
        assert_eq!(session.engine().started(), vec!["broken.mid", "good.mid"]);
    }

    #[test]
    fn test_playlist_shrinking_under_active_entry_idles_on_finish() {
        let mut playlist = tracks(&["a", "b", "c"]);
        let mut session = session();
        session.play(&playlist, Some(2)).unwrap();

        playlist.remove_at(0).unwrap();
        playlist.remove_at(0).unwrap();
        assert_eq!(session.active_index(), Some(2));

        session.on_finished(&playlist);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_fast_forward_release_always_restores_normal_speed() {
        let playlist = tracks(&["a"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();

        session.fast_forward_pressed(4);
        assert_eq!(session.rate_multiplier(), 4);
        session.set_tempo(140);
        session.scrub(0.75);
        session.fast_forward_released();

        assert_eq!(session.rate_multiplier(), 0);
        assert_eq!(
            &session.engine().directives[1..],
            &[
                EngineDirective::SetFastForwardFactor(4),
                EngineDirective::SetTempo(140),
                EngineDirective::Jump(750),
                EngineDirective::SetFastForwardFactor(0),
            ]
        );
    }

    #[test]
    fn test_scrub_changes_no_local_state() {
        let playlist = tracks(&["a"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();
        let before = session.snapshot();

        session.scrub(0.5);
        assert_eq!(session.snapshot(), before);
        assert_eq!(
            session.engine().directives.last(),
            Some(&EngineDirective::Jump(500))
        );
    }

    #[test]
    fn test_engine_tempo_updates_display_without_feedback() {
        let playlist = tracks(&["a"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();
        session.set_tempo(100);
        let directive_count = session.engine().directives.len();

        session.on_tempo_changed(100);
        session.on_tempo_changed(96);

        assert_eq!(session.display_tempo(), 96);
        assert_eq!(session.tempo_override(), Some(100));
        assert_eq!(session.effective_tempo(), 100);
        assert_eq!(session.engine().directives.len(), directive_count);
    }

    #[test]
    fn test_advance_resets_tempo_override() {
        let playlist = tracks(&["a", "b"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();
        session.set_tempo(180);

        session.on_finished(&playlist);
        assert_eq!(session.tempo_override(), None);
        assert_eq!(session.display_tempo(), DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn test_time_changed_updates_progress_only() {
        let playlist = tracks(&["a"]);
        let mut session = session();
        session.play(&playlist, None).unwrap();

        let progress = session.on_time_changed(90_000_000_000, 180);
        assert_eq!(progress.position_fraction, 0.5);
        assert_eq!(session.progress(), progress);
        assert_eq!(session.active_index(), Some(0));
        assert_eq!(session.engine().directives.len(), 1);
    }

    #[test]
    fn test_custom_default_tempo_is_restored() {
        let playlist = tracks(&["a"]);
        let mut session = PlaybackSession::with_default_tempo(RecordingEngine::default(), 96);
        session.play(&playlist, None).unwrap();
        session.on_tempo_changed(130);
        session.stop();
        assert_eq!(session.display_tempo(), 96);
        assert_eq!(session.effective_tempo(), 96);
    }
}
