//! Wall-clock stand-in for the MIDI playback engine.
//!
//! Plays every existing file for a fixed nominal length, advancing simulated
//! time on each tick and reporting it back through the session inbox. A path
//! that does not exist fails to load and is reported as an immediate finish,
//! the same way the real engine reports unreadable files.

use std::{
    path::Path,
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    config::EngineConfig,
    error::Result,
    progress::{NANOS_PER_SECOND, PERMILLE_SCALE},
    protocol::{EngineDirective, EngineEvent},
    session_manager::SessionHandle,
};

#[derive(Debug)]
struct LoadedTrack {
    path: String,
    elapsed_nanos: u64,
    total_seconds: u32,
}

impl LoadedTrack {
    fn total_nanos(&self) -> u64 {
        u64::from(self.total_seconds) * NANOS_PER_SECOND
    }
}

pub struct ClockEngine {
    directives: Receiver<EngineDirective>,
    events: SessionHandle,
    tick_interval: Duration,
    nominal_track_seconds: u32,
    nominal_tempo: u32,
    tempo: u32,
    fast_forward_factor: u32,
    current: Option<LoadedTrack>,
}

impl ClockEngine {
    pub fn new(
        directives: Receiver<EngineDirective>,
        events: SessionHandle,
        config: &EngineConfig,
        nominal_tempo: u32,
    ) -> Self {
        Self {
            directives,
            events,
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            nominal_track_seconds: config.nominal_track_seconds,
            nominal_tempo: nominal_tempo.max(1),
            tempo: nominal_tempo,
            fast_forward_factor: 0,
            current: None,
        }
    }

    pub fn run(&mut self) {
        let mut last_tick = Instant::now();
        loop {
            let wait = self.tick_interval.saturating_sub(last_tick.elapsed());
            match self.directives.recv_timeout(wait) {
                Ok(directive) => self.apply(directive),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("ClockEngine: directive channel closed");
                    break;
                }
            }

            let since_tick = last_tick.elapsed();
            if since_tick >= self.tick_interval {
                last_tick = Instant::now();
                if !self.advance(since_tick) {
                    debug!("ClockEngine: session inbox closed");
                    break;
                }
            }
        }
    }

    fn apply(&mut self, directive: EngineDirective) {
        debug!("ClockEngine: received {:?}", directive);
        match directive {
            EngineDirective::Start(path) => self.start(path),
            EngineDirective::Stop => {
                self.current = None;
            }
            EngineDirective::Jump(permille) => {
                if let Some(track) = self.current.as_mut() {
                    let permille = u64::from(permille.min(PERMILLE_SCALE));
                    track.elapsed_nanos =
                        track.total_nanos() * permille / u64::from(PERMILLE_SCALE);
                    let event = EngineEvent::TimeChanged {
                        elapsed_nanos: track.elapsed_nanos,
                        total_seconds: track.total_seconds,
                    };
                    self.events.engine_event(event);
                }
            }
            EngineDirective::SetFastForwardFactor(factor) => {
                self.fast_forward_factor = factor;
            }
            EngineDirective::SetTempo(bpm) => {
                if bpm == 0 {
                    warn!("ClockEngine: ignoring zero tempo");
                    return;
                }
                self.tempo = bpm;
                self.events.engine_event(EngineEvent::TempoChanged(bpm));
            }
        }
    }

    fn start(&mut self, path: String) {
        if !Path::new(&path).exists() {
            warn!("ClockEngine: cannot open {}", path);
            self.current = None;
            self.events.engine_event(EngineEvent::Finished);
            return;
        }

        info!("ClockEngine: playing {}", path);
        self.tempo = self.nominal_tempo;
        self.events
            .engine_event(EngineEvent::TempoChanged(self.nominal_tempo));
        self.events.engine_event(EngineEvent::TimeChanged {
            elapsed_nanos: 0,
            total_seconds: self.nominal_track_seconds,
        });
        self.current = Some(LoadedTrack {
            path,
            elapsed_nanos: 0,
            total_seconds: self.nominal_track_seconds,
        });
    }

    /// Advances the loaded track by `real_elapsed` of wall time scaled by the
    /// fast-forward factor and tempo. Returns false once nobody is listening.
    fn advance(&mut self, real_elapsed: Duration) -> bool {
        let Some(track) = self.current.as_mut() else {
            return true;
        };

        let speed = u128::from(self.fast_forward_factor.max(1)) * u128::from(self.tempo);
        let step = real_elapsed.as_nanos() * speed / u128::from(self.nominal_tempo);
        let step = u64::try_from(step).unwrap_or(u64::MAX);
        track.elapsed_nanos = track.elapsed_nanos.saturating_add(step);

        if track.elapsed_nanos >= track.total_nanos() {
            debug!("ClockEngine: finished {}", track.path);
            let total_seconds = track.total_seconds;
            self.current = None;
            self.events.engine_event(EngineEvent::TimeChanged {
                elapsed_nanos: u64::from(total_seconds) * NANOS_PER_SECOND,
                total_seconds,
            });
            return self.events.engine_event(EngineEvent::Finished);
        }

        self.events.engine_event(EngineEvent::TimeChanged {
            elapsed_nanos: track.elapsed_nanos,
            total_seconds: track.total_seconds,
        })
    }
}

/// Spawns the clock engine thread. Events go to `events`; directives are
/// read from `directives` until its sender is dropped.
pub fn spawn_clock_engine(
    directives: Receiver<EngineDirective>,
    events: SessionHandle,
    config: &EngineConfig,
    nominal_tempo: u32,
) -> Result<JoinHandle<()>> {
    let mut engine = ClockEngine::new(directives, events, config, nominal_tempo);
    let join_handle = thread::Builder::new()
        .name("clock-engine".to_string())
        .spawn(move || engine.run())?;
    Ok(join_handle)
}
