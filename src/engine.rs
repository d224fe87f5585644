//! Boundary to the external playback engine.

use std::sync::mpsc::Sender;

use log::warn;

use crate::protocol::EngineDirective;

/// Directives the playback session issues to the engine.
///
/// Every call is fire-and-forget: the engine reports outcomes later as
/// `EngineEvent`s. After acknowledging `stop` the engine emits no further
/// events for the superseded track.
pub trait PlaybackEngine {
    fn start(&mut self, track: &str);
    fn stop(&mut self);
    fn jump(&mut self, position_permille: u32);
    /// 0 restores normal speed.
    fn set_fast_forward_factor(&mut self, multiplier: u32);
    fn set_tempo(&mut self, beats_per_minute: u32);
}

/// Engine handle that forwards directives to an engine thread over a channel.
#[derive(Debug, Clone)]
pub struct DirectiveSender {
    sender: Sender<EngineDirective>,
}

impl DirectiveSender {
    pub fn new(sender: Sender<EngineDirective>) -> Self {
        Self { sender }
    }

    fn send(&self, directive: EngineDirective) {
        if let Err(err) = self.sender.send(directive) {
            warn!("DirectiveSender: engine is gone, dropped {:?}", err.0);
        }
    }
}

impl PlaybackEngine for DirectiveSender {
    fn start(&mut self, track: &str) {
        self.send(EngineDirective::Start(track.to_string()));
    }

    fn stop(&mut self) {
        self.send(EngineDirective::Stop);
    }

    fn jump(&mut self, position_permille: u32) {
        self.send(EngineDirective::Jump(position_permille));
    }

    fn set_fast_forward_factor(&mut self, multiplier: u32) {
        self.send(EngineDirective::SetFastForwardFactor(multiplier));
    }

    fn set_tempo(&mut self, beats_per_minute: u32) {
        self.send(EngineDirective::SetTempo(beats_per_minute));
    }
}

/// Engine double that records every directive in order.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    pub directives: Vec<EngineDirective>,
}

#[cfg(test)]
impl RecordingEngine {
    pub fn started(&self) -> Vec<&str> {
        self.directives
            .iter()
            .filter_map(|directive| match directive {
                EngineDirective::Start(track) => Some(track.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl PlaybackEngine for RecordingEngine {
    fn start(&mut self, track: &str) {
        self.directives
            .push(EngineDirective::Start(track.to_string()));
    }

    fn stop(&mut self) {
        self.directives.push(EngineDirective::Stop);
    }

    fn jump(&mut self, position_permille: u32) {
        self.directives.push(EngineDirective::Jump(position_permille));
    }

    fn set_fast_forward_factor(&mut self, multiplier: u32) {
        self.directives
            .push(EngineDirective::SetFastForwardFactor(multiplier));
    }

    fn set_tempo(&mut self, beats_per_minute: u32) {
        self.directives
            .push(EngineDirective::SetTempo(beats_per_minute));
    }
}
