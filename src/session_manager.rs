//! Session service: the single owner of the playlist and playback session.
//!
//! User commands, playlist edits, and engine events all arrive on one ordered
//! inbox and are applied one at a time on the service thread, so an engine
//! finish and a user play can never interleave mid-update. Results are
//! published on a broadcast bus for renderers.

use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::{
    engine::PlaybackEngine,
    error::Result,
    playlist::Playlist,
    playlist_file,
    protocol::{EngineEvent, Message, Notification, PlaylistCommand, TransportCommand},
    session::PlaybackSession,
};

/// Cloneable sender side of the session inbox.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: Sender<Message>,
}

impl SessionHandle {
    pub fn new(sender: Sender<Message>) -> Self {
        Self { sender }
    }

    /// Queues a message. Returns false once the service has shut down.
    pub fn send(&self, message: Message) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn transport(&self, command: TransportCommand) -> bool {
        self.send(Message::Transport(command))
    }

    pub fn playlist(&self, command: PlaylistCommand) -> bool {
        self.send(Message::Playlist(command))
    }

    pub fn engine_event(&self, event: EngineEvent) -> bool {
        self.send(Message::Engine(event))
    }

    pub fn shutdown(&self) -> bool {
        self.send(Message::Shutdown)
    }
}

/// Outcome of a playlist command that succeeded.
enum PlaylistEdit {
    /// Republish the list with `selected` highlighted.
    Changed { selected: Option<usize> },
    Unchanged,
}

pub struct SessionManager<E: PlaybackEngine> {
    playlist: Playlist,
    session: PlaybackSession<E>,
    inbox: Receiver<Message>,
    bus_producer: broadcast::Sender<Notification>,
}

impl<E: PlaybackEngine> SessionManager<E> {
    pub fn new(
        playlist: Playlist,
        session: PlaybackSession<E>,
        inbox: Receiver<Message>,
        bus_producer: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            playlist,
            session,
            inbox,
            bus_producer,
        }
    }

    pub fn run(&mut self) {
        info!(
            "SessionManager: started with {} playlist entries",
            self.playlist.len()
        );
        self.publish_playlist(None);
        self.publish_session();

        loop {
            match self.inbox.recv() {
                Ok(Message::Shutdown) => {
                    debug!("SessionManager: received shutdown");
                    self.session.stop();
                    break;
                }
                Ok(message) => self.handle_message(message),
                Err(_) => {
                    debug!("SessionManager: all senders dropped");
                    break;
                }
            }
        }
        info!("SessionManager: stopped");
    }

    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Transport(command) => self.handle_transport(command),
            Message::Playlist(command) => self.handle_playlist(command),
            Message::Engine(event) => self.handle_engine_event(event),
            Message::Shutdown => {}
        }
    }

    fn handle_transport(&mut self, command: TransportCommand) {
        debug!("SessionManager: received transport command {:?}", command);
        match command {
            TransportCommand::Play { selection } => {
                if let Err(err) = self.session.play(&self.playlist, selection) {
                    self.reject(format!("play: {}", err));
                    return;
                }
            }
            TransportCommand::Stop => self.session.stop(),
            TransportCommand::FastForwardPressed(multiplier) => {
                self.session.fast_forward_pressed(multiplier)
            }
            TransportCommand::FastForwardReleased => self.session.fast_forward_released(),
            TransportCommand::SetTempo(bpm) => self.session.set_tempo(bpm),
            TransportCommand::Scrub(position_fraction) => {
                self.session.scrub(position_fraction);
                return;
            }
        }
        self.publish_session();
    }

    fn handle_playlist(&mut self, command: PlaylistCommand) {
        debug!("SessionManager: received playlist command {:?}", command);
        match self.apply_playlist_command(command) {
            Ok(PlaylistEdit::Changed { selected }) => self.publish_playlist(selected),
            Ok(PlaylistEdit::Unchanged) => {}
            Err(err) => self.reject(format!("playlist: {}", err)),
        }
    }

    fn apply_playlist_command(&mut self, command: PlaylistCommand) -> Result<PlaylistEdit> {
        let selected = match command {
            PlaylistCommand::Append(tracks) => {
                self.playlist.extend(tracks);
                None
            }
            PlaylistCommand::InsertAt { index, track } => {
                self.playlist.insert_at(index, track)?;
                Some(index)
            }
            PlaylistCommand::RemoveAt(index) => {
                let removed = self.playlist.remove_at(index)?;
                debug!("SessionManager: removed entry {}: {}", index, removed);
                None
            }
            PlaylistCommand::MoveUp(index) => Some(self.playlist.move_up(index)?),
            PlaylistCommand::MoveDown(index) => Some(self.playlist.move_down(index)?),
            PlaylistCommand::Clear => {
                self.playlist.clear();
                None
            }
            PlaylistCommand::LoadFile(path) => {
                let tracks = playlist_file::read_playlist(&path).map_err(|err| {
                    error!("Failed to read playlist {}: {}", path.display(), err);
                    err
                })?;
                info!(
                    "SessionManager: loaded {} entries from {}",
                    tracks.len(),
                    path.display()
                );
                self.playlist.extend(tracks);
                None
            }
            PlaylistCommand::SaveFile(path) => {
                playlist_file::write_playlist(&path, &self.playlist).map_err(|err| {
                    error!("Failed to write playlist {}: {}", path.display(), err);
                    err
                })?;
                return Ok(PlaylistEdit::Unchanged);
            }
        };
        Ok(PlaylistEdit::Changed { selected })
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Finished => {
                debug!("SessionManager: received finished event");
                if self.session.on_finished(&self.playlist) {
                    self.publish_session();
                }
            }
            EngineEvent::TimeChanged {
                elapsed_nanos,
                total_seconds,
            } => {
                let progress = self.session.on_time_changed(elapsed_nanos, total_seconds);
                let _ = self
                    .bus_producer
                    .send(Notification::ProgressChanged(progress));
            }
            EngineEvent::TempoChanged(tempo) => {
                debug!("SessionManager: engine reported tempo {}", tempo);
                self.session.on_tempo_changed(tempo);
                let _ = self.bus_producer.send(Notification::TempoChanged(tempo));
            }
        }
    }

    fn reject(&self, reason: String) {
        warn!("SessionManager: rejected command: {}", reason);
        let _ = self
            .bus_producer
            .send(Notification::CommandRejected(reason));
    }

    fn publish_session(&self) {
        let _ = self
            .bus_producer
            .send(Notification::SessionChanged(self.session.snapshot()));
    }

    fn publish_playlist(&self, selected: Option<usize>) {
        let _ = self.bus_producer.send(Notification::PlaylistChanged {
            tracks: self.playlist.tracks().to_vec(),
            selected,
        });
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn session(&self) -> &PlaybackSession<E> {
        &self.session
    }
}

/// Spawns the session service on its own thread.
pub fn spawn_session_manager<E>(
    playlist: Playlist,
    session: PlaybackSession<E>,
    bus_producer: broadcast::Sender<Notification>,
) -> Result<(SessionHandle, JoinHandle<()>)>
where
    E: PlaybackEngine + Send + 'static,
{
    let (sender, inbox) = mpsc::channel();
    let join_handle = thread::Builder::new()
        .name("session-manager".to_string())
        .spawn(move || {
            let mut manager = SessionManager::new(playlist, session, inbox, bus_producer);
            manager.run();
        })?;
    Ok((SessionHandle::new(sender), join_handle))
}
