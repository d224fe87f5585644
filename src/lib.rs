//! Sequential playlist controller for a MIDI file player.
//!
//! The [`session::PlaybackSession`] state machine decides which playlist
//! entry an external engine plays next. [`session_manager`] runs it on a
//! single thread behind one ordered inbox shared by user commands and engine
//! events.

pub mod cli;
pub mod clock_engine;
pub mod config;
pub mod engine;
pub mod error;
pub mod playlist;
pub mod playlist_file;
pub mod progress;
pub mod protocol;
pub mod session;
pub mod session_manager;
pub mod terminal_view;

pub use error::{Error, Result};
