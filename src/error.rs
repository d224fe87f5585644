//! Error types shared by the playlist, session, and configuration layers.

use thiserror::Error;

/// Errors raised by playlist edits, transport commands, and file handling.
///
/// None of these are fatal: a rejected command leaves the playlist and the
/// playback session exactly as they were.
#[derive(Error, Debug)]
pub enum Error {
    /// A playlist position did not name an existing entry.
    #[error("index {index} out of range for playlist of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Play was requested with nothing in the playlist.
    #[error("playlist is empty")]
    EmptyPlaylist,

    /// Reading or writing a playlist or config file failed.
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// The platform has no per-user configuration directory.
    #[error("no configuration directory available")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, Error>;
