//! Persistent application configuration model and defaults.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "midi_playlist.toml";

/// Root configuration persisted to `midi_playlist.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Transport defaults.
    pub playback: PlaybackConfig,
    #[serde(default)]
    /// Directories remembered by the file-handling front end.
    pub files: FilesConfig,
    #[serde(default)]
    /// Stand-in engine timing.
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackConfig {
    /// Tempo restored whenever playback stops or a new track begins.
    #[serde(default = "default_tempo_bpm")]
    pub default_tempo_bpm: u32,
    #[serde(default = "default_fast_forward_factor")]
    pub fast_forward_factor: u32,
    #[serde(default = "default_fast_fast_forward_factor")]
    pub fast_fast_forward_factor: u32,
}

/// Last used directories for adding tracks and for playlist files.
///
/// Relative paths typed by the user resolve against these, and each
/// successful add/load/save updates them.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FilesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EngineConfig {
    /// Length reported for every track by the clock engine.
    #[serde(default = "default_nominal_track_seconds")]
    pub nominal_track_seconds: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_tempo_bpm() -> u32 {
    crate::session::DEFAULT_TEMPO_BPM
}

fn default_fast_forward_factor() -> u32 {
    4
}

fn default_fast_fast_forward_factor() -> u32 {
    16
}

fn default_nominal_track_seconds() -> u32 {
    180
}

fn default_tick_interval_ms() -> u64 {
    100
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_tempo_bpm: default_tempo_bpm(),
            fast_forward_factor: default_fast_forward_factor(),
            fast_fast_forward_factor: default_fast_fast_forward_factor(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nominal_track_seconds: default_nominal_track_seconds(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl FilesConfig {
    pub fn resolve_track(&self, path: &Path) -> PathBuf {
        resolve_against(self.track_dir.as_deref(), path)
    }

    pub fn resolve_playlist(&self, path: &Path) -> PathBuf {
        resolve_against(self.playlist_dir.as_deref(), path)
    }

    pub fn remember_track_dir(&mut self, track: &Path) {
        if let Some(parent) = parent_dir(track) {
            self.track_dir = Some(parent);
        }
    }

    pub fn remember_playlist_dir(&mut self, playlist_file: &Path) {
        if let Some(parent) = parent_dir(playlist_file) {
            self.playlist_dir = Some(parent);
        }
    }
}

fn resolve_against(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(Error::NoConfigDir)
}

/// Loads the config at `path`, writing the defaults there first if the file
/// does not exist yet.
pub fn load_or_create(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        let default_config = Config::default();
        save(path, &default_config)?;
        return Ok(default_config);
    }

    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

pub fn save(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = parent_dir(path) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string(config)?)?;
    Ok(())
}
