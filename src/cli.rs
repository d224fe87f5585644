//! Command-line arguments and the line-oriented command language.
//!
//! Entry numbers typed by the user are 1-based and converted to playlist
//! positions here.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::{
    config::{FilesConfig, PlaybackConfig},
    protocol::{Message, PlaylistCommand, TransportCommand},
};

#[derive(Parser, Debug)]
#[command(
    name = "midi-playlist",
    version,
    about = "Plays a list of MIDI files one after another"
)]
pub struct Args {
    /// Playlist files to load at startup (one track per line)
    pub playlists: Vec<PathBuf>,

    /// Tracks to append after the playlist files
    #[arg(short = 'a', long = "add", num_args = 1..)]
    pub tracks: Vec<PathBuf>,

    /// Config file path (defaults to the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the simulated length of every track
    #[arg(long)]
    pub track_seconds: Option<u32>,
}

pub const HELP: &str = "\
commands:
  play [N]        play entry N once, then continue; without N play through
  stop            stop and reset tempo
  ff | fff        hold fast forward (normal / fast factor)
  ffr             release fast forward
  tempo BPM       override the tempo of the current track
  scrub PERCENT   jump within the current track
  add PATH...     append tracks
  insert N PATH   insert a track before entry N
  rm N            remove entry N
  up N | down N   move entry N
  clear           remove every entry
  load PATH       append the tracks listed in a playlist file
  save PATH       write the playlist to a file
  list | status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Dispatch(Message),
    List,
    Status,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// Paths are resolved against the remembered directories in `files`, which
/// are updated to the directory of the last path used.
pub fn parse_command(
    line: &str,
    files: &mut FilesConfig,
    playback: &PlaybackConfig,
) -> Result<Option<CliCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb {
        "play" => {
            let selection = match rest.first() {
                Some(word) => Some(parse_entry(word)?),
                None => None,
            };
            transport(TransportCommand::Play { selection })
        }
        "stop" => transport(TransportCommand::Stop),
        "ff" => transport(TransportCommand::FastForwardPressed(
            playback.fast_forward_factor,
        )),
        "fff" => transport(TransportCommand::FastForwardPressed(
            playback.fast_fast_forward_factor,
        )),
        "ffr" => transport(TransportCommand::FastForwardReleased),
        "tempo" => {
            let bpm: u32 = parse_arg(&rest, 0, "BPM")?;
            if bpm == 0 {
                return Err("tempo must be positive".to_string());
            }
            transport(TransportCommand::SetTempo(bpm))
        }
        "scrub" => {
            let percent: f64 = parse_arg(&rest, 0, "PERCENT")?;
            if !(0.0..=100.0).contains(&percent) {
                return Err("scrub position must be between 0 and 100".to_string());
            }
            transport(TransportCommand::Scrub(percent / 100.0))
        }
        "add" => {
            if rest.is_empty() {
                return Err("add needs at least one path".to_string());
            }
            let tracks = rest
                .iter()
                .map(|word| resolve_track(files, word))
                .collect();
            playlist(PlaylistCommand::Append(tracks))
        }
        "insert" => {
            let index = parse_entry(required(&rest, 0, "N")?)?;
            let track = resolve_track(files, required(&rest, 1, "PATH")?);
            playlist(PlaylistCommand::InsertAt { index, track })
        }
        "rm" => {
            let index = parse_entry(required(&rest, 0, "N")?)?;
            playlist(PlaylistCommand::RemoveAt(index))
        }
        "up" => {
            let index = parse_entry(required(&rest, 0, "N")?)?;
            playlist(PlaylistCommand::MoveUp(index))
        }
        "down" => {
            let index = parse_entry(required(&rest, 0, "N")?)?;
            playlist(PlaylistCommand::MoveDown(index))
        }
        "clear" => playlist(PlaylistCommand::Clear),
        "load" => {
            let path = resolve_playlist_file(files, required(&rest, 0, "PATH")?);
            playlist(PlaylistCommand::LoadFile(path))
        }
        "save" => {
            let path = resolve_playlist_file(files, required(&rest, 0, "PATH")?);
            playlist(PlaylistCommand::SaveFile(path))
        }
        "list" => CliCommand::List,
        "status" => CliCommand::Status,
        "help" | "?" => CliCommand::Help,
        "quit" | "exit" => CliCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(Some(command))
}

fn transport(command: TransportCommand) -> CliCommand {
    CliCommand::Dispatch(Message::Transport(command))
}

fn playlist(command: PlaylistCommand) -> CliCommand {
    CliCommand::Dispatch(Message::Playlist(command))
}

fn required<'a>(rest: &[&'a str], position: usize, name: &str) -> Result<&'a str, String> {
    rest.get(position)
        .copied()
        .ok_or_else(|| format!("missing {}", name))
}

fn parse_arg<T: std::str::FromStr>(
    rest: &[&str],
    position: usize,
    name: &str,
) -> Result<T, String> {
    let word = required(rest, position, name)?;
    word.parse()
        .map_err(|_| format!("invalid {}: '{}'", name, word))
}

/// Converts a 1-based entry number into a playlist position.
fn parse_entry(word: &str) -> Result<usize, String> {
    match word.parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number - 1),
        _ => Err(format!("invalid entry number '{}'", word)),
    }
}

fn resolve_track(files: &mut FilesConfig, word: &str) -> String {
    let path = files.resolve_track(Path::new(word));
    files.remember_track_dir(&path);
    path.to_string_lossy().into_owned()
}

fn resolve_playlist_file(files: &mut FilesConfig, word: &str) -> PathBuf {
    let path = files.resolve_playlist(Path::new(word));
    files.remember_playlist_dir(&path);
    path
}
