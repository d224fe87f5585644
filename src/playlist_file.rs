//! Plain-text playlist files: one track reference per line.

use std::{
    fs,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use log::debug;

use crate::{error::Result, playlist::Playlist};

/// Reads track references from `path`, skipping blank lines.
pub fn read_playlist(path: &Path) -> Result<Vec<String>> {
    let file = fs::File::open(path)?;
    parse_lines(BufReader::new(file))
}

pub fn parse_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut tracks = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        tracks.push(line.to_string());
    }
    Ok(tracks)
}

pub fn write_playlist(path: &Path, playlist: &Playlist) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for track in playlist.iter() {
        writeln!(writer, "{}", track)?;
    }
    writer.flush()?;
    debug!(
        "Wrote {} playlist entries to {}",
        playlist.len(),
        path.display()
    );
    Ok(())
}
