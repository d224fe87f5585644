//! Ordered list of track references.
//!
//! The playlist is a passive sequence: it knows nothing about playback and
//! never reorders itself. Positions are 0-based and stay contiguous after
//! every removal.

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<String>,
}

impl Playlist {
    pub fn new() -> Playlist {
        Playlist { tracks: Vec::new() }
    }

    pub fn from_tracks<I, S>(tracks: I) -> Playlist
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Playlist {
            tracks: tracks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn append(&mut self, track: impl Into<String>) {
        self.tracks.push(track.into());
    }

    pub fn extend<I, S>(&mut self, tracks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tracks.extend(tracks.into_iter().map(Into::into));
    }

    /// Inserts before `index`. `index == len()` appends.
    pub fn insert_at(&mut self, index: usize, track: impl Into<String>) -> Result<()> {
        if index > self.tracks.len() {
            return Err(self.out_of_range(index));
        }
        self.tracks.insert(index, track.into());
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<String> {
        self.check_index(index)?;
        Ok(self.tracks.remove(index))
    }

    pub fn swap(&mut self, index_a: usize, index_b: usize) -> Result<()> {
        self.check_index(index_a)?;
        self.check_index(index_b)?;
        self.tracks.swap(index_a, index_b);
        Ok(())
    }

    /// Moves the entry at `index` one position towards the front and returns
    /// its new position. The first entry stays where it is.
    pub fn move_up(&mut self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        if index == 0 {
            return Ok(index);
        }
        self.tracks.swap(index, index - 1);
        Ok(index - 1)
    }

    /// Moves the entry at `index` one position towards the back and returns
    /// its new position. The last entry stays where it is.
    pub fn move_down(&mut self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        if index + 1 >= self.tracks.len() {
            return Ok(index);
        }
        self.tracks.swap(index, index + 1);
        Ok(index + 1)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn get(&self, index: usize) -> Result<&str> {
        self.tracks
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.out_of_range(index))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(String::as_str)
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::OutOfRange {
            index,
            len: self.tracks.len(),
        }
    }
}
