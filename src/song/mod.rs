//! Song Model Domain
//!
//! A song is a fixed-capacity grid of note ids (rows × 9 channels) plus the
//! tempo byte, the used row count and one instrument block and name per
//! channel. Songs are shared with the sequencer through [`SharedSong`].

use crate::opl::instrument::{Instrument, INSTRUMENT_SIZE};
use crate::opl::registers::CHANNEL_COUNT;
use crate::opl::tables::{MAX_NOTE_ID, NOTE_OFF};
use crate::opl::{DEFAULT_SONG_DELAY, MAX_SONG_LENGTH, NAME_BUFFER_SIZE};
use parking_lot::RwLock;
use std::sync::Arc;

/// Song handle shared between the editor and the sequencer
pub type SharedSong = Arc<RwLock<SongData>>;

/// One row of notes, one entry per channel
pub type Row = [i16; CHANNEL_COUNT];

/// Longest channel name that fits a name buffer
pub const MAX_NAME_LEN: usize = NAME_BUFFER_SIZE - 1;

/// Tracker song
///
/// Name buffers are stored exactly as they appear in song files: byte 0 holds
/// the name length, the name follows. Any bytes past the name are preserved so
/// files round-trip unchanged.
#[derive(Clone, PartialEq, Eq)]
pub struct SongData {
    names: [[u8; NAME_BUFFER_SIZE]; CHANNEL_COUNT],
    instruments: [Instrument; CHANNEL_COUNT],
    /// Tempo byte; a tick fires every `delay / 90` seconds
    pub song_delay: u8,
    song_length: u16,
    rows: Box<[Row]>,
}

impl SongData {
    /// Empty song: no rows, default delay, blank names and zeroed instruments
    pub fn new() -> Self {
        SongData {
            names: [[0; NAME_BUFFER_SIZE]; CHANNEL_COUNT],
            instruments: [Instrument::default(); CHANNEL_COUNT],
            song_delay: DEFAULT_SONG_DELAY,
            song_length: 0,
            rows: vec![[0; CHANNEL_COUNT]; MAX_SONG_LENGTH].into_boxed_slice(),
        }
    }

    /// Wrap into a [`SharedSong`]
    pub fn into_shared(self) -> SharedSong {
        Arc::new(RwLock::new(self))
    }

    /// Re-initialise to an empty song
    pub fn clear(&mut self) {
        *self = SongData::new();
    }

    /// Number of rows in use
    pub fn song_length(&self) -> u16 {
        self.song_length
    }

    /// Set the number of rows in use, clamped to the grid capacity
    pub fn set_song_length(&mut self, length: u16) {
        if length as usize > MAX_SONG_LENGTH {
            log::warn!(
                "song length {} exceeds maximum {}, clamping",
                length,
                MAX_SONG_LENGTH
            );
        }
        self.song_length = length.min(MAX_SONG_LENGTH as u16);
    }

    /// Note id at `row`/`channel`, `None` outside the grid
    pub fn note(&self, row: usize, channel: usize) -> Option<i16> {
        self.rows.get(row)?.get(channel).copied()
    }

    /// Store a note id. Rejects cells outside the grid and ids outside `-1..=84`.
    pub fn set_note(&mut self, row: usize, channel: usize, value: i16) -> bool {
        if !(NOTE_OFF..=MAX_NOTE_ID).contains(&value) {
            return false;
        }
        match self.rows.get_mut(row).and_then(|r| r.get_mut(channel)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Row of notes, `None` past the grid capacity
    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    /// Rows `0..song_length`
    pub fn used_rows(&self) -> &[Row] {
        &self.rows[..self.song_length as usize]
    }

    /// Replace every row. Rows past the grid capacity are ignored.
    pub(crate) fn set_rows(&mut self, rows: &[Row]) {
        let count = rows.len().min(MAX_SONG_LENGTH);
        self.rows[..count].copy_from_slice(&rows[..count]);
        for row in self.rows[count..].iter_mut() {
            *row = [0; CHANNEL_COUNT];
        }
    }

    /// Zero rows `first..=last` (clipped to the grid). Returns false if `first > last`.
    pub fn clear_range(&mut self, first: usize, last: usize) -> bool {
        if first > last || first >= MAX_SONG_LENGTH {
            return false;
        }
        let last = last.min(MAX_SONG_LENGTH - 1);
        for row in &mut self.rows[first..=last] {
            *row = [0; CHANNEL_COUNT];
        }
        true
    }

    /// Remove rows `first..=last`; later rows move up and the song shrinks
    pub fn delete_range(&mut self, first: usize, last: usize) -> bool {
        let length = self.song_length as usize;
        if first > last || first >= length {
            return false;
        }
        let last = last.min(length - 1);
        let removed = last - first + 1;

        self.rows.copy_within(last + 1..length, first);
        for row in &mut self.rows[length - removed..length] {
            *row = [0; CHANNEL_COUNT];
        }
        self.song_length -= removed as u16;
        true
    }

    /// Insert an empty row at `row`; later rows move down
    ///
    /// The song grows by one row unless it is already full, in which case
    /// the last row is dropped.
    pub fn insert_row_at(&mut self, row: usize) -> bool {
        if row >= MAX_SONG_LENGTH {
            return false;
        }
        let length = self.song_length as usize;
        let new_length = (length + 1).min(MAX_SONG_LENGTH).max(row + 1);

        if row < new_length - 1 {
            self.rows.copy_within(row..new_length - 1, row + 1);
        }
        self.rows[row] = [0; CHANNEL_COUNT];
        self.song_length = new_length as u16;
        true
    }

    /// Copy `len` rows from `src` starting at `src_start` into `self` at `dst_start`
    ///
    /// The destination length grows to cover the pasted rows. Rows that would
    /// land past the grid capacity are dropped. Returns the number of rows copied.
    pub fn copy_range_from(
        &mut self,
        src: &SongData,
        src_start: usize,
        dst_start: usize,
        len: usize,
    ) -> usize {
        if src_start >= MAX_SONG_LENGTH || dst_start >= MAX_SONG_LENGTH {
            return 0;
        }
        let count = len
            .min(MAX_SONG_LENGTH - src_start)
            .min(MAX_SONG_LENGTH - dst_start);
        if count == 0 {
            return 0;
        }

        self.rows[dst_start..dst_start + count]
            .copy_from_slice(&src.rows[src_start..src_start + count]);
        let end = (dst_start + count) as u16;
        if end > self.song_length {
            self.song_length = end;
        }
        count
    }

    /// Copy rows within the same song (ranges may overlap)
    pub fn copy_range(&mut self, src_start: usize, dst_start: usize, len: usize) -> usize {
        let snapshot = self.clone();
        self.copy_range_from(&snapshot, src_start, dst_start, len)
    }

    /// Replace every `old` note on `channel` within the used rows. Returns the count.
    pub fn replace_notes(&mut self, channel: usize, old: i16, new: i16) -> usize {
        if channel >= CHANNEL_COUNT || !(NOTE_OFF..=MAX_NOTE_ID).contains(&new) {
            return 0;
        }
        let length = self.song_length as usize;
        let mut count = 0;
        for row in &mut self.rows[..length] {
            if row[channel] == old {
                row[channel] = new;
                count += 1;
            }
        }
        log::debug!(
            "replaced {} instances of note {} with {} on channel {}",
            count,
            old,
            new,
            channel
        );
        count
    }

    /// Channel name decoded from its length-prefixed buffer
    pub fn instrument_name(&self, channel: usize) -> Option<String> {
        let buffer = self.names.get(channel)?;
        let len = buffer[0] as usize;
        Some(String::from_utf8_lossy(&buffer[1..=len]).into_owned())
    }

    /// Store a channel name, truncated to 255 bytes
    pub fn set_instrument_name(&mut self, channel: usize, name: &str) -> bool {
        let Some(buffer) = self.names.get_mut(channel) else {
            return false;
        };
        let bytes = truncate_name(name);
        buffer[0] = bytes.len() as u8;
        buffer[1..=bytes.len()].copy_from_slice(bytes);
        true
    }

    /// Raw name buffer of a channel
    pub fn name_buffer(&self, channel: usize) -> Option<&[u8; NAME_BUFFER_SIZE]> {
        self.names.get(channel)
    }

    pub(crate) fn set_name_buffer(&mut self, channel: usize, buffer: [u8; NAME_BUFFER_SIZE]) {
        if let Some(slot) = self.names.get_mut(channel) {
            *slot = buffer;
        }
    }

    /// Instrument block stored for a channel
    pub fn instrument(&self, channel: usize) -> Option<Instrument> {
        self.instruments.get(channel).copied()
    }

    /// Store an instrument block for a channel
    pub fn set_instrument(&mut self, channel: usize, instrument: Instrument) -> bool {
        match self.instruments.get_mut(channel) {
            Some(slot) => {
                *slot = instrument;
                true
            }
            None => false,
        }
    }

    /// All instrument blocks
    pub fn instruments(&self) -> &[Instrument; CHANNEL_COUNT] {
        &self.instruments
    }
}

/// Longest prefix of `name` that fits a name buffer, cut on a char boundary
pub(crate) fn truncate_name(name: &str) -> &[u8] {
    if name.len() <= MAX_NAME_LEN {
        return name.as_bytes();
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name.as_bytes()[..end]
}

impl Default for SongData {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SongData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = (0..CHANNEL_COUNT)
            .filter_map(|ch| self.instrument_name(ch))
            .collect();
        f.debug_struct("SongData")
            .field("song_delay", &self.song_delay)
            .field("song_length", &self.song_length)
            .field("names", &names)
            .field("instrument_bytes", &(CHANNEL_COUNT * INSTRUMENT_SIZE))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(rows: usize) -> SongData {
        let mut song = SongData::new();
        for row in 0..rows {
            song.set_note(row, 0, (row % 84 + 1) as i16);
        }
        song.set_song_length(rows as u16);
        song
    }

    #[test]
    fn test_new_song_defaults() {
        let song = SongData::new();
        assert_eq!(song.song_delay, 15);
        assert_eq!(song.song_length(), 0);
        assert_eq!(song.note(999, 8), Some(0));
        assert_eq!(song.note(1000, 0), None);
        assert_eq!(song.instrument_name(0).as_deref(), Some(""));
    }

    #[test]
    fn test_set_note_validates() {
        let mut song = SongData::new();
        assert!(song.set_note(0, 0, 84));
        assert!(song.set_note(0, 1, -1));
        assert!(!song.set_note(0, 2, 85));
        assert!(!song.set_note(0, 2, -2));
        assert!(!song.set_note(0, 9, 1));
        assert!(!song.set_note(1000, 0, 1));
    }

    #[test]
    fn test_delete_range_shifts_rows_up() {
        let mut song = numbered(6);
        assert!(song.delete_range(1, 2));
        assert_eq!(song.song_length(), 4);
        let col: Vec<i16> = song.used_rows().iter().map(|r| r[0]).collect();
        assert_eq!(col, vec![1, 4, 5, 6]);
        assert_eq!(song.note(4, 0), Some(0));
        assert_eq!(song.note(5, 0), Some(0));
    }

    #[test]
    fn test_insert_row_shifts_rows_down() {
        let mut song = numbered(3);
        assert!(song.insert_row_at(1));
        assert_eq!(song.song_length(), 4);
        let col: Vec<i16> = song.used_rows().iter().map(|r| r[0]).collect();
        assert_eq!(col, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_insert_row_at_capacity_drops_last() {
        let mut song = numbered(MAX_SONG_LENGTH);
        let last_before = song.note(MAX_SONG_LENGTH - 2, 0);
        assert!(song.insert_row_at(0));
        assert_eq!(song.song_length() as usize, MAX_SONG_LENGTH);
        assert_eq!(song.note(0, 0), Some(0));
        assert_eq!(song.note(MAX_SONG_LENGTH - 1, 0), last_before);
    }

    #[test]
    fn test_clear_range() {
        let mut song = numbered(4);
        assert!(song.clear_range(1, 2));
        let col: Vec<i16> = song.used_rows().iter().map(|r| r[0]).collect();
        assert_eq!(col, vec![1, 0, 0, 4]);
        assert!(!song.clear_range(3, 2));
    }

    #[test]
    fn test_copy_range_extends_destination() {
        let src = numbered(4);
        let mut dst = SongData::new();
        assert_eq!(dst.copy_range_from(&src, 1, 10, 3), 3);
        assert_eq!(dst.song_length(), 13);
        assert_eq!(dst.note(10, 0), Some(2));
        assert_eq!(dst.note(12, 0), Some(4));
        assert_eq!(dst.copy_range_from(&src, 0, 998, 5), 2);
        assert_eq!(dst.song_length() as usize, MAX_SONG_LENGTH);
    }

    #[test]
    fn test_replace_notes() {
        let mut song = SongData::new();
        song.set_note(0, 3, 10);
        song.set_note(2, 3, 10);
        song.set_note(5, 3, 10);
        song.set_song_length(4);
        assert_eq!(song.replace_notes(3, 10, 20), 2);
        assert_eq!(song.note(5, 3), Some(10));
        assert_eq!(song.replace_notes(9, 10, 20), 0);
    }

    #[test]
    fn test_instrument_name_is_capped() {
        let mut song = SongData::new();
        let long = "x".repeat(300);
        assert!(song.set_instrument_name(2, &long));
        assert_eq!(song.instrument_name(2).map(|n| n.len()), Some(255));
        assert_eq!(song.name_buffer(2).map(|b| b[0]), Some(255));
        assert!(!song.set_instrument_name(9, "nope"));
    }
}
