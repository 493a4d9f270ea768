//! Sequencer Domain
//!
//! Tick-driven playback of a [`SongData`](crate::song::SongData) grid. One
//! tick plays one row; ticks are scheduled in output samples by the render
//! pipeline.

use crate::backend::OplBackend;
use crate::controller::Engine;
use crate::opl::registers::CHANNEL_COUNT;
use crate::opl::tables::{note_name, NOTE_OFF};
use crate::opl::{OUTPUT_SAMPLE_RATE, PLAYBACK_BASE_HZ};
use crate::song::SharedSong;
use std::fmt::Write as _;

/// Sequencer playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not advancing
    #[default]
    Stopped,
    /// Advancing one row per tick
    Playing,
}

/// Output samples between two rows for a song delay
///
/// A delay of 0 is treated as 1.
///
/// ```
/// use opl_fms::sequencer::samples_per_tick;
///
/// assert_eq!(samples_per_tick(15), 7350);
/// assert_eq!(samples_per_tick(0), 490);
/// ```
pub fn samples_per_tick(delay: u8) -> u32 {
    let delay = delay.max(1) as f64;
    let ticks_per_second = PLAYBACK_BASE_HZ / delay;
    (OUTPUT_SAMPLE_RATE as f64 / ticks_per_second).round() as u32
}

/// Mutable sequencer fields
#[derive(Debug, Clone, Default)]
pub struct SequencerState {
    pub(crate) state: PlaybackState,
    pub(crate) loop_enabled: bool,
    pub(crate) needle: usize,
    pub(crate) start_at: usize,
    pub(crate) stop_at: usize,
    pub(crate) samples_per_tick: u32,
    pub(crate) sample_accumulator: u32,
    pub(crate) song: Option<SharedSong>,
    pub(crate) last_notes: [i16; CHANNEL_COUNT],
    pub(crate) note_updated: bool,
}

/// Copy of the sequencer fields for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerSnapshot {
    /// Playback state
    pub state: PlaybackState,
    /// Whether playback wraps to `start_at`
    pub loop_enabled: bool,
    /// Next row to play
    pub needle: usize,
    /// First row of the playback range
    pub start_at: usize,
    /// Row at which playback ends or wraps
    pub stop_at: usize,
    /// Output samples per row
    pub samples_per_tick: u32,
    /// Samples counted toward the next row
    pub sample_accumulator: u32,
    /// Note ids of the last played row
    pub last_notes: [i16; CHANNEL_COUNT],
    /// Set when a row was played since the last [`take_step_line`](crate::OplController::take_step_line)
    pub note_updated: bool,
    /// Whether a song is attached
    pub has_song: bool,
}

impl SequencerState {
    /// Whether the sequencer is advancing
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub(crate) fn rewind(&mut self) {
        self.needle = 0;
        self.sample_accumulator = 0;
        self.state = PlaybackState::Stopped;
    }

    pub(crate) fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            state: self.state,
            loop_enabled: self.loop_enabled,
            needle: self.needle,
            start_at: self.start_at,
            stop_at: self.stop_at,
            samples_per_tick: self.samples_per_tick,
            sample_accumulator: self.sample_accumulator,
            last_notes: self.last_notes,
            note_updated: self.note_updated,
            has_song: self.song.is_some(),
        }
    }

    /// Format the last played row and clear the updated flag
    ///
    /// Returns `None` when no row was played since the previous call.
    pub(crate) fn take_step_line(&mut self, use_numbers: bool) -> Option<String> {
        if !self.note_updated {
            return None;
        }
        self.note_updated = false;
        Some(format_step_line(
            self.needle as i64 - 1,
            &self.last_notes,
            use_numbers,
        ))
    }
}

/// Console tracker line for one row, e.g. `"Step   3:  D-1  ===  ... "`
pub fn format_step_line(step: i64, notes: &[i16], use_numbers: bool) -> String {
    let mut line = format!("Step {:3}: ", step);
    for &note in notes {
        // Writing into a String cannot fail
        let _ = match note {
            NOTE_OFF => write!(line, " === "),
            0 => write!(line, " ... "),
            n if use_numbers => write!(line, "{:4} ", n),
            n => write!(line, "{:>4} ", note_name(n)),
        };
    }
    line
}

impl<B: OplBackend> Engine<B> {
    /// Attach `song` and start playing at `start_at`
    ///
    /// `stop_at` only applies when it lies after `start_at`; otherwise playback
    /// runs to the end of the song.
    pub(crate) fn start_song(
        &mut self,
        song: &SharedSong,
        loop_enabled: bool,
        start_at: usize,
        stop_at: Option<usize>,
    ) {
        let (length, delay) = {
            let song = song.read();
            (song.song_length() as usize, song.song_delay)
        };

        let seq = &mut self.sequencer;
        seq.song = Some(SharedSong::clone(song));
        seq.start_at = start_at;
        seq.stop_at = match stop_at {
            Some(stop) if stop > start_at => stop,
            _ => length,
        };
        seq.needle = start_at;
        seq.sample_accumulator = 0;
        seq.loop_enabled = loop_enabled;
        seq.samples_per_tick = samples_per_tick(delay);
        seq.state = PlaybackState::Playing;
    }

    /// Start or stop playback; stopping silences every channel
    pub(crate) fn set_playing(&mut self, playing: bool, hard: bool) {
        if playing {
            self.sequencer.state = PlaybackState::Playing;
        } else {
            self.sequencer.state = PlaybackState::Stopped;
            self.silence_all(hard);
        }
    }

    pub(crate) fn toggle_pause(&mut self) {
        let playing = self.sequencer.is_playing();
        self.set_playing(!playing, false);
    }

    /// Count one output sample toward the next tick
    pub(crate) fn advance_sequencer(&mut self) {
        if !self.sequencer.is_playing() || self.sequencer.song.is_none() {
            return;
        }
        self.sequencer.sample_accumulator += 1;
        while self.sequencer.samples_per_tick > 0
            && self.sequencer.sample_accumulator >= self.sequencer.samples_per_tick
        {
            self.sequencer.sample_accumulator -= self.sequencer.samples_per_tick;
            self.tick_sequencer();
            if !self.sequencer.is_playing() {
                break;
            }
        }
    }

    /// Play the row under the needle and advance, wrapping or stopping at the end
    pub(crate) fn tick_sequencer(&mut self) {
        let Some(song) = self.sequencer.song.clone() else {
            return;
        };
        let song = song.read();
        let length = song.song_length() as usize;

        if self.sequencer.stop_at > length {
            log::warn!(
                "stop row {} lies past the song length {}, clamping",
                self.sequencer.stop_at,
                length
            );
            self.sequencer.stop_at = length;
        }

        if self.sequencer.needle < self.sequencer.stop_at {
            if let Some(row) = song.row(self.sequencer.needle) {
                let row = *row;
                self.sequencer.last_notes = row;
                self.sequencer.note_updated = true;

                for (channel, &note) in row.iter().enumerate() {
                    if note == NOTE_OFF {
                        self.stop_note(channel);
                    } else if note > 0 {
                        self.play_note_dos(channel, note as usize);
                    }
                }
            }
            self.sequencer.needle += 1;
        }

        let seq = &mut self.sequencer;
        if seq.needle >= length || seq.needle >= seq.stop_at {
            if seq.loop_enabled {
                if seq.start_at > seq.stop_at {
                    log::warn!(
                        "start row {} lies past the stop row {}, restarting from 0",
                        seq.start_at,
                        seq.stop_at
                    );
                    seq.start_at = 0;
                }
                seq.needle = seq.start_at;
            } else {
                drop(song);
                self.set_playing(false, false);
            }
        }
    }
}
