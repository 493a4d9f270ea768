//! OPL2/OPL3 FM Tracker Playback Core
//!
//! Drives a Yamaha OPL-family FM chip from a nine-channel note grid. The chip
//! emulator itself is pluggable through [`OplBackend`]; this crate supplies
//! everything around it: a shadowed register codec, instrument programming,
//! melodic and rhythm voices, a tick-driven sequencer and a render pipeline
//! that resamples the chip's 49 716 Hz output to 44 100 Hz stereo with
//! selectable sound-card coloration.
//!
//! # Features
//! - 24-byte instrument blocks with per-field limits
//! - Two pitch tables: an 84-entry tracker scale and a chromatic F-number table
//! - Rhythm mode with five drums on channels 6-8
//! - Looping and range playback with per-song tempo
//! - Seven render profiles (`RAW`, `BLENDED`, `SBPRO`, ...)
//! - Byte-exact FMS song and FMI instrument files
//! - WAV export on a worker thread with progress
//!
//! # Crate feature flags
//! - `export-wav` (default): WAV file writing (`export::export_to_wav`, enables `hound`)
//! - `streaming` (opt-in): Live audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ```no_run
//! use opl_fms::backend::NullChip;
//! use opl_fms::song::SongData;
//! use opl_fms::OplController;
//!
//! let controller = OplController::new(NullChip::new());
//! let song = SongData::new().into_shared();
//! controller.load_song("song.fms", &song).unwrap();
//! controller.start_song(&song, false, 0, None);
//!
//! let mut buffer = vec![0i16; 2 * 1024];
//! while controller.is_playing() {
//!     controller.fill_buffer(&mut buffer);
//!     // hand `buffer` to an audio sink
//! }
//! ```

#![warn(missing_docs)]

pub mod backend; // Chip Backend Seam
pub mod config; // Controller Configuration
pub mod controller; // Locked Controller Facade
pub mod export; // Offline Rendering
pub mod fms; // Song & Instrument Files
pub mod opl; // Registers, Tables, Instruments
pub mod render; // Resampling & Coloration
pub mod sequencer; // Row Playback
pub mod song; // Song Model
#[cfg(feature = "streaming")]
pub mod streaming; // Live Audio Output

/// Error types for controller, file and export operations
#[derive(thiserror::Error, Debug)]
pub enum OplError {
    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or truncated song/instrument file
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Song header declares more rows than a song can hold
    #[error("Song too long: {0} rows (maximum 1000)")]
    SongTooLong(u16),

    /// Channel index outside 0-8
    #[error("Invalid channel: {0}")]
    InvalidChannel(usize),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for OplError {
    /// Converts a String into `OplError::Other`.
    ///
    /// Prefer a specific variant (`ParseError`, `ConfigError`, ...) where the
    /// failure has a known cause.
    fn from(msg: String) -> Self {
        OplError::Other(msg)
    }
}

impl From<&str> for OplError {
    /// Converts a string slice into `OplError::Other`.
    fn from(msg: &str) -> Self {
        OplError::Other(msg.to_string())
    }
}

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, OplError>;

// Public API re-exports
pub use backend::{NullChip, OplBackend, RecordingChip, StereoFrame};
pub use config::ControllerConfig;
pub use controller::OplController;
pub use opl::{note_id, note_name, Instrument, InstrumentParam, RhythmFlags, INSTRUMENT_PARAMS};
pub use render::RenderProfile;
pub use sequencer::{samples_per_tick, PlaybackState, SequencerSnapshot};
pub use song::{SharedSong, SongData};

#[cfg(feature = "export-wav")]
pub use export::export_to_wav;
pub use export::{render_song_pcm, ExportProgress, ExportTask};

#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, ControllerSource};
