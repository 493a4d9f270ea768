//! OPL Chip Domain
//!
//! Register map, instrument block layout, pitch tables and built-in patches
//! for OPL2/OPL3-class FM chips.
//!
//! Implementation:
//! - `registers` - operator offsets, register groups, rhythm bits, shadow bank
//! - `instrument` - 24-byte instrument block and its register packing
//! - `tables` - F-numbers, legacy DOS scale, note names
//! - `presets` - default drum and melodic patches

pub mod instrument;
pub mod presets;
pub mod registers;
pub mod tables;

// Re-export public API
pub use instrument::{Instrument, InstrumentParam, INSTRUMENT_PARAMS, INSTRUMENT_SIZE};
pub use registers::{RegisterGroup, RhythmFlags, ShadowRegisters, CHANNEL_COUNT};
pub use tables::{note_id, note_name};

/// Output sample rate in Hz
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Native sample rate of the chip in Hz (14.31818 MHz / 288)
pub const OPL_NATIVE_RATE: f64 = 49_716.0;

/// Tick rate in Hz at a song delay of 1
pub const PLAYBACK_BASE_HZ: f64 = 90.0;

/// Maximum number of rows in a song
pub const MAX_SONG_LENGTH: usize = 1000;

/// Size of a channel name buffer in song files
pub const NAME_BUFFER_SIZE: usize = 256;

/// Default song delay (tempo byte)
pub const DEFAULT_SONG_DELAY: u8 = 15;
