//! OPL Register Definitions
//!
//! Register group base addresses, the channel → operator offset table and
//! the shadow register bank used for read-modify-write updates.

use bitflags::bitflags;
use std::fmt;

/// Number of melodic channels
pub const CHANNEL_COUNT: usize = 9;

/// Highest valid channel index
pub const MAX_CHANNEL: usize = CHANNEL_COUNT - 1;

/// Size of the register space mirrored by [`ShadowRegisters`] (both OPL3 banks)
pub const REGISTER_SPACE: usize = 0x200;

/// Modulator operator offset for each channel. The carrier sits 3 slots higher.
pub const OPERATOR_OFFSETS: [u8; CHANNEL_COUNT] = [0x00, 0x01, 0x02, 0x08, 0x09, 0x0A, 0x10, 0x11, 0x12];

/// Distance between a channel's modulator and carrier operator slots
pub const CARRIER_DISTANCE: u8 = 3;

/// Test / waveform-select enable register
pub const REG_WAVEFORM_ENABLE: u16 = 0x01;
/// Value written to [`REG_WAVEFORM_ENABLE`] to allow non-sine waveforms
pub const WAVEFORM_ENABLE: u8 = 0x20;
/// AM/VIB depth, rhythm enable and drum trigger register
pub const REG_RHYTHM: u16 = 0xBD;
/// OPL3 mode register in bank 1
pub const REG_OPL3_ENABLE: u16 = 0x105;
/// Key-on bit inside the `0xB0` block register
pub const KEY_ON: u8 = 0x20;
/// Total level value that attenuates an operator completely
pub const MAX_ATTENUATION: u8 = 63;
/// Channel register value for centre pan with FM connection
pub const CENTER_PAN_FM: u8 = 0x30;

/// Per-operator and per-channel register groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterGroup {
    /// AM / VIB / EG type / KSR / multiplier - 0x20 + operator
    Multiplier = 0x20,
    /// Key scale level / total level - 0x40 + operator
    Level = 0x40,
    /// Attack rate / decay rate - 0x60 + operator
    AttackDecay = 0x60,
    /// Sustain level / release rate - 0x80 + operator
    SustainRelease = 0x80,
    /// F-number low byte - 0xA0 + channel
    FrequencyLo = 0xA0,
    /// Key-on / block / F-number high bits - 0xB0 + channel
    KeyOnBlock = 0xB0,
    /// Panning / feedback / connection - 0xC0 + channel
    FeedbackConnection = 0xC0,
    /// Waveform select - 0xE0 + operator
    Waveform = 0xE0,
}

impl RegisterGroup {
    /// Base address of the group
    pub fn base(self) -> u16 {
        self as u16
    }

    /// Address of the group register for an operator slot or channel index
    pub fn at(self, offset: u8) -> u16 {
        self.base() + offset as u16
    }
}

impl fmt::Display for RegisterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterGroup::Multiplier => write!(f, "0x20 (AM/VIB/EG/Multiplier)"),
            RegisterGroup::Level => write!(f, "0x40 (KSL/Total Level)"),
            RegisterGroup::AttackDecay => write!(f, "0x60 (Attack/Decay)"),
            RegisterGroup::SustainRelease => write!(f, "0x80 (Sustain/Release)"),
            RegisterGroup::FrequencyLo => write!(f, "0xA0 (F-Number Low)"),
            RegisterGroup::KeyOnBlock => write!(f, "0xB0 (Key-On/Block/F-Number High)"),
            RegisterGroup::FeedbackConnection => write!(f, "0xC0 (Feedback/Connection)"),
            RegisterGroup::Waveform => write!(f, "0xE0 (Waveform)"),
        }
    }
}

/// Modulator operator offset for `channel`, `None` past channel 8
pub fn modulator_offset(channel: usize) -> Option<u8> {
    OPERATOR_OFFSETS.get(channel).copied()
}

/// Carrier operator offset for `channel`, `None` past channel 8
pub fn carrier_offset(channel: usize) -> Option<u8> {
    modulator_offset(channel).map(|offset| offset + CARRIER_DISTANCE)
}

bitflags! {
    /// Register 0xBD bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RhythmFlags: u8 {
        /// Hi-hat trigger
        const HI_HAT = 0x01;
        /// Top cymbal trigger
        const CYMBAL = 0x02;
        /// Tom-tom trigger
        const TOM = 0x04;
        /// Snare drum trigger
        const SNARE = 0x08;
        /// Bass drum trigger
        const BASS_DRUM = 0x10;
        /// Rhythm (percussion) mode enable
        const RHYTHM_MODE = 0x20;
        /// Vibrato depth 14 cents
        const VIBRATO_DEPTH = 0x40;
        /// Tremolo depth 4.8 dB
        const AM_DEPTH = 0x80;
    }
}

impl RhythmFlags {
    /// Value asserted on every instrument write while in melodic mode
    pub const MELODIC_DEFAULT: RhythmFlags = RhythmFlags::AM_DEPTH.union(RhythmFlags::VIBRATO_DEPTH);

    /// Value asserted on every instrument write while in rhythm mode
    pub const RHYTHM_DEFAULT: RhythmFlags = Self::MELODIC_DEFAULT.union(RhythmFlags::RHYTHM_MODE);

    /// Every drum trigger bit
    pub const ALL_DRUMS: RhythmFlags = RhythmFlags::HI_HAT
        .union(RhythmFlags::CYMBAL)
        .union(RhythmFlags::TOM)
        .union(RhythmFlags::SNARE)
        .union(RhythmFlags::BASS_DRUM);

    /// Create flags from raw register value
    pub fn from_register(value: u8) -> Self {
        RhythmFlags::from_bits_truncate(value)
    }

    /// Drum bits a rhythm channel clears on note-off
    pub fn stop_mask(channel: usize) -> RhythmFlags {
        match channel {
            6 => RhythmFlags::BASS_DRUM,
            7 => RhythmFlags::SNARE | RhythmFlags::HI_HAT,
            8 => RhythmFlags::TOM | RhythmFlags::CYMBAL,
            _ => RhythmFlags::empty(),
        }
    }

    /// Drum bit triggered by a note on a rhythm channel
    ///
    /// Notes below 36 select the hi-hat / tom, notes from 36 the snare / cymbal.
    pub fn trigger_for(channel: usize, note_index: usize) -> RhythmFlags {
        match channel {
            6 => RhythmFlags::BASS_DRUM,
            7 if note_index < 36 => RhythmFlags::HI_HAT,
            7 => RhythmFlags::SNARE,
            8 if note_index < 36 => RhythmFlags::TOM,
            8 => RhythmFlags::CYMBAL,
            _ => RhythmFlags::empty(),
        }
    }
}

/// Mirror of the last value written to every chip register
#[derive(Clone)]
pub struct ShadowRegisters {
    registers: [u8; REGISTER_SPACE],
}

impl ShadowRegisters {
    /// Create a shadow bank with all values set to 0
    pub fn new() -> Self {
        ShadowRegisters {
            registers: [0; REGISTER_SPACE],
        }
    }

    /// Read a register value
    pub fn read(&self, reg: u16) -> u8 {
        self.registers[reg as usize & (REGISTER_SPACE - 1)]
    }

    /// Write a register value
    pub fn write(&mut self, reg: u16, value: u8) {
        self.registers[reg as usize & (REGISTER_SPACE - 1)] = value;
    }

    /// Zero every register
    pub fn clear(&mut self) {
        self.registers = [0; REGISTER_SPACE];
    }

    /// Get all registers as a slice
    pub fn as_slice(&self) -> &[u8; REGISTER_SPACE] {
        &self.registers
    }
}

impl Default for ShadowRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShadowRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowRegisters")
            .field("rhythm", &format_args!("{:#04X}", self.read(REG_RHYTHM)))
            .finish_non_exhaustive()
    }
}
