//! FM instrument block
//!
//! An instrument is 24 bytes of paired modulator/carrier parameters plus the
//! channel-wide feedback and connection settings. The byte order is the FMI
//! file format and the FMS song block format, so it must not change.

use super::registers::{carrier_offset, modulator_offset, RegisterGroup};

/// Size of an instrument block in bytes
pub const INSTRUMENT_SIZE: usize = 24;

/// Byte index of each instrument parameter
pub mod param {
    /// Modulator frequency multiplier
    pub const MOD_MULTIPLIER: usize = 0;
    /// Carrier frequency multiplier
    pub const CAR_MULTIPLIER: usize = 1;
    /// Modulator output level (attenuation)
    pub const MOD_OUTPUT: usize = 2;
    /// Carrier output level (attenuation)
    pub const CAR_OUTPUT: usize = 3;
    /// Modulator attack rate
    pub const MOD_ATTACK: usize = 4;
    /// Carrier attack rate
    pub const CAR_ATTACK: usize = 5;
    /// Modulator decay rate
    pub const MOD_DECAY: usize = 6;
    /// Carrier decay rate
    pub const CAR_DECAY: usize = 7;
    /// Modulator sustain level
    pub const MOD_SUSTAIN: usize = 8;
    /// Carrier sustain level
    pub const CAR_SUSTAIN: usize = 9;
    /// Modulator release rate
    pub const MOD_RELEASE: usize = 10;
    /// Carrier release rate
    pub const CAR_RELEASE: usize = 11;
    /// Modulator waveform
    pub const MOD_WAVEFORM: usize = 12;
    /// Carrier waveform
    pub const CAR_WAVEFORM: usize = 13;
    /// Modulator envelope sustain type
    pub const MOD_EG_TYPE: usize = 14;
    /// Carrier envelope sustain type
    pub const CAR_EG_TYPE: usize = 15;
    /// Modulator vibrato
    pub const MOD_VIBRATO: usize = 16;
    /// Carrier vibrato
    pub const CAR_VIBRATO: usize = 17;
    /// Modulator amplitude modulation
    pub const MOD_AM: usize = 18;
    /// Carrier amplitude modulation
    pub const CAR_AM: usize = 19;
    /// Feedback level
    pub const FEEDBACK: usize = 20;
    /// Connection mode (0 = FM, 1 = additive)
    pub const CONNECTION: usize = 21;
    /// Modulator key scale level
    pub const MOD_SCALING: usize = 22;
    /// Carrier key scale level
    pub const CAR_SCALING: usize = 23;
}

/// Display name and editor maximum of one instrument parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentParam {
    /// Parameter name as shown by editors
    pub name: &'static str,
    /// Largest value an editor should offer
    pub max_value: u8,
}

const fn p(name: &'static str, max_value: u8) -> InstrumentParam {
    InstrumentParam { name, max_value }
}

/// Parameter metadata in block order
pub const INSTRUMENT_PARAMS: [InstrumentParam; INSTRUMENT_SIZE] = [
    p("Modulator Frequency", 0xF),
    p("Carrier Frequency", 0xF),
    p("Modulator Output", 0x3F),
    p("Carrier Output", 0x3F),
    p("Modulator Attack", 0xF),
    p("Carrier Attack", 0xF),
    p("Modulator Decay", 0xF),
    p("Carrier Decay", 0xF),
    p("Modulator Sustain", 0xF),
    p("Carrier Sustain", 0xF),
    p("Modulator Release", 0xF),
    p("Carrier Release", 0xF),
    p("Modulator Waveform", 0x3),
    p("Carrier Waveform", 0x3),
    p("Modulator EG Typ", 0x1),
    p("Carrier EG Typ", 0x1),
    p("Modulator Vibrato", 0x1),
    p("Carrier Vibrato", 0x1),
    p("Modulator Amp Mod", 0x1),
    p("Carrier Amp Mod", 0x1),
    p("Feedback", 0x7),
    p("Modulation Mode", 0x1),
    p("Modulator Scaling", 0x3),
    p("Carrier Scaling", 0x3),
];

/// Register field widths. Waveform is 3 bits wide on OPL3 even though
/// editors only offer the four OPL2 shapes.
const FIELD_MASKS: [u8; INSTRUMENT_SIZE] = [
    0x0F, 0x0F, 0x3F, 0x3F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x07, 0x07, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x07, 0x01, 0x03, 0x03,
];

/// 24-byte FM instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instrument {
    data: [u8; INSTRUMENT_SIZE],
}

impl Instrument {
    /// Wrap a raw block
    pub const fn from_bytes(data: [u8; INSTRUMENT_SIZE]) -> Self {
        Instrument { data }
    }

    /// Build from a slice, `None` unless it is exactly 24 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let data: [u8; INSTRUMENT_SIZE] = bytes.try_into().ok()?;
        Some(Instrument { data })
    }

    /// Raw block
    pub fn as_bytes(&self) -> &[u8; INSTRUMENT_SIZE] {
        &self.data
    }

    /// Consume into the raw block
    pub fn into_bytes(self) -> [u8; INSTRUMENT_SIZE] {
        self.data
    }

    /// Instrument whose operators are fully attenuated
    pub fn silent() -> Self {
        let mut data = [0u8; INSTRUMENT_SIZE];
        data[param::MOD_OUTPUT] = 63;
        data[param::CAR_OUTPUT] = 63;
        Instrument { data }
    }

    /// Parameter value, `None` for an index past 23
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    /// Set a parameter, clamped to its editor maximum. Returns false for a bad index.
    pub fn set(&mut self, index: usize, value: u8) -> bool {
        match INSTRUMENT_PARAMS.get(index) {
            Some(meta) => {
                self.data[index] = value.min(meta.max_value);
                true
            }
            None => false,
        }
    }

    /// Every parameter clamped to its editor maximum
    pub fn clamped(&self) -> Self {
        let mut data = self.data;
        for (value, meta) in data.iter_mut().zip(INSTRUMENT_PARAMS.iter()) {
            *value = (*value).min(meta.max_value);
        }
        Instrument { data }
    }

    #[inline]
    fn field(&self, index: usize) -> u8 {
        self.data[index] & FIELD_MASKS[index]
    }

    fn multiplier_byte(&self, multiplier: usize, eg_type: usize, vibrato: usize, am: usize) -> u8 {
        self.field(multiplier)
            | (self.field(eg_type) << 5)
            | (self.field(vibrato) << 6)
            | (self.field(am) << 7)
    }

    /// Register writes that program this instrument onto `channel`, in chip order
    ///
    /// Returns an empty list for a channel past 8. Global registers (0x01, 0xBD)
    /// are not included.
    pub fn register_writes(&self, channel: usize) -> Vec<(u16, u8)> {
        use param::*;

        let (Some(modulator), Some(carrier)) = (modulator_offset(channel), carrier_offset(channel))
        else {
            return Vec::new();
        };

        vec![
            (
                RegisterGroup::Multiplier.at(modulator),
                self.multiplier_byte(MOD_MULTIPLIER, MOD_EG_TYPE, MOD_VIBRATO, MOD_AM),
            ),
            (
                RegisterGroup::Multiplier.at(carrier),
                self.multiplier_byte(CAR_MULTIPLIER, CAR_EG_TYPE, CAR_VIBRATO, CAR_AM),
            ),
            (
                RegisterGroup::Level.at(modulator),
                self.field(MOD_OUTPUT) | (self.field(MOD_SCALING) << 6),
            ),
            (
                RegisterGroup::Level.at(carrier),
                self.field(CAR_OUTPUT) | (self.field(CAR_SCALING) << 6),
            ),
            (
                RegisterGroup::AttackDecay.at(modulator),
                self.field(MOD_DECAY) | (self.field(MOD_ATTACK) << 4),
            ),
            (
                RegisterGroup::AttackDecay.at(carrier),
                self.field(CAR_DECAY) | (self.field(CAR_ATTACK) << 4),
            ),
            (
                RegisterGroup::SustainRelease.at(modulator),
                self.field(MOD_RELEASE) | (self.field(MOD_SUSTAIN) << 4),
            ),
            (
                RegisterGroup::SustainRelease.at(carrier),
                self.field(CAR_RELEASE) | (self.field(CAR_SUSTAIN) << 4),
            ),
            (RegisterGroup::Waveform.at(modulator), self.field(MOD_WAVEFORM)),
            (RegisterGroup::Waveform.at(carrier), self.field(CAR_WAVEFORM)),
            (
                RegisterGroup::FeedbackConnection.at(channel as u8),
                self.field(CONNECTION) | (self.field(FEEDBACK) << 1),
            ),
        ]
    }
}

impl From<[u8; INSTRUMENT_SIZE]> for Instrument {
    fn from(data: [u8; INSTRUMENT_SIZE]) -> Self {
        Instrument::from_bytes(data)
    }
}

impl AsRef<[u8]> for Instrument {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Instrument {
        Instrument::from_bytes([
            0x01, 0x02, // multiplier
            0x10, 0x3F, // output
            0x0F, 0x0E, // attack
            0x03, 0x04, // decay
            0x07, 0x08, // sustain
            0x05, 0x06, // release
            0x01, 0x02, // waveform
            0x01, 0x00, // eg type
            0x00, 0x01, // vibrato
            0x01, 0x01, // am
            0x05, 0x01, // feedback / connection
            0x02, 0x03, // scaling
        ])
    }

    #[test]
    fn test_register_packing_channel_zero() {
        let writes = sample().register_writes(0);
        assert_eq!(
            writes,
            vec![
                (0x20, 0x01 | 0x20 | 0x80),
                (0x23, 0x02 | 0x40 | 0x80),
                (0x40, 0x10 | (0x02 << 6)),
                (0x43, 0x3F | (0x03 << 6)),
                (0x60, 0x03 | 0xF0),
                (0x63, 0x04 | 0xE0),
                (0x80, 0x05 | 0x70),
                (0x83, 0x06 | 0x80),
                (0xE0, 0x01),
                (0xE3, 0x02),
                (0xC0, 0x01 | (0x05 << 1)),
            ]
        );
    }

    #[test]
    fn test_register_packing_uses_operator_table() {
        let writes = sample().register_writes(8);
        assert_eq!(writes[0].0, 0x32);
        assert_eq!(writes[1].0, 0x35);
        assert_eq!(writes[10].0, 0xC8);
        assert!(sample().register_writes(9).is_empty());
    }

    #[test]
    fn test_out_of_range_fields_do_not_leak() {
        let mut data = [0u8; INSTRUMENT_SIZE];
        data[param::MOD_MULTIPLIER] = 0xFF;
        let writes = Instrument::from_bytes(data).register_writes(0);
        assert_eq!(writes[0], (0x20, 0x0F));
    }

    #[test]
    fn test_set_clamps_to_metadata() {
        let mut ins = Instrument::default();
        assert!(ins.set(param::FEEDBACK, 12));
        assert_eq!(ins.get(param::FEEDBACK), Some(7));
        assert!(!ins.set(24, 1));
        assert_eq!(ins.get(24), None);
    }

    #[test]
    fn test_silent_instrument() {
        let ins = Instrument::silent();
        assert_eq!(ins.get(param::MOD_OUTPUT), Some(63));
        assert_eq!(ins.get(param::CAR_OUTPUT), Some(63));
        assert_eq!(ins.as_bytes().iter().filter(|b| **b != 0).count(), 2);
    }

    #[test]
    fn test_from_slice_requires_exact_length() {
        assert!(Instrument::from_slice(&[0u8; 23]).is_none());
        assert!(Instrument::from_slice(&[0u8; 24]).is_some());
    }
}
