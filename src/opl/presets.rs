//! Built-in instrument patches
//!
//! Drum patches are tuned for the rhythm-mode channels 6-8. The melodic bank
//! cycles through six timbres so a fresh song has something audible on
//! every channel.

use super::instrument::Instrument;
use super::registers::CHANNEL_COUNT;

/// Plain sine patch used when a channel is reset
pub const DEFAULT: Instrument = Instrument::from_bytes([
    0x01, 0x01, 0x10, 0x00, 0x0F, 0x0F, 0x00, 0x00, 0x07, 0x07, 0x07, 0x07, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

/// Bass drum, carrier one harmonic up
pub const BASS_DRUM: Instrument = Instrument::from_bytes([
    0x01, 0x02, 0x10, 0x00, 0x0F, 0x0F, 0x08, 0x06, 0x00, 0x00, 0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

/// Hi-hat on the modulator slot, snare on the carrier slot
pub const HI_HAT: Instrument = Instrument::from_bytes([
    0x01, 0x01, 0x12, 0x00, 0x0F, 0x0F, 0x0D, 0x07, 0x00, 0x00, 0x0D, 0x07, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

/// Tom-tom
pub const TOM: Instrument = Instrument::from_bytes([
    0x03, 0x00, 0x10, 0x00, 0x0F, 0x00, 0x06, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

/// Half-sine lead with feedback
pub const LEAD_SYNTH: Instrument = Instrument::from_bytes([
    0x01, 0x01, 0x12, 0x00, 0x0F, 0x0F, 0x05, 0x02, 0x0F, 0x0F, 0x05, 0x05, 0x02, 0x00, 0x01, 0x01,
    0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00,
]);

/// Additive organ with vibrato
pub const ORGAN: Instrument = Instrument::from_bytes([
    0x01, 0x02, 0x08, 0x00, 0x0F, 0x0F, 0x00, 0x00, 0x0F, 0x0F, 0x02, 0x02, 0x00, 0x00, 0x01, 0x01,
    0x01, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
]);

/// Metallic cowbell
pub const COWBELL: Instrument = Instrument::from_bytes([
    0x01, 0x04, 0x15, 0x00, 0x0F, 0x0F, 0x06, 0x08, 0x00, 0x00, 0x08, 0x08, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00,
]);

/// Melodic bank entry for `index`; the bank repeats every six entries
///
/// 0 piano, 1 FM bass, 2 strings, 3 lead, 4 organ, 5 cowbell.
pub fn melodic_default(index: usize) -> Instrument {
    let mut data = DEFAULT.into_bytes();
    match index % 6 {
        0 => {
            data[4] = 0x0F;
            data[5] = 0x0F;
            data[6] = 0x04;
            data[7] = 0x04;
            data[8] = 0x02;
            data[9] = 0x02;
        }
        1 => {
            data[20] = 0x05;
            data[2] = 0x15;
        }
        2 => {
            data[4] = 0x03;
            data[5] = 0x02;
            data[10] = 0x05;
            data[11] = 0x05;
        }
        3 => return LEAD_SYNTH,
        4 => return ORGAN,
        _ => return COWBELL,
    }
    Instrument::from_bytes(data)
}

/// Patch a channel falls back to on reset
pub fn reset_patch(channel: usize, melodic_mode: bool) -> Instrument {
    if melodic_mode {
        return DEFAULT;
    }
    match channel {
        6 => BASS_DRUM,
        7 => HI_HAT,
        8 => TOM,
        _ => DEFAULT,
    }
}

/// Patch and display name of one channel in the default bank
pub fn bank_entry(channel: usize, melodic_mode: bool) -> (Instrument, String) {
    if melodic_mode {
        return (
            melodic_default(channel),
            format!("MelodicDefault {}", channel + 1),
        );
    }
    let instrument = match channel {
        6 => BASS_DRUM,
        7 => HI_HAT,
        8 => TOM,
        _ => melodic_default(channel),
    };
    (instrument, format!("RythmDefaultChannel {}", channel + 1))
}

/// The full 9-channel default bank
pub fn default_bank(melodic_mode: bool) -> Vec<(Instrument, String)> {
    (0..CHANNEL_COUNT)
        .map(|channel| bank_entry(channel, melodic_mode))
        .collect()
}
