//! Melodic and rhythm voices
//!
//! Channels 0-8 play melodic FM voices. With rhythm mode on, channels 6-8
//! drive the five built-in drums through register 0xBD instead.

use super::Engine;
use crate::backend::OplBackend;
use crate::opl::registers::{
    RegisterGroup, RhythmFlags, CENTER_PAN_FM, CHANNEL_COUNT, KEY_ON, REG_OPL3_ENABLE, REG_RHYTHM,
};
use crate::opl::tables::{chromatic_pitch, DOS_SCALE, DOS_SCALE_LEN};

/// First channel that becomes a drum in rhythm mode
pub(crate) const FIRST_RHYTHM_CHANNEL: usize = 6;

impl<B: OplBackend> Engine<B> {
    fn is_drum_channel(&self, channel: usize) -> bool {
        !self.melodic_mode && channel >= FIRST_RHYTHM_CHANNEL
    }

    /// Key on a chromatic semitone (`octave * 12 + note`)
    pub(crate) fn play_note(&mut self, channel: usize, semitone: usize) {
        if channel >= CHANNEL_COUNT {
            return;
        }
        self.stop_note(channel);

        let (lo, hi) = chromatic_pitch(semitone);
        self.write(RegisterGroup::FrequencyLo.at(channel as u8), lo);
        self.write(RegisterGroup::KeyOnBlock.at(channel as u8), hi);
    }

    /// Play a DOS scale note id; ids outside `1..=84` release the channel
    pub(crate) fn play_note_dos(&mut self, channel: usize, note: usize) {
        if channel >= CHANNEL_COUNT {
            return;
        }
        if note == 0 || note >= DOS_SCALE_LEN {
            self.stop_note(channel);
            return;
        }
        if self.is_drum_channel(channel) {
            self.play_drum(channel, note);
            return;
        }

        self.stop_note(channel);
        let [hi, lo] = DOS_SCALE[note];
        self.write(RegisterGroup::FrequencyLo.at(channel as u8), lo);
        self.write(RegisterGroup::KeyOnBlock.at(channel as u8), hi);
    }

    /// Set the drum pitch, then strobe its 0xBD bit low and high
    pub(crate) fn play_drum(&mut self, channel: usize, note: usize) {
        let mask = RhythmFlags::trigger_for(channel, note);
        if mask.is_empty() || note >= DOS_SCALE_LEN {
            return;
        }

        let [hi, lo] = DOS_SCALE[note];
        self.write(RegisterGroup::FrequencyLo.at(channel as u8), lo);
        self.write(RegisterGroup::KeyOnBlock.at(channel as u8), hi & !KEY_ON);

        let current = self.read_shadow(REG_RHYTHM);
        self.write(REG_RHYTHM, current & !mask.bits());
        self.write(REG_RHYTHM, current | mask.bits());
    }

    /// Release a channel. Drum channels clear their trigger bits instead.
    ///
    /// The chip is clocked once after the key-off so the release is latched
    /// before any following key-on on the same channel.
    pub(crate) fn stop_note(&mut self, channel: usize) {
        if channel >= CHANNEL_COUNT {
            return;
        }

        if self.is_drum_channel(channel) {
            let mask = RhythmFlags::stop_mask(channel);
            let current = self.read_shadow(REG_RHYTHM);
            self.write(REG_RHYTHM, current & !mask.bits());
        } else {
            let reg = RegisterGroup::KeyOnBlock.at(channel as u8);
            let value = self.read_shadow(reg) & !KEY_ON;
            self.write(reg, value);
        }
        self.render.clock_chip(&mut self.chip);
    }

    /// Switch between nine melodic voices and six voices plus drums
    pub(crate) fn set_melodic_mode(&mut self, melodic: bool) {
        self.melodic_mode = melodic;
        if melodic {
            let current = self.read_shadow(REG_RHYTHM);
            self.write(REG_RHYTHM, current & !RhythmFlags::RHYTHM_MODE.bits());
        } else {
            self.write(REG_OPL3_ENABLE, 0x01);
            for channel in FIRST_RHYTHM_CHANNEL..CHANNEL_COUNT {
                self.write(
                    RegisterGroup::FeedbackConnection.at(channel as u8),
                    CENTER_PAN_FM,
                );
            }
            self.write(REG_RHYTHM, RhythmFlags::RHYTHM_DEFAULT.bits());
        }
    }
}
