//! Register writes, instrument programming and chip reset
//!
//! Every write to the chip goes through [`Engine::write`] so the shadow bank
//! always mirrors what the chip has seen.

use super::Engine;
use crate::backend::OplBackend;
use crate::opl::instrument::Instrument;
use crate::opl::registers::{
    carrier_offset, modulator_offset, RegisterGroup, RhythmFlags, CHANNEL_COUNT, MAX_ATTENUATION,
    REG_RHYTHM, REG_WAVEFORM_ENABLE, WAVEFORM_ENABLE,
};

impl<B: OplBackend> Engine<B> {
    /// Write a register through the shadow bank
    pub(crate) fn write(&mut self, reg: u16, value: u8) {
        self.shadow.write(reg, value);
        self.chip.write_address(reg);
        self.chip.write_data(value);
    }

    /// Last value written to `reg`
    pub(crate) fn read_shadow(&self, reg: u16) -> u8 {
        self.shadow.read(reg)
    }

    /// Cache `instrument` for `channel` and program it onto the chip
    pub(crate) fn set_instrument(&mut self, channel: usize, instrument: &Instrument) {
        if channel >= CHANNEL_COUNT {
            return;
        }
        self.instruments[channel] = *instrument;

        for (reg, value) in instrument.register_writes(channel) {
            self.write(reg, value);
        }

        self.write(REG_WAVEFORM_ENABLE, WAVEFORM_ENABLE);
        let rhythm = if self.melodic_mode {
            RhythmFlags::MELODIC_DEFAULT
        } else {
            RhythmFlags::RHYTHM_DEFAULT
        };
        self.write(REG_RHYTHM, rhythm.bits());
    }

    pub(crate) fn instrument(&self, channel: usize) -> Option<Instrument> {
        self.instruments.get(channel).copied()
    }

    /// Key off every channel; `hard` also attenuates every operator fully
    pub(crate) fn silence_all(&mut self, hard: bool) {
        for channel in 0..CHANNEL_COUNT {
            self.stop_note(channel);

            if hard {
                if let (Some(modulator), Some(carrier)) =
                    (modulator_offset(channel), carrier_offset(channel))
                {
                    self.write(RegisterGroup::Level.at(modulator), MAX_ATTENUATION);
                    self.write(RegisterGroup::Level.at(carrier), MAX_ATTENUATION);
                }
            }
        }
    }

    /// Return chip, shadow bank, render history and sequencer to a silent idle state
    pub(crate) fn reset(&mut self) {
        self.chip.reset();
        self.shadow.clear();

        let silent = Instrument::silent();
        for channel in 0..CHANNEL_COUNT {
            self.set_instrument(channel, &silent);
        }

        self.sequencer.rewind();
        self.silence_all(true);
        self.render.reset_history();
    }
}
