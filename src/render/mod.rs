//! Render Pipeline Domain
//!
//! Converts the chip's native 49 716 Hz stream to 44 100 Hz interleaved
//! stereo. Each output frame first advances the sequencer, then pulls as many
//! native samples as the fractional cursor requires, optionally low-passes
//! them, optionally blends the last two native samples, applies gain and
//! clamps to i16.

use crate::backend::{OplBackend, StereoFrame};
use crate::controller::Engine;
use crate::opl::{OPL_NATIVE_RATE, OUTPUT_SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Cutoff at or above which the low-pass filter is bypassed
const FILTER_BYPASS_HZ: f64 = 20_000.0;

/// Output coloration profile
///
/// Each profile fixes a low-pass cutoff, whether native samples are blended
/// and an output gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderProfile {
    /// No filter, no blending
    #[default]
    Raw,
    /// Blending only
    Blended,
    /// Sound Blaster Pro: 3.2 kHz, louder
    #[serde(rename = "SBPRO")]
    SbPro,
    /// Original Sound Blaster: 2.8 kHz, loudest
    SbOriginal,
    /// AdLib Gold: 16 kHz, slight boost
    AdlibGold,
    /// 12 kHz low-pass
    ModernLpf,
    /// 8 kHz, no blending, quieter
    CloneCard,
}

impl RenderProfile {
    /// All profiles in menu order
    pub const ALL: [RenderProfile; 7] = [
        RenderProfile::Raw,
        RenderProfile::Blended,
        RenderProfile::SbPro,
        RenderProfile::SbOriginal,
        RenderProfile::AdlibGold,
        RenderProfile::ModernLpf,
        RenderProfile::CloneCard,
    ];

    /// Low-pass cutoff in Hz
    pub fn cutoff_hz(self) -> f64 {
        match self {
            RenderProfile::Raw | RenderProfile::Blended => 20_000.0,
            RenderProfile::SbPro => 3_200.0,
            RenderProfile::SbOriginal => 2_800.0,
            RenderProfile::AdlibGold => 16_000.0,
            RenderProfile::ModernLpf => 12_000.0,
            RenderProfile::CloneCard => 8_000.0,
        }
    }

    /// Whether consecutive native samples are blended
    pub fn blending(self) -> bool {
        !matches!(self, RenderProfile::Raw | RenderProfile::CloneCard)
    }

    /// Output gain
    pub fn gain(self) -> f64 {
        match self {
            RenderProfile::SbPro => 1.2,
            RenderProfile::SbOriginal => 1.3,
            RenderProfile::AdlibGold => 1.05,
            RenderProfile::CloneCard => 0.9,
            _ => 1.0,
        }
    }

    /// One-pole filter coefficient; exactly 1.0 when the filter is bypassed
    pub fn alpha(self) -> f64 {
        let cutoff = self.cutoff_hz();
        if cutoff >= FILTER_BYPASS_HZ {
            return 1.0;
        }
        let dt = 1.0 / OUTPUT_SAMPLE_RATE as f64;
        let rc = 1.0 / (2.0 * PI * cutoff);
        dt / (rc + dt)
    }

    /// Upper-case profile name
    pub fn name(self) -> &'static str {
        match self {
            RenderProfile::Raw => "RAW",
            RenderProfile::Blended => "BLENDED",
            RenderProfile::SbPro => "SBPRO",
            RenderProfile::SbOriginal => "SB_ORIGINAL",
            RenderProfile::AdlibGold => "ADLIB_GOLD",
            RenderProfile::ModernLpf => "MODERN_LPF",
            RenderProfile::CloneCard => "CLONE_CARD",
        }
    }
}

impl fmt::Display for RenderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderProfile {
    type Err = crate::OplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        RenderProfile::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| crate::OplError::ConfigError(format!("unknown render profile '{}'", s)))
    }
}

/// Resampler and filter state
#[derive(Debug, Clone)]
pub struct RenderState {
    profile: RenderProfile,
    alpha: f64,
    blending: bool,
    gain: f64,
    step: f64,
    pos: f64,
    prev: StereoFrame,
    current: StereoFrame,
    lpf_left: f64,
    lpf_right: f64,
}

impl RenderState {
    /// State configured for `profile` with empty history
    pub fn new(profile: RenderProfile) -> Self {
        let mut state = RenderState {
            profile,
            alpha: 1.0,
            blending: false,
            gain: 1.0,
            step: OPL_NATIVE_RATE / OUTPUT_SAMPLE_RATE as f64,
            pos: 0.0,
            prev: StereoFrame::default(),
            current: StereoFrame::default(),
            lpf_left: 0.0,
            lpf_right: 0.0,
        };
        state.set_profile(profile);
        state
    }

    /// Switch profile; history and filter memory are kept
    pub fn set_profile(&mut self, profile: RenderProfile) {
        self.profile = profile;
        self.alpha = profile.alpha();
        self.blending = profile.blending();
        self.gain = profile.gain();
    }

    /// Active profile
    pub fn profile(&self) -> RenderProfile {
        self.profile
    }

    /// Filter coefficient of the active profile
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Cursor advance per native sample (native rate / output rate)
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Fractional resample cursor relative to the next buffer
    pub fn position(&self) -> f64 {
        self.pos
    }

    pub(crate) fn rewind_cursor(&mut self) {
        self.pos = 0.0;
    }

    /// Clock the chip once outside the resampler; the raw frame becomes the
    /// current sample and the cursor does not move
    pub(crate) fn clock_chip<B: OplBackend>(&mut self, chip: &mut B) {
        self.current = chip.generate();
    }

    pub(crate) fn reset_history(&mut self) {
        self.pos = 0.0;
        self.prev = StereoFrame::default();
        self.current = StereoFrame::default();
        self.lpf_left = 0.0;
        self.lpf_right = 0.0;
    }

    /// Pull native frames until the cursor passes output frame `index`
    fn pull_native<B: OplBackend>(&mut self, chip: &mut B, index: f64) {
        while self.pos <= index {
            self.prev = self.current;
            self.current = chip.generate();

            if self.alpha < 1.0 {
                self.lpf_left += self.alpha * (self.current.left as f64 - self.lpf_left);
                self.lpf_right += self.alpha * (self.current.right as f64 - self.lpf_right);
                self.current = StereoFrame::new(self.lpf_left as i16, self.lpf_right as i16);
            }
            self.pos += self.step;
        }
    }

    /// Output pair for frame `index` after [`pull_native`](Self::pull_native)
    fn output(&self, index: f64) -> (i16, i16) {
        if self.blending {
            let fraction = self.pos - index;
            let left = self.prev.left as f64 * fraction + self.current.left as f64 * (1.0 - fraction);
            let right =
                self.prev.right as f64 * fraction + self.current.right as f64 * (1.0 - fraction);
            (self.clamp(left), self.clamp(right))
        } else {
            (
                self.clamp(self.current.left as f64),
                self.clamp(self.current.right as f64),
            )
        }
    }

    #[inline]
    fn clamp(&self, sample: f64) -> i16 {
        (sample * self.gain).clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::new(RenderProfile::default())
    }
}

impl<B: OplBackend> Engine<B> {
    /// Render `out.len() / 2` interleaved stereo frames
    pub(crate) fn fill_buffer(&mut self, out: &mut [i16]) {
        let frames = out.len() / 2;

        for (i, frame) in out.chunks_exact_mut(2).enumerate() {
            self.advance_sequencer();

            let index = i as f64;
            self.render.pull_native(&mut self.chip, index);
            let (left, right) = self.render.output(index);
            frame[0] = left;
            frame[1] = right;
        }

        self.render.pos -= frames as f64;
    }
}
