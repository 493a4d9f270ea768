//! OPL Controller
//!
//! [`OplController`] owns the chip backend together with everything that must
//! change atomically with it: the shadow registers, the instrument cache, the
//! sequencer and the render pipeline. All of it sits behind one reentrant lock
//! so the audio thread (pulling buffers) and the control thread (editing,
//! previewing notes) never interleave register writes.
//!
//! # Example
//!
//! ```
//! use opl_fms::backend::RecordingChip;
//! use opl_fms::song::SongData;
//! use opl_fms::OplController;
//!
//! let controller = OplController::new(RecordingChip::new());
//!
//! let mut song = SongData::new();
//! song.set_note(0, 0, 1);
//! song.set_song_length(1);
//! let song = song.into_shared();
//!
//! controller.start_song(&song, false, 0, None);
//! let mut buffer = vec![0i16; 2 * 1024];
//! controller.fill_buffer(&mut buffer);
//! assert_eq!(controller.sequencer_snapshot().needle, 1);
//! ```

mod codec;
mod voice;

use crate::backend::OplBackend;
use crate::config::ControllerConfig;
use crate::fms;
use crate::opl::instrument::Instrument;
use crate::opl::presets;
use crate::opl::registers::{self, ShadowRegisters, CHANNEL_COUNT};
use crate::render::{RenderProfile, RenderState};
use crate::sequencer::{PlaybackState, SequencerSnapshot, SequencerState};
use crate::song::{truncate_name, SharedSong, SongData};
use crate::Result;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = [
    "Channel 1", "Channel 2", "Channel 3", "Channel 4", "Channel 5", "Channel 6", "Channel 7",
    "Channel 8", "Channel 9",
];

const CHANNEL_SHORT_NAMES: [&str; CHANNEL_COUNT] = [
    "CH#1", "CH#2", "CH#3", "CH#4", "CH#5", "CH#6", "CH#7", "CH#8", "CH#9",
];

const DRUM_CHANNEL_NAMES: [&str; 3] = ["Bass Drum", "Snare/HH", "Tom/Cym"];

/// Lock-free core shared by all controller operations
///
/// Methods on `Engine` never take the controller lock; the public
/// [`OplController`] methods lock once and delegate here.
pub(crate) struct Engine<B: OplBackend> {
    pub(crate) chip: B,
    pub(crate) shadow: ShadowRegisters,
    pub(crate) instruments: [Instrument; CHANNEL_COUNT],
    pub(crate) names: [String; CHANNEL_COUNT],
    pub(crate) melodic_mode: bool,
    pub(crate) sequencer: SequencerState,
    pub(crate) render: RenderState,
}

impl<B: OplBackend> Engine<B> {
    /// Wrap `chip` and bring it to the reset state
    pub(crate) fn new(chip: B) -> Self {
        let mut engine = Engine {
            chip,
            shadow: ShadowRegisters::new(),
            instruments: [Instrument::default(); CHANNEL_COUNT],
            names: Default::default(),
            melodic_mode: true,
            sequencer: SequencerState::default(),
            render: RenderState::default(),
        };
        engine.reset();
        engine
    }

    pub(crate) fn set_name_in_cache(&mut self, channel: usize, name: &str) -> bool {
        let Some(slot) = self.names.get_mut(channel) else {
            return false;
        };
        let name = fms::display_name(name);
        *slot = String::from_utf8_lossy(truncate_name(&name)).into_owned();
        true
    }

    pub(crate) fn reset_instrument(&mut self, channel: usize) {
        let patch = presets::reset_patch(channel, self.melodic_mode);
        self.set_instrument(channel, &patch);
    }

    pub(crate) fn load_instrument_preset(&mut self) {
        for (channel, (instrument, name)) in presets::default_bank(self.melodic_mode)
            .into_iter()
            .enumerate()
        {
            self.set_name_in_cache(channel, &name);
            self.set_instrument(channel, &instrument);
        }
    }

    /// Program every channel from `song` and take over its names
    pub(crate) fn apply_song_instruments(&mut self, song: &SongData) {
        for channel in 0..CHANNEL_COUNT {
            if let Some(instrument) = song.instrument(channel) {
                self.set_instrument(channel, &instrument);
            }
            let name = song.instrument_name(channel).unwrap_or_default();
            self.set_name_in_cache(channel, &name);
        }
    }
}

/// Thread-safe OPL playback controller
///
/// Every public method takes the controller lock for its whole duration. The
/// lock is reentrant, so [`locked`](Self::locked) can batch several calls into
/// one atomic step. The engine itself is not reentrant: a closure passed to
/// [`with_backend`](Self::with_backend) must not call back into the
/// controller.
///
/// Lock order is always controller first, then song. Do not hold a song write
/// guard while calling into the controller.
pub struct OplController<B: OplBackend> {
    engine: ReentrantMutex<RefCell<Engine<B>>>,
    output_attached: AtomicBool,
}

impl<B: OplBackend> OplController<B> {
    /// Create a controller around `backend` and reset it
    pub fn new(backend: B) -> Self {
        OplController {
            engine: ReentrantMutex::new(RefCell::new(Engine::new(backend))),
            output_attached: AtomicBool::new(true),
        }
    }

    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut Engine<B>) -> R) -> R {
        let guard = self.engine.lock();
        let mut engine = match guard.try_borrow_mut() {
            Ok(engine) => engine,
            Err(_) => panic!("OplController re-entered from inside with_backend"),
        };
        f(&mut engine)
    }

    /// Run `f` while holding the controller lock
    ///
    /// Other threads cannot touch the chip until `f` returns.
    pub fn locked<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.engine.lock();
        f(self)
    }

    /// Access the backend directly, e.g. to inspect a test double
    ///
    /// # Panics
    ///
    /// Panics if `f` calls any method of this controller. Read what you need
    /// before or after the call, or use [`locked`](Self::locked) to batch
    /// controller calls.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        self.with_engine(|engine| f(&mut engine.chip))
    }

    // ----- register & instrument codec -----

    /// Write a chip register (shadowed)
    pub fn write(&self, reg: u16, value: u8) {
        self.with_engine(|engine| engine.write(reg, value));
    }

    /// Last value written to `reg`
    pub fn read_shadow(&self, reg: u16) -> u8 {
        self.with_engine(|engine| engine.read_shadow(reg))
    }

    /// Cache and program an instrument; ignored for channels past 8
    pub fn set_instrument(&self, channel: usize, instrument: &Instrument) {
        self.with_engine(|engine| engine.set_instrument(channel, instrument));
    }

    /// Cached instrument of a channel
    pub fn instrument(&self, channel: usize) -> Option<Instrument> {
        self.with_engine(|engine| engine.instrument(channel))
    }

    /// Modulator operator offset of a channel
    pub fn modulator_offset(&self, channel: usize) -> Option<u8> {
        registers::modulator_offset(channel)
    }

    /// Carrier operator offset of a channel
    pub fn carrier_offset(&self, channel: usize) -> Option<u8> {
        registers::carrier_offset(channel)
    }

    /// Program the reset patch for a channel (drum patches on 6-8 in rhythm mode)
    pub fn reset_instrument(&self, channel: usize) {
        self.with_engine(|engine| engine.reset_instrument(channel));
    }

    /// Program the default 9-channel bank and name the channels after it
    pub fn load_instrument_preset(&self) {
        self.with_engine(|engine| engine.load_instrument_preset());
    }

    /// [`load_instrument_preset`](Self::load_instrument_preset), then copy the
    /// bank names into `song`
    pub fn load_instrument_preset_into(&self, song: &SharedSong) {
        self.with_engine(|engine| {
            engine.load_instrument_preset();
            let mut song = song.write();
            for (channel, name) in engine.names.iter().enumerate() {
                song.set_instrument_name(channel, name);
            }
        });
    }

    /// Reset chip, shadow registers, render history and sequencer
    pub fn reset(&self) {
        self.with_engine(|engine| engine.reset());
    }

    /// Key off every channel; `hard` also attenuates every operator
    pub fn silence_all(&self, hard: bool) {
        self.with_engine(|engine| engine.silence_all(hard));
    }

    // ----- voices -----

    /// Key on a chromatic semitone
    pub fn play_note(&self, channel: usize, semitone: usize) {
        self.with_engine(|engine| engine.play_note(channel, semitone));
    }

    /// Play a tracker note id (`1..=84`); other ids release the channel
    pub fn play_note_dos(&self, channel: usize, note: usize) {
        self.with_engine(|engine| engine.play_note_dos(channel, note));
    }

    /// Release a channel
    pub fn stop_note(&self, channel: usize) {
        self.with_engine(|engine| engine.stop_note(channel));
    }

    /// Switch melodic (`true`) or rhythm (`false`) mode
    pub fn set_melodic_mode(&self, melodic: bool) {
        self.with_engine(|engine| engine.set_melodic_mode(melodic));
    }

    /// Whether all nine channels are melodic
    pub fn melodic_mode(&self) -> bool {
        self.with_engine(|engine| engine.melodic_mode)
    }

    /// Display name of a channel for the current mode
    pub fn channel_name(&self, channel: usize) -> Option<&'static str> {
        let melodic = self.melodic_mode();
        channel_label(channel, melodic, &CHANNEL_NAMES)
    }

    /// Short display name of a channel for the current mode
    pub fn channel_short_name(&self, channel: usize) -> Option<&'static str> {
        let melodic = self.melodic_mode();
        channel_label(channel, melodic, &CHANNEL_SHORT_NAMES)
    }

    // ----- instrument names -----

    /// Cached instrument name of a channel
    pub fn instrument_name(&self, channel: usize) -> Option<String> {
        self.with_engine(|engine| engine.names.get(channel).cloned())
    }

    /// Set the cached instrument name; paths are reduced to their file name
    pub fn set_instrument_name_in_cache(&self, channel: usize, name: &str) -> bool {
        self.with_engine(|engine| engine.set_name_in_cache(channel, name))
    }

    /// Set a channel name in both the cache and `song`
    pub fn set_song_instrument_name(&self, song: &SharedSong, channel: usize, name: &str) -> bool {
        self.with_engine(|engine| {
            if !engine.set_name_in_cache(channel, name) {
                log::error!("cannot name invalid channel {}", channel);
                return false;
            }
            song.write().set_instrument_name(channel, name)
        })
    }

    // ----- sequencer -----

    /// Start playing `song` from `start_at`
    ///
    /// Playback ends (or wraps, with `loop_enabled`) at `stop_at` when it lies
    /// after `start_at`, else at the end of the song.
    pub fn start_song(
        &self,
        song: &SharedSong,
        loop_enabled: bool,
        start_at: usize,
        stop_at: Option<usize>,
    ) {
        self.with_engine(|engine| engine.start_song(song, loop_enabled, start_at, stop_at));
    }

    /// Start or stop the sequencer; stopping silences all channels
    pub fn set_playing(&self, playing: bool, hard: bool) {
        self.with_engine(|engine| engine.set_playing(playing, hard));
    }

    /// Flip between playing and stopped, keeping the position
    pub fn toggle_pause(&self) {
        self.with_engine(|engine| engine.toggle_pause());
    }

    /// Whether the sequencer is advancing
    pub fn is_playing(&self) -> bool {
        self.with_engine(|engine| engine.sequencer.is_playing())
    }

    /// Current playback state
    pub fn playback_state(&self) -> PlaybackState {
        self.with_engine(|engine| engine.sequencer.state)
    }

    /// Copy of the sequencer fields
    pub fn sequencer_snapshot(&self) -> SequencerSnapshot {
        self.with_engine(|engine| engine.sequencer.snapshot())
    }

    /// Console line for the last played row, `None` if nothing new was played
    pub fn take_step_line(&self, use_numbers: bool) -> Option<String> {
        self.with_engine(|engine| engine.sequencer.take_step_line(use_numbers))
    }

    // ----- render -----

    /// Select the output coloration profile
    pub fn set_render_profile(&self, profile: RenderProfile) {
        self.with_engine(|engine| engine.render.set_profile(profile));
    }

    /// Active output profile
    pub fn render_profile(&self) -> RenderProfile {
        self.with_engine(|engine| engine.render.profile())
    }

    /// Render interleaved stereo frames into `out`, advancing the sequencer
    pub fn fill_buffer(&self, out: &mut [i16]) {
        self.with_engine(|engine| engine.fill_buffer(out));
    }

    /// Whether the live audio device may pull from this controller
    pub fn output_attached(&self) -> bool {
        self.output_attached.load(Ordering::Acquire)
    }

    /// Attach or detach the live audio device
    pub fn set_output_attached(&self, attached: bool) {
        self.output_attached.store(attached, Ordering::Release);
    }

    /// Apply render profile, mode and loop settings
    pub fn apply_config(&self, config: &ControllerConfig) {
        self.with_engine(|engine| {
            engine.render.set_profile(config.render_profile);
            if engine.melodic_mode != config.melodic_mode {
                engine.set_melodic_mode(config.melodic_mode);
            }
            engine.sequencer.loop_enabled = config.loop_playback;
        });
    }

    // ----- persistence -----

    /// Load a song file into `song`
    ///
    /// The controller is reset once the file is open. On success `song` is
    /// replaced and all nine channels are reprogrammed from it; on failure
    /// `song` is left untouched and the controller stays reset.
    pub fn load_song<P: AsRef<Path>>(&self, path: P, song: &SharedSong) -> Result<()> {
        let path = path.as_ref();
        self.with_engine(|engine| -> Result<()> {
            let file = std::fs::File::open(path).map_err(|e| {
                log::error!("could not open song file {}: {}", path.display(), e);
                e
            })?;

            engine.reset();

            let loaded = fms::parse_song(&mut std::io::BufReader::new(file)).map_err(|e| {
                log::error!("failed to load song {}: {}", path.display(), e);
                e
            })?;

            engine.apply_song_instruments(&loaded);
            *song.write() = loaded;
            log::info!("song {} loaded", path.display());
            Ok(())
        })
    }

    /// Save `song`, first copying the live instrument cache into it
    pub fn save_song<P: AsRef<Path>>(&self, path: P, song: &SharedSong) -> Result<()> {
        let path = path.as_ref();
        self.with_engine(|engine| -> Result<()> {
            let mut song = song.write();
            for (channel, instrument) in engine.instruments.iter().enumerate() {
                song.set_instrument(channel, *instrument);
            }
            fms::save_song(path, &song).map_err(|e| {
                log::error!("failed to save song {}: {}", path.display(), e);
                e
            })
        })
    }

    /// Load a 24-byte instrument file onto `channel`
    pub fn load_instrument<P: AsRef<Path>>(&self, path: P, channel: usize) -> Result<()> {
        if channel >= CHANNEL_COUNT {
            return Err(crate::OplError::InvalidChannel(channel));
        }
        let path = path.as_ref();
        let instrument = fms::read_instrument(path).map_err(|e| {
            log::error!("failed to load instrument {}: {}", path.display(), e);
            e
        })?;
        self.with_engine(|engine| {
            engine.set_instrument(channel, &instrument);
            engine.set_name_in_cache(channel, &path.to_string_lossy());
        });
        Ok(())
    }

    /// Save the cached instrument of `channel` to a 24-byte file
    pub fn save_instrument<P: AsRef<Path>>(&self, path: P, channel: usize) -> Result<()> {
        let path = path.as_ref();
        self.with_engine(|engine| -> Result<()> {
            let instrument = engine
                .instrument(channel)
                .ok_or(crate::OplError::InvalidChannel(channel))?;
            fms::save_instrument(path, &instrument).map_err(|e| {
                log::error!("failed to save instrument {}: {}", path.display(), e);
                e
            })?;
            engine.set_name_in_cache(channel, &path.to_string_lossy());
            Ok(())
        })
    }
}

fn channel_label(
    channel: usize,
    melodic: bool,
    melodic_names: &[&'static str; CHANNEL_COUNT],
) -> Option<&'static str> {
    let name = melodic_names.get(channel).copied()?;
    if melodic || channel < voice::FIRST_RHYTHM_CHANNEL {
        return Some(name);
    }
    DRUM_CHANNEL_NAMES
        .get(channel - voice::FIRST_RHYTHM_CHANNEL)
        .copied()
}

impl<B: OplBackend + Default> Default for OplController<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}
