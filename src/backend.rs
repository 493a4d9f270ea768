//! Backend trait abstraction for OPL chip implementations
//!
//! The FM chip core (operators, envelopes, LFOs) lives outside this crate.
//! Everything the controller needs from it is captured by [`OplBackend`]:
//! a reset, an address/data register port and a native-rate sample generator.

/// One stereo sample pair as produced by the chip at its native rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StereoFrame {
    /// Left channel sample
    pub left: i16,
    /// Right channel sample
    pub right: i16,
}

impl StereoFrame {
    /// Create a frame from a left/right pair
    pub const fn new(left: i16, right: i16) -> Self {
        StereoFrame { left, right }
    }

    /// Frame with both channels set to the same value
    pub const fn mono(value: i16) -> Self {
        StereoFrame {
            left: value,
            right: value,
        }
    }
}

/// Common interface for OPL chip backends
///
/// Register addresses cover the OPL3 bank-extended space: `0x000..=0x0FF` is
/// bank 0, `0x100..=0x1FF` is bank 1.
///
/// # Example
///
/// ```
/// use opl_fms::backend::{OplBackend, RecordingChip};
///
/// fn key_on<B: OplBackend>(chip: &mut B) {
///     chip.write(0xA0, 0x81); // F-number low byte, channel 0
///     chip.write(0xB0, 0x21); // key-on | block 0 | F-number high bits
///     let _frame = chip.generate();
/// }
///
/// let mut chip = RecordingChip::new();
/// key_on(&mut chip);
/// assert_eq!(chip.writes(), &[(0xA0, 0x81), (0xB0, 0x21)]);
/// ```
pub trait OplBackend: Send {
    /// Reset the chip to its power-on state
    fn reset(&mut self);

    /// Latch a register address (0x000-0x1FF)
    fn write_address(&mut self, reg: u16);

    /// Write a value to the latched register
    fn write_data(&mut self, value: u8);

    /// Latch `reg` and write `value` to it
    fn write(&mut self, reg: u16, value: u8) {
        self.write_address(reg);
        self.write_data(value);
    }

    /// Advance the chip by one native-rate sample and return the output pair
    fn generate(&mut self) -> StereoFrame;
}

/// Backend that accepts every write and always outputs silence.
#[derive(Debug, Clone, Default)]
pub struct NullChip {
    latched: u16,
}

impl NullChip {
    /// Create a silent backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Last latched register address
    pub fn latched_address(&self) -> u16 {
        self.latched
    }
}

impl OplBackend for NullChip {
    fn reset(&mut self) {
        self.latched = 0;
    }

    fn write_address(&mut self, reg: u16) {
        self.latched = reg;
    }

    fn write_data(&mut self, _value: u8) {}

    fn generate(&mut self) -> StereoFrame {
        StereoFrame::default()
    }
}

/// Deterministic test double.
///
/// Records every completed register write in order and generates samples by
/// cycling through a caller-supplied pattern (silence when the pattern is
/// empty).
#[derive(Debug, Clone, Default)]
pub struct RecordingChip {
    latched: u16,
    writes: Vec<(u16, u8)>,
    pattern: Vec<StereoFrame>,
    cursor: usize,
    generated: u64,
    clocked_at: Option<usize>,
    resets: u32,
}

impl RecordingChip {
    /// Create a recorder that outputs silence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder that repeats `pattern` forever
    pub fn with_pattern(pattern: Vec<StereoFrame>) -> Self {
        RecordingChip {
            pattern,
            ..Self::default()
        }
    }

    /// Create a recorder that outputs a constant frame
    pub fn constant(frame: StereoFrame) -> Self {
        Self::with_pattern(vec![frame])
    }

    /// All writes recorded since creation or the last [`clear_writes`](Self::clear_writes)
    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes
    }

    /// Writes to a single register, in order
    pub fn writes_to(&self, reg: u16) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Forget recorded writes
    pub fn clear_writes(&mut self) {
        self.writes.clear();
        self.clocked_at = None;
    }

    /// Number of native samples generated so far
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// How many of the recorded writes preceded the most recent
    /// [`OplBackend::generate`], or `None` if nothing was generated since the
    /// last [`clear_writes`](Self::clear_writes)
    pub fn writes_before_last_clock(&self) -> Option<usize> {
        self.clocked_at
    }

    /// Number of times [`OplBackend::reset`] was called
    pub fn reset_count(&self) -> u32 {
        self.resets
    }
}

impl OplBackend for RecordingChip {
    fn reset(&mut self) {
        self.latched = 0;
        self.cursor = 0;
        self.resets += 1;
    }

    fn write_address(&mut self, reg: u16) {
        self.latched = reg;
    }

    fn write_data(&mut self, value: u8) {
        self.writes.push((self.latched, value));
    }

    fn generate(&mut self) -> StereoFrame {
        self.generated += 1;
        self.clocked_at = Some(self.writes.len());
        if self.pattern.is_empty() {
            return StereoFrame::default();
        }
        let frame = self.pattern[self.cursor];
        self.cursor = (self.cursor + 1) % self.pattern.len();
        frame
    }
}
