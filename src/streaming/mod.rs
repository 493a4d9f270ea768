//! Live Audio Output
//!
//! A rodio [`Source`](rodio::Source) that pulls interleaved stereo buffers
//! straight from an [`OplController`](crate::OplController), and the device
//! wrapper that plays it.

mod audio_device;

pub use audio_device::{AudioDevice, ControllerSource};

/// Output channel count of the render pipeline
pub const OUTPUT_CHANNELS: u16 = 2;
