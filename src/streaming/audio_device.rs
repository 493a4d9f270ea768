//! Audio device integration using rodio
//!
//! The device pulls one buffer at a time from the controller, which holds the
//! controller lock for the whole fill. While the controller's output is
//! detached the source plays silence without touching the lock.

use super::OUTPUT_CHANNELS;
use crate::backend::OplBackend;
use crate::config::ControllerConfig;
use crate::controller::OplController;
use crate::opl::OUTPUT_SAMPLE_RATE;
use crate::{OplError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Audio source reading frames from a controller
pub struct ControllerSource<B: OplBackend> {
    controller: Arc<OplController<B>>,
    finished: Arc<AtomicBool>,
    buffer: Vec<i16>,
    buffer_pos: usize,
}

impl<B: OplBackend> ControllerSource<B> {
    /// Source pulling `buffer_frames` stereo frames per fill
    pub fn new(
        controller: Arc<OplController<B>>,
        buffer_frames: usize,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let len = buffer_frames.max(1) * OUTPUT_CHANNELS as usize;
        ControllerSource {
            controller,
            finished,
            buffer: vec![0; len],
            buffer_pos: len, // Start by pulling a fresh buffer
        }
    }

    fn refill(&mut self) {
        if self.controller.output_attached() {
            self.controller.fill_buffer(&mut self.buffer);
        } else {
            self.buffer.fill(0);
        }
        self.buffer_pos = 0;
    }
}

impl<B: OplBackend> Iterator for ControllerSource<B> {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }
        if self.buffer_pos >= self.buffer.len() {
            self.refill();
        }
        let sample = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Some(sample)
    }
}

impl<B: OplBackend> Source for ControllerSource<B> {
    fn current_frame_len(&self) -> Option<usize> {
        match self.buffer.len() - self.buffer_pos {
            0 => Some(self.buffer.len()),
            remaining => Some(remaining),
        }
    }

    fn channels(&self) -> u16 {
        OUTPUT_CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        OUTPUT_SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device and start pulling from `controller`
    pub fn new<B: OplBackend + 'static>(
        controller: Arc<OplController<B>>,
        buffer_frames: usize,
    ) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            OplError::AudioDeviceError(format!("Failed to create audio stream: {}", e))
        })?;

        let sink = Sink::try_new(&stream_handle).map_err(|e| {
            OplError::AudioDeviceError(format!("Failed to create audio sink: {}", e))
        })?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(ControllerSource::new(
            controller,
            buffer_frames,
            Arc::clone(&finished),
        ));

        log::debug!("audio device opened, {} frames per buffer", buffer_frames);

        Ok(AudioDevice {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Open the device with the buffer size and volume from `config`
    pub fn with_config<B: OplBackend + 'static>(
        controller: Arc<OplController<B>>,
        config: &ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let device = Self::new(controller, config.buffer_frames)?;
        device.set_volume(config.volume);
        Ok(device)
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Set output volume (1.0 = unity)
    pub fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume);
    }

    /// Current output volume
    pub fn volume(&self) -> f32 {
        self.sink.volume()
    }

    /// Whether the sink is playing a source that has not been finished
    pub fn is_running(&self) -> bool {
        sink_running(&self.sink, &self.finished)
    }

    /// Stop pulling from the controller; the stream ends after the current buffer
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.pause();
    }
}

fn sink_running(sink: &Sink, finished: &AtomicBool) -> bool {
    !sink.is_paused() && !sink.empty() && !finished.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingChip, StereoFrame};

    type Fixture = (
        ControllerSource<RecordingChip>,
        Arc<OplController<RecordingChip>>,
    );

    fn source(frames: usize) -> Fixture {
        let controller = Arc::new(OplController::new(RecordingChip::constant(
            StereoFrame::new(5, -5),
        )));
        let finished = Arc::new(AtomicBool::new(false));
        (
            ControllerSource::new(Arc::clone(&controller), frames, finished),
            controller,
        )
    }

    #[test]
    fn test_source_pulls_from_controller() {
        let (mut source, _controller) = source(4);
        let samples: Vec<i16> = source.by_ref().take(10).collect();
        assert_eq!(samples, vec![5, -5, 5, -5, 5, -5, 5, -5, 5, -5]);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 44_100);
    }

    #[test]
    fn test_detached_source_is_silent() {
        let (mut source, controller) = source(4);
        controller.set_output_attached(false);
        let before = controller.with_backend(|chip| chip.generated());
        assert!(source.by_ref().take(8).all(|s| s == 0));
        assert_eq!(controller.with_backend(|chip| chip.generated()), before);
    }

    #[test]
    fn test_finished_source_ends() {
        let controller = Arc::new(OplController::new(RecordingChip::new()));
        let finished = Arc::new(AtomicBool::new(true));
        let mut source = ControllerSource::new(controller, 16, finished);
        assert_eq!(source.next(), None);
    }

    #[test]
    fn test_running_follows_sink_state() {
        let (sink, _queue) = Sink::new_idle();
        let finished = Arc::new(AtomicBool::new(false));
        assert!(!sink_running(&sink, &finished));

        let controller = Arc::new(OplController::new(RecordingChip::new()));
        sink.append(ControllerSource::new(controller, 16, Arc::clone(&finished)));
        assert!(sink_running(&sink, &finished));

        sink.pause();
        assert!(!sink_running(&sink, &finished));
        sink.play();
        assert!(sink_running(&sink, &finished));

        finished.store(true, Ordering::Relaxed);
        assert!(!sink_running(&sink, &finished));
    }
}
