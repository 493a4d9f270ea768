//! Offline Rendering
//!
//! Renders a whole song through the same fill routine the live device uses.
//! The live output is detached for the duration so the two never interleave.
//!
//! # Example
//!
//! ```
//! use opl_fms::backend::NullChip;
//! use opl_fms::export::render_song_pcm;
//! use opl_fms::song::SongData;
//! use opl_fms::OplController;
//!
//! let controller = OplController::new(NullChip::new());
//! let mut song = SongData::new();
//! song.set_song_length(2);
//! song.song_delay = 15;
//! let song = song.into_shared();
//!
//! let pcm = render_song_pcm(&controller, &song, None);
//! assert_eq!(pcm.len(), 2 * 7350 * 2);
//! ```

#[cfg(feature = "export-wav")]
mod wav;

#[cfg(feature = "export-wav")]
pub use wav::{export_to_wav, write_wav_file};

use crate::backend::OplBackend;
use crate::controller::OplController;
use crate::song::SharedSong;
use crate::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Frames rendered per fill call during export
pub const EXPORT_CHUNK_FRAMES: usize = 4096;

/// Shared export progress in `0.0..=1.0`
///
/// Stored as `f32` bits with relaxed ordering; suitable for a progress bar,
/// not for synchronization.
#[derive(Debug, Clone, Default)]
pub struct ExportProgress(Arc<AtomicU32>);

impl ExportProgress {
    /// Progress starting at 0.0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current fraction
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Publish a fraction
    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Detaches the live output and reattaches it when dropped
struct DetachGuard<'a, B: OplBackend> {
    controller: &'a OplController<B>,
    was_attached: bool,
}

impl<'a, B: OplBackend> DetachGuard<'a, B> {
    fn new(controller: &'a OplController<B>) -> Self {
        let was_attached = controller.output_attached();
        controller.set_output_attached(false);
        DetachGuard {
            controller,
            was_attached,
        }
    }
}

impl<B: OplBackend> Drop for DetachGuard<'_, B> {
    fn drop(&mut self) {
        self.controller.set_output_attached(self.was_attached);
    }
}

/// Render `song` once from row 0 to its end as interleaved stereo i16
///
/// The length is `song_length × samples_per_tick` frames. Playback state is
/// left stopped at the end of the song.
pub fn render_song_pcm<B: OplBackend>(
    controller: &OplController<B>,
    song: &SharedSong,
    progress: Option<&ExportProgress>,
) -> Vec<i16> {
    let _detached = DetachGuard::new(controller);

    let total_frames = controller.with_engine(|engine| {
        engine.start_song(song, false, 0, None);
        engine.sequencer.sample_accumulator = 0;
        engine.render.rewind_cursor();
        let length = engine.sequencer.stop_at;
        length * engine.sequencer.samples_per_tick as usize
    });

    log::debug!("rendering {} frames", total_frames);

    let mut pcm = vec![0i16; total_frames * 2];
    let mut done = 0usize;
    for chunk in pcm.chunks_mut(EXPORT_CHUNK_FRAMES * 2) {
        controller.fill_buffer(chunk);
        done += chunk.len() / 2;
        if let Some(progress) = progress {
            progress.set(done as f32 / total_frames as f32);
        }
    }
    if total_frames == 0 {
        if let Some(progress) = progress {
            progress.set(1.0);
        }
    }
    pcm
}

/// Export running on a worker thread
pub struct ExportTask<T> {
    handle: JoinHandle<Result<T>>,
    progress: ExportProgress,
}

impl<T: Send + 'static> ExportTask<T> {
    /// Run `job` on a new thread, handing it the task's progress handle
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce(ExportProgress) -> Result<T> + Send + 'static,
    {
        let progress = ExportProgress::new();
        let worker_progress = progress.clone();
        let handle = std::thread::spawn(move || job(worker_progress));
        ExportTask { handle, progress }
    }

    /// Progress handle, readable from any thread
    pub fn progress(&self) -> &ExportProgress {
        &self.progress
    }

    /// Whether the worker has returned
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its result
    pub fn join(self) -> Result<T> {
        self.handle
            .join()
            .map_err(|_| crate::OplError::Other("export worker panicked".to_string()))?
    }
}

impl ExportTask<Vec<i16>> {
    /// Render `song` to PCM on a worker thread
    pub fn render_pcm<B: OplBackend + 'static>(
        controller: Arc<OplController<B>>,
        song: SharedSong,
    ) -> Self {
        Self::spawn(move |progress| Ok(render_song_pcm(&*controller, &song, Some(&progress))))
    }
}

#[cfg(feature = "export-wav")]
impl ExportTask<()> {
    /// Render `song` and write it as a WAV file on a worker thread
    pub fn wav<B: OplBackend + 'static, P: AsRef<std::path::Path> + Send + 'static>(
        controller: Arc<OplController<B>>,
        song: SharedSong,
        path: P,
    ) -> Self {
        Self::spawn(move |progress| export_to_wav(&*controller, &song, path, Some(&progress)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingChip, StereoFrame};
    use crate::song::SongData;

    fn short_song(rows: u16, delay: u8) -> SharedSong {
        let mut song = SongData::new();
        song.set_note(0, 0, 13);
        song.set_song_length(rows);
        song.song_delay = delay;
        song.into_shared()
    }

    #[test]
    fn test_export_length_matches_tempo() {
        let controller = OplController::new(RecordingChip::new());
        let song = short_song(3, 1);
        let progress = ExportProgress::new();
        let pcm = render_song_pcm(&controller, &song, Some(&progress));
        assert_eq!(pcm.len(), 3 * 490 * 2);
        assert_eq!(progress.get(), 1.0);
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_export_restores_output_attachment() {
        let controller = OplController::new(RecordingChip::new());
        let song = short_song(1, 1);
        render_song_pcm(&controller, &song, None);
        assert!(controller.output_attached());

        controller.set_output_attached(false);
        render_song_pcm(&controller, &song, None);
        assert!(!controller.output_attached());
    }

    #[test]
    fn test_empty_song_renders_nothing() {
        let controller = OplController::new(RecordingChip::new());
        let song = short_song(0, 15);
        let progress = ExportProgress::new();
        assert!(render_song_pcm(&controller, &song, Some(&progress)).is_empty());
        assert_eq!(progress.get(), 1.0);
    }

    #[test]
    fn test_worker_task_reports_completion() {
        let controller = Arc::new(OplController::new(RecordingChip::constant(
            StereoFrame::mono(100),
        )));
        let task = ExportTask::render_pcm(Arc::clone(&controller), short_song(2, 1));
        let pcm = task.join().unwrap();
        assert_eq!(pcm.len(), 2 * 490 * 2);
        assert!(pcm.iter().all(|&s| s == 100));
    }
}
