//! WAV file export

use super::{render_song_pcm, ExportProgress};
use crate::backend::OplBackend;
use crate::controller::OplController;
use crate::opl::OUTPUT_SAMPLE_RATE;
use crate::song::SharedSong;
use crate::{OplError, Result};
use std::path::Path;

/// Render `song` and write it as 16-bit stereo WAV at 44 100 Hz
///
/// # Examples
///
/// ```no_run
/// use opl_fms::backend::NullChip;
/// use opl_fms::export::export_to_wav;
/// use opl_fms::song::SongData;
/// use opl_fms::OplController;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let controller = OplController::new(NullChip::new());
/// let song = SongData::new().into_shared();
/// controller.load_song("song.fms", &song)?;
///
/// export_to_wav(&controller, &song, "song.wav", None)?;
/// # Ok(())
/// # }
/// ```
pub fn export_to_wav<B: OplBackend, P: AsRef<Path>>(
    controller: &OplController<B>,
    song: &SharedSong,
    output_path: P,
    progress: Option<&ExportProgress>,
) -> Result<()> {
    let pcm = render_song_pcm(controller, song, progress);
    write_wav_file(output_path.as_ref(), &pcm).map_err(|e| {
        log::error!("export to {} failed: {}", output_path.as_ref().display(), e);
        e
    })?;
    log::info!(
        "exported {} frames to {}",
        pcm.len() / 2,
        output_path.as_ref().display()
    );
    Ok(())
}

/// Write interleaved stereo i16 samples to a WAV file
pub fn write_wav_file(path: &Path, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: OUTPUT_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| OplError::AudioFileError(format!("Failed to create WAV file: {}", e)))?;

    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| OplError::AudioFileError(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| OplError::AudioFileError(format!("Failed to finalize WAV file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingChip, StereoFrame};
    use crate::song::SongData;

    #[test]
    fn test_wav_header_and_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let controller = OplController::new(RecordingChip::constant(StereoFrame::new(7, -7)));
        let mut song = SongData::new();
        song.set_song_length(2);
        song.song_delay = 1;
        let song = song.into_shared();

        export_to_wav(&controller, &song, &path, None).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 2 * 490);
        let bytes = std::fs::metadata(&path).unwrap().len();
        assert_eq!(bytes, 44 + 2 * 490 * 4);
    }
}
