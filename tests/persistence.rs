//! Integration tests for song and instrument files through the controller

use opl_fms::backend::RecordingChip;
use opl_fms::fms::{self, HEADER_SIZE};
use opl_fms::opl::presets;
use opl_fms::opl::registers::CHANNEL_COUNT;
use opl_fms::{Instrument, OplController, OplError, SongData};

fn sample_song() -> SongData {
    let mut song = SongData::new();
    song.song_delay = 4;
    for channel in 0..CHANNEL_COUNT {
        song.set_instrument(channel, presets::melodic_default(channel));
        song.set_instrument_name(channel, &format!("voice{}.fmi", channel));
    }
    for row in 0..16 {
        song.set_note(row, row % CHANNEL_COUNT, (row as i16 % 84) + 1);
    }
    song.set_note(16, 0, -1);
    song.set_song_length(17);
    song
}

#[test]
fn test_load_then_save_is_byte_exact() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("original.fms");
    let copy = dir.path().join("copy.fms");
    fms::save_song(&original, &sample_song()).unwrap();

    let controller = OplController::new(RecordingChip::new());
    let song = SongData::new().into_shared();
    controller.load_song(&original, &song).unwrap();
    controller.save_song(&copy, &song).unwrap();

    assert_eq!(std::fs::read(&original).unwrap(), std::fs::read(&copy).unwrap());
}

#[test]
fn test_load_programs_channels_and_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.fms");
    fms::save_song(&path, &sample_song()).unwrap();

    let controller = OplController::new(RecordingChip::new());
    let song = SongData::new().into_shared();
    controller.load_song(&path, &song).unwrap();

    assert_eq!(song.read().song_length(), 17);
    assert_eq!(song.read().song_delay, 4);
    for channel in 0..CHANNEL_COUNT {
        assert_eq!(
            controller.instrument(channel),
            Some(presets::melodic_default(channel))
        );
    }
    assert_eq!(controller.instrument_name(2).as_deref(), Some("voice2.fmi"));
}

#[test]
fn test_save_copies_live_instruments_into_song() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.fms");

    let controller = OplController::new(RecordingChip::new());
    let song = SongData::new().into_shared();
    controller.set_instrument(5, &presets::ORGAN);
    controller.save_song(&path, &song).unwrap();

    assert_eq!(song.read().instrument(5), Some(presets::ORGAN));
    let reread = fms::read_song(&path).unwrap();
    assert_eq!(reread.instrument(5), Some(presets::ORGAN));
}

#[test]
fn test_oversized_song_leaves_controller_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.fms");
    let mut bytes = fms::song_to_bytes(&sample_song());
    bytes[HEADER_SIZE + 1..HEADER_SIZE + 3].copy_from_slice(&1001u16.to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let controller = OplController::new(RecordingChip::new());
    controller.load_instrument_preset();
    let song = SongData::new();
    let mut existing = song.clone();
    existing.set_note(0, 0, 42);
    existing.set_song_length(1);
    let shared = existing.clone().into_shared();

    let resets_before = controller.with_backend(|chip| chip.reset_count());
    let result = controller.load_song(&path, &shared);

    assert!(matches!(result, Err(OplError::SongTooLong(1001))));
    assert_eq!(*shared.read(), existing);
    assert_eq!(
        controller.with_backend(|chip| chip.reset_count()),
        resets_before + 1
    );
    for channel in 0..CHANNEL_COUNT {
        assert_eq!(controller.instrument(channel), Some(Instrument::silent()));
    }
}

#[test]
fn test_missing_song_file_does_not_reset() {
    let controller = OplController::new(RecordingChip::new());
    controller.set_instrument(0, &presets::LEAD_SYNTH);
    let song = SongData::new().into_shared();

    let result = controller.load_song("/nonexistent/dir/none.fms", &song);
    assert!(matches!(result, Err(OplError::Io(_))));
    assert_eq!(controller.instrument(0), Some(presets::LEAD_SYNTH));
}

#[test]
fn test_instrument_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bell.fmi");

    let controller = OplController::new(RecordingChip::new());
    controller.set_instrument(1, &presets::COWBELL);
    controller.save_instrument(&path, 1).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 24);
    assert_eq!(controller.instrument_name(1).as_deref(), Some("bell.fmi"));

    controller.load_instrument(&path, 7).unwrap();
    assert_eq!(controller.instrument(7), Some(presets::COWBELL));
    assert_eq!(controller.instrument_name(7).as_deref(), Some("bell.fmi"));
}

#[test]
fn test_short_instrument_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.fmi");
    std::fs::write(&path, [1u8; 10]).unwrap();

    let controller = OplController::new(RecordingChip::new());
    assert!(matches!(
        controller.load_instrument(&path, 0),
        Err(OplError::ParseError(_))
    ));
    assert!(matches!(
        controller.load_instrument(&path, 9),
        Err(OplError::InvalidChannel(9))
    ));
}
