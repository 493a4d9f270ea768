//! FMS song and FMI instrument file formats
//!
//! Song layout (little-endian):
//!
//! | field | size |
//! |---|---|
//! | 9 × channel name buffer + instrument block | 9 × (256 + 24) |
//! | song delay | 1 |
//! | row count | 2 |
//! | notes, row-major, 9 per row | row count × 9 × 2 |
//!
//! An instrument file is a bare 24-byte block.

use crate::opl::instrument::{Instrument, INSTRUMENT_SIZE};
use crate::opl::registers::CHANNEL_COUNT;
use crate::opl::{MAX_SONG_LENGTH, NAME_BUFFER_SIZE};
use crate::song::{Row, SongData};
use crate::{OplError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

/// Byte length of the channel header block
pub const HEADER_SIZE: usize = CHANNEL_COUNT * (NAME_BUFFER_SIZE + INSTRUMENT_SIZE);

/// Byte length of a song file with `rows` rows
pub fn song_file_size(rows: usize) -> usize {
    HEADER_SIZE + 1 + 2 + rows * CHANNEL_COUNT * 2
}

fn read_field<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: impl FnOnce() -> String,
) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            OplError::ParseError(format!("unexpected end of file reading {}", what()))
        }
        _ => OplError::Io(e),
    })
}

/// Decode a song from `reader`
///
/// Fails on any short read and on a row count above 1000; in that case no
/// row data is read.
pub fn parse_song<R: Read>(reader: &mut R) -> Result<SongData> {
    let mut song = SongData::new();

    for channel in 0..CHANNEL_COUNT {
        let mut name = [0u8; NAME_BUFFER_SIZE];
        read_field(reader, &mut name, || format!("name of channel {}", channel + 1))?;
        song.set_name_buffer(channel, name);

        let mut block = [0u8; INSTRUMENT_SIZE];
        read_field(reader, &mut block, || format!("instrument of channel {}", channel + 1))?;
        song.set_instrument(channel, Instrument::from_bytes(block));
    }

    let mut delay = [0u8; 1];
    read_field(reader, &mut delay, || "song delay".to_string())?;
    let mut length = [0u8; 2];
    read_field(reader, &mut length, || "song length".to_string())?;
    let delay = delay[0];
    let length = u16::from_le_bytes(length);

    log::info!("song header loaded: delay {}, length {}", delay, length);

    if length as usize > MAX_SONG_LENGTH {
        return Err(OplError::SongTooLong(length));
    }

    let mut rows: Vec<Row> = Vec::with_capacity(length as usize);
    let mut raw = [0u8; CHANNEL_COUNT * 2];
    for row in 0..length as usize {
        read_field(reader, &mut raw, || format!("notes of row {}", row))?;
        let mut notes = [0i16; CHANNEL_COUNT];
        for (note, bytes) in notes.iter_mut().zip(raw.chunks_exact(2)) {
            *note = i16::from_le_bytes([bytes[0], bytes[1]]);
        }
        rows.push(notes);
    }

    song.song_delay = delay;
    song.set_song_length(length);
    song.set_rows(&rows);
    Ok(song)
}

/// Decode a song from a byte slice
pub fn song_from_bytes(data: &[u8]) -> Result<SongData> {
    let mut cursor = data;
    parse_song(&mut cursor)
}

/// Encode a song to `writer`
pub fn write_song<W: Write>(writer: &mut W, song: &SongData) -> Result<()> {
    for channel in 0..CHANNEL_COUNT {
        let name = song.name_buffer(channel).ok_or(OplError::InvalidChannel(channel))?;
        writer.write_all(name)?;
        let instrument = song.instrument(channel).ok_or(OplError::InvalidChannel(channel))?;
        writer.write_all(instrument.as_bytes())?;
    }

    writer.write_all(&[song.song_delay])?;
    writer.write_all(&song.song_length().to_le_bytes())?;

    for row in song.used_rows() {
        for note in row {
            writer.write_all(&note.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Encode a song into a new byte vector
pub fn song_to_bytes(song: &SongData) -> Vec<u8> {
    let mut out = Vec::with_capacity(song_file_size(song.song_length() as usize));
    // Writing into a Vec cannot fail
    let _ = write_song(&mut out, song);
    out
}

/// Read a song file
pub fn read_song<P: AsRef<Path>>(path: P) -> Result<SongData> {
    let file = File::open(path.as_ref())?;
    parse_song(&mut BufReader::new(file))
}

/// Write a song file
pub fn save_song<P: AsRef<Path>>(path: P, song: &SongData) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_song(&mut writer, song)?;
    writer.flush()?;
    Ok(())
}

/// Read a 24-byte instrument file
pub fn read_instrument<P: AsRef<Path>>(path: P) -> Result<Instrument> {
    let mut file = File::open(path.as_ref())?;
    let mut block = [0u8; INSTRUMENT_SIZE];
    read_field(&mut file, &mut block, || {
        format!("instrument file {}", path.as_ref().display())
    })?;
    Ok(Instrument::from_bytes(block))
}

/// Write a 24-byte instrument file
pub fn save_instrument<P: AsRef<Path>>(path: P, instrument: &Instrument) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    file.write_all(instrument.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Final path component of `path`, used as an instrument display name
pub fn display_name<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
