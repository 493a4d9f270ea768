//! Pitch tables and tracker note names
//!
//! Note ids follow the legacy DOS tracker: `0` is an empty cell, `-1` a
//! note-off and `1..=84` index [`DOS_SCALE`]. The scale rows within an octave
//! are not in chromatic order, so the display names use their own permutation.

/// F-numbers for the 12 semitones of one block, used by chromatic playback
pub const F_NUMBERS: [u16; 12] = [
    0x157, 0x16B, 0x181, 0x198, 0x1B0, 0x1CA, 0x1E5, 0x202, 0x220, 0x241, 0x263, 0x287,
];

/// Number of entries in [`DOS_SCALE`] (slot 0 is padding)
pub const DOS_SCALE_LEN: usize = 85;

/// Highest playable note id
pub const MAX_NOTE_ID: i16 = 84;

/// Note id that releases the channel
pub const NOTE_OFF: i16 = -1;

/// Note id of an empty cell
pub const NOTE_EMPTY: i16 = 0;

/// Legacy DOS pitch table: `[key-on/block/F-number high byte, F-number low byte]`
pub const DOS_SCALE: [[u8; 2]; DOS_SCALE_LEN] = [
    [0x00, 0x00],
    [0x21, 0x81], [0x21, 0xB0], [0x21, 0xCA], [0x22, 0x02], [0x22, 0x41], [0x22, 0x87],
    [0x21, 0x6B], [0x21, 0x98], [0x21, 0xE5], [0x22, 0x20], [0x22, 0x63], [0x22, 0xAE],
    [0x25, 0x81], [0x25, 0xB0], [0x25, 0xCA], [0x26, 0x02], [0x26, 0x41], [0x26, 0x87],
    [0x25, 0x6B], [0x25, 0x98], [0x25, 0xE5], [0x26, 0x20], [0x26, 0x63], [0x26, 0xAE],
    [0x29, 0x81], [0x29, 0xB0], [0x29, 0xCA], [0x2A, 0x02], [0x2A, 0x41], [0x2A, 0x87],
    [0x29, 0x6B], [0x29, 0x98], [0x29, 0xE5], [0x2A, 0x20], [0x2A, 0x63], [0x2A, 0xAE],
    [0x2D, 0x81], [0x2D, 0xB0], [0x2D, 0xCA], [0x2E, 0x02], [0x2E, 0x41], [0x2E, 0x87],
    [0x2D, 0x6B], [0x2D, 0x98], [0x2D, 0xE5], [0x2E, 0x20], [0x2E, 0x63], [0x2E, 0xAE],
    [0x31, 0x81], [0x31, 0xB0], [0x31, 0xCA], [0x32, 0x02], [0x32, 0x41], [0x32, 0x87],
    [0x31, 0x6B], [0x31, 0x98], [0x31, 0xE5], [0x32, 0x20], [0x32, 0x63], [0x32, 0xAE],
    [0x35, 0x81], [0x35, 0xB0], [0x35, 0xCA], [0x36, 0x02], [0x36, 0x41], [0x36, 0x87],
    [0x35, 0x6B], [0x35, 0x98], [0x35, 0xE5], [0x36, 0x20], [0x36, 0x63], [0x36, 0xAE],
    [0x39, 0x81], [0x39, 0xB0], [0x39, 0xCA], [0x3A, 0x02], [0x3A, 0x41], [0x3A, 0x87],
    [0x39, 0x6B], [0x39, 0x98], [0x39, 0xE5], [0x3A, 0x20], [0x3A, 0x63], [0x3A, 0xAE],
];

/// Octave 1 starts on D in the DOS scale; this maps a row position to its
/// chromatic index (0 = C).
const POSITION_TO_CHROMATIC: [usize; 12] = [2, 4, 5, 7, 9, 11, 1, 3, 6, 8, 10, 0];

/// Inverse of [`POSITION_TO_CHROMATIC`]
const CHROMATIC_TO_POSITION: [usize; 12] = [11, 6, 0, 7, 1, 2, 8, 3, 9, 4, 10, 5];

const NOTE_NAMES: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

/// Text shown for an empty cell
pub const EMPTY_NAME: &str = "...";
/// Text shown for a note-off cell
pub const NOTE_OFF_NAME: &str = "===";

/// Display name of a note id, e.g. `1` -> `"D-1"`, `12` -> `"C-2"`
pub fn note_name(id: i16) -> String {
    if id == NOTE_EMPTY || id > MAX_NOTE_ID {
        return EMPTY_NAME.to_string();
    }
    if id < 0 {
        return NOTE_OFF_NAME.to_string();
    }

    let octave = id / 12 + 1;
    let position = ((id - 1) % 12) as usize;
    format!("{}{}", NOTE_NAMES[POSITION_TO_CHROMATIC[position]], octave)
}

/// Inverse of [`note_name`]. Unknown text maps to `0`.
pub fn note_id(name: &str) -> i16 {
    if name.len() < 3 || name == EMPTY_NAME {
        return NOTE_EMPTY;
    }
    if name == NOTE_OFF_NAME {
        return NOTE_OFF;
    }

    let (Some(note_part), Some(octave_part)) = (name.get(..2), name.get(2..)) else {
        return NOTE_EMPTY;
    };
    let Some(octave) = parse_leading_int(octave_part) else {
        return NOTE_EMPTY;
    };
    let Some(chromatic) = NOTE_NAMES.iter().position(|n| *n == note_part) else {
        return NOTE_EMPTY;
    };

    // C is displayed one octave up, see note_name
    let octave = if chromatic == 0 { octave - 1 } else { octave };
    let id = (octave - 1) * 12 + CHROMATIC_TO_POSITION[chromatic] as i32 + 1;

    if (1..=MAX_NOTE_ID as i32).contains(&id) {
        id as i16
    } else {
        NOTE_EMPTY
    }
}

/// Integer prefix of `text` after leading whitespace, `None` if there are no digits
fn parse_leading_int(text: &str) -> Option<i32> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['-', '+']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse().ok()
}

/// Chromatic `(A0, B0)` register pair for a semitone index, key-on set
pub fn chromatic_pitch(semitone: usize) -> (u8, u8) {
    let octave = (semitone / 12) as u8;
    let fnum = F_NUMBERS[semitone % 12];
    let lo = (fnum & 0xFF) as u8;
    let hi = 0x20 | ((octave & 0x07) << 2) | (fnum >> 8) as u8;
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dos_scale_shape() {
        assert_eq!(DOS_SCALE[0], [0, 0]);
        assert_eq!(DOS_SCALE[1], [0x21, 0x81]);
        assert_eq!(DOS_SCALE[12], [0x22, 0xAE]);
        assert_eq!(DOS_SCALE[13], [0x25, 0x81]);
        assert_eq!(DOS_SCALE[84], [0x3A, 0xAE]);
        assert!(DOS_SCALE[1..].iter().all(|[hi, _]| hi & 0x20 != 0));
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(0), "...");
        assert_eq!(note_name(85), "...");
        assert_eq!(note_name(-1), "===");
        assert_eq!(note_name(1), "D-1");
        assert_eq!(note_name(7), "C#1");
        assert_eq!(note_name(11), "A#1");
        assert_eq!(note_name(12), "C-2");
        assert_eq!(note_name(13), "D-2");
        assert_eq!(note_name(84), "C-8");
    }

    #[test]
    fn test_note_name_round_trip() {
        for id in 1..=MAX_NOTE_ID {
            assert_eq!(note_id(&note_name(id)), id, "id {}", id);
        }
        assert_eq!(note_id("..."), 0);
        assert_eq!(note_id("==="), -1);
    }

    #[test]
    fn test_note_id_rejects_garbage() {
        assert_eq!(note_id(""), 0);
        assert_eq!(note_id("D-"), 0);
        assert_eq!(note_id("X-3"), 0);
        assert_eq!(note_id("D-x"), 0);
        assert_eq!(note_id("D-9"), 0);
        assert_eq!(note_id("D-0"), 0);
        assert_eq!(note_id("D-1 "), 1);
    }

    #[test]
    fn test_chromatic_pitch() {
        assert_eq!(chromatic_pitch(0), (0x57, 0x21));
        assert_eq!(chromatic_pitch(7), (0x02, 0x22));
        assert_eq!(chromatic_pitch(12 * 4 + 11), (0x87, 0x32));
    }
}
