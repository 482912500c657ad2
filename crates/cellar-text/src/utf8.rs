// SPDX-License-Identifier: MIT
//
// UTF-8 to cells and back.
//
// Decoding never fails. Each well-formed sequence becomes one cell; each
// maximal malformed subpart becomes one U+FFFD cell, the same substitution
// `String::from_utf8_lossy` performs. Encoding is the plain inverse, so
// `encode(decode(bytes)) == bytes` for valid input and equals the lossy
// string for invalid input.

use crate::cell::Cell;

/// U+FFFD, substituted for malformed input.
pub const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Decode a byte run into codepoints, substituting U+FFFD for malformed parts.
pub fn chars(bytes: &[u8]) -> impl Iterator<Item = char> + '_ {
    bytes.utf8_chunks().flat_map(|chunk| {
        let bad = (!chunk.invalid().is_empty()).then_some(REPLACEMENT);
        chunk.valid().chars().chain(bad)
    })
}

/// Decode a byte run into cells with default metadata.
#[must_use]
pub fn decode(bytes: &[u8]) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(bytes.len());
    cells.extend(chars(bytes).map(Cell::new));
    cells
}

/// Number of cells `decode` would produce, without allocating.
#[must_use]
pub fn count(bytes: &[u8]) -> usize {
    chars(bytes).count()
}

/// Append the UTF-8 encoding of `cells` to `out`.
pub fn encode_into(cells: &[Cell], out: &mut Vec<u8>) {
    let mut buf = [0u8; 4];
    for cell in cells {
        out.extend_from_slice(cell.ch.encode_utf8(&mut buf).as_bytes());
    }
}

/// UTF-8 encoding of `cells`.
#[must_use]
pub fn encode(cells: &[Cell]) -> Vec<u8> {
    let mut out = Vec::with_capacity(cells.len());
    encode_into(cells, &mut out);
    out
}

/// The cells' codepoints as a `String`.
#[must_use]
pub fn to_string(cells: &[Cell]) -> String {
    cells.iter().map(|c| c.ch).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chars_of(bytes: &[u8]) -> Vec<char> {
        decode(bytes).iter().map(|c| c.ch).collect()
    }

    #[test]
    fn ascii_is_one_cell_per_byte() {
        assert_eq!(chars_of(b"abc"), vec!['a', 'b', 'c']);
    }

    #[test]
    fn multibyte_is_one_cell_per_sequence() {
        assert_eq!(chars_of("é中😀".as_bytes()), vec!['é', '中', '😀']);
    }

    #[test]
    fn decomposed_accent_is_two_cells() {
        assert_eq!(chars_of("e\u{301}".as_bytes()), vec!['e', '\u{301}']);
    }

    #[test]
    fn lone_continuation_byte_is_replaced() {
        assert_eq!(chars_of(b"a\x80b"), vec!['a', REPLACEMENT, 'b']);
    }

    #[test]
    fn truncated_sequence_is_one_replacement() {
        // First two bytes of a three-byte sequence.
        assert_eq!(chars_of(b"x\xE4\xB8"), vec!['x', REPLACEMENT]);
    }

    #[test]
    fn invalid_lead_bytes_each_replaced() {
        assert_eq!(chars_of(b"\xFF\xFE"), vec![REPLACEMENT, REPLACEMENT]);
    }

    #[test]
    fn matches_lossy_string() {
        let inputs: [&[u8]; 4] = [b"plain", b"\xC3(", b"ok\xF0\x9F\x98", "ünï".as_bytes()];
        for bytes in inputs {
            assert_eq!(
                to_string(&decode(bytes)),
                String::from_utf8_lossy(bytes).into_owned()
            );
        }
    }

    #[test]
    fn round_trip_valid_bytes() {
        let text = "fn main() { \"héllo\" } // 🇯🇵 👨‍👩‍👧";
        assert_eq!(encode(&decode(text.as_bytes())), text.as_bytes());
    }

    #[test]
    fn round_trip_malformed_bytes_is_lossy_text() {
        let bytes = b"a\xFFb";
        assert_eq!(encode(&decode(bytes)), "a\u{FFFD}b".as_bytes());
    }

    #[test]
    fn count_agrees_with_decode() {
        let bytes = b"h\xC3\xA9\x80llo";
        assert_eq!(count(bytes), decode(bytes).len());
        assert_eq!(count(b""), 0);
    }
}
