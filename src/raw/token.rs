//! The token grammar shared by both encoders and the decoder.
//!
//! Every sequence starts with a descriptor byte. Its high nibble holds the literal run length,
//! its low nibble the match length minus [`MINMATCH`]. A nibble of 15 means the length continues
//! in extension bytes that each add up to 255, terminated by the first byte below 255
//! ("linear small-integer code", lsic). After the literal extension come the literals, then the
//! u16 LE offset and finally the match extension. The last sequence of a block has no match part.

use byteorder::{NativeEndian, WriteBytesExt, LE};
use fehler::{throw, throws};
use std::cmp;
use std::io::{self, Write};

use super::decompress::DecodeError;
use super::{MAX_DISTANCE, MINMATCH};

/// Nibble value announcing extension bytes.
pub(crate) const RUN_MASK: u8 = 0xF;

/// No single length may exceed this, no matter what the extension bytes say.
pub(crate) const MAX_RUN_LENGTH: usize = crate::MAX_INPUT_SIZE;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Duplicate {
    /// The number of bytes before our cursor, where the duplicate starts.
    pub offset: u16,

    /// The length beyond the four first bytes.
    ///
    /// Adding four to this number yields the actual length.
    pub extra_bytes: usize,
}

impl Duplicate {
    pub fn new(offset: usize, match_len: usize) -> Self {
        debug_assert!(offset != 0 && offset <= MAX_DISTANCE);
        debug_assert!(match_len >= MINMATCH);
        Duplicate { offset: offset as u16, extra_bytes: match_len - MINMATCH }
    }

    pub fn len(&self) -> usize {
        self.extra_bytes + MINMATCH
    }
}

fn write_lsic_head(token: &mut u8, shift: usize, value: usize) {
    let i = cmp::min(value, RUN_MASK as usize) as u8;
    *token |= i << shift;
}

#[throws(io::Error)]
fn write_lsic_tail<W: Write>(writer: &mut W, mut value: usize) {
    if value < RUN_MASK as usize {
        return;
    }

    value -= RUN_MASK as usize;

    while value >= 4 * 0xFF {
        writer.write_u32::<NativeEndian>(std::u32::MAX)?;
        value -= 4 * 0xFF;
    }
    while value >= 0xFF {
        writer.write_u8(0xFF)?;
        value -= 0xFF;
    }
    writer.write_u8(value as u8)?;
}

/// Emit one full sequence: literals followed by a back-reference.
#[throws(io::Error)]
pub(crate) fn write_sequence<W: Write>(writer: &mut W, literal: &[u8], duplicate: Duplicate) {
    let literal_len = literal.len();

    let mut token = 0;
    write_lsic_head(&mut token, 4, literal_len);
    write_lsic_head(&mut token, 0, duplicate.extra_bytes);

    writer.write_u8(token)?;
    write_lsic_tail(writer, literal_len)?;
    writer.write_all(literal)?;
    writer.write_u16::<LE>(duplicate.offset)?;
    write_lsic_tail(writer, duplicate.extra_bytes)?;
}

/// Emit the closing literal-only sequence of a block.
#[throws(io::Error)]
pub(crate) fn write_last_literals<W: Write>(writer: &mut W, literal: &[u8]) {
    let mut token = 0;
    write_lsic_head(&mut token, 4, literal.len());
    writer.write_u8(token)?;
    write_lsic_tail(writer, literal.len())?;
    writer.write_all(literal)?;
}

/// Decode a length from its descriptor nibble and, if the nibble is 15, the extension bytes at `*pos`.
///
/// `*pos` is advanced past the consumed extension bytes.
#[throws(DecodeError)]
pub(crate) fn read_lsic(initial: u8, input: &[u8], pos: &mut usize) -> usize {
    let mut value = initial as usize;
    if initial == RUN_MASK {
        loop {
            let more = match input.get(*pos) {
                Some(&b) => b,
                None => throw!(DecodeError::UnexpectedEnd),
            };
            *pos += 1;
            value += more as usize;
            if value > MAX_RUN_LENGTH {
                throw!(DecodeError::LengthOverflow);
            }
            if more != 0xFF {
                break;
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tail(value: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        write_lsic_tail(&mut buf, value).unwrap();
        buf
    }

    #[test]
    fn short_lengths_have_no_extension() {
        assert!(tail(0).is_empty());
        assert!(tail(14).is_empty());
    }

    #[test]
    fn extension_bytes() {
        assert_eq!(tail(15), [0]);
        assert_eq!(tail(15 + 254), [254]);
        assert_eq!(tail(15 + 255), [255, 0]);
        assert_eq!(tail(15 + 4 * 255 + 3), [255, 255, 255, 255, 3]);
    }

    #[test]
    fn extension_reads_back() {
        for &value in &[15, 16, 269, 270, 271, 1035, 100_000] {
            let encoded = tail(value);
            let mut pos = 0;
            assert_eq!(read_lsic(RUN_MASK, &encoded, &mut pos).unwrap(), value);
            assert_eq!(pos, encoded.len());
        }
    }

    #[test]
    fn nibble_below_mask_ignores_input() {
        let mut pos = 0;
        assert_eq!(read_lsic(7, &[0xFF, 0xFF], &mut pos).unwrap(), 7);
        assert_eq!(pos, 0);
    }

    #[test]
    fn run_length_is_capped_at_the_input_limit() {
        let encoded = tail(crate::MAX_INPUT_SIZE);
        let mut pos = 0;
        assert_eq!(read_lsic(RUN_MASK, &encoded, &mut pos).unwrap(), crate::MAX_INPUT_SIZE);

        let endless = vec![0xFF; crate::MAX_INPUT_SIZE / 255 + 1];
        let mut pos = 0;
        assert_eq!(read_lsic(RUN_MASK, &endless, &mut pos), Err(DecodeError::LengthOverflow));
    }

    #[test]
    fn truncated_extension() {
        let mut pos = 0;
        assert_eq!(read_lsic(RUN_MASK, &[0xFF, 0xFF], &mut pos), Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn sequence_layout() {
        let mut buf = Vec::new();
        write_sequence(&mut buf, b"abc", Duplicate::new(3, 6)).unwrap();
        assert_eq!(buf, [0x32, b'a', b'b', b'c', 3, 0]);

        buf.clear();
        write_last_literals(&mut buf, b"xy").unwrap();
        assert_eq!(buf, [0x20, b'x', b'y']);
    }

    #[test]
    fn long_match_uses_low_nibble_extension() {
        let mut buf = Vec::new();
        write_sequence(&mut buf, b"", Duplicate::new(1, MINMATCH + 20)).unwrap();
        assert_eq!(buf, [0x0F, 1, 0, 5]);
    }
}
