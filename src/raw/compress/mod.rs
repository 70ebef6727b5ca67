//! The compression algorithms.
//!
//! We make use of hash tables to find duplicates. This gives a reasonable compression ratio with a
//! high performance. It has fixed memory usage, which contrary to other approachs, makes it less
//! memory hungry.
//!
//! The fast encoder looks at one candidate per position, the HC encoder walks hash chains and
//! looks ahead one byte before committing to a match. Both produce the same token format.

mod chain;
mod hc;
mod table;

pub use chain::{Candidates, HashChain};
pub use hc::*;
pub use table::*;

use fehler::throws;
use std::io::Write;
use std::mem;

use super::token::{write_last_literals, write_sequence, Duplicate};
use super::{LAST_LITERALS, MAX_DISTANCE, MFLIMIT, MINMATCH};

type Error = std::io::Error;

/// Count how many leading bytes `a` and `b` have in common.
pub(crate) fn count_matching_bytes(a: &[u8], b: &[u8]) -> usize {
    const REGSIZE: usize = mem::size_of::<usize>();
    fn read_usize(b: &[u8]) -> usize { // sadly byteorder doesn't have this
        let mut buf = [0u8; REGSIZE];
        buf.copy_from_slice(&b[..REGSIZE]);
        usize::from_le_bytes(buf)
    }

    let mut matching_bytes = 0;
    // match in chunks of usize so we process a full register at a time instead of single bytes
    for (a, b) in a.chunks_exact(REGSIZE).zip(b.chunks_exact(REGSIZE)) {
        let xor = read_usize(a) ^ read_usize(b);
        if xor == 0 {
            matching_bytes += REGSIZE;
        } else {
            // both words were read little endian, so the first differing byte is the lowest set one
            matching_bytes += (xor.trailing_zeros() / 8/*bits per byte*/) as usize;
            return matching_bytes;
        }
    }

    // we only return here if we ran out of data (i.e. all full words have matched)
    // but there may be a few more bytes to check!
    let trailing_matches = a.iter().zip(b).skip(matching_bytes).take_while(|&(a, b)| a == b).count();
    matching_bytes + trailing_matches
}

/// Single pass compression without lookahead.
///
/// Every scanned position is looked up in `table` once and recorded in its place. If the candidate
/// really is a duplicate within the window, the match is extended as far as possible and emitted;
/// scanning resumes right after it. Time is linear in the input length.
///
/// `table` must be fresh (or deliberately pre-seeded) because positions are relative to `input`.
#[throws]
pub fn compress_fast<W: Write, T: EncoderTable>(input: &[u8], table: &mut T, mut writer: W) {
    assert!(input.len() <= T::payload_size_limit());

    let mut cursor = 0;
    let mut literal_start = 0;
    // the closing literals are required by the format, our decoder does not need them
    // but the reference implementation strictly enforces this and we want to stay compatible
    let match_limit = input.len().saturating_sub(LAST_LITERALS);

    while cursor + MFLIMIT <= input.len() {
        let candidate = table.replace(input, cursor);

        // can never match on the very first byte, and the offset has to be addressable
        if cursor != 0 && cursor - candidate <= MAX_DISTANCE {
            let matching_bytes = count_matching_bytes(&input[cursor..match_limit], &input[candidate..]);

            // if it is shorter, this was just a hash collision :(
            if matching_bytes >= MINMATCH {
                let duplicate = Duplicate::new(cursor - candidate, matching_bytes);
                write_sequence(&mut writer, &input[literal_start..cursor], duplicate)?;
                cursor += matching_bytes;
                literal_start = cursor;

                // not sure why exactly cursor - 2, but that's what they do
                table.insert(input, cursor - 2);
                continue;
            }
        }

        cursor += 1;
    }

    write_last_literals(&mut writer, &input[literal_start..])?;
}

/// Compress one block with the encoder selected by `level`.
///
/// Level 0 is the fast encoder (on a 16-bit table for inputs up to 64KiB), anything above is the
/// HC encoder at that level.
#[throws]
pub fn compress_block<W: Write>(input: &[u8], level: u32, writer: W) {
    if level == 0 {
        if input.len() <= U16Table::payload_size_limit() {
            compress_fast(input, &mut U16Table::default(), writer)?;
        } else {
            compress_fast(input, &mut U32Table::default(), writer)?;
        }
    } else {
        compress_hc(input, level, writer)?;
    }
}
