//! Single-slot hash tables used by the fast encoder to find duplicates.
//!
//! Each slot remembers the last position whose leading four bytes hashed there. Collisions simply
//! overwrite, so a lookup only yields a *candidate*: the caller has to compare the bytes.

use byteorder::{ByteOrder, LE};

/// Duplication dictionary size.
///
/// Every four bytes is assigned an entry. When this number is lower, fewer entries exists, and
/// thus collisions are more likely, hurting the compression ratio.
const DICTIONARY_SIZE: usize = 1 << HASHLOG;
const HASHLOG: usize = 12;

/// Knuth's multiplicative constant (2^32 / phi).
const PRIME: u32 = 2654435761;

pub trait EncoderTable: Default {
    /// Inputs longer than this must use a wider table.
    fn payload_size_limit() -> usize;

    /// Look up the candidate for the four bytes at `offset` and record `offset` in its place.
    ///
    /// `offset` must not be above `payload_size_limit` and at least four bytes have to follow it.
    fn replace(&mut self, input: &[u8], offset: usize) -> usize;

    /// The position last recorded for the hash of the four bytes at `offset`.
    ///
    /// A fresh table answers 0 for every slot.
    fn find(&self, input: &[u8], offset: usize) -> usize;

    fn insert(&mut self, input: &[u8], offset: usize) {
        self.replace(input, offset);
    }
}

fn hash_for_u32(input: &[u8]) -> usize {
    (LE::read_u32(input).wrapping_mul(PRIME) >> (32 - HASHLOG)) as usize
}

fn hash_for_u16(input: &[u8]) -> usize {
    // shift by one less than hashlog because we have twice as many slots
    (LE::read_u32(input).wrapping_mul(PRIME) >> (32 - HASHLOG - 1)) as usize
}

#[derive(Clone)]
pub struct U32Table {
    dict: [u32; DICTIONARY_SIZE],
}
impl Default for U32Table {
    fn default() -> Self {
        U32Table { dict: [0; DICTIONARY_SIZE] }
    }
}

impl EncoderTable for U32Table {
    fn replace(&mut self, input: &[u8], offset: usize) -> usize {
        debug_assert!(offset <= Self::payload_size_limit());
        let slot = &mut self.dict[hash_for_u32(&input[offset..])];
        let previous = *slot;
        *slot = offset as u32;
        previous as usize
    }
    fn find(&self, input: &[u8], offset: usize) -> usize {
        self.dict[hash_for_u32(&input[offset..])] as usize
    }
    fn payload_size_limit() -> usize { std::u32::MAX as usize }
}

/// Positions of inputs up to 64KiB fit into u16, which fits twice as many slots into the same memory.
#[derive(Clone)]
pub struct U16Table {
    dict: [u16; DICTIONARY_SIZE * 2],
}
impl Default for U16Table {
    fn default() -> Self {
        U16Table { dict: [0; DICTIONARY_SIZE * 2] }
    }
}

impl EncoderTable for U16Table {
    fn replace(&mut self, input: &[u8], offset: usize) -> usize {
        debug_assert!(offset <= std::u16::MAX as usize);
        let slot = &mut self.dict[hash_for_u16(&input[offset..])];
        let previous = *slot;
        *slot = offset as u16;
        previous as usize
    }
    fn find(&self, input: &[u8], offset: usize) -> usize {
        self.dict[hash_for_u16(&input[offset..])] as usize
    }
    // no match ever starts in the last MFLIMIT bytes, so the last inserted position still fits
    fn payload_size_limit() -> usize { std::u16::MAX as usize + 1 }
}
