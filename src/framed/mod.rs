//! The LZ4 frame format.
//!
//! A frame is a small header followed by independently compressed blocks, an end mark and an
//! optional checksum over the whole content. Blocks that do not shrink are stored as they are.

mod compress;
mod decompress;
mod header;

/// The four magic bytes at the start of every LZ4 frame.
const MAGIC: u32 = 0x184D2204;
/// The frame format sets the high bit of every length field to indicate that the data was not compressed.
const INCOMPRESSIBLE: u32 = 1 << 31;

pub use compress::*;
pub use decompress::*;
pub use header::{BlockSize, Flags};

use std::hash::Hasher;
use twox_hash::XxHash32;

/// xxHash32 with seed 0, as used for header, block and content checksums.
fn checksum(data: &[u8]) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(data);
    hasher.finish() as u32
}

/// The header checksum is the second byte of the xxHash32 of the descriptor (magic excluded).
fn header_checksum(descriptor: &[u8]) -> u8 {
    (checksum(descriptor) >> 8) as u8
}
