//! Pure Rust LZ4: a block codec with a fast and a high compression (HC) encoder, and the
//! LZ4 frame container on top of it.
//!
//! The one-shot functions in this module are for buffers that fit in memory: [`compress`] prepends
//! the original size as a 4-byte little endian header to a single raw block, [`decompress`] reads
//! it back. For files and streams use [`framed`], which splits the data into independently
//! compressed blocks with optional checksums.
//!
//! ```
//! let data = b"an example, an example, an example";
//! let compressed = lz4_engine::compress(data).unwrap();
//! assert_eq!(lz4_engine::decompress(&compressed).unwrap(), &data[..]);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod framed;
pub mod raw;

pub use error::{ChecksumKind, Error, FormatError};
pub use framed::{decompress_frame, BlockSize, CompressionSettings, LZ4FrameReader, LZ4FrameWriter};
pub use raw::{DecodeError, DEFAULT_HC_LEVEL, MAX_LEVEL};

use byteorder::{ByteOrder, WriteBytesExt, LE};
use fehler::{throw, throws};
use log::trace;

/// The largest input the one-shot API accepts.
///
/// Lengths travel in 32-bit fields; this leaves headroom below 2^31 for the worst case expansion
/// of incompressible data.
pub const MAX_INPUT_SIZE: usize = 0x7E00_0000;

const HEADER_SIZE: usize = 4;

/// Compress `input` with the fast encoder.
#[throws]
pub fn compress(input: &[u8]) -> Vec<u8> {
    compress_with_level(input, 0)?
}

/// Compress `input` with the HC encoder at [`DEFAULT_HC_LEVEL`].
#[throws]
pub fn compress_hc(input: &[u8]) -> Vec<u8> {
    compress_with_level(input, DEFAULT_HC_LEVEL)?
}

/// Compress `input`. Level 0 is the fast encoder, anything above selects the HC encoder.
///
/// Fails with [`Error::SizeLimitExceeded`] before doing any work if `input` is longer than
/// [`MAX_INPUT_SIZE`].
#[throws]
pub fn compress_with_level(input: &[u8], level: u32) -> Vec<u8> {
    if input.len() > MAX_INPUT_SIZE {
        throw!(Error::SizeLimitExceeded { size: input.len() as u64, max: MAX_INPUT_SIZE });
    }

    let mut output = Vec::with_capacity(HEADER_SIZE + raw::compress_bound(input.len()));
    output.write_u32::<LE>(input.len() as u32)?;
    if !input.is_empty() {
        raw::compress_block(input, level, &mut output)?;
    }
    trace!("compressed {} bytes to {} at level {}", input.len(), output.len(), level);
    output
}

/// Decompress the output of [`compress`] and friends.
///
/// The output is allocated up front from the size header, unless the header claims more than the
/// token stream could ever expand to. The token stream has to produce exactly that many bytes.
#[throws]
pub fn decompress(input: &[u8]) -> Vec<u8> {
    if input.len() < HEADER_SIZE {
        throw!(FormatError::Truncated);
    }
    let size = LE::read_u32(input) as usize;
    if size > MAX_INPUT_SIZE {
        throw!(Error::SizeLimitExceeded { size: size as u64, max: MAX_INPUT_SIZE });
    }

    let max = raw::max_decompressed_size(input.len() - HEADER_SIZE);
    if size > max {
        throw!(DecodeError::UnreachableSize { declared: size, max });
    }

    let mut output = vec![0u8; size];
    if size > 0 {
        let written = raw::decompress_into(&input[HEADER_SIZE..], &mut output)?;
        if written != size {
            throw!(DecodeError::OutputTooShort { expected: size, actual: written });
        }
    }
    output
}
