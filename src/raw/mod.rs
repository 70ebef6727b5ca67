//! The raw LZ4 block format.
//!
//! Using this directly saves you the overhead of framing (~11 bytes) but you lose several features,
//! most notably the fallback mechanism for incompressible data: if the compressed version of a block
//! would be larger, the frame encodes the uncompressed version instead. The break-even point where framing
//! is always smaller is around 2.5KB for totally incompressible data.

mod compress;
mod decompress;
mod token;

pub use compress::*;
pub use decompress::*;

/// Shortest match the format can express. Match lengths are stored minus this value.
pub const MINMATCH: usize = 4;
/// No match may start within this many bytes of the end of a block.
pub const MFLIMIT: usize = 12;
/// The last bytes of a block are always encoded as literals.
pub const LAST_LITERALS: usize = 5;
/// The lookback window is exactly 64KiB.
pub const WINDOW_SIZE: usize = 64 * 1024;
/// Offsets are stored as u16, so the farthest addressable byte is one short of the window.
pub const MAX_DISTANCE: usize = WINDOW_SIZE - 1;

/// Worst case size of the token stream produced for `input_len` bytes of input.
///
/// Incompressible data ends up as a single literal run, costing one descriptor plus one
/// extension byte per 255 literals.
pub fn compress_bound(input_len: usize) -> usize {
    input_len + input_len / 255 + 16
}
