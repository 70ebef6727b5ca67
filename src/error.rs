//! Error types shared by the one-shot API, the block codec and the frame container.

use std::fmt;
use std::io::{self, ErrorKind};
use thiserror::Error;

use crate::raw::DecodeError;

/// Everything that can go wrong while compressing or decompressing.
///
/// `Io` only ever wraps errors of the reader or writer you handed in,
/// everything else is a failure of the data itself.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unrecognized or malformed container: {0}")]
    Format(#[from] FormatError),
    #[error("the {0} checksum did not match")]
    ChecksumMismatch(ChecksumKind),
    #[error("the compressed token stream is corrupt: {0}")]
    CorruptStream(#[from] DecodeError),
    #[error("{size} bytes exceed the maximum representable length of {max} bytes")]
    SizeLimitExceeded { size: u64, max: usize },
    #[error("error reading or writing the stream you gave me")]
    Io(#[from] io::Error),
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Io(e) => e,
            e => io::Error::new(ErrorKind::Other, e),
        }
    }
}

/// Details of a malformed header or container.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("the input ended before the header or a block was complete")]
    Truncated,
    #[error("wrong magic number in frame header: {0:08x}")]
    WrongMagic(u32),
    #[error("frame version {0} not supported")]
    UnsupportedVersion(u8),
    #[error("reserved bits in flags set")]
    ReservedFlagBitsSet,
    #[error("reserved bits in block descriptor set")]
    ReservedBdBitsSet,
    #[error("block size id {0} is not one of 4, 5, 6 or 7")]
    InvalidBlockSize(u8),
    #[error("frames with linked (dependent) blocks are not supported")]
    DependentBlocks,
    #[error("a block claims {length} bytes but the frame allows at most {max}")]
    BlockTooLarge { length: usize, max: usize },
    #[error("the frame declares {declared} bytes of content but holds {actual}")]
    ContentSizeMismatch { declared: u64, actual: u64 },
}

/// Which checksum of a frame disagreed with the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Header,
    Block,
    Content,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChecksumKind::Header => "header",
            ChecksumKind::Block => "block",
            ChecksumKind::Content => "content",
        })
    }
}
