#![allow(non_upper_case_globals)]

use bitflags::bitflags;
use fehler::{throw, throws};

use crate::error::FormatError;

bitflags! {
    pub struct Flags: u8 {
        const IndependentBlocks = 0b00100000;
        const BlockChecksums    = 0b00010000;
        const ContentSize       = 0b00001000;
        const ContentChecksum   = 0b00000100;
        const DictionaryId      = 0b00000001;
    }
}

/// The only frame version there is.
pub const VERSION: u8 = 1;

impl Flags {
    #[throws(FormatError)]
    pub fn parse(i: u8) -> Self {
        let version = i >> 6;
        if version != VERSION {
            throw!(FormatError::UnsupportedVersion(version));
        }
        if (i & 0b10) != 0 {
            throw!(FormatError::ReservedFlagBitsSet);
        }

        Flags::from_bits_truncate(i)
    }

    /// The FLG byte as it appears on the wire, version bits included.
    pub fn to_byte(&self) -> u8 {
        VERSION << 6 | self.bits()
    }

    pub fn independent_blocks(&self) -> bool { self.contains(Flags::IndependentBlocks) }
    pub fn block_checksums(&self)    -> bool { self.contains(Flags::BlockChecksums) }
    pub fn content_size(&self)       -> bool { self.contains(Flags::ContentSize) }
    pub fn content_checksum(&self)   -> bool { self.contains(Flags::ContentChecksum) }
    pub fn dictionary_id(&self)      -> bool { self.contains(Flags::DictionaryId) }
}

/// Maximum size of a block inside a frame.
///
/// The numeric ids (4 to 7) are what the LZ4 command line and most bindings call `blockSizeID`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockSize {
    Max64KB = 4,
    Max256KB = 5,
    Max1MB = 6,
    Max4MB = 7,
}

impl BlockSize {
    pub const ALL: [BlockSize; 4] = [BlockSize::Max64KB, BlockSize::Max256KB, BlockSize::Max1MB, BlockSize::Max4MB];

    #[throws(FormatError)]
    pub fn from_id(id: u8) -> Self {
        match id {
            4 => BlockSize::Max64KB,
            5 => BlockSize::Max256KB,
            6 => BlockSize::Max1MB,
            7 => BlockSize::Max4MB,
            _ => throw!(FormatError::InvalidBlockSize(id)),
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// 64KiB, 256KiB, 1MiB or 4MiB.
    pub fn bytes(self) -> usize {
        1 << (self.id() * 2 + 8)
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        BlockSize::Max4MB
    }
}

pub struct BlockDescriptor(pub u8); // ??? or what else could "BD" stand for ???
impl BlockDescriptor {
    pub fn new(block_size: BlockSize) -> Self {
        BlockDescriptor(block_size.id() << 4)
    }

    #[throws(FormatError)]
    pub fn parse(i: u8) -> Self {
        if (i & 0b10001111) != 0 {
            throw!(FormatError::ReservedBdBitsSet);
        }
        BlockDescriptor(i)
    }

    #[throws(FormatError)]
    pub fn block_size(&self) -> BlockSize {
        BlockSize::from_id((self.0 >> 4) & 0b111)?
    }
}
