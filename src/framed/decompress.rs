use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use fehler::{throw, throws};
use log::{debug, trace, warn};
use std::cmp;
use std::hash::Hasher;
use std::io::{self, BufRead, ErrorKind, Read};
use twox_hash::XxHash32;

use super::header::{BlockDescriptor, BlockSize, Flags};
use super::{checksum, header_checksum, INCOMPRESSIBLE, MAGIC};
use crate::error::{ChecksumKind, Error, FormatError};
use crate::raw;

/// A stream that ends early is a malformed container, not an I/O failure.
fn truncated(e: io::Error) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        Error::Format(FormatError::Truncated)
    } else {
        Error::Io(e)
    }
}

/// Wrapper around `LZ4FrameReader` that implements `Read` and `BufRead`.
pub struct LZ4FrameIoReader<R: Read> {
    frame_reader: LZ4FrameReader<R>,
    bytes_taken: usize,
    buffer: Vec<u8>,
}
impl<R: Read> Read for LZ4FrameIoReader<R> {
    #[throws(io::Error)]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mybuf = self.fill_buf()?;
        let bytes_to_take = cmp::min(mybuf.len(), buf.len());
        buf[..bytes_to_take].copy_from_slice(&mybuf[..bytes_to_take]);
        self.consume(bytes_to_take);
        bytes_to_take
    }
}
impl<R: Read> BufRead for LZ4FrameIoReader<R> {
    #[throws(io::Error)]
    fn fill_buf(&mut self) -> &[u8] {
        // blocks may legitimately decode to nothing, only the end mark ends the stream
        while self.bytes_taken == self.buffer.len() {
            self.buffer.clear();
            self.bytes_taken = 0;
            if !self.frame_reader.decode_block(&mut self.buffer)? {
                break;
            }
        }
        &self.buffer[self.bytes_taken..]
    }

    fn consume(&mut self, amt: usize) {
        self.bytes_taken += amt;
        assert!(self.bytes_taken <= self.buffer.len(), "You consumed more bytes than I even gave you!");
    }
}

/// Read an LZ4-compressed frame.
///
/// This reader reads the blocks inside a frame one by one. Since blocks are self-delimited you may
/// stop at any block boundary. Once a call has failed the position in the stream is unknown and
/// the reader should be dropped.
pub struct LZ4FrameReader<R: Read> {
    reader: R,
    flags: Flags,
    block_size: BlockSize,
    read_buf: Vec<u8>,
    content_size: Option<u64>,
    dictionary_id: Option<u32>,
    content_hasher: Option<XxHash32>,
    bytes_out: u64,
    finished: bool,
}

impl<R: Read> LZ4FrameReader<R> {
    /// Read and validate the frame header.
    #[throws]
    pub fn new(mut reader: R) -> Self {
        let magic = reader.read_u32::<LE>().map_err(truncated)?;
        if magic != MAGIC {
            throw!(FormatError::WrongMagic(magic));
        }

        let flags_byte = reader.read_u8().map_err(truncated)?;
        let flags = Flags::parse(flags_byte)?;
        let bd_byte = reader.read_u8().map_err(truncated)?;
        let bd = BlockDescriptor::parse(bd_byte)?;

        // the descriptor bytes as they appeared on the wire, for the header checksum
        let mut descriptor = vec![flags_byte, bd_byte];

        let content_size = if flags.content_size() {
            let i = reader.read_u64::<LE>().map_err(truncated)?;
            descriptor.write_u64::<LE>(i)?;
            Some(i)
        } else {
            None
        };

        let dictionary_id = if flags.dictionary_id() {
            let i = reader.read_u32::<LE>().map_err(truncated)?;
            descriptor.write_u32::<LE>(i)?;
            Some(i)
        } else {
            None
        };

        let header_checksum_desired = reader.read_u8().map_err(truncated)?;
        if header_checksum_desired != header_checksum(&descriptor) {
            warn!("frame header checksum mismatch");
            throw!(Error::ChecksumMismatch(ChecksumKind::Header));
        }

        // matches may never reach into a previous block
        if !flags.independent_blocks() {
            throw!(FormatError::DependentBlocks);
        }
        let block_size = bd.block_size()?;

        debug!("opened frame: block size {:?}, flags {:?}, content size {:?}", block_size, flags, content_size);

        let content_hasher = if flags.content_checksum() {
            Some(XxHash32::with_seed(0))
        } else {
            None
        };

        LZ4FrameReader {
            reader,
            flags,
            block_size,
            content_size,
            dictionary_id,
            content_hasher,
            bytes_out: 0,
            finished: false,
            read_buf: Vec::new(),
        }
    }

    pub fn block_size(&self) -> BlockSize { self.block_size }
    pub fn frame_size(&self) -> Option<u64> { self.content_size }
    pub fn dictionary_id(&self) -> Option<u32> { self.dictionary_id }
    pub fn block_checksums(&self) -> bool { self.flags.block_checksums() }
    pub fn content_checksum(&self) -> bool { self.flags.content_checksum() }

    pub fn into_read(self) -> LZ4FrameIoReader<R> {
        LZ4FrameIoReader {
            buffer: Vec::with_capacity(self.block_size.bytes()),
            bytes_taken: 0,
            frame_reader: self,
        }
    }

    /// Decode the next block into `output`, which has to be empty.
    ///
    /// Returns `false` (leaving `output` empty) once the end mark has been read and the content
    /// checksum, if any, has been verified. On error `output` is left empty as well.
    pub fn decode_block(&mut self, output: &mut Vec<u8>) -> Result<bool, Error> {
        assert!(output.is_empty(), "You must pass an empty buffer to this interface.");

        let result = self.decode_block_internal(output);
        if result.is_err() {
            output.clear();
        }
        result
    }

    /// The next block as a fresh vector, or `None` at the end of the frame.
    #[throws]
    pub fn read_block(&mut self) -> Option<Vec<u8>> {
        let mut output = Vec::new();
        if self.decode_block(&mut output)? {
            Some(output)
        } else {
            None
        }
    }

    #[throws]
    fn decode_block_internal(&mut self, output: &mut Vec<u8>) -> bool {
        if self.finished {
            return false;
        }

        let reader = &mut self.reader;

        let block_length = reader.read_u32::<LE>().map_err(truncated)?;
        if block_length == 0 {
            if let Some(hasher) = self.content_hasher.take() {
                let checksum = reader.read_u32::<LE>().map_err(truncated)?;
                if hasher.finish() as u32 != checksum {
                    warn!("content checksum mismatch after {} bytes", self.bytes_out);
                    throw!(Error::ChecksumMismatch(ChecksumKind::Content));
                }
            }
            if let Some(declared) = self.content_size {
                if declared != self.bytes_out {
                    throw!(FormatError::ContentSizeMismatch { declared, actual: self.bytes_out });
                }
            }
            self.finished = true;
            debug!("finished frame: {} bytes decoded", self.bytes_out);
            return false;
        }

        let is_compressed = block_length & INCOMPRESSIBLE == 0;
        let block_length = (block_length & !INCOMPRESSIBLE) as usize;

        let block_maxsize = self.block_size.bytes();
        if block_length > block_maxsize {
            throw!(FormatError::BlockTooLarge { length: block_length, max: block_maxsize });
        }

        let buf = &mut self.read_buf;
        buf.resize(block_length, 0);
        reader.read_exact(buf.as_mut_slice()).map_err(truncated)?;

        if self.flags.block_checksums() {
            let desired = reader.read_u32::<LE>().map_err(truncated)?;
            if checksum(buf) != desired {
                warn!("block checksum mismatch at content offset {}", self.bytes_out);
                throw!(Error::ChecksumMismatch(ChecksumKind::Block));
            }
        }

        if is_compressed {
            raw::decompress_raw(buf, output, block_maxsize)?;
        } else {
            output.extend_from_slice(buf);
        }
        trace!("block of {} bytes decoded to {} (compressed: {})", block_length, output.len(), is_compressed);

        if let Some(hasher) = self.content_hasher.as_mut() {
            hasher.write(output);
        }
        self.bytes_out += output.len() as u64;
        true
    }
}

/// Convenience wrapper around `LZ4FrameReader` that reads everything into a vector and returns it.
#[throws]
pub fn decompress_frame<R: Read>(reader: R) -> Vec<u8> {
    let mut reader = LZ4FrameReader::new(reader)?;

    let mut plaintext = Vec::new();
    let mut buf = Vec::with_capacity(reader.block_size().bytes());
    while reader.decode_block(&mut buf)? {
        plaintext.extend_from_slice(&buf);
        buf.clear();
    }
    plaintext
}
