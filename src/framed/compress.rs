use byteorder::{WriteBytesExt, LE};
use fehler::{throw, throws};
use log::{debug, trace};
use std::cmp;
use std::hash::Hasher;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::mem;
use twox_hash::XxHash32;

use super::header::{BlockDescriptor, BlockSize, Flags};
use super::{checksum, header_checksum, INCOMPRESSIBLE, MAGIC};
use crate::error::{Error, FormatError};
use crate::raw::compress_block;

/// A builder-style struct that configures compression settings.
/// This is how you compress LZ4 frames.
/// (An LZ4 file usually consists of a single frame.)
///
/// Create it using `Default::default()`.
#[derive(Clone, Debug)]
pub struct CompressionSettings {
    level: u32,
    block_checksums: bool,
    content_checksum: bool,
    block_size: BlockSize,
}
impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            level: 0,
            block_checksums: false,
            content_checksum: true,
            block_size: BlockSize::Max4MB,
        }
    }
}
impl CompressionSettings {
    /// Level 0 uses the fast encoder. Levels 1 and up use the HC encoder, where each level doubles
    /// the number of candidates examined per position (levels above 16 behave like 16).
    ///
    /// The default level is 0.
    pub fn level(&mut self, v: u32) -> &mut Self {
        self.level = v;
        self
    }

    /// Block checksums can help detect data corruption in storage and transit.
    /// They do not offer error correction though.
    ///
    /// In most cases, block checksums are not very helpful because you generally want a lower
    /// layer to deal with data corruption more comprehensively.
    ///
    /// Block checksums are disabled by default.
    pub fn block_checksums(&mut self, v: bool) -> &mut Self {
        self.block_checksums = v;
        self
    }

    /// The content checksum (also called frame checksum) is calculated over the contents of the entire frame.
    /// This makes them cheaper than block checksums as their size overhead is constant
    /// as well as marginally more useful, because they can help protect against incorrect decompression.
    ///
    /// Note that the content checksum can only be verified *after* the entire frame has been read
    /// (and returned!), which is the downside of content checksums.
    ///
    /// Frame checksums are enabled by default.
    pub fn content_checksum(&mut self, v: bool) -> &mut Self {
        self.content_checksum = v;
        self
    }

    /// Larger blocks compress better, smaller blocks need less memory on both ends.
    ///
    /// The default block size is 4 MiB.
    pub fn block_size(&mut self, v: BlockSize) -> &mut Self {
        self.block_size = v;
        self
    }

    /// Start a frame on `writer`. See [`LZ4FrameWriter`].
    #[throws]
    pub fn writer<W: Write>(&self, writer: W) -> LZ4FrameWriter<W> {
        LZ4FrameWriter::open(writer, self, None)?
    }

    /// Compress everything `reader` yields into a single frame on `writer`.
    #[throws]
    pub fn compress<R: Read, W: Write>(&self, reader: R, writer: W) -> W {
        self.compress_internal(reader, writer, None)?
    }

    /// Like `compress`, but records `content_size` in the header.
    ///
    /// The frame only gets finished if the reader yields exactly that many bytes.
    #[throws]
    pub fn compress_with_size_unchecked<R: Read, W: Write>(&self, reader: R, writer: W, content_size: u64) -> W {
        self.compress_internal(reader, writer, Some(content_size))?
    }

    /// Like `compress`, but records the remaining length of `reader` in the header.
    #[throws]
    pub fn compress_with_size<R: Read + Seek, W: Write>(&self, mut reader: R, writer: W) -> W {
        // we ignore all bytes before the cursor, like the reader itself would
        let start = reader.seek(SeekFrom::Current(0))?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;

        self.compress_internal(reader, writer, Some(end - start))?
    }

    #[throws]
    fn compress_internal<R: Read, W: Write>(&self, mut reader: R, writer: W, content_size: Option<u64>) -> W {
        let mut frame = LZ4FrameWriter::open(writer, self, content_size)?;
        let mut in_buffer = Vec::with_capacity(self.block_size.bytes());
        loop {
            // We basically want read_exact semantics, except at the end.
            // Sadly read_exact specifies the buffer contents to be undefined
            // on error, so we have to use this construction instead.
            in_buffer.clear();
            reader.by_ref().take(self.block_size.bytes() as u64).read_to_end(&mut in_buffer)?;
            if in_buffer.is_empty() {
                break;
            }
            frame.write_block(&in_buffer)?;
        }
        frame.finish()?
    }
}

/// Write an LZ4 frame block by block.
///
/// Opening the writer emits the frame header. Bytes passed to [`write_block`](Self::write_block) are
/// collected until a full block is available, which is then compressed and written. Nothing is
/// complete until [`finish`](Self::finish) has written the last partial block, the end mark and the
/// content checksum; dropping the writer leaves a truncated frame behind.
pub struct LZ4FrameWriter<W: Write> {
    writer: W,
    flags: Flags,
    level: u32,
    block_maxsize: usize,
    in_buffer: Vec<u8>,
    out_buffer: Vec<u8>,
    content_hasher: Option<XxHash32>,
    content_size: Option<u64>,
    bytes_in: u64,
    bytes_out: u64,
}

impl<W: Write> LZ4FrameWriter<W> {
    #[throws]
    fn open(mut writer: W, settings: &CompressionSettings, content_size: Option<u64>) -> Self {
        let mut flags = Flags::IndependentBlocks;
        if settings.block_checksums {
            flags |= Flags::BlockChecksums;
        }
        if settings.content_checksum {
            flags |= Flags::ContentChecksum;
        }
        if content_size.is_some() {
            flags |= Flags::ContentSize;
        }

        let mut header = Vec::new();
        header.write_u32::<LE>(MAGIC)?;
        header.write_u8(flags.to_byte())?;
        header.write_u8(BlockDescriptor::new(settings.block_size).0)?;
        if let Some(content_size) = content_size {
            header.write_u64::<LE>(content_size)?;
        }
        let hc = header_checksum(&header[4..]); // skip magic for header checksum
        header.write_u8(hc)?;
        writer.write_all(&header)?;

        debug!(
            "opened frame: block size {:?}, level {}, flags {:?}, content size {:?}",
            settings.block_size, settings.level, flags, content_size
        );

        let block_maxsize = settings.block_size.bytes();
        LZ4FrameWriter {
            writer,
            flags,
            level: settings.level,
            block_maxsize,
            in_buffer: Vec::with_capacity(block_maxsize),
            out_buffer: vec![0u8; block_maxsize],
            content_hasher: if settings.content_checksum { Some(XxHash32::with_seed(0)) } else { None },
            content_size,
            bytes_in: 0,
            bytes_out: header.len() as u64,
        }
    }

    /// Append raw bytes to the frame.
    ///
    /// Every time a full block has accumulated it is compressed and written out.
    #[throws]
    pub fn write_block(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.in_buffer.is_empty() && data.len() >= self.block_maxsize {
                // no need to copy a full block into the buffer first
                let (block, rest) = data.split_at(self.block_maxsize);
                self.emit_block(block)?;
                data = rest;
                continue;
            }

            let take = cmp::min(self.block_maxsize - self.in_buffer.len(), data.len());
            self.in_buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.in_buffer.len() == self.block_maxsize {
                self.flush_block()?;
            }
        }
    }

    #[throws]
    fn flush_block(&mut self) {
        if self.in_buffer.is_empty() {
            return;
        }
        let block = mem::take(&mut self.in_buffer);
        let result = self.emit_block(&block);
        self.in_buffer = block;
        self.in_buffer.clear();
        result?;
    }

    #[throws]
    fn emit_block(&mut self, block: &[u8]) {
        debug_assert!(!block.is_empty() && block.len() <= self.block_maxsize);

        if let Some(x) = self.content_hasher.as_mut() {
            x.write(block);
        }
        self.bytes_in += block.len() as u64;

        // 1. limit output to one byte less than the input so the block has to shrink to be stored compressed
        // 2. use a wrapper that forbids partial writes, so don't write 32-bit integers
        //    as four individual bytes with four individual range checks
        let limit = block.len() - 1;
        let mut cursor = NoPartialWrites(&mut self.out_buffer[..limit]);
        let write = match compress_block(block, self.level, &mut cursor) {
            Ok(()) => {
                let written_len = limit - cursor.0.len();
                trace!("block of {} bytes compressed to {}", block.len(), written_len);
                self.writer.write_u32::<LE>(written_len as u32)?;
                &self.out_buffer[..written_len]
            }
            Err(e) => {
                if e.kind() != ErrorKind::ConnectionAborted {
                    throw!(e);
                }
                // incompressible
                trace!("block of {} bytes stored uncompressed", block.len());
                self.writer.write_u32::<LE>((block.len() as u32) | INCOMPRESSIBLE)?;
                block
            }
        };

        self.writer.write_all(write)?;
        self.bytes_out += 4 + write.len() as u64;
        if self.flags.block_checksums() {
            self.writer.write_u32::<LE>(checksum(write))?;
            self.bytes_out += 4;
        }
    }

    /// Raw bytes accepted so far, including those still waiting for their block to fill up.
    pub fn bytes_in(&self) -> u64 { self.bytes_in + self.in_buffer.len() as u64 }

    /// Write the last block, the end mark and the content checksum, then hand back the writer.
    #[throws]
    pub fn finish(mut self) -> W {
        self.flush_block()?;

        if let Some(declared) = self.content_size {
            if declared != self.bytes_in {
                throw!(FormatError::ContentSizeMismatch { declared, actual: self.bytes_in });
            }
        }

        self.writer.write_u32::<LE>(0)?;
        self.bytes_out += 4;
        if let Some(x) = self.content_hasher.take() {
            self.writer.write_u32::<LE>(x.finish() as u32)?;
            self.bytes_out += 4;
        }
        self.writer.flush()?;

        debug!("finished frame: {} bytes in, {} bytes out", self.bytes_in, self.bytes_out);
        self.writer
    }
}

impl<W: Write> Write for LZ4FrameWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_block(buf)?;
        Ok(buf.len())
    }

    /// Flushes the underlying writer. A partial block stays buffered until more data or `finish` arrives.
    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Helper struct to allow more efficient code generation when using the Write trait on byte buffers.
///
/// The underlying problem is that the Write impl on [u8] (and everything similar, e.g. Cursor<[u8]>)
/// is specified to write as many bytes as possible before returning an error.
/// This is a problem because it forces e.g. a 32-bit write to compile to four 8-bit writes with a range
/// check every time, rather than a single 32-bit write with a range check.
///
/// This wrapper aims to resolve the problem by simply not writing anything in case we fail the bounds check,
/// as we throw away the entire buffer in that case anyway.
struct NoPartialWrites<'a>(&'a mut [u8]);
impl<'a> Write for NoPartialWrites<'a> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.0.len() < data.len() {
            // quite frankly it doesn't matter what we specify here
            return Err(ErrorKind::ConnectionAborted.into());
        }

        let amt = data.len();
        let (a, b) = mem::replace(&mut self.0, &mut []).split_at_mut(data.len());
        a.copy_from_slice(data);
        self.0 = b;
        Ok(amt)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
