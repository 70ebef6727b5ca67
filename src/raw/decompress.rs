use byteorder::{ByteOrder, LE};
use fehler::{throw, throws};
use thiserror::Error;

use super::token::read_lsic;
use super::MINMATCH;

/// Ways in which a token stream can be invalid.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DecodeError {
    /// Expected more bytes, but found none.
    /// Either your input was truncated or you're trying to decompress garbage.
    #[error("the token stream ended in the middle of a sequence")]
    UnexpectedEnd,
    /// A back-reference with offset zero. No encoder produces these.
    #[error("a match has offset zero")]
    ZeroOffset,
    /// The offset for a deduplication reaches before the start of the block.
    #[error("a match reaches before the start of the block")]
    InvalidDeduplicationOffset,
    /// The data decompresses to more bytes than the output may hold.
    #[error("the block decompresses to more bytes than declared")]
    OutputOverflow,
    /// A length extension is absurdly large.
    #[error("a length extension overflows")]
    LengthOverflow,
    /// The declared size is more than a token stream of this length can ever produce.
    #[error("{declared} bytes cannot be produced by a token stream of at most {max}")]
    UnreachableSize { declared: usize, max: usize },
    /// The data decompresses to fewer bytes than declared.
    #[error("expected {expected} decompressed bytes, got {actual}")]
    OutputTooShort { expected: usize, actual: usize },
}

/// Decompress an LZ4-compressed block into a pre-sized buffer and return the number of bytes produced.
///
/// Matches may only reference bytes produced by this very call. `output.len()` is a hard limit:
/// a block that would decompress to more fails with [`DecodeError::OutputOverflow`] instead of
/// writing past it. Nothing but `output` is written to.
#[throws(DecodeError)]
pub fn decompress_into(input: &[u8], output: &mut [u8]) -> usize {
    let mut ip = 0;
    let mut op = 0;
    loop {
        let token = match input.get(ip) {
            Some(&t) => t,
            None => throw!(DecodeError::UnexpectedEnd),
        };
        ip += 1;

        // read literals
        let literal_len = read_lsic(token >> 4, input, &mut ip)?;
        if literal_len > input.len() - ip {
            throw!(DecodeError::UnexpectedEnd);
        }
        if literal_len > output.len() - op {
            throw!(DecodeError::OutputOverflow);
        }
        output[op..][..literal_len].copy_from_slice(&input[ip..][..literal_len]);
        ip += literal_len;
        op += literal_len;

        // the last sequence has no match part
        if ip == input.len() {
            break;
        }

        // read duplicates
        if input.len() - ip < 2 {
            throw!(DecodeError::UnexpectedEnd);
        }
        let offset = LE::read_u16(&input[ip..]) as usize;
        ip += 2;
        let match_len = MINMATCH + read_lsic(token & 0xF, input, &mut ip)?;

        if offset == 0 {
            throw!(DecodeError::ZeroOffset);
        }
        if offset > op {
            throw!(DecodeError::InvalidDeduplicationOffset);
        }
        if match_len > output.len() - op {
            throw!(DecodeError::OutputOverflow);
        }
        copy_overlapping(output, op, offset, match_len);
        op += match_len;

        // our encoders always end on literals, others may not
        if ip == input.len() {
            break;
        }
    }
    op
}

/// The most a token stream of `input_len` bytes can decode to.
///
/// Every byte of the stream, be it a literal, an extension byte or part of a sequence header,
/// accounts for at most 255 bytes of output.
pub fn max_decompressed_size(input_len: usize) -> usize {
    input_len.saturating_mul(255).saturating_add(16)
}

/// Replicate `match_len` bytes starting `offset` bytes before `pos`.
///
/// Source and destination overlap whenever `offset < match_len`; the copy then repeats the
/// last `offset` bytes, which is how LZ4 expresses runs.
fn copy_overlapping(output: &mut [u8], pos: usize, offset: usize, match_len: usize) {
    let start = pos - offset;
    match offset {
        // fastpath: memset if we repeat the same byte forever
        1 => {
            let b = output[start];
            for x in &mut output[pos..][..match_len] {
                *x = b;
            }
        }

        // fastpath: nonoverlapping
        o if match_len <= o => output.copy_within(start..start + match_len, pos),

        2 | 4 | 8 => {
            // fastpath: overlapping but small

            // speedup: build 16 byte buffer so we can handle 16 bytes each iteration instead of one
            let mut buf = [0u8; 16];
            for chunk in buf.chunks_mut(offset) {
                // offset divides 16, so every chunk is exactly one period
                chunk.copy_from_slice(&output[start..pos]);
            }
            for target in output[pos..][..match_len].chunks_mut(buf.len()) {
                target.copy_from_slice(&buf[..target.len()]);
            }
        }
        _ => {
            // slowest path: copy single bytes
            for i in 0..match_len {
                output[pos + i] = output[start + i];
            }
        }
    }
}

/// Decompress a block, appending at most `limit` bytes to `output`.
///
/// On failure `output` is restored to its previous length.
#[throws(DecodeError)]
pub fn decompress_raw(input: &[u8], output: &mut Vec<u8>, limit: usize) {
    let old_len = output.len();
    output.resize(old_len + limit, 0);
    match decompress_into(input, &mut output[old_len..]) {
        Ok(written) => output.truncate(old_len + written),
        Err(e) => {
            output.truncate(old_len);
            throw!(e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decompress(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut vec = Vec::new();
        decompress_raw(input, &mut vec, 1 << 16)?;
        Ok(vec)
    }

    #[test]
    fn aaaaaaaaaaa_lots_of_aaaaaaaaa() {
        assert_eq!(decompress(&[0x11, b'a', 1, 0]).unwrap(), b"aaaaaa");
    }

    #[test]
    fn multiple_repeated_blocks() {
        assert_eq!(
            decompress(&[0x11, b'a', 1, 0, 0x22, b'b', b'c', 2, 0]).unwrap(),
            b"aaaaaabcbcbcbc"
        );
    }

    #[test]
    fn all_literal() {
        assert_eq!(decompress(&[0x30, b'a', b'4', b'9']).unwrap(), b"a49");
    }

    #[test]
    fn overlapping_odd_period() {
        // "abc" then a match of 10 at offset 3, then two closing literals
        assert_eq!(
            decompress(&[0x36, b'a', b'b', b'c', 3, 0, 0x20, b'x', b'y']).unwrap(),
            b"abcabcabcabcaxy"
        );
    }

    #[test]
    fn offset_oob() {
        assert_eq!(decompress(&[0x10, b'a', 2, 0]), Err(DecodeError::InvalidDeduplicationOffset));
        assert_eq!(decompress(&[0x40, b'a', 1, 0]), Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn zero_offset() {
        assert_eq!(decompress(&[0x10, b'a', 0, 0]), Err(DecodeError::ZeroOffset));
    }

    #[test]
    fn truncated_offset() {
        assert_eq!(decompress(&[0x10, b'a', 1]), Err(DecodeError::UnexpectedEnd));
        assert_eq!(decompress(&[]), Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn output_limit_is_enforced() {
        let mut out = [0u8; 5];
        assert_eq!(decompress_into(&[0x11, b'a', 1, 0], &mut out), Err(DecodeError::OutputOverflow));
        let mut out = [0u8; 2];
        assert_eq!(decompress_into(&[0x30, b'a', b'4', b'9'], &mut out), Err(DecodeError::OutputOverflow));
    }

    #[test]
    fn failed_decode_leaves_vec_untouched() {
        let mut vec = b"keep".to_vec();
        decompress_raw(&[0x10, b'a', 2, 0], &mut vec, 100).unwrap_err();
        assert_eq!(vec, b"keep");
    }
}
