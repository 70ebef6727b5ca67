//! High compression mode.
//!
//! Instead of trusting the single most recent candidate like the fast encoder, every position walks
//! its hash chain (nearest first) and keeps the longest verified match, up to a number of probes
//! set by the compression level. Before a match is committed, the next position is searched as
//! well; if it yields a longer match, the current byte becomes a literal.

use fehler::throws;
use std::cmp;
use std::io::Write;

use super::chain::HashChain;
use super::count_matching_bytes;
use crate::raw::token::{write_last_literals, write_sequence, Duplicate};
use crate::raw::{LAST_LITERALS, MFLIMIT, MINMATCH};

type Error = std::io::Error;

/// Levels above this are treated as this level.
pub const MAX_LEVEL: u32 = 16;
/// A good tradeoff between speed and ratio.
pub const DEFAULT_HC_LEVEL: u32 = 9;

/// How many chain entries are probed per position at `level`.
///
/// Each level doubles the search depth: level 1 probes one candidate, level 9 probes 256.
pub fn search_depth(level: u32) -> usize {
    let level = cmp::min(cmp::max(level, 1), MAX_LEVEL);
    1 << (level - 1)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Match {
    offset: usize,
    len: usize,
}

struct MatchSearch<'a> {
    input: &'a [u8],
    chain: HashChain,
    max_attempts: usize,
    match_limit: usize,
}

impl<'a> MatchSearch<'a> {
    fn new(input: &'a [u8], max_attempts: usize) -> Self {
        MatchSearch {
            input,
            chain: HashChain::default(),
            max_attempts,
            match_limit: input.len().saturating_sub(LAST_LITERALS),
        }
    }

    /// The longest match for `pos` among the probed candidates. Ties go to the nearest one.
    fn longest_match(&mut self, pos: usize) -> Option<Match> {
        let input = self.input;
        self.chain.insert_up_to(input, pos);

        let current = &input[pos..self.match_limit];
        let mut best: Option<Match> = None;
        for candidate in self.chain.candidates(input, pos).take(self.max_attempts) {
            let len = count_matching_bytes(current, &input[candidate..]);
            if len >= MINMATCH && best.map_or(true, |b| len > b.len) {
                best = Some(Match { offset: pos - candidate, len });
                if len == current.len() {
                    // can't get any longer than this
                    break;
                }
            }
        }
        best
    }
}

/// Compress `input` with hash chain search and one step of lazy matching.
///
/// `level` bounds the chain walk, see [`search_depth`]. The output is a regular token stream.
#[throws]
pub fn compress_hc<W: Write>(input: &[u8], level: u32, mut writer: W) {
    let mut search = MatchSearch::new(input, search_depth(level));

    let mut cursor = 0;
    let mut literal_start = 0;
    // best match at `cursor`, left over from looking ahead
    let mut pending: Option<Match> = None;

    while cursor + MFLIMIT <= input.len() {
        let found = match pending.take() {
            Some(m) => Some(m),
            None => search.longest_match(cursor),
        };
        let current = match found {
            Some(m) => m,
            None => {
                cursor += 1;
                continue;
            }
        };

        if cursor + 1 + MFLIMIT <= input.len() {
            if let Some(next) = search.longest_match(cursor + 1) {
                if next.len > current.len {
                    pending = Some(next);
                    cursor += 1;
                    continue;
                }
            }
        }

        write_sequence(&mut writer, &input[literal_start..cursor], Duplicate::new(current.offset, current.len))?;
        cursor += current.len;
        literal_start = cursor;
    }

    write_last_literals(&mut writer, &input[literal_start..])?;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{compress_fast, decompress_raw, U32Table};

    fn hc(input: &[u8], level: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        compress_hc(input, level, &mut buf).unwrap();
        buf
    }

    fn roundtrip(input: &[u8], level: u32) -> Vec<u8> {
        let compressed = hc(input, level);
        let mut decoded = Vec::new();
        decompress_raw(&compressed, &mut decoded, input.len()).unwrap();
        assert_eq!(decoded, input);
        compressed
    }

    #[test]
    fn depth_per_level() {
        assert_eq!(search_depth(0), 1);
        assert_eq!(search_depth(1), 1);
        assert_eq!(search_depth(9), 256);
        assert_eq!(search_depth(100), search_depth(MAX_LEVEL));
    }

    #[test]
    fn lazy_matching_prefers_longer_match() {
        let input = b"abcdQ_bcdefghij_abcdefghij0123456789AB";
        let compressed = roundtrip(input, DEFAULT_HC_LEVEL);
        // 17 literals (extension byte 2), then a match of 9 at offset 11
        assert_eq!(compressed[0], 0xF5);
        assert_eq!(compressed[1], 2);
        assert_eq!(&compressed[19..21], &[11, 0]);
        assert_eq!(compressed.len(), 34);
    }

    #[test]
    fn deeper_search_finds_older_matches() {
        // the most recent "key=" is followed by junk, an older one continues the match
        let mut input = b"key=value-and-more;".to_vec();
        for i in 0..40u8 {
            input.extend_from_slice(b"key=");
            input.push(b'A' + (i % 26));
            input.push(b'0' + (i % 10));
        }
        input.extend_from_slice(b"key=value-and-more;0123456789AB");
        let shallow = roundtrip(&input, 1);
        let deep = roundtrip(&input, MAX_LEVEL);
        assert!(deep.len() < shallow.len());
    }

    #[test]
    fn never_worse_than_fast_on_runs() {
        let input = vec![0x55u8; 128 * 1024];
        let mut fast = Vec::new();
        compress_fast(&input, &mut U32Table::default(), &mut fast).unwrap();
        for &level in &[1, DEFAULT_HC_LEVEL, MAX_LEVEL] {
            assert!(roundtrip(&input, level).len() <= fast.len());
        }
    }

    #[test]
    fn text_roundtrips_at_every_level() {
        let text = include_bytes!("hc.rs");
        for level in 1..=MAX_LEVEL {
            roundtrip(text, level);
        }
    }

    #[test]
    fn deterministic() {
        let text = include_bytes!("mod.rs");
        assert_eq!(hc(text, 12), hc(text, 12));
    }
}
