//! Hash chains for the HC encoder.
//!
//! `head` maps a hash to the latest position with that hash, `chain` maps a position (modulo
//! the window) to the distance back to the previous position with the same hash. Since no match may
//! reach further than the window, a u16 delta per position is all we need and the arena never grows.

use byteorder::{ByteOrder, LE};

use super::super::{MAX_DISTANCE, WINDOW_SIZE};

const HASH_LOG: usize = 15;
const HASH_TABLE_SIZE: usize = 1 << HASH_LOG;
const CHAIN_MASK: usize = WINDOW_SIZE - 1;
const NO_POSITION: u32 = std::u32::MAX;

fn hash(input: &[u8]) -> usize {
    (LE::read_u32(input).wrapping_mul(2654435761) >> (32 - HASH_LOG)) as usize
}

pub struct HashChain {
    head: Vec<u32>,
    chain: Vec<u16>,
    next_to_insert: usize,
}

impl Default for HashChain {
    fn default() -> Self {
        HashChain {
            head: vec![NO_POSITION; HASH_TABLE_SIZE],
            chain: vec![0; WINDOW_SIZE],
            next_to_insert: 0,
        }
    }
}

impl HashChain {
    /// Link `pos` in front of the chain for the four bytes starting there.
    pub fn insert(&mut self, input: &[u8], pos: usize) {
        let h = hash(&input[pos..]);
        let previous = self.head[h];
        let delta = if previous == NO_POSITION { 0 } else { pos - previous as usize };
        // a delta of zero terminates the chain
        self.chain[pos & CHAIN_MASK] = if delta > MAX_DISTANCE { 0 } else { delta as u16 };
        self.head[h] = pos as u32;
        self.next_to_insert = pos + 1;
    }

    /// Insert every position below `pos` that has not been inserted yet.
    pub fn insert_up_to(&mut self, input: &[u8], pos: usize) {
        while self.next_to_insert < pos {
            self.insert(input, self.next_to_insert);
        }
    }

    /// Earlier positions sharing the hash of the four bytes at `pos`, nearest first.
    ///
    /// Only positions inside the window are yielded. They are candidates, not matches.
    pub fn candidates<'a>(&'a self, input: &[u8], pos: usize) -> Candidates<'a> {
        let first = self.head[hash(&input[pos..])];
        let next = if first == NO_POSITION { None } else { Some(first as usize) };
        Candidates { chain: &self.chain, pos, next }
    }
}

pub struct Candidates<'a> {
    chain: &'a [u16],
    pos: usize,
    next: Option<usize>,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next.take()?;
        if current >= self.pos || self.pos - current > MAX_DISTANCE {
            return None;
        }
        let delta = self.chain[current & CHAIN_MASK] as usize;
        if delta != 0 && delta <= current {
            self.next = Some(current - delta);
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_nearest_first() {
        let input = b"abcd1abcd2abcd3abcd";
        let mut chain = HashChain::default();
        chain.insert_up_to(input, 15);
        let found: Vec<usize> = chain.candidates(input, 15).collect();
        assert_eq!(found, [10, 5, 0]);
    }

    #[test]
    fn only_inserted_positions_are_candidates() {
        let input = b"abcd1abcd2abcd3abcd";
        let mut chain = HashChain::default();
        chain.insert_up_to(input, 6);
        let found: Vec<usize> = chain.candidates(input, 15).collect();
        assert_eq!(found, [5, 0]);
    }

    #[test]
    fn stops_at_window_edge() {
        for &(distance, reachable) in &[(MAX_DISTANCE, true), (WINDOW_SIZE, false)] {
            let mut input = vec![0u8; WINDOW_SIZE + 8];
            input[..4].copy_from_slice(b"wxyz");
            input[distance..][..4].copy_from_slice(b"wxyz");
            let mut chain = HashChain::default();
            chain.insert(&input, 0);
            assert_eq!(chain.candidates(&input, distance).next().is_some(), reachable);
        }
    }
}
