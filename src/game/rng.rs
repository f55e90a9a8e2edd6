//! Block-seeded deterministic random numbers.
//!
//! The stream is the BLAKE3 extendable output of the block hash under a
//! domain tag, so every node draws the same numbers for the same block.

use blake3::OutputReader;

use crate::hash::BlockHash;

const DOMAIN: &[u8] = b"huntercore/rng/v1";

/// Deterministic random number generator for one block.
#[derive(Debug, Clone)]
pub struct GameRng {
    reader: OutputReader,
}

impl GameRng {
    /// Seed the stream from a block hash.
    #[must_use]
    pub fn from_block_hash(hash: &BlockHash) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN);
        hasher.update(hash.as_bytes());
        Self {
            reader: hasher.finalize_xof(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.reader.fill(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Uniform integer in `0..modulo`. Returns 0 for a zero modulo.
    pub fn below(&mut self, modulo: u64) -> u64 {
        if modulo == 0 {
            return 0;
        }
        // Reject the top partial range to stay unbiased.
        let zone = u64::MAX - (u64::MAX % modulo);
        loop {
            let v = self.next_u64();
            if v < zone {
                return v % modulo;
            }
        }
    }

    /// Uniform integer in `a..=b`.
    pub fn between(&mut self, a: i32, b: i32) -> i32 {
        if b <= a {
            return a;
        }
        let span = u64::from(a.abs_diff(b)) + 1;
        let offset = i64::try_from(self.below(span)).unwrap_or(0);
        i32::try_from(i64::from(a) + offset).unwrap_or(a)
    }

    /// Uniform index into a slice of length `len`.
    pub fn index(&mut self, len: usize) -> usize {
        let len = u64::try_from(len).unwrap_or(u64::MAX);
        usize::try_from(self.below(len)).unwrap_or(0)
    }
}
