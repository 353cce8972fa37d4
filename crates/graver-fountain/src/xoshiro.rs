//! Xoshiro256** seeded from a 32-byte buffer.
//!
//! Deterministic across platforms: fragment selection replays the same
//! pseudo-random stream on the encoder and every decoder, so the state
//! transition and seeding rules here are part of the wire format.

/// Xoshiro256** generator with a 256-bit state.
#[derive(Debug, Clone)]
pub struct Xoshiro256 {
    s: [u64; 4],
}

impl Xoshiro256 {
    /// Seed from 32 bytes, filling lanes `s0..s3` big-endian.
    ///
    /// Seeds are always SHA-256 output, so the all-zero state (which would
    /// make the generator degenerate) cannot occur in practice.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut s = [0u64; 4];
        for (lane, chunk) in s.iter_mut().zip(seed.chunks_exact(8)) {
            *lane = u64::from_be_bytes(chunk.try_into().expect("chunks_exact yields 8 bytes"));
        }
        debug_assert!(s.iter().any(|&lane| lane != 0), "all-zero xoshiro256 seed");
        Self { s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let s = &mut self.s;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = s[1] << 17;
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);

        result
    }

    /// Next value scaled into `[0, 1)` by division by 2^64.
    pub fn next_double(&mut self) -> f64 {
        self.next_u64() as f64 / 18_446_744_073_709_551_616.0
    }
}
