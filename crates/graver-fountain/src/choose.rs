//! Degree and fragment selection for mixed frames.

use sha2::{Digest, Sha256};

use crate::sampler::RandomSampler;
use crate::xoshiro::Xoshiro256;

/// Sample a mixing degree in `[1, seq_len]` from the `1/d` soliton family.
pub(crate) fn choose_degree(seq_len: u32, rng: &mut Xoshiro256) -> u32 {
    let weights: Vec<f64> = (1..=seq_len).map(|d| 1.0 / d as f64).collect();
    RandomSampler::new(&weights).next(rng) as u32 + 1
}

/// The set of pure fragment indexes a frame mixes together.
///
/// Frames `1..=seq_len` are the pure fragments themselves. Later frames
/// seed a generator from `SHA-256(be32(seq_num) || be32(checksum))`, draw a
/// degree, and pick that many distinct indexes from a shrinking candidate
/// list. Both sides replay this selection, so only the frame header needs
/// to travel on the wire.
pub(crate) fn choose_fragments(seq_num: u32, seq_len: u32, checksum: u32) -> Vec<u32> {
    if seq_num <= seq_len {
        return vec![seq_num - 1];
    }

    let mut hasher = Sha256::new();
    hasher.update(seq_num.to_be_bytes());
    hasher.update(checksum.to_be_bytes());
    let seed: [u8; 32] = hasher.finalize().into();

    let mut rng = Xoshiro256::from_seed(&seed);
    let degree = choose_degree(seq_len, &mut rng);

    let mut remaining: Vec<u32> = (0..seq_len).collect();
    let mut chosen = Vec::with_capacity(degree as usize);
    for _ in 0..degree {
        let pick = (rng.next_double() * remaining.len() as f64) as usize;
        chosen.push(remaining.remove(pick));
    }
    chosen
}
