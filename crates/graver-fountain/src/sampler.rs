//! Weighted sampling via Walker's alias method.
//!
//! Consumes exactly two generator values per sample regardless of the
//! outcome count, which keeps the pseudo-random stream alignment identical
//! on both sides of the transfer.

use crate::xoshiro::Xoshiro256;

pub(crate) struct RandomSampler {
    probs: Vec<f64>,
    aliases: Vec<usize>,
}

impl RandomSampler {
    pub(crate) fn new(weights: &[f64]) -> Self {
        let n = weights.len();
        let sum: f64 = weights.iter().sum();
        let mut scaled: Vec<f64> = weights.iter().map(|w| w * n as f64 / sum).collect();

        let mut small = Vec::new();
        let mut large = Vec::new();
        for i in (0..n).rev() {
            if scaled[i] < 1.0 {
                small.push(i);
            } else {
                large.push(i);
            }
        }

        let mut probs = vec![0.0; n];
        let mut aliases = vec![0usize; n];
        while let (Some(&a), Some(&g)) = (small.last(), large.last()) {
            small.pop();
            large.pop();

            probs[a] = scaled[a];
            aliases[a] = g;
            scaled[g] += scaled[a] - 1.0;
            if scaled[g] < 1.0 {
                small.push(g);
            } else {
                large.push(g);
            }
        }
        while let Some(g) = large.pop() {
            probs[g] = 1.0;
        }
        while let Some(a) = small.pop() {
            probs[a] = 1.0;
        }

        Self { probs, aliases }
    }

    pub(crate) fn next(&self, rng: &mut Xoshiro256) -> usize {
        let r1 = rng.next_double();
        let r2 = rng.next_double();

        let i = (r1 * self.probs.len() as f64) as usize;
        if r2 < self.probs[i] { i } else { self.aliases[i] }
    }
}
