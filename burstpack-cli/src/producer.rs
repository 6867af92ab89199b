//! Seeded synthetic producer.

use burstpack_core::{CorrelationEdge, LaneBatch};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Emits lane batches of random correlation edges.
///
/// Each lane is valid with probability `valid_prob`. Valid edges carry a
/// running sequence number in `pixel_a`, so output order can be checked.
pub struct SyntheticProducer {
    rng: Xoshiro256PlusPlus,
    lanes: usize,
    valid_prob: f64,
    pixels: u32,
    sequence: u32,
}

impl SyntheticProducer {
    /// Create a producer for `lanes` lanes over an image of `pixels` pixels.
    pub fn new(seed: u64, lanes: usize, valid_prob: f64, pixels: u32) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            lanes,
            valid_prob: valid_prob.clamp(0.0, 1.0),
            pixels: pixels.max(1),
            sequence: 0,
        }
    }

    /// Produce the next step's batch.
    pub fn next_batch(&mut self) -> LaneBatch<CorrelationEdge> {
        let pairs: Vec<(CorrelationEdge, bool)> = (0..self.lanes)
            .map(|_| {
                if self.rng.random::<f64>() < self.valid_prob {
                    let edge = CorrelationEdge::new(
                        self.sequence,
                        self.rng.random_range(0..self.pixels),
                        self.rng.random::<f32>() * 2.0 - 1.0,
                    );
                    self.sequence = self.sequence.wrapping_add(1);
                    (edge, true)
                } else {
                    (CorrelationEdge::default(), false)
                }
            })
            .collect();
        LaneBatch::from_pairs(pairs)
    }

    /// Valid edges produced so far.
    pub fn produced(&self) -> u32 {
        self.sequence
    }
}
