//! Deterministic sources of randomness for stochastic parts of the model.
//!
//! Every random draw in a scenario comes from a generator seeded by the scenario's base seed, the
//! year being simulated and a named stream (e.g. the region whose demand is being projected). This
//! means results are reproducible and do not depend on the order in which streams are consumed.
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// FNV-1a offset basis
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a prime
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// A factory for deterministic random number generators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSequence {
    base_seed: u64,
}

impl SeedSequence {
    /// Create a new [`SeedSequence`] from a base seed
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    /// The base seed
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Get the generator for the given year and stream name.
    ///
    /// The stream is identified by a list of labels, such as a region and technology ID.
    pub fn rng(&self, year: u32, stream: &[&str]) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.base_seed.wrapping_add(u64::from(year)));
        rng.set_stream(stream_id(stream));
        rng
    }
}

/// Hash the labels of a stream into a stream number
fn stream_id(labels: &[&str]) -> u64 {
    let mut hash = FNV_OFFSET;
    for label in labels {
        // Separator, so that ["ab", "c"] and ["a", "bc"] differ
        for byte in label.bytes().chain(std::iter::once(0xff)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }

    hash
}
