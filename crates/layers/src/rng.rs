//! Explicit, splittable random state.
//!
//! Randomness is never hidden inside a layer. A forward pass receives a
//! [`RandomState`], advances it by one draw and derives every key it needs
//! (decision draws, dropout masks) from that draw with [`RandomState::split`]
//! and [`RandomState::fold_in`]. The key is two `u32` words so replicas can
//! combine their keys with an integer sum reduction.

use rand::{rngs::StdRng, Rng, SeedableRng};

const SPLIT_DOMAIN: u64 = 0x243F_6A88_85A3_08D3;
const FOLD_DOMAIN: u64 = 0x1319_8A2E_0370_7344;

/// Two-word random key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RandomState {
    key: [u32; 2],
}

impl RandomState {
    /// Builds a state from a user supplied seed.
    pub fn new(seed: u64) -> Self {
        Self::from_u64(seed)
    }

    /// Rebuilds a state from raw key words (e.g. after a cross-replica reduction).
    pub fn from_key(key: [u32; 2]) -> Self {
        Self { key }
    }

    /// Raw key words.
    pub fn key(&self) -> [u32; 2] {
        self.key
    }

    /// Splits the state into two independent states.
    pub fn split(&self) -> (Self, Self) {
        (self.derive(SPLIT_DOMAIN, 0), self.derive(SPLIT_DOMAIN, 1))
    }

    /// Derives an independent state keyed by `data` without consuming `self`.
    pub fn fold_in(&self, data: u64) -> Self {
        self.derive(FOLD_DOMAIN, data)
    }

    /// Advances the stream by one draw, returning the key for that draw.
    pub fn advance(&mut self) -> Self {
        let (next, draw) = self.split();
        *self = next;
        draw
    }

    /// Samples a scalar uniformly from `[low, high)`; returns `low` for an empty range.
    pub fn uniform(&self, low: f32, high: f32) -> f32 {
        if !(high > low) {
            return low;
        }
        self.rng().gen_range(low..high)
    }

    /// Seeded generator for bulk sampling (dropout masks).
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(splitmix64(self.as_u64()))
    }

    fn as_u64(&self) -> u64 {
        (u64::from(self.key[0]) << 32) | u64::from(self.key[1])
    }

    fn from_u64(value: u64) -> Self {
        Self {
            key: [(value >> 32) as u32, value as u32],
        }
    }

    fn derive(&self, domain: u64, data: u64) -> Self {
        let tweak = splitmix64(domain ^ splitmix64(data));
        Self::from_u64(splitmix64(self.as_u64() ^ tweak))
    }
}

impl Default for RandomState {
    fn default() -> Self {
        Self::new(0)
    }
}

// Finaliser from SplitMix64; bijective on u64.
fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
