//! Deterministic random numbers for the script `Random` intrinsic.
//!
//! The generator is reseeded on every stage load, so a replay of the same
//! input against the same stage draws the same sequence.

/// PCG-XSH-RR: 64-bit LCG state, 32-bit permuted output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcgRng {
    state: u64,
}

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self { state: 0 };
        rng.reseed(seed);
        rng
    }

    pub fn reseed(&mut self, seed: u64) {
        self.state = Self::step(seed.wrapping_add(Self::INCREMENT));
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.state = Self::step(old);
        Self::output(old)
    }

    /// Value in `0..bound`; a non-positive bound yields 0.
    pub fn below(&mut self, bound: i32) -> i32 {
        if bound <= 0 {
            return 0;
        }
        (self.next_u32() % bound as u32) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PcgRng::new(42);
        let mut b = PcgRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_ne!(PcgRng::new(42).next_u32(), PcgRng::new(43).next_u32());
    }

    #[test]
    fn below_stays_in_range() {
        let mut rng = PcgRng::new(7);
        for _ in 0..256 {
            let v = rng.below(10);
            assert!((0..10).contains(&v));
        }
        assert_eq!(rng.below(0), 0);
        assert_eq!(rng.below(-5), 0);
    }
}
