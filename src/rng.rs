const SEED: u128 = 0x246C_CB2D_3B40_2853_9918_0A6D_BC3A_F444;

/// A xorshift generator over 128 bits of state, used for Zobrist keys,
/// magic number search, and the built-in network's weight noise.
pub struct XorShiftState {
    pub state: u128,
}

impl XorShiftState {
    pub const fn new() -> Self {
        Self { state: SEED }
    }

    pub const fn with_seed(seed: u128) -> Self {
        Self { state: seed | 1 }
    }

    /// Generates the next random number in the sequence, consuming self.
    /// This allows the generator to be driven inside const items.
    pub const fn next_self(mut self) -> (u64, Self) {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        #[allow(clippy::cast_possible_truncation)]
        let r = x as u64 ^ (x >> 64) as u64;
        (r, self)
    }

    pub fn next(&mut self) -> u64 {
        let (r, next) = Self { state: self.state }.next_self();
        self.state = next.state;
        r
    }

    /// Generates a random number with only a few bits set.
    /// Advances the generator by three steps.
    pub fn random_few_bits(&mut self) -> u64 {
        self.next() & self.next() & self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::XorShiftState;

    #[test]
    fn const_and_runtime_sequences_agree() {
        let mut runtime = XorShiftState::new();
        let mut konst = XorShiftState::new();
        for _ in 0..32 {
            let (v, next) = konst.next_self();
            konst = next;
            assert_eq!(runtime.next(), v);
        }
    }

    #[test]
    fn few_bits_is_sparse() {
        let mut rng = XorShiftState::new();
        let total: u32 = (0..256).map(|_| rng.random_few_bits().count_ones()).sum();
        // three-way AND leaves roughly an eighth of the bits set.
        assert!(total / 256 < 16);
    }
}
