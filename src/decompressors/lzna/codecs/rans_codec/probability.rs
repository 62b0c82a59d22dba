use super::{MOVE_BITS, PROB_TOTAL};

const PROB_INIT: u16 = (PROB_TOTAL / 2) as u16;

/// A single adaptive binary probability, estimating P(bit = 0) on a 15-bit
/// scale. The update rule keeps the estimate strictly inside
/// `(0, PROB_TOTAL)` so both bit values stay codable forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitProbability(pub u16);

impl Default for BitProbability {
    fn default() -> Self {
        Self::new()
    }
}

impl BitProbability {
    pub fn new() -> Self {
        Self(PROB_INIT)
    }

    /// Move toward "bit is 0".
    pub fn increment(&mut self) {
        let mut prob = self.0 as u32;
        prob += (PROB_TOTAL - prob) >> MOVE_BITS;
        self.0 = prob as u16;
    }

    /// Move toward "bit is 1".
    pub fn decrement(&mut self) {
        let mut prob = self.0 as u32;
        prob -= prob >> MOVE_BITS;
        self.0 = prob as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_never_saturates() {
        let mut prob = BitProbability::new();
        for _ in 0..10_000 {
            prob.increment();
            assert!((prob.0 as u32) < PROB_TOTAL);
        }
        let mut prob = BitProbability::new();
        for _ in 0..10_000 {
            prob.decrement();
            assert!(prob.0 > 0);
        }
    }
}
