//! Adaptive multi-symbol models: the 4-bit ("nibble") and 3-bit coders
//! every higher-level LZNA model is built from.
//!
//! A codec stores a cumulative distribution over its symbols. The stored
//! slots adapt freely, but the CDF actually used for coding is derived per
//! decision as `e(i) = (prob[i] * (PROB_TOTAL - symbols) >> 15) + i`,
//! which reserves one count per symbol: no frequency can collapse to zero,
//! so every symbol stays decodable no matter how skewed the adaptation
//! gets. Encoder and decoder share the derivation and the update rule,
//! keeping the two sides bit-exact.

use super::rans_codec::{RansDecoder, RansEncoder, MOVE_BITS, PROB_TOTAL};
use crate::decompressors::lzna::error::Result;

/// An adaptive model over `SLOTS - 1` symbols, stored as `SLOTS`
/// cumulative probability slots. `prob[0]` is pinned at 0 and
/// `prob[SLOTS - 1]` at `PROB_TOTAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolCodec<const SLOTS: usize> {
    probs: [u16; SLOTS],
}

/// Binary-decomposition coder for a 4-bit symbol.
pub type NibbleCodec = SymbolCodec<17>;

/// Binary-decomposition coder for a 3-bit symbol.
pub type ThreeBitCodec = SymbolCodec<9>;

impl<const SLOTS: usize> Default for SymbolCodec<SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SLOTS: usize> SymbolCodec<SLOTS> {
    const SYMBOLS: u32 = SLOTS as u32 - 1;
    const STEP: u32 = PROB_TOTAL / Self::SYMBOLS;
    const SCALE: u32 = PROB_TOTAL - Self::SYMBOLS;

    /// The documented uniform initializer spread: slot `i` starts at
    /// `i * PROB_TOTAL / symbols`.
    pub fn new() -> Self {
        let mut probs = [0u16; SLOTS];
        for (i, slot) in probs.iter_mut().enumerate() {
            *slot = (i as u32 * Self::STEP) as u16;
        }
        Self { probs }
    }

    /// Coding CDF boundary for slot `i`, with the per-symbol floor mixed in.
    fn bound(&self, i: usize) -> u32 {
        ((self.probs[i] as u32 * Self::SCALE) >> 15) + i as u32
    }

    /// Move the slots between the observed symbol and its neighbors,
    /// widening the symbol's interval. Slots 0 and `SLOTS - 1` never move.
    fn adapt(&mut self, symbol: usize) {
        for i in 1..SLOTS - 1 {
            let p = self.probs[i] as u32;
            self.probs[i] = if i <= symbol {
                (p - (p >> MOVE_BITS)) as u16
            } else {
                (p + ((PROB_TOTAL - p) >> MOVE_BITS)) as u16
            };
        }
    }

    pub fn decode(&mut self, dec: &mut RansDecoder) -> Result<u32> {
        let low = dec.low_bits();

        let mut symbol = 0usize;
        let mut start = 0u32;
        for i in 1..SLOTS {
            let e = self.bound(i);
            if e <= low {
                symbol = i;
                start = e;
            } else {
                break;
            }
        }
        // bound(SLOTS - 1) == PROB_TOTAL > low, so symbol < SLOTS - 1 here.
        let freq = self.bound(symbol + 1) - start;

        dec.consume(start, freq)?;
        self.adapt(symbol);
        Ok(symbol as u32)
    }

    pub fn encode(&mut self, enc: &mut RansEncoder, symbol: u32) {
        debug_assert!(symbol < Self::SYMBOLS);
        let symbol = symbol as usize;
        let start = self.bound(symbol);
        let freq = self.bound(symbol + 1) - start;
        enc.push_scaled(start, freq);
        self.adapt(symbol);
    }

    /// Invariant check used by tests: slots monotone, endpoints pinned.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.probs[0] == 0
            && self.probs[SLOTS - 1] as u32 == PROB_TOTAL
            && self.probs.windows(2).all(|w| w[0] <= w[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_round_trip() {
        let mut codec = NibbleCodec::new();
        let mut encoder = RansEncoder::new();
        for pass in 0..20u32 {
            for symbol in 0..16 {
                codec.encode(&mut encoder, (symbol + pass) & 15);
            }
        }
        let buf = encoder.finish();

        let mut codec = NibbleCodec::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for pass in 0..20u32 {
            for symbol in 0..16 {
                assert_eq!(codec.decode(&mut decoder).unwrap(), (symbol + pass) & 15);
            }
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_three_bit_round_trip() {
        let mut codec = ThreeBitCodec::new();
        let mut encoder = RansEncoder::new();
        for i in 0..200u32 {
            codec.encode(&mut encoder, i * 3 & 7);
        }
        let buf = encoder.finish();

        let mut codec = ThreeBitCodec::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for i in 0..200u32 {
            assert_eq!(codec.decode(&mut decoder).unwrap(), i * 3 & 7);
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_adaptation_skews_toward_repeats() {
        // A heavily repeated symbol should cost well under 4 bits once the
        // model has adapted.
        let mut codec = NibbleCodec::new();
        let mut encoder = RansEncoder::new();
        for _ in 0..2000 {
            codec.encode(&mut encoder, 11);
        }
        let buf = encoder.finish();
        assert!(buf.len() < 150, "len = {}", buf.len());

        let mut codec = NibbleCodec::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for _ in 0..2000 {
            assert_eq!(codec.decode(&mut decoder).unwrap(), 11);
        }
    }

    #[test]
    fn test_cdf_stays_well_formed_under_skew() {
        let mut codec = NibbleCodec::new();
        let mut encoder = RansEncoder::new();
        // Hammer the extremes, which drags interior slots toward 0 and
        // PROB_TOTAL respectively.
        for _ in 0..5000 {
            codec.encode(&mut encoder, 15);
        }
        assert!(codec.is_well_formed());
        for _ in 0..5000 {
            codec.encode(&mut encoder, 0);
        }
        assert!(codec.is_well_formed());

        // Every symbol must still be codable afterwards.
        for symbol in 0..16 {
            codec.encode(&mut encoder, symbol);
        }
        let _ = encoder.finish();
        assert!(codec.is_well_formed());
    }
}
