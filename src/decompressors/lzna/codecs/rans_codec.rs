//! # Dual-lane rANS bitstream for LZNA
//!
//! ### Decoding
//!
//! The decoder owns two 64-bit rANS accumulators. Lane A resolves every
//! model-coded decision (adaptive probabilities, 15-bit scale); lane B
//! carries raw, uniformly distributed bit groups. Both lanes refill from
//! the compressed source 32 bits at a time, as little-endian words, and
//! stay inside `[2^31, 2^63)` between operations.
//!
//! The stream starts with a 16-byte header holding the initial lane
//! states, followed by the refill words in consumption order.
//!
//! ### Encoding
//!
//! rANS emits symbols in reverse, so [`RansEncoder`] records the coding
//! intervals during a forward pass over the data (while the adaptive
//! models update) and performs the arithmetic backwards in
//! [`RansEncoder::finish`]. Only the bit-level encoder is public; quantum
//! level encoding is test support, not a compression API.

mod probability;

pub use probability::*;

use byteorder::{ByteOrder, LittleEndian};

use crate::decompressors::lzna::error::{LznaError, Result};

pub const PROB_TOTAL_BITS: u32 = 15;
pub const PROB_TOTAL: u32 = 1 << PROB_TOTAL_BITS;
pub const MOVE_BITS: u32 = 5;

/// Lanes are renormalized back above this bound after every operation.
const RANS_LOWER_BOUND: u64 = 1 << 31;

/// Initial lane states, one `u64` per lane.
const HEADER_BYTES: usize = 16;

/// Largest raw bit group either lane transfers in one call.
pub const MAX_RAW_BITS: u32 = 16;

#[derive(Debug)]
pub struct RansDecoder<'a> {
    lane_a: u64,
    lane_b: u64,
    src: &'a [u8],
    pos: usize,
}

impl<'a> RansDecoder<'a> {
    pub fn new(src: &'a [u8]) -> Result<Self> {
        if src.len() < HEADER_BYTES {
            return Err(LznaError::Truncated);
        }
        let lane_a = LittleEndian::read_u64(&src[0..8]);
        let lane_b = LittleEndian::read_u64(&src[8..16]);

        // A lane below the renormalization bound cannot have come from the
        // encoder and would break the refill invariant.
        if lane_a < RANS_LOWER_BOUND || lane_b < RANS_LOWER_BOUND {
            return Err(LznaError::ModelCorruption);
        }

        Ok(Self {
            lane_a,
            lane_b,
            src,
            pos: HEADER_BYTES,
        })
    }

    /// Compressed bytes consumed so far, including the header.
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    pub fn bytes_remaining(&self) -> usize {
        self.src.len() - self.pos
    }

    /// True once every refill word has been consumed and both lanes are
    /// back at their flush state.
    pub fn is_finished(&self) -> bool {
        self.pos == self.src.len()
            && self.lane_a == RANS_LOWER_BOUND
            && self.lane_b == RANS_LOWER_BOUND
    }

    fn next_word(&mut self) -> Result<u64> {
        if self.pos + 4 > self.src.len() {
            return Err(LznaError::Truncated);
        }
        let word = LittleEndian::read_u32(&self.src[self.pos..]);
        self.pos += 4;
        Ok(word as u64)
    }

    /// The 15 low bits of lane A, locating the next symbol inside its
    /// model's cumulative distribution.
    pub fn low_bits(&self) -> u32 {
        (self.lane_a & (PROB_TOTAL - 1) as u64) as u32
    }

    /// Advance lane A past a symbol coded on `[start, start + freq)`.
    pub fn consume(&mut self, start: u32, freq: u32) -> Result<()> {
        debug_assert!(freq > 0 && start + freq <= PROB_TOTAL);
        debug_assert!(start <= self.low_bits() && self.low_bits() < start + freq);

        let low = self.lane_a & (PROB_TOTAL - 1) as u64;
        self.lane_a = freq as u64 * (self.lane_a >> PROB_TOTAL_BITS) + low - start as u64;
        if self.lane_a < RANS_LOWER_BOUND {
            self.lane_a = (self.lane_a << 32) | self.next_word()?;
        }
        Ok(())
    }

    /// Decode one binary decision against `prob`, updating it.
    pub fn decode_bit(&mut self, prob: &mut BitProbability) -> Result<u32> {
        let q = prob.0 as u32;
        if self.low_bits() < q {
            self.consume(0, q)?;
            prob.increment();
            Ok(0)
        } else {
            self.consume(q, PROB_TOTAL - q)?;
            prob.decrement();
            Ok(1)
        }
    }

    /// Read `count` uniformly distributed bits from lane B.
    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= MAX_RAW_BITS);
        if count == 0 {
            return Ok(0);
        }
        let mask = (1u64 << count) - 1;
        let value = (self.lane_b & mask) as u32;
        self.lane_b >>= count;
        if self.lane_b < RANS_LOWER_BOUND {
            self.lane_b = (self.lane_b << 32) | self.next_word()?;
        }
        Ok(value)
    }
}

enum RansOp {
    /// Lane A, a symbol on the cumulative interval `[start, start + freq)`.
    Scaled { start: u16, freq: u16 },
    /// Lane B, `count` raw bits.
    Raw { value: u16, count: u8 },
}

pub struct RansEncoder {
    ops: Vec<RansOp>,
}

impl Default for RansEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RansEncoder {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Record a lane A symbol on `[start, start + freq)`.
    pub fn push_scaled(&mut self, start: u32, freq: u32) {
        debug_assert!(freq > 0 && start + freq <= PROB_TOTAL);
        self.ops.push(RansOp::Scaled {
            start: start as u16,
            freq: freq as u16,
        });
    }

    /// Record one binary decision against `prob`, updating it the same way
    /// the decoder will.
    pub fn encode_bit(&mut self, prob: &mut BitProbability, bit: u32) {
        let q = prob.0 as u32;
        if bit == 0 {
            self.push_scaled(0, q);
            prob.increment();
        } else {
            self.push_scaled(q, PROB_TOTAL - q);
            prob.decrement();
        }
    }

    /// Record `count` raw bits for lane B.
    pub fn push_raw(&mut self, value: u32, count: u32) {
        debug_assert!(count <= MAX_RAW_BITS);
        debug_assert!(count == MAX_RAW_BITS || value < (1 << count));
        if count == 0 {
            return;
        }
        self.ops.push(RansOp::Raw {
            value: value as u16,
            count: count as u8,
        });
    }

    /// Run the rANS arithmetic backwards over the recorded operations and
    /// lay out the stream: lane headers first, then the refill words in
    /// the order the decoder will pull them.
    pub fn finish(self) -> Vec<u8> {
        let mut lane_a = RANS_LOWER_BOUND;
        let mut lane_b = RANS_LOWER_BOUND;
        let mut words: Vec<u32> = Vec::new();

        for op in self.ops.iter().rev() {
            match *op {
                RansOp::Scaled { start, freq } => {
                    let freq = freq as u64;
                    if lane_a >= freq << (63 - PROB_TOTAL_BITS) {
                        words.push(lane_a as u32);
                        lane_a >>= 32;
                    }
                    lane_a = ((lane_a / freq) << PROB_TOTAL_BITS) + lane_a % freq + start as u64;
                }
                RansOp::Raw { value, count } => {
                    if lane_b >= 1 << (63 - count as u32) {
                        words.push(lane_b as u32);
                        lane_b >>= 32;
                    }
                    lane_b = (lane_b << count) | value as u64;
                }
            }
        }

        let mut out = vec![0u8; HEADER_BYTES + words.len() * 4];
        LittleEndian::write_u64(&mut out[0..8], lane_a);
        LittleEndian::write_u64(&mut out[8..16], lane_b);
        for (i, word) in words.iter().rev().enumerate() {
            LittleEndian::write_u32(&mut out[HEADER_BYTES + i * 4..], *word);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_bits_round_trip() {
        let mut encoder = RansEncoder::new();
        for i in 0..100u32 {
            encoder.push_raw(i & 0xFF, 8);
            encoder.push_raw(i & 0x7, 3);
        }
        let buf = encoder.finish();

        let mut decoder = RansDecoder::new(&buf).unwrap();
        for i in 0..100u32 {
            assert_eq!(decoder.read_bits(8).unwrap(), i & 0xFF);
            assert_eq!(decoder.read_bits(3).unwrap(), i & 0x7);
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_bit_probability_round_trip() {
        let mut prob = BitProbability::new();
        let mut encoder = RansEncoder::new();
        for i in 0..100u32 {
            for bit in 0..32 {
                encoder.encode_bit(&mut prob, (i >> bit) & 1);
            }
        }
        let buf = encoder.finish();

        let mut prob = BitProbability::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for i in 0..100u32 {
            let mut result = 0;
            for bit in 0..32 {
                result |= decoder.decode_bit(&mut prob).unwrap() << bit;
            }
            assert_eq!(result, i);
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_biased_bits_compress() {
        let mut prob = BitProbability::new();
        let mut encoder = RansEncoder::new();
        for _ in 0..1000 {
            encoder.encode_bit(&mut prob, 0);
        }
        encoder.encode_bit(&mut prob, 1);
        for _ in 0..1000 {
            encoder.encode_bit(&mut prob, 0);
        }
        let buf = encoder.finish();

        // 2001 heavily biased decisions adapt to a fraction of a bit each.
        assert!(buf.len() < 100, "len = {}", buf.len());

        let mut prob = BitProbability::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for _ in 0..1000 {
            assert_eq!(decoder.decode_bit(&mut prob).unwrap(), 0);
        }
        assert_eq!(decoder.decode_bit(&mut prob).unwrap(), 1);
        for _ in 0..1000 {
            assert_eq!(decoder.decode_bit(&mut prob).unwrap(), 0);
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_interleaved_lanes() {
        let mut prob = BitProbability::new();
        let mut encoder = RansEncoder::new();
        for i in 0..500u32 {
            encoder.encode_bit(&mut prob, i & 1);
            encoder.push_raw(i & 0xFFF, 12);
        }
        let buf = encoder.finish();

        let mut prob = BitProbability::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for i in 0..500u32 {
            assert_eq!(decoder.decode_bit(&mut prob).unwrap(), i & 1);
            assert_eq!(decoder.read_bits(12).unwrap(), i & 0xFFF);
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_short_header_is_truncated() {
        for len in 0..16 {
            let buf = vec![0xFFu8; len];
            assert_eq!(RansDecoder::new(&buf).unwrap_err(), LznaError::Truncated);
        }
    }

    #[test]
    fn test_bad_header_state_rejected() {
        // Lane states below the renormalization bound are unreachable from
        // the encoder.
        let buf = vec![0u8; 16];
        assert_eq!(
            RansDecoder::new(&buf).unwrap_err(),
            LznaError::ModelCorruption
        );
    }

    #[test]
    fn test_exhausted_refill_is_truncated() {
        let mut encoder = RansEncoder::new();
        for i in 0..64u32 {
            encoder.push_raw(i, 16);
        }
        let buf = encoder.finish();
        assert!(buf.len() > HEADER_BYTES);

        let cut = &buf[..buf.len() - 4];
        let mut decoder = RansDecoder::new(cut).unwrap();
        let mut result = Ok(0);
        for _ in 0..64 {
            result = decoder.read_bits(16);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result.unwrap_err(), LznaError::Truncated);
    }
}
