//! Match-length models.
//!
//! LZNA lengths come in three tiers: a single state-indexed bit for the
//! minimum length 2, a 3-bit model for lengths 3..=9, and an escalating
//! nibble chain for everything longer. Rep-matches on a recent distance
//! additionally get per-slot 3-bit models for their very short lengths.
//! The tier selection itself lives in the quantum codec because it
//! consults state-indexed models; this module owns the model shapes.

use super::nibble_codec::{NibbleCodec, ThreeBitCodec};
use super::rans_codec::{RansDecoder, RansEncoder};
use crate::decompressors::lzna::error::Result;

pub const MATCH_LEN_MIN: usize = 2;

/// Largest value [`LongLengthCodec`] can carry: three chained nibbles plus
/// a 16-bit raw tail.
pub const LONG_LENGTH_EXTRA_MAX: u32 = 45 + 0xFFFF;

/// Short-length models for rep-matches, one 3-bit model per state group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRecentLengthCodec {
    pub a: [ThreeBitCodec; 4],
}

impl Default for ShortRecentLengthCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortRecentLengthCodec {
    pub fn new() -> Self {
        Self {
            a: [ThreeBitCodec::new(); 4],
        }
    }
}

/// Escalating nibble chain for long match lengths: `first` either encodes
/// the value directly or saturates into `second`, which saturates into
/// `third`, which saturates into a raw 16-bit tail. Values accumulate
/// across the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongLengthCodec {
    first: [NibbleCodec; 4],
    second: NibbleCodec,
    third: NibbleCodec,
}

impl Default for LongLengthCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LongLengthCodec {
    pub fn new() -> Self {
        Self {
            first: [NibbleCodec::new(); 4],
            second: NibbleCodec::new(),
            third: NibbleCodec::new(),
        }
    }

    pub fn decode_extra(&mut self, dec: &mut RansDecoder, pos: usize) -> Result<u32> {
        let mut value = self.first[pos & 3].decode(dec)?;
        if value == 15 {
            let second = self.second.decode(dec)?;
            value += second;
            if second == 15 {
                let third = self.third.decode(dec)?;
                value += third;
                if third == 15 {
                    value += dec.read_bits(16)?;
                }
            }
        }
        Ok(value)
    }

    pub fn encode_extra(&mut self, enc: &mut RansEncoder, pos: usize, value: u32) {
        debug_assert!(value <= LONG_LENGTH_EXTRA_MAX);

        let first = value.min(15);
        self.first[pos & 3].encode(enc, first);
        if first < 15 {
            return;
        }
        let second = (value - 15).min(15);
        self.second.encode(enc, second);
        if second < 15 {
            return;
        }
        let third = (value - 30).min(15);
        self.third.encode(enc, third);
        if third == 15 {
            enc.push_raw(value - 45, 16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_length_round_trip() {
        let values = [
            0u32,
            1,
            7,
            14,
            15,
            16,
            29,
            30,
            31,
            44,
            45,
            46,
            100,
            1000,
            LONG_LENGTH_EXTRA_MAX,
        ];

        let mut codec = LongLengthCodec::new();
        let mut encoder = RansEncoder::new();
        for pos in 0..4 {
            for &v in &values {
                codec.encode_extra(&mut encoder, pos, v);
            }
        }
        let buf = encoder.finish();

        let mut codec = LongLengthCodec::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for pos in 0..4 {
            for &v in &values {
                assert_eq!(codec.decode_extra(&mut decoder, pos).unwrap(), v);
            }
        }
        assert!(decoder.is_finished());
    }
}
