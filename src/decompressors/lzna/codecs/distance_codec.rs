//! Match-distance models.
//!
//! Distances that do not reuse a history slot take one of two routes. The
//! far route codes the raw distance by bit length: two chained nibbles
//! give the index of the top set bit, the two bits below it are modeled
//! per bit length, the lowest byte (or lowest bit for narrow distances)
//! comes from the shared low-bits models, and everything in between is raw
//! lane-B bits. The near route delta-codes against one of the two most
//! recent history distances, with its own magnitude and sign models per
//! anchor.

use super::nibble_codec::NibbleCodec;
use super::rans_codec::{BitProbability, RansDecoder, RansEncoder, MAX_RAW_BITS};
use crate::decompressors::lzna::error::Result;

/// Distances fit in 31 bits; the bit-length index is 0..=30.
const BIT_LENGTHS: usize = 31;

/// Largest delta the near route can express against its anchor.
pub const NEAR_DELTA_MAX: u32 = 32;

/// Models for the lowest bits of a far distance, shared between the two
/// bit-length parities. `d` covers the low byte of wide distances, `v` the
/// lowest bit of narrow ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowBitsDistanceCodec {
    d: [NibbleCodec; 2],
    v: BitProbability,
}

impl Default for LowBitsDistanceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LowBitsDistanceCodec {
    pub fn new() -> Self {
        Self {
            d: [NibbleCodec::new(); 2],
            v: BitProbability::new(),
        }
    }
}

/// Raw lane-B bits wider than one refill-safe group.
fn read_wide(dec: &mut RansDecoder, count: u32) -> Result<u32> {
    if count > MAX_RAW_BITS {
        let hi = dec.read_bits(count - MAX_RAW_BITS)?;
        let lo = dec.read_bits(MAX_RAW_BITS)?;
        Ok(hi << MAX_RAW_BITS | lo)
    } else {
        dec.read_bits(count)
    }
}

fn push_wide(enc: &mut RansEncoder, value: u32, count: u32) {
    if count > MAX_RAW_BITS {
        enc.push_raw(value >> MAX_RAW_BITS, count - MAX_RAW_BITS);
        enc.push_raw(value & ((1 << MAX_RAW_BITS) - 1), MAX_RAW_BITS);
    } else {
        enc.push_raw(value, count);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarDistanceCodec {
    first_lo: NibbleCodec,
    first_hi: NibbleCodec,
    second: [BitProbability; BIT_LENGTHS],
    third: [[BitProbability; BIT_LENGTHS]; 2],
}

impl Default for FarDistanceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FarDistanceCodec {
    pub fn new() -> Self {
        Self {
            first_lo: NibbleCodec::new(),
            first_hi: NibbleCodec::new(),
            second: [BitProbability::new(); BIT_LENGTHS],
            third: [[BitProbability::new(); BIT_LENGTHS]; 2],
        }
    }

    pub fn decode(
        &mut self,
        dec: &mut RansDecoder,
        low_bits: &mut [LowBitsDistanceCodec; 2],
    ) -> Result<u32> {
        let mut bl = self.first_lo.decode(dec)?;
        if bl == 15 {
            bl += self.first_hi.decode(dec)?;
        }
        if bl == 0 {
            return Ok(1);
        }
        let bl_idx = bl as usize;

        let b1 = dec.decode_bit(&mut self.second[bl_idx])?;
        let mut dist = (1 << bl) | b1 << (bl - 1);
        let mut rem = bl - 1;
        if rem > 0 {
            rem -= 1;
            let b2 = dec.decode_bit(&mut self.third[b1 as usize][bl_idx])?;
            dist |= b2 << rem;
        }

        let low = &mut low_bits[(bl & 1) as usize];
        if rem >= 8 {
            dist |= read_wide(dec, rem - 8)? << 8;
            dist |= low.d[0].decode(dec)? << 4;
            dist |= low.d[1].decode(dec)?;
        } else if rem >= 1 {
            dist |= dec.read_bits(rem - 1)? << 1;
            dist |= dec.decode_bit(&mut low.v)?;
        }
        Ok(dist)
    }

    pub fn encode(
        &mut self,
        enc: &mut RansEncoder,
        low_bits: &mut [LowBitsDistanceCodec; 2],
        dist: u32,
    ) {
        debug_assert!(dist >= 1 && dist < 1 << BIT_LENGTHS);

        let bl = 31 - dist.leading_zeros();
        if bl >= 15 {
            self.first_lo.encode(enc, 15);
            self.first_hi.encode(enc, bl - 15);
        } else {
            self.first_lo.encode(enc, bl);
        }
        if bl == 0 {
            return;
        }
        let bl_idx = bl as usize;

        let b1 = dist >> (bl - 1) & 1;
        enc.encode_bit(&mut self.second[bl_idx], b1);
        let mut rem = bl - 1;
        if rem > 0 {
            rem -= 1;
            enc.encode_bit(&mut self.third[b1 as usize][bl_idx], dist >> rem & 1);
        }

        let low = &mut low_bits[(bl & 1) as usize];
        if rem >= 8 {
            push_wide(enc, dist >> 8 & ((1 << (rem - 8)) - 1), rem - 8);
            low.d[0].encode(enc, dist >> 4 & 15);
            low.d[1].encode(enc, dist & 15);
        } else if rem >= 1 {
            enc.push_raw(dist >> 1 & ((1 << (rem - 1)) - 1), rem - 1);
            enc.encode_bit(&mut low.v, dist & 1);
        }
    }
}

/// Delta coder against one of the two most recent match distances: a 4-bit
/// magnitude, a sign conditioned on the magnitude, and an extension bit
/// lifting the magnitude into 17..=32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearDistanceCodec {
    first: NibbleCodec,
    second: [BitProbability; 16],
    third: [[BitProbability; 16]; 2],
}

impl Default for NearDistanceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl NearDistanceCodec {
    pub fn new() -> Self {
        Self {
            first: NibbleCodec::new(),
            second: [BitProbability::new(); 16],
            third: [[BitProbability::new(); 16]; 2],
        }
    }

    /// Decode a distance relative to `base`. The result can be zero or
    /// negative for corrupt input; the caller validates it against the
    /// window.
    pub fn decode(&mut self, dec: &mut RansDecoder, base: u32) -> Result<i64> {
        let m = self.first.decode(dec)? as usize;
        let sign = dec.decode_bit(&mut self.second[m])?;
        let ext = dec.decode_bit(&mut self.third[sign as usize][m])?;
        let magnitude = (1 + m as u32 + (ext << 4)) as i64;

        if sign == 0 {
            Ok(base as i64 + magnitude)
        } else {
            Ok(base as i64 - magnitude)
        }
    }

    pub fn encode(&mut self, enc: &mut RansEncoder, base: u32, dist: u32) {
        let delta = dist as i64 - base as i64;
        debug_assert!(delta != 0 && delta.unsigned_abs() <= NEAR_DELTA_MAX as u64);

        let magnitude = delta.unsigned_abs() as u32 - 1;
        let m = (magnitude & 15) as usize;
        let sign = (delta < 0) as u32;
        let ext = magnitude >> 4;

        self.first.encode(enc, m as u32);
        enc.encode_bit(&mut self.second[m], sign);
        enc.encode_bit(&mut self.third[sign as usize][m], ext);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_far_distance_round_trip() {
        // One distance per bit length plus the boundaries of each layout
        // regime (modeled-only, lowest-bit, low-byte, chunked raw middle).
        let mut dists: Vec<u32> = vec![1, 2, 3, 4, 5, 7, 8, 11, 255, 256, 511, 0x7FFF_FFFF];
        for bl in 1..31 {
            dists.push(1 << bl);
            dists.push((1 << bl) | ((1 << bl) - 1) / 3);
        }

        let mut codec = FarDistanceCodec::new();
        let mut low = [LowBitsDistanceCodec::new(), LowBitsDistanceCodec::new()];
        let mut encoder = RansEncoder::new();
        for &d in &dists {
            codec.encode(&mut encoder, &mut low, d);
        }
        let buf = encoder.finish();

        let mut codec = FarDistanceCodec::new();
        let mut low = [LowBitsDistanceCodec::new(), LowBitsDistanceCodec::new()];
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for &d in &dists {
            assert_eq!(codec.decode(&mut decoder, &mut low).unwrap(), d);
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_near_distance_round_trip() {
        let base = 1000u32;

        let mut codec = NearDistanceCodec::new();
        let mut encoder = RansEncoder::new();
        for mag in 1..=NEAR_DELTA_MAX {
            codec.encode(&mut encoder, base, base + mag);
            codec.encode(&mut encoder, base, base - mag);
        }
        let buf = encoder.finish();

        let mut codec = NearDistanceCodec::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        for mag in 1..=NEAR_DELTA_MAX {
            assert_eq!(
                codec.decode(&mut decoder, base).unwrap(),
                (base + mag) as i64
            );
            assert_eq!(
                codec.decode(&mut decoder, base).unwrap(),
                (base - mag) as i64
            );
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_near_distance_can_undershoot_base() {
        // A delta below the anchor may produce a non-positive distance on
        // corrupt input; the decoder reports it rather than wrapping.
        let mut codec = NearDistanceCodec::new();
        let mut encoder = RansEncoder::new();
        codec.encode(&mut encoder, 40, 8);
        let buf = encoder.finish();

        let mut codec = NearDistanceCodec::new();
        let mut decoder = RansDecoder::new(&buf).unwrap();
        // Same coded delta against a smaller anchor goes negative.
        assert_eq!(codec.decode(&mut decoder, 10).unwrap(), 10 - 32);
    }
}
