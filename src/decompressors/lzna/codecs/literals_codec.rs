//! Literal byte model.
//!
//! A literal decodes as two nibbles. When the previous operation was a
//! match, the byte sitting at the most recent match distance predicts the
//! literal: the high nibble is coded against models conditioned on the
//! predicted high nibble, and as long as the prediction holds the low
//! nibble is coded the same way. The moment a mismatch is observed the
//! remainder falls back to the `nomatch` models, which are also what a
//! fresh literal run (no predicted byte) uses directly, conditioned on the
//! previous output byte.

use super::nibble_codec::NibbleCodec;
use super::rans_codec::{RansDecoder, RansEncoder};
use crate::decompressors::lzna::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralCodec {
    upper: [NibbleCodec; 16],
    lower: [NibbleCodec; 16],
    nomatch: [NibbleCodec; 16],
}

impl Default for LiteralCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteralCodec {
    pub fn new() -> Self {
        Self {
            upper: [NibbleCodec::new(); 16],
            lower: [NibbleCodec::new(); 16],
            nomatch: [NibbleCodec::new(); 16],
        }
    }

    /// Decode a literal with no predicted byte available.
    pub fn decode_normal(&mut self, dec: &mut RansDecoder, prev_byte: u8) -> Result<u8> {
        let hi = self.nomatch[(prev_byte >> 4) as usize].decode(dec)?;
        let lo = self.nomatch[hi as usize].decode(dec)?;
        Ok((hi << 4 | lo) as u8)
    }

    /// Decode a literal predicted by `match_byte`, the byte at the most
    /// recent match distance behind the current position.
    pub fn decode_matched(&mut self, dec: &mut RansDecoder, match_byte: u8) -> Result<u8> {
        let pred_hi = (match_byte >> 4) as u32;
        let pred_lo = (match_byte & 15) as u32;

        let hi = self.upper[pred_hi as usize].decode(dec)?;
        let lo = if hi == pred_hi {
            self.lower[pred_lo as usize].decode(dec)?
        } else {
            // Prediction already failed on the high nibble.
            self.nomatch[hi as usize].decode(dec)?
        };
        Ok((hi << 4 | lo) as u8)
    }

    pub fn encode_normal(&mut self, enc: &mut RansEncoder, symbol: u8, prev_byte: u8) {
        let hi = (symbol >> 4) as u32;
        let lo = (symbol & 15) as u32;
        self.nomatch[(prev_byte >> 4) as usize].encode(enc, hi);
        self.nomatch[hi as usize].encode(enc, lo);
    }

    pub fn encode_matched(&mut self, enc: &mut RansEncoder, symbol: u8, match_byte: u8) {
        let hi = (symbol >> 4) as u32;
        let lo = (symbol & 15) as u32;
        let pred_hi = (match_byte >> 4) as u32;
        let pred_lo = (match_byte & 15) as u32;

        self.upper[pred_hi as usize].encode(enc, hi);
        if hi == pred_hi {
            self.lower[pred_lo as usize].encode(enc, lo);
        } else {
            self.nomatch[hi as usize].encode(enc, lo);
        }
    }
}
