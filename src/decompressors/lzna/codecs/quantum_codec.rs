//! The per-quantum decode loop.
//!
//! For every output position the loop decodes a literal-vs-match decision
//! conditioned on the 12-valued decoder state, dispatches to the literal
//! model or to one of the match routes (fresh far distance, near delta,
//! short or full rep-match), performs the copy against the already
//! decoded window, and advances the state. All model state lives in
//! [`LznaCodec`], owned by the caller: independent contexts decode
//! concurrently without any shared mutable state, and one context carries
//! its adaptation (and the window) across consecutive quantums until it
//! is explicitly reset.

mod state;

pub use state::{DecoderState, MatchHistory, MATCH_HISTORY_SIZE, STATES};

use super::distance_codec::{FarDistanceCodec, LowBitsDistanceCodec, NearDistanceCodec};
use super::length_codec::{LongLengthCodec, ShortRecentLengthCodec, MATCH_LEN_MIN};
use super::literals_codec::LiteralCodec;
use super::nibble_codec::{NibbleCodec, ThreeBitCodec};
use super::rans_codec::{BitProbability, RansDecoder};
use crate::decompressors::lzna::error::{LznaError, Result};

/// `is_literal` and `op_type` are additionally conditioned on the low
/// bits of the output position.
const POSITION_CONTEXTS: usize = 8;

// Operation-type nibble values.
const OP_NEW_MATCH: u32 = 0;
const OP_REP_SHORT_FIRST: u32 = 1; // 1..=8, one per history slot
const OP_REP_FULL_FIRST: u32 = 9; // 9..=12, the four most recent slots
const OP_NEAR_MATCH_FIRST: u32 = 13; // 13..=14, anchored on slots 0 and 1

/// Complete decode context: every adaptive model, the match history and
/// the decoder state. Created (or [`reset`](Self::reset)) at the start of
/// an independent decode context; evolves freely afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LznaCodec {
    state: DecoderState,
    history: MatchHistory,

    literal: [LiteralCodec; 4],
    is_literal: [BitProbability; STATES * POSITION_CONTEXTS],
    op_type: [NibbleCodec; STATES * POSITION_CONTEXTS],

    short_length_recent: [ShortRecentLengthCodec; 4],
    long_length_recent: LongLengthCodec,
    short_length: [[BitProbability; 4]; STATES],
    medium_length: ThreeBitCodec,
    long_length: LongLengthCodec,

    near_dist: [NearDistanceCodec; 2],
    far_distance: FarDistanceCodec,
    low_bits_of_distance: [LowBitsDistanceCodec; 2],
}

impl Default for LznaCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LznaCodec {
    /// A fresh context with every model at its initializer distribution.
    pub fn new() -> Self {
        Self {
            state: DecoderState::new(),
            history: MatchHistory::new(),

            literal: [LiteralCodec::new(); 4],
            is_literal: [BitProbability::new(); STATES * POSITION_CONTEXTS],
            op_type: [NibbleCodec::new(); STATES * POSITION_CONTEXTS],

            short_length_recent: [ShortRecentLengthCodec::new(); 4],
            long_length_recent: LongLengthCodec::new(),
            short_length: [[BitProbability::new(); 4]; STATES],
            medium_length: ThreeBitCodec::new(),
            long_length: LongLengthCodec::new(),

            near_dist: [NearDistanceCodec::new(); 2],
            far_distance: FarDistanceCodec::new(),
            low_bits_of_distance: [LowBitsDistanceCodec::new(), LowBitsDistanceCodec::new()],
        }
    }

    /// Reset every model to its initializer and clear the match history.
    /// The only supported way to discard adaptation between quantums.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Decode one quantum. `window[..from]` is already-decoded output (the
    /// match window; index 0 is the start of the logical output, so
    /// back-references may reach across earlier quantums). The call fills
    /// `window[from..to]` exactly and returns the number of compressed
    /// bytes consumed from `src`.
    ///
    /// On error the contents of `window[from..to]` are unspecified and the
    /// context must be reset before further use.
    pub fn decode_quantum(
        &mut self,
        window: &mut [u8],
        from: usize,
        to: usize,
        src: &[u8],
    ) -> Result<usize> {
        assert!(from <= to && to <= window.len());
        if from == to {
            return Ok(0);
        }

        let mut dec = RansDecoder::new(src)?;
        let mut pos = from;

        while pos < to {
            let st = self.state.index();
            let pos_ctx = pos & (POSITION_CONTEXTS - 1);

            if dec.decode_bit(&mut self.is_literal[st * POSITION_CONTEXTS + pos_ctx])? == 0 {
                let byte = self.decode_literal(&mut dec, window, pos)?;
                window[pos] = byte;
                pos += 1;
                self.state.update_literal();
                continue;
            }

            let op = self.op_type[st * POSITION_CONTEXTS + pos_ctx].decode(&mut dec)?;
            let (length, distance) = match op {
                OP_NEW_MATCH => {
                    let length = self.decode_match_len(&mut dec, pos, false)?;
                    let distance = self
                        .far_distance
                        .decode(&mut dec, &mut self.low_bits_of_distance)?;
                    self.history.push(distance);
                    self.state.update_match();
                    (length, distance)
                }
                1..=8 => {
                    let slot = (op - OP_REP_SHORT_FIRST) as usize;
                    let v = self.short_length_recent[slot & 3].a[st & 3].decode(&mut dec)?;
                    let length = if v == 7 {
                        9 + self.long_length_recent.decode_extra(&mut dec, pos)? as usize
                    } else {
                        MATCH_LEN_MIN + v as usize
                    };
                    let distance = self.history.promote(slot);
                    self.state.update_rep();
                    (length, distance)
                }
                9..=12 => {
                    let slot = (op - OP_REP_FULL_FIRST) as usize;
                    let length = self.decode_match_len(&mut dec, pos, true)?;
                    let distance = self.history.promote(slot);
                    self.state.update_rep();
                    (length, distance)
                }
                13..=14 => {
                    let anchor = (op - OP_NEAR_MATCH_FIRST) as usize;
                    let length = self.decode_match_len(&mut dec, pos, false)?;
                    let base = self.history.get(anchor);
                    let dist = self.near_dist[anchor].decode(&mut dec, base)?;
                    if dist <= 0 {
                        return Err(LznaError::InvalidDistance {
                            distance: 0,
                            available: pos,
                        });
                    }
                    let distance = dist as u32;
                    self.history.push(distance);
                    self.state.update_match();
                    (length, distance)
                }
                _ => return Err(LznaError::ModelCorruption),
            };

            copy_match(window, pos, to, distance, length)?;
            pos += length;
        }

        Ok(dec.bytes_consumed())
    }

    fn decode_literal(&mut self, dec: &mut RansDecoder, window: &[u8], pos: usize) -> Result<u8> {
        if self.state.after_match() {
            let dist = self.history.front() as usize;
            // At the very start of the output there may be no byte at the
            // match distance to predict from.
            if dist <= pos {
                return self.literal[pos & 3].decode_matched(dec, window[pos - dist]);
            }
        }
        let prev = if pos > 0 { window[pos - 1] } else { 0 };
        self.literal[pos & 3].decode_normal(dec, prev)
    }

    /// The general length path shared by fresh matches and full
    /// rep-matches: a state-indexed bit for the minimum length, a 3-bit
    /// model for 3..=9, and the escalating long chain beyond.
    fn decode_match_len(
        &mut self,
        dec: &mut RansDecoder,
        pos: usize,
        recent: bool,
    ) -> Result<usize> {
        let st = self.state.index();
        if dec.decode_bit(&mut self.short_length[st][pos & 3])? == 0 {
            return Ok(MATCH_LEN_MIN);
        }
        let v = self.medium_length.decode(dec)?;
        if v < 7 {
            return Ok(3 + v as usize);
        }
        let long = if recent {
            &mut self.long_length_recent
        } else {
            &mut self.long_length
        };
        Ok(10 + long.decode_extra(dec, pos)? as usize)
    }
}

/// Copy `length` bytes from `distance` behind `pos`, byte by byte so that
/// overlapping (distance < length) copies replicate correctly.
fn copy_match(
    window: &mut [u8],
    pos: usize,
    end: usize,
    distance: u32,
    length: usize,
) -> Result<()> {
    let dist = distance as usize;
    if dist == 0 || dist > pos {
        return Err(LznaError::InvalidDistance {
            distance,
            available: pos,
        });
    }
    if length > end - pos {
        return Err(LznaError::OutputOverrun {
            length,
            position: pos,
            end,
        });
    }
    for i in 0..length {
        window[pos + i] = window[pos + i - dist];
    }
    Ok(())
}
