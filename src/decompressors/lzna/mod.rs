//! Decoder for the LZNA compressed format.
//!
//! LZNA is an LZ77 variant with fully adaptive entropy coding: every
//! literal, length and distance decision is resolved against an adaptive
//! probability model driven by a dual-lane rANS bitstream. A compressed
//! *quantum* (one bounded block) expands into literals and back-reference
//! copies against the already-decoded output, which doubles as the match
//! window.
//!
//! Container parsing, codec selection and compression are out of scope;
//! callers hand this module one quantum at a time.

pub mod codecs;
pub mod error;

pub use codecs::quantum_codec::LznaCodec;
pub use error::LznaError;
