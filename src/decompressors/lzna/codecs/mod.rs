pub mod distance_codec;
pub mod length_codec;
pub mod literals_codec;
pub mod nibble_codec;
pub mod quantum_codec;
pub mod rans_codec;
