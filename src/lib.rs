pub mod decompressors;

pub use decompressors::lzna::{LznaCodec, LznaError};
