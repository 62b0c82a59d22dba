/// Errors produced while decoding a quantum.
///
/// Every error aborts the current quantum immediately; partial output must
/// be discarded by the caller. The decoder never reads outside the source
/// range or writes outside the destination range, however malformed the
/// input is.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LznaError {
    /// The compressed input ran out before the destination quantum was
    /// filled.
    #[error("compressed input exhausted before the quantum was filled")]
    Truncated,

    /// A decoded match distance reaches before the start of the output
    /// window.
    #[error("match distance {distance} exceeds the {available} decoded bytes")]
    InvalidDistance { distance: u32, available: usize },

    /// A decoded match would write past the end of the destination quantum.
    #[error("match of length {length} at offset {position} would overrun the quantum end {end}")]
    OutputOverrun {
        length: usize,
        position: usize,
        end: usize,
    },

    /// A decoded symbol fell outside its model's valid range. Structurally
    /// impossible for well-formed streams, but input is adversarial.
    #[error("decoded symbol outside the model's valid range")]
    ModelCorruption,
}

pub type Result<T> = std::result::Result<T, LznaError>;
