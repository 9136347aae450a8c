use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantizeError {
    #[error("conversion cancelled by progress callback")]
    Cancelled,

    #[error("failed to allocate working buffers")]
    OutOfMemory,

    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    #[error("{channel} plane length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        channel: &'static str,
        len: usize,
        width: usize,
        height: usize,
    },

    /// A median-cut box reached color computation with no population.
    #[error("median-cut box {index} has zero population")]
    EmptyBox { index: usize },
}

impl From<alloc::collections::TryReserveError> for QuantizeError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
