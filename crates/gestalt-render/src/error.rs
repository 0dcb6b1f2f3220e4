//! Render error types.

use gestalt_gpu::GpuError;
use thiserror::Error;

/// Errors raised while packing scene data into GPU buffers.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A draw references data outside its backing buffer.
    #[error("Range out of bounds: {0}")]
    RangeOutOfBounds(String),

    /// More items than the buffer was sized for.
    #[error("Capacity exceeded: {what} ({requested} > {capacity})")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        capacity: usize,
    },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
