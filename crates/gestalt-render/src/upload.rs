//! Copying packed arrays into host-visible buffers.

use crate::error::{RenderError, Result};
use bytemuck::Pod;
use gestalt_gpu::ash::vk;
use gestalt_gpu::{GpuAllocator, GpuBuffer, MemoryLocation};

/// Byte size of `capacity` elements of `T`.
pub const fn array_size<T>(capacity: usize) -> u64 {
    (capacity * std::mem::size_of::<T>()) as u64
}

/// Host-visible buffer holding up to `capacity` elements of `T`.
pub fn create_array_buffer<T: Pod>(
    allocator: &mut GpuAllocator,
    capacity: usize,
    usage: vk::BufferUsageFlags,
    name: &str,
) -> Result<GpuBuffer> {
    // zero-capacity arrays still get one element so the binding stays valid
    let size = array_size::<T>(capacity.max(1));
    Ok(allocator.create_buffer(size, usage, MemoryLocation::CpuToGpu, name)?)
}

/// Check that `len` elements of `T` fit in `buffer_size` bytes.
pub fn check_capacity<T>(what: &'static str, len: usize, buffer_size: u64) -> Result<()> {
    let capacity = (buffer_size / std::mem::size_of::<T>().max(1) as u64) as usize;
    if len > capacity {
        return Err(RenderError::CapacityExceeded {
            what,
            requested: len,
            capacity,
        });
    }
    Ok(())
}

/// Copy `items` to the start of `buffer`.
pub fn upload_slice<T: Pod>(what: &'static str, buffer: &GpuBuffer, items: &[T]) -> Result<()> {
    check_capacity::<T>(what, items.len(), buffer.size)?;
    if items.is_empty() {
        return Ok(());
    }
    buffer.write_pod(0, items)?;
    tracing::trace!("Uploaded {} {what} ({} bytes)", items.len(), array_size::<T>(items.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_types::GpuPointLight;

    #[test]
    fn capacity_in_elements() {
        let size = array_size::<GpuPointLight>(4);
        assert_eq!(size, 128);
        assert!(check_capacity::<GpuPointLight>("point lights", 4, size).is_ok());
        let err = check_capacity::<GpuPointLight>("point lights", 5, size).unwrap_err();
        assert!(matches!(
            err,
            RenderError::CapacityExceeded {
                requested: 5,
                capacity: 4,
                ..
            }
        ));
    }
}
