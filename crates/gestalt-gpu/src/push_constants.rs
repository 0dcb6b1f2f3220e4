//! Push-constant range helpers.

use crate::error::{GpuError, Result};
use ash::vk;

/// Push-constant bytes every Vulkan implementation guarantees.
pub const MAX_PUSH_CONSTANT_SIZE: u32 = 128;

/// Range covering one `T` at `offset`.
pub fn push_constant_range<T: bytemuck::Pod>(
    stage_flags: vk::ShaderStageFlags,
    offset: u32,
) -> Result<vk::PushConstantRange> {
    let size = std::mem::size_of::<T>() as u32;
    if size == 0 || size % 4 != 0 || offset % 4 != 0 {
        return Err(GpuError::InvalidLayout(format!(
            "push constant range at {offset} of {size} bytes is not 4-byte aligned"
        )));
    }
    let fits = offset
        .checked_add(size)
        .is_some_and(|end| end <= MAX_PUSH_CONSTANT_SIZE);
    if !fits {
        return Err(GpuError::InvalidLayout(format!(
            "push constant range at {offset} of {size} bytes exceeds {MAX_PUSH_CONSTANT_SIZE} bytes"
        )));
    }
    Ok(vk::PushConstantRange {
        stage_flags,
        offset,
        size,
    })
}

/// Ranges for one pipeline layout, laid out back to back.
#[derive(Debug, Clone, Default)]
pub struct PushConstantRanges {
    ranges: Vec<vk::PushConstantRange>,
    cursor: u32,
}

impl PushConstantRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a range for `T` directly after the previous one.
    pub fn push<T: bytemuck::Pod>(mut self, stage_flags: vk::ShaderStageFlags) -> Result<Self> {
        let range = push_constant_range::<T>(stage_flags, self.cursor)?;
        self.cursor = range.offset + range.size;
        self.ranges.push(range);
        Ok(self)
    }

    pub fn ranges(&self) -> &[vk::PushConstantRange] {
        &self.ranges
    }

    /// Bytes used by all ranges.
    pub const fn size(&self) -> u32 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
    struct DrawConstants {
        draw_id: u32,
        material: u32,
    }

    #[test]
    fn range_matches_type_size() {
        let range = push_constant_range::<DrawConstants>(vk::ShaderStageFlags::VERTEX, 16).unwrap();
        assert_eq!(range.offset, 16);
        assert_eq!(range.size, 8);
    }

    #[test]
    fn misaligned_or_oversized_ranges_fail() {
        assert!(push_constant_range::<u16>(vk::ShaderStageFlags::VERTEX, 0).is_err());
        assert!(push_constant_range::<u32>(vk::ShaderStageFlags::VERTEX, 2).is_err());
        assert!(push_constant_range::<[glam::Mat4; 2]>(vk::ShaderStageFlags::VERTEX, 4).is_err());
        assert!(push_constant_range::<[glam::Mat4; 2]>(vk::ShaderStageFlags::VERTEX, 0).is_ok());
    }

    #[test]
    fn offset_near_u32_max_is_rejected() {
        let err = push_constant_range::<DrawConstants>(vk::ShaderStageFlags::VERTEX, u32::MAX - 3)
            .unwrap_err();
        assert!(matches!(err, GpuError::InvalidLayout(_)));
    }

    #[test]
    fn ranges_are_packed() {
        let ranges = PushConstantRanges::new()
            .push::<glam::Mat4>(vk::ShaderStageFlags::VERTEX)
            .and_then(|r| r.push::<DrawConstants>(vk::ShaderStageFlags::FRAGMENT))
            .unwrap();
        assert_eq!(ranges.ranges()[1].offset, 64);
        assert_eq!(ranges.size(), 72);
    }
}
