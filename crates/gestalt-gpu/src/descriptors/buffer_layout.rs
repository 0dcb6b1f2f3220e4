//! Binding layout of a descriptor buffer (`VK_EXT_descriptor_buffer`).
//!
//! A descriptor buffer stores the descriptors of one set back to back. Each
//! binding starts at an offset aligned to the device's
//! `descriptorBufferOffsetAlignment`, and array element `i` of a binding sits
//! `i * descriptor_size` bytes after that offset.

use crate::error::{GpuError, Result};
use ash::vk;

/// One binding slot in a packed descriptor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    /// Size of a single descriptor in bytes.
    pub descriptor_size: usize,
    /// Number of array elements.
    pub descriptor_count: u32,
    pub binding: u32,
    /// Byte offset of the first element in the buffer.
    pub offset: vk::DeviceSize,
}

impl DescriptorBinding {
    /// Bytes occupied by all elements of the binding.
    pub const fn size(&self) -> vk::DeviceSize {
        (self.descriptor_size as vk::DeviceSize) * self.descriptor_count as vk::DeviceSize
    }
}

/// Per-device descriptor sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorSizes {
    pub uniform_buffer: usize,
    pub storage_buffer: usize,
    pub uniform_texel_buffer: usize,
    pub storage_texel_buffer: usize,
    pub sampler: usize,
    pub combined_image_sampler: usize,
    pub sampled_image: usize,
    pub storage_image: usize,
    pub input_attachment: usize,
}

impl DescriptorSizes {
    pub fn from_properties(props: &vk::PhysicalDeviceDescriptorBufferPropertiesEXT<'_>) -> Self {
        Self {
            uniform_buffer: props.uniform_buffer_descriptor_size,
            storage_buffer: props.storage_buffer_descriptor_size,
            uniform_texel_buffer: props.uniform_texel_buffer_descriptor_size,
            storage_texel_buffer: props.storage_texel_buffer_descriptor_size,
            sampler: props.sampler_descriptor_size,
            combined_image_sampler: props.combined_image_sampler_descriptor_size,
            sampled_image: props.sampled_image_descriptor_size,
            storage_image: props.storage_image_descriptor_size,
            input_attachment: props.input_attachment_descriptor_size,
        }
    }

    /// Size of one descriptor of `ty`.
    pub fn size_of(&self, ty: vk::DescriptorType) -> Result<usize> {
        let size = match ty {
            vk::DescriptorType::UNIFORM_BUFFER => self.uniform_buffer,
            vk::DescriptorType::STORAGE_BUFFER => self.storage_buffer,
            vk::DescriptorType::UNIFORM_TEXEL_BUFFER => self.uniform_texel_buffer,
            vk::DescriptorType::STORAGE_TEXEL_BUFFER => self.storage_texel_buffer,
            vk::DescriptorType::SAMPLER => self.sampler,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER => self.combined_image_sampler,
            vk::DescriptorType::SAMPLED_IMAGE => self.sampled_image,
            vk::DescriptorType::STORAGE_IMAGE => self.storage_image,
            vk::DescriptorType::INPUT_ATTACHMENT => self.input_attachment,
            other => {
                return Err(GpuError::InvalidLayout(format!(
                    "{other:?} is not supported in descriptor buffers"
                )))
            }
        };
        if size == 0 {
            return Err(GpuError::InvalidLayout(format!(
                "device reports a zero descriptor size for {ty:?}"
            )));
        }
        Ok(size)
    }
}

/// Assigns aligned offsets to bindings in the order they are added.
#[derive(Debug, Clone)]
pub struct DescriptorBufferLayoutBuilder {
    sizes: DescriptorSizes,
    alignment: vk::DeviceSize,
    bindings: Vec<DescriptorBinding>,
    cursor: vk::DeviceSize,
}

impl DescriptorBufferLayoutBuilder {
    /// `offset_alignment` is `descriptorBufferOffsetAlignment`, zero is treated as 1.
    pub fn new(sizes: DescriptorSizes, offset_alignment: vk::DeviceSize) -> Self {
        Self {
            sizes,
            alignment: offset_alignment.max(1),
            bindings: Vec::new(),
            cursor: 0,
        }
    }

    /// Append `count` descriptors of `ty` at `binding`.
    pub fn add_binding(mut self, binding: u32, ty: vk::DescriptorType, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(GpuError::InvalidLayout(format!(
                "binding {binding} has a descriptor count of zero"
            )));
        }
        if self.bindings.iter().any(|b| b.binding == binding) {
            return Err(GpuError::InvalidLayout(format!(
                "binding {binding} declared twice"
            )));
        }

        let descriptor_size = self.sizes.size_of(ty)?;
        let offset = align_up(self.cursor, self.alignment);
        let entry = DescriptorBinding {
            descriptor_size,
            descriptor_count: count,
            binding,
            offset,
        };
        self.cursor = offset + entry.size();
        self.bindings.push(entry);
        Ok(self)
    }

    pub fn build(self) -> DescriptorBufferLayout {
        DescriptorBufferLayout {
            size: align_up(self.cursor, self.alignment),
            bindings: self.bindings,
        }
    }
}

/// Final binding layout of a descriptor buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBufferLayout {
    bindings: Vec<DescriptorBinding>,
    size: vk::DeviceSize,
}

impl DescriptorBufferLayout {
    /// Total buffer size, aligned.
    pub const fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    pub fn binding(&self, binding: u32) -> Option<&DescriptorBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    /// Byte offset of array element `index` of `binding`.
    pub fn descriptor_offset(&self, binding: u32, index: u32) -> Result<vk::DeviceSize> {
        let b = self.binding(binding).ok_or_else(|| {
            GpuError::InvalidLayout(format!("binding {binding} is not in the layout"))
        })?;
        if index >= b.descriptor_count {
            return Err(GpuError::InvalidLayout(format!(
                "element {index} out of range for binding {binding} with {} elements",
                b.descriptor_count
            )));
        }
        Ok(b.offset + vk::DeviceSize::from(index) * b.descriptor_size as vk::DeviceSize)
    }
}

const fn align_up(value: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes() -> DescriptorSizes {
        DescriptorSizes {
            uniform_buffer: 16,
            storage_buffer: 16,
            sampler: 8,
            combined_image_sampler: 32,
            sampled_image: 24,
            storage_image: 24,
            ..DescriptorSizes::default()
        }
    }

    #[test]
    fn offsets_are_monotonic_and_aligned() {
        let layout = DescriptorBufferLayoutBuilder::new(sizes(), 64)
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER, 1)
            .and_then(|b| b.add_binding(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 5))
            .and_then(|b| b.add_binding(2, vk::DescriptorType::STORAGE_BUFFER, 3))
            .unwrap()
            .build();

        let offsets: Vec<_> = layout.bindings().iter().map(|b| b.offset).collect();
        assert_eq!(offsets, vec![0, 64, 256]);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        assert!(offsets.iter().all(|o| o % 64 == 0));
        // 256 + 3 * 16 = 304, aligned
        assert_eq!(layout.size(), 320);
    }

    #[test]
    fn element_offsets() {
        let layout = DescriptorBufferLayoutBuilder::new(sizes(), 16)
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER, 1)
            .and_then(|b| b.add_binding(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 4))
            .unwrap()
            .build();
        assert_eq!(layout.descriptor_offset(1, 0).unwrap(), 16);
        assert_eq!(layout.descriptor_offset(1, 3).unwrap(), 16 + 3 * 32);
        assert!(layout.descriptor_offset(1, 4).is_err());
        assert!(layout.descriptor_offset(7, 0).is_err());
    }

    #[test]
    fn invalid_bindings_are_rejected() {
        let builder = DescriptorBufferLayoutBuilder::new(sizes(), 16);
        assert!(builder
            .clone()
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER, 0)
            .is_err());
        // no size reported for input attachments
        assert!(builder
            .clone()
            .add_binding(0, vk::DescriptorType::INPUT_ATTACHMENT, 1)
            .is_err());
        assert!(builder
            .clone()
            .add_binding(0, vk::DescriptorType::ACCELERATION_STRUCTURE_KHR, 1)
            .is_err());
        assert!(builder
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER, 1)
            .and_then(|b| b.add_binding(0, vk::DescriptorType::STORAGE_BUFFER, 1))
            .is_err());
    }
}
