//! Batched descriptor writes.

use crate::device::{DescriptorDevice, DescriptorWrite, WriteResources};
use crate::error::{GpuError, Result};
use ash::vk;
use gestalt_core::limits::MAX_MATERIALS;

/// Most combined image samplers accepted by a single array write.
pub const MAX_IMAGE_ARRAY_WRITE: usize = 5;

/// Records descriptor writes and applies them to a set in one update.
pub trait DescriptorWriter {
    fn write_image(
        &mut self,
        binding: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
        descriptor_type: vk::DescriptorType,
    );

    fn write_buffer(
        &mut self,
        binding: u32,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
        descriptor_type: vk::DescriptorType,
    );

    /// Write consecutive buffer descriptors starting at `array_element_start`.
    fn write_buffer_array(
        &mut self,
        binding: u32,
        infos: &[vk::DescriptorBufferInfo],
        descriptor_type: vk::DescriptorType,
        array_element_start: u32,
    ) -> Result<()>;

    /// Write up to [`MAX_IMAGE_ARRAY_WRITE`] combined image samplers starting
    /// at `array_element_start`.
    fn write_image_array(
        &mut self,
        binding: u32,
        infos: &[vk::DescriptorImageInfo],
        array_element_start: u32,
    ) -> Result<()>;

    /// Write an image array of any length as consecutive chunks.
    fn write_image_array_chunked(
        &mut self,
        binding: u32,
        infos: &[vk::DescriptorImageInfo],
        array_element_start: u32,
    ) -> Result<()> {
        let mut element = array_element_start;
        for chunk in infos.chunks(MAX_IMAGE_ARRAY_WRITE) {
            self.write_image_array(binding, chunk, element)?;
            element += chunk.len() as u32;
        }
        Ok(())
    }

    /// Drop all pending writes.
    fn clear(&mut self);

    /// Apply the pending writes to `set`.
    fn update_set(&mut self, device: &dyn DescriptorDevice, set: vk::DescriptorSet) -> Result<()>;
}

/// [`DescriptorWriter`] that owns its pending writes.
///
/// Writes stay pending after [`update_set`](DescriptorWriter::update_set), so
/// one recorded batch can be applied to the set of every frame in flight.
#[derive(Debug, Default)]
pub struct BatchedDescriptorWriter {
    writes: Vec<DescriptorWrite>,
}

impl BatchedDescriptorWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            writes: Vec::with_capacity(capacity),
        }
    }

    /// Writer sized for a full material table.
    pub fn for_materials() -> Self {
        Self::with_capacity(MAX_MATERIALS as usize)
    }

    pub fn pending_writes(&self) -> &[DescriptorWrite] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

impl DescriptorWriter for BatchedDescriptorWriter {
    fn write_image(
        &mut self,
        binding: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
        descriptor_type: vk::DescriptorType,
    ) {
        let info = vk::DescriptorImageInfo {
            sampler,
            image_view,
            image_layout: layout,
        };
        self.writes.push(DescriptorWrite {
            binding,
            array_element: 0,
            descriptor_type,
            resources: WriteResources::Images(vec![info]),
        });
    }

    fn write_buffer(
        &mut self,
        binding: u32,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
        descriptor_type: vk::DescriptorType,
    ) {
        let info = vk::DescriptorBufferInfo {
            buffer,
            offset,
            range: size,
        };
        self.writes.push(DescriptorWrite {
            binding,
            array_element: 0,
            descriptor_type,
            resources: WriteResources::Buffers(vec![info]),
        });
    }

    fn write_buffer_array(
        &mut self,
        binding: u32,
        infos: &[vk::DescriptorBufferInfo],
        descriptor_type: vk::DescriptorType,
        array_element_start: u32,
    ) -> Result<()> {
        if infos.is_empty() {
            return Err(GpuError::InvalidWrite(format!(
                "empty buffer array write to binding {binding}"
            )));
        }
        self.writes.push(DescriptorWrite {
            binding,
            array_element: array_element_start,
            descriptor_type,
            resources: WriteResources::Buffers(infos.to_vec()),
        });
        Ok(())
    }

    fn write_image_array(
        &mut self,
        binding: u32,
        infos: &[vk::DescriptorImageInfo],
        array_element_start: u32,
    ) -> Result<()> {
        if infos.is_empty() || infos.len() > MAX_IMAGE_ARRAY_WRITE {
            return Err(GpuError::InvalidWrite(format!(
                "image array write to binding {binding} takes 1 to {MAX_IMAGE_ARRAY_WRITE} images, got {}",
                infos.len()
            )));
        }
        self.writes.push(DescriptorWrite {
            binding,
            array_element: array_element_start,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            resources: WriteResources::Images(infos.to_vec()),
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.writes.clear();
    }

    fn update_set(&mut self, device: &dyn DescriptorDevice, set: vk::DescriptorSet) -> Result<()> {
        if set == vk::DescriptorSet::null() {
            return Err(GpuError::InvalidState(
                "descriptor update targets a null set".to_string(),
            ));
        }
        if self.writes.is_empty() {
            return Ok(());
        }
        tracing::trace!("Updating descriptor set with {} writes", self.writes.len());
        device.update_descriptor_set(set, &self.writes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::allocator::{
        DescriptorAllocatorGrowable, GrowableDescriptorAllocator, PoolSizeRatio,
    };
    use crate::testing::{MockDescriptor, MockDescriptorDevice};
    use ash::vk::Handle;

    const SAMPLER: vk::DescriptorType = vk::DescriptorType::COMBINED_IMAGE_SAMPLER;

    fn image(n: u64) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: vk::Sampler::from_raw(100),
            image_view: vk::ImageView::from_raw(n),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    fn setup(
        ty: vk::DescriptorType,
        count: u32,
    ) -> (MockDescriptorDevice, GrowableDescriptorAllocator, vk::DescriptorSet) {
        let device = MockDescriptorDevice::new();
        let layout = device.simple_layout(ty, count);
        let mut allocator = GrowableDescriptorAllocator::default();
        allocator
            .init(&device, 4, &[PoolSizeRatio::new(ty, count as f32)])
            .unwrap();
        let set = allocator.allocate(&device, layout, &[]).unwrap();
        (device, allocator, set)
    }

    #[test]
    fn partial_image_array_write_touches_only_its_range() {
        let (device, mut allocator, set) = setup(SAMPLER, 10);
        let mut writer = BatchedDescriptorWriter::new();
        writer.write_image_array(0, &[image(1), image(2)], 3).unwrap();
        writer.update_set(&device, set).unwrap();

        let contents = device.contents(set, 0);
        for (i, element) in contents.iter().enumerate() {
            match i {
                3 | 4 => assert_eq!(
                    *element,
                    Some(MockDescriptor::Image {
                        view: vk::ImageView::from_raw(i as u64 - 2),
                        sampler: vk::Sampler::from_raw(100),
                        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    })
                ),
                _ => assert_eq!(*element, None, "element {i} was written"),
            }
        }
        allocator.destroy_pools(&device);
    }

    #[test]
    fn single_image_lands_in_first_element() {
        let (device, mut allocator, set) = setup(SAMPLER, 3);
        let mut writer = BatchedDescriptorWriter::new();
        writer.write_image(
            0,
            vk::ImageView::from_raw(9),
            vk::Sampler::from_raw(100),
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            SAMPLER,
        );
        writer.update_set(&device, set).unwrap();

        assert_eq!(
            device.contents(set, 0),
            vec![
                Some(MockDescriptor::Image {
                    view: vk::ImageView::from_raw(9),
                    sampler: vk::Sampler::from_raw(100),
                    layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                }),
                None,
                None,
            ]
        );
        assert_eq!(device.update_calls(), 1);
        allocator.destroy_pools(&device);
    }

    #[test]
    fn image_array_limit() {
        let mut writer = BatchedDescriptorWriter::new();
        let six: Vec<_> = (0..6).map(image).collect();
        assert!(matches!(
            writer.write_image_array(0, &six, 0),
            Err(GpuError::InvalidWrite(_))
        ));
        assert!(matches!(
            writer.write_image_array(0, &[], 0),
            Err(GpuError::InvalidWrite(_))
        ));
        assert!(writer.is_empty());
        writer.write_image_array(0, &six[..5], 0).unwrap();
        assert_eq!(writer.pending_writes().len(), 1);
    }

    #[test]
    fn chunked_write_covers_every_element() {
        let (device, mut allocator, set) = setup(SAMPLER, 16);
        let mut writer = BatchedDescriptorWriter::new();
        let images: Vec<_> = (1..=12).map(image).collect();
        writer.write_image_array_chunked(0, &images, 2).unwrap();
        assert_eq!(writer.pending_writes().len(), 3);
        assert_eq!(
            writer
                .pending_writes()
                .iter()
                .map(|w| w.array_element)
                .collect::<Vec<_>>(),
            vec![2, 7, 12]
        );

        writer.update_set(&device, set).unwrap();
        assert_eq!(device.update_calls(), 1);
        let written = device.contents(set, 0).iter().filter(|e| e.is_some()).count();
        assert_eq!(written, 12);
        allocator.destroy_pools(&device);
    }

    #[test]
    fn clear_then_update_leaves_set_untouched() {
        let (device, mut allocator, set) = setup(vk::DescriptorType::UNIFORM_BUFFER, 1);
        let mut writer = BatchedDescriptorWriter::new();
        writer.write_buffer(
            0,
            vk::Buffer::from_raw(7),
            256,
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
        );
        writer.clear();
        writer.update_set(&device, set).unwrap();

        assert_eq!(device.update_calls(), 0);
        assert_eq!(device.contents(set, 0), vec![None]);
        allocator.destroy_pools(&device);
    }

    #[test]
    fn same_writes_apply_to_every_frame_set() {
        let device = MockDescriptorDevice::new();
        let layout = device.simple_layout(vk::DescriptorType::UNIFORM_BUFFER, 1);
        let mut allocator = GrowableDescriptorAllocator::default();
        allocator
            .init(
                &device,
                4,
                &[PoolSizeRatio::new(vk::DescriptorType::UNIFORM_BUFFER, 1.0)],
            )
            .unwrap();
        let sets: Vec<_> = (0..2)
            .map(|_| allocator.allocate(&device, layout, &[]).unwrap())
            .collect();

        let mut writer = BatchedDescriptorWriter::new();
        writer.write_buffer(
            0,
            vk::Buffer::from_raw(9),
            64,
            128,
            vk::DescriptorType::UNIFORM_BUFFER,
        );
        for &set in &sets {
            writer.update_set(&device, set).unwrap();
        }

        let expected = Some(MockDescriptor::Buffer {
            buffer: vk::Buffer::from_raw(9),
            offset: 128,
            range: 64,
        });
        for &set in &sets {
            assert_eq!(device.contents(set, 0), vec![expected]);
        }
        assert_eq!(device.update_calls(), 2);
        allocator.destroy_pools(&device);
    }

    #[test]
    fn buffer_array_starts_at_requested_element() {
        let (device, mut allocator, set) = setup(vk::DescriptorType::STORAGE_BUFFER, 4);
        let infos = [
            vk::DescriptorBufferInfo {
                buffer: vk::Buffer::from_raw(1),
                offset: 0,
                range: vk::WHOLE_SIZE,
            },
            vk::DescriptorBufferInfo {
                buffer: vk::Buffer::from_raw(2),
                offset: 0,
                range: vk::WHOLE_SIZE,
            },
        ];
        let mut writer = BatchedDescriptorWriter::new();
        writer
            .write_buffer_array(0, &infos, vk::DescriptorType::STORAGE_BUFFER, 1)
            .unwrap();
        writer.update_set(&device, set).unwrap();

        let contents = device.contents(set, 0);
        assert_eq!(contents[0], None);
        assert!(contents[1].is_some());
        assert!(contents[2].is_some());
        assert_eq!(contents[3], None);
        allocator.destroy_pools(&device);
    }

    #[test]
    fn null_set_is_rejected() {
        let device = MockDescriptorDevice::new();
        let mut writer = BatchedDescriptorWriter::new();
        let err = writer
            .update_set(&device, vk::DescriptorSet::null())
            .unwrap_err();
        assert!(matches!(err, GpuError::InvalidState(_)));
    }
}
