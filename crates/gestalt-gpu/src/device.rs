//! The device seam for descriptor management.
//!
//! Allocators, writers and layout builders never call Vulkan directly. They go
//! through [`DescriptorDevice`], which [`VulkanDescriptorDevice`] implements on
//! top of an `ash::Device`.

use crate::error::{GpuError, Result, VkResultExt};
use ash::vk;
use std::sync::Arc;

/// Binding flags applied to variable-count (bindless) bindings.
pub const VARIABLE_BINDING_FLAGS: vk::DescriptorBindingFlags = vk::DescriptorBindingFlags::from_raw(
    vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT.as_raw()
        | vk::DescriptorBindingFlags::PARTIALLY_BOUND.as_raw(),
);

/// One binding of a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    /// Descriptor count, or the upper bound for a variable-count binding.
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
    /// Whether the actual count is supplied when the set is allocated.
    pub variable_count: bool,
}

/// Resources referenced by a single descriptor write.
#[derive(Debug, Clone)]
pub enum WriteResources {
    Images(Vec<vk::DescriptorImageInfo>),
    Buffers(Vec<vk::DescriptorBufferInfo>),
}

impl WriteResources {
    pub fn len(&self) -> usize {
        match self {
            Self::Images(infos) => infos.len(),
            Self::Buffers(infos) => infos.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A descriptor update targeting `array_element .. array_element + len` of one binding.
#[derive(Debug, Clone)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub array_element: u32,
    pub descriptor_type: vk::DescriptorType,
    pub resources: WriteResources,
}

impl DescriptorWrite {
    /// Number of consecutive array elements this write updates.
    pub fn descriptor_count(&self) -> u32 {
        self.resources.len() as u32
    }
}

/// Driver operations needed to create, allocate and update descriptor sets.
pub trait DescriptorDevice {
    fn create_descriptor_set_layout(
        &self,
        bindings: &[LayoutBinding],
        flags: vk::DescriptorSetLayoutCreateFlags,
    ) -> Result<vk::DescriptorSetLayout>;

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        flags: vk::DescriptorPoolCreateFlags,
    ) -> Result<vk::DescriptorPool>;

    /// Return every set allocated from the pool to the pool.
    fn reset_descriptor_pool(&self, pool: vk::DescriptorPool) -> Result<()>;

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    /// Allocate one set. Pool exhaustion is reported as
    /// `ERROR_OUT_OF_POOL_MEMORY` or `ERROR_FRAGMENTED_POOL`.
    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        variable_descriptor_count: Option<u32>,
    ) -> Result<vk::DescriptorSet>;

    /// Apply all writes to `set` in one batched update.
    fn update_descriptor_set(&self, set: vk::DescriptorSet, writes: &[DescriptorWrite]);
}

/// [`DescriptorDevice`] backed by a Vulkan logical device.
#[derive(Clone)]
pub struct VulkanDescriptorDevice {
    device: Arc<ash::Device>,
}

impl VulkanDescriptorDevice {
    /// Wrap a logical device.
    ///
    /// # Safety
    /// The device must stay valid for the lifetime of this wrapper, and every
    /// handle passed to it must have been created from the same device.
    pub unsafe fn new(device: Arc<ash::Device>) -> Self {
        Self { device }
    }

    /// Get the wrapped device.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }
}

impl DescriptorDevice for VulkanDescriptorDevice {
    fn create_descriptor_set_layout(
        &self,
        bindings: &[LayoutBinding],
        flags: vk::DescriptorSetLayoutCreateFlags,
    ) -> Result<vk::DescriptorSetLayout> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(b.descriptor_type)
                    .descriptor_count(b.descriptor_count)
                    .stage_flags(b.stage_flags)
            })
            .collect();

        let binding_flags: Vec<vk::DescriptorBindingFlags> = bindings
            .iter()
            .map(|b| {
                if b.variable_count {
                    VARIABLE_BINDING_FLAGS
                } else {
                    vk::DescriptorBindingFlags::empty()
                }
            })
            .collect();

        let mut flags_info =
            vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);

        let mut create_info = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(flags)
            .bindings(&vk_bindings);
        if binding_flags.iter().any(|f| !f.is_empty()) {
            create_info = create_info.push_next(&mut flags_info);
        }

        unsafe { self.device.create_descriptor_set_layout(&create_info, None) }
            .context("vkCreateDescriptorSetLayout")
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) };
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        flags: vk::DescriptorPoolCreateFlags,
    ) -> Result<vk::DescriptorPool> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes)
            .flags(flags);

        unsafe { self.device.create_descriptor_pool(&create_info, None) }
            .context("vkCreateDescriptorPool")
    }

    fn reset_descriptor_pool(&self, pool: vk::DescriptorPool) -> Result<()> {
        unsafe {
            self.device
                .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
        }
        .context("vkResetDescriptorPool")
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) };
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        variable_descriptor_count: Option<u32>,
    ) -> Result<vk::DescriptorSet> {
        let layouts = [layout];
        let counts = [variable_descriptor_count.unwrap_or(0)];

        let mut variable_info =
            vk::DescriptorSetVariableDescriptorCountAllocateInfo::default().descriptor_counts(&counts);

        let mut alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        if variable_descriptor_count.is_some() {
            alloc_info = alloc_info.push_next(&mut variable_info);
        }

        // Pool exhaustion is an expected result here, so it is not logged.
        let sets = unsafe { self.device.allocate_descriptor_sets(&alloc_info) }?;
        sets.first()
            .copied()
            .ok_or_else(|| GpuError::Other("vkAllocateDescriptorSets returned no set".to_string()))
    }

    fn update_descriptor_set(&self, set: vk::DescriptorSet, writes: &[DescriptorWrite]) {
        let vk_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .map(|w| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(w.binding)
                    .dst_array_element(w.array_element)
                    .descriptor_type(w.descriptor_type);
                match &w.resources {
                    WriteResources::Images(infos) => write.image_info(infos),
                    WriteResources::Buffers(infos) => write.buffer_info(infos),
                }
            })
            .collect();

        unsafe { self.device.update_descriptor_sets(&vk_writes, &[]) };
    }
}
