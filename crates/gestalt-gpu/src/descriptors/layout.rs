//! Descriptor set layout builder.

use super::allocator::PoolSizeRatio;
use crate::device::{DescriptorDevice, LayoutBinding};
use crate::error::{GpuError, Result};
use ash::vk;

/// Upper bound of a bindless (variable-count) binding.
pub const BINDLESS_DESCRIPTOR_COUNT: u32 = 4096;

/// Descriptor set layout builder.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<LayoutBinding>,
    flags: vk::DescriptorSetLayoutCreateFlags,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding.
    pub fn binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        count: u32,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(LayoutBinding {
            binding,
            descriptor_type,
            descriptor_count: count,
            stage_flags,
            variable_count: false,
        });
        self
    }

    /// Add a variable-count, partially bound binding of up to
    /// [`BINDLESS_DESCRIPTOR_COUNT`] descriptors.
    pub fn bindless(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(LayoutBinding {
            binding,
            descriptor_type,
            descriptor_count: BINDLESS_DESCRIPTOR_COUNT,
            stage_flags,
            variable_count: true,
        });
        self
    }

    /// Add a storage buffer binding.
    pub fn storage_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(binding, vk::DescriptorType::STORAGE_BUFFER, 1, stage_flags)
    }

    /// Add a uniform buffer binding.
    pub fn uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(binding, vk::DescriptorType::UNIFORM_BUFFER, 1, stage_flags)
    }

    /// Add a storage image binding.
    pub fn storage_image(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(binding, vk::DescriptorType::STORAGE_IMAGE, 1, stage_flags)
    }

    /// Add a sampled image binding.
    pub fn sampled_image(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(
            binding,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            1,
            stage_flags,
        )
    }

    /// Set the layout create flags.
    pub fn flags(mut self, flags: vk::DescriptorSetLayoutCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Remove all bindings.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn bindings(&self) -> &[LayoutBinding] {
        &self.bindings
    }

    /// Pool ratios matching one set of this layout, merged per descriptor type.
    pub fn pool_ratios(&self) -> Vec<PoolSizeRatio> {
        let mut ratios: Vec<PoolSizeRatio> = Vec::new();
        for b in &self.bindings {
            match ratios.iter_mut().find(|r| r.descriptor_type == b.descriptor_type) {
                Some(r) => r.ratio += b.descriptor_count as f32,
                None => ratios.push(PoolSizeRatio::new(
                    b.descriptor_type,
                    b.descriptor_count as f32,
                )),
            }
        }
        ratios
    }

    fn validate(&self) -> Result<()> {
        if self.bindings.is_empty() {
            return Err(GpuError::InvalidLayout("layout has no bindings".to_string()));
        }

        for (i, b) in self.bindings.iter().enumerate() {
            if b.descriptor_count == 0 {
                return Err(GpuError::InvalidLayout(format!(
                    "binding {} has a descriptor count of zero",
                    b.binding
                )));
            }
            if self.bindings[..i].iter().any(|o| o.binding == b.binding) {
                return Err(GpuError::InvalidLayout(format!(
                    "binding {} declared twice",
                    b.binding
                )));
            }
        }

        let mut variable = self.bindings.iter().filter(|b| b.variable_count);
        if let Some(v) = variable.next() {
            if variable.next().is_some() {
                return Err(GpuError::InvalidLayout(
                    "only one variable-count binding per layout".to_string(),
                ));
            }
            let highest = self.bindings.iter().map(|b| b.binding).max().unwrap_or(0);
            if v.binding != highest {
                return Err(GpuError::InvalidLayout(format!(
                    "variable-count binding {} must be the highest binding ({highest})",
                    v.binding
                )));
            }
        }
        Ok(())
    }

    /// Build the descriptor set layout.
    ///
    /// Bindings are ordered by index, so a variable-count binding is the last one.
    pub fn build(&self, device: &dyn DescriptorDevice) -> Result<vk::DescriptorSetLayout> {
        self.validate()?;
        let mut bindings = self.bindings.clone();
        bindings.sort_by_key(|b| b.binding);
        device.create_descriptor_set_layout(&bindings, self.flags)
    }
}
