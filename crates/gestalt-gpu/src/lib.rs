//! Vulkan descriptor layer for the Gestalt engine.
//!
//! This crate provides:
//! - A growable descriptor set allocator that chains pools on exhaustion
//! - A batched descriptor writer
//! - Descriptor set layout and descriptor buffer layout builders
//! - Sampler deduplication and push-constant range helpers
//! - A headless Vulkan context with buffer allocation via gpu-allocator
//!
//! Everything that touches descriptors goes through [`DescriptorDevice`], so the
//! allocation and update logic runs against a real device or an in-memory one.

pub mod capabilities;
pub mod context;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod instance;
pub mod memory;
pub mod push_constants;
pub mod sampler;

#[cfg(test)]
mod testing;

pub use capabilities::{DescriptorBufferSupport, GpuCapabilities, GpuVendor};
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{
    AllocatorConfig, BatchedDescriptorWriter, DescriptorAllocatorGrowable, DescriptorBinding,
    DescriptorBufferLayout, DescriptorBufferLayoutBuilder, DescriptorSetLayoutBuilder,
    DescriptorSizes, DescriptorWriter, GrowableDescriptorAllocator, PoolSizeRatio,
    BINDLESS_DESCRIPTOR_COUNT, MAX_IMAGE_ARRAY_WRITE,
};
pub use device::{
    DescriptorDevice, DescriptorWrite, LayoutBinding, VulkanDescriptorDevice, WriteResources,
};
pub use error::{GpuError, Result, VkResultExt};
pub use memory::{GpuAllocator, GpuBuffer};
pub use push_constants::{push_constant_range, PushConstantRanges, MAX_PUSH_CONSTANT_SIZE};
pub use sampler::{SamplerCache, SamplerConfig};

pub use ash;
pub use gpu_allocator::MemoryLocation;
