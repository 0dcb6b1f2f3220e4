//! Descriptor set management.

pub mod allocator;
pub mod buffer_layout;
pub mod layout;
pub mod writer;

pub use allocator::{
    AllocatorConfig, DescriptorAllocatorGrowable, GrowableDescriptorAllocator, PoolSizeRatio,
};
pub use buffer_layout::{
    DescriptorBinding, DescriptorBufferLayout, DescriptorBufferLayoutBuilder, DescriptorSizes,
};
pub use layout::{DescriptorSetLayoutBuilder, BINDLESS_DESCRIPTOR_COUNT};
pub use writer::{BatchedDescriptorWriter, DescriptorWriter, MAX_IMAGE_ARRAY_WRITE};
