//! Descriptor-related device capabilities.

use crate::descriptors::{DescriptorSizes, BINDLESS_DESCRIPTOR_COUNT};
use ash::vk;
use std::collections::HashSet;
use std::ffi::CStr;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Descriptor sizes and placement rules of `VK_EXT_descriptor_buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBufferSupport {
    pub sizes: DescriptorSizes,
    pub offset_alignment: vk::DeviceSize,
}

/// Detected GPU capabilities.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    pub vendor: GpuVendor,
    pub device_name: String,
    pub api_version: u32,

    /// Descriptor indexing (bindless arrays), core since Vulkan 1.2.
    pub supports_descriptor_indexing: bool,
    /// Present when `VK_EXT_descriptor_buffer` is available.
    pub descriptor_buffer: Option<DescriptorBufferSupport>,

    pub max_bound_descriptor_sets: u32,
    pub max_per_stage_descriptor_sampled_images: u32,
    pub max_push_constants_size: u32,
    pub min_uniform_buffer_offset_alignment: vk::DeviceSize,
    pub min_storage_buffer_offset_alignment: vk::DeviceSize,
}

impl GpuCapabilities {
    /// Query capabilities from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };

        let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .unwrap_or_default();
        let available_extensions: HashSet<String> = extensions
            .iter()
            .filter_map(|ext| {
                unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                    .to_str()
                    .ok()
                    .map(String::from)
            })
            .collect();

        let api_version = properties.api_version;
        let has_vulkan_1_2 = vk::api_version_major(api_version) > 1
            || vk::api_version_minor(api_version) >= 2;

        let descriptor_buffer = if available_extensions.contains("VK_EXT_descriptor_buffer") {
            let mut buffer_props = vk::PhysicalDeviceDescriptorBufferPropertiesEXT::default();
            let mut props2 = vk::PhysicalDeviceProperties2::default().push_next(&mut buffer_props);
            unsafe { instance.get_physical_device_properties2(physical_device, &mut props2) };
            Some(DescriptorBufferSupport {
                sizes: DescriptorSizes::from_properties(&buffer_props),
                offset_alignment: buffer_props.descriptor_buffer_offset_alignment,
            })
        } else {
            None
        };

        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        let limits = properties.limits;

        Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name,
            api_version,
            supports_descriptor_indexing: has_vulkan_1_2
                || available_extensions.contains("VK_EXT_descriptor_indexing"),
            descriptor_buffer,
            max_bound_descriptor_sets: limits.max_bound_descriptor_sets,
            max_per_stage_descriptor_sampled_images: limits.max_per_stage_descriptor_sampled_images,
            max_push_constants_size: limits.max_push_constants_size,
            min_uniform_buffer_offset_alignment: limits.min_uniform_buffer_offset_alignment,
            min_storage_buffer_offset_alignment: limits.min_storage_buffer_offset_alignment,
        }
    }

    /// Whether a bindless sampled-image binding of full size fits this device.
    pub const fn supports_bindless(&self) -> bool {
        self.supports_descriptor_indexing
            && self.max_per_stage_descriptor_sampled_images >= BINDLESS_DESCRIPTOR_COUNT
    }

    /// Check if the GPU meets minimum requirements for the engine.
    pub fn meets_requirements(&self) -> bool {
        let api_major = vk::api_version_major(self.api_version);
        let api_minor = vk::api_version_minor(self.api_version);

        if api_major < 1 || (api_major == 1 && api_minor < 3) {
            return false;
        }

        self.supports_descriptor_indexing && self.max_bound_descriptor_sets >= 4
    }

    /// Get a human-readable summary of capabilities.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}) - Vulkan {}.{}.{} - bindless: {} - descriptor buffer: {}",
            self.device_name,
            self.vendor,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.supports_bindless(),
            self.descriptor_buffer.is_some(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(api_version: u32) -> GpuCapabilities {
        GpuCapabilities {
            vendor: GpuVendor::Other(0),
            device_name: "test".to_string(),
            api_version,
            supports_descriptor_indexing: true,
            descriptor_buffer: None,
            max_bound_descriptor_sets: 8,
            max_per_stage_descriptor_sampled_images: 1_000_000,
            max_push_constants_size: 128,
            min_uniform_buffer_offset_alignment: 256,
            min_storage_buffer_offset_alignment: 16,
        }
    }

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
    }

    #[test]
    fn requirements() {
        assert!(caps(vk::API_VERSION_1_3).meets_requirements());
        assert!(!caps(vk::API_VERSION_1_2).meets_requirements());

        let mut limited = caps(vk::API_VERSION_1_3);
        limited.max_per_stage_descriptor_sampled_images = 16;
        assert!(limited.meets_requirements());
        assert!(!limited.supports_bindless());
    }
}
