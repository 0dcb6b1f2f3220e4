//! Headless GPU context.

use crate::capabilities::GpuCapabilities;
use crate::device::VulkanDescriptorDevice;
use crate::error::{GpuError, Result, VkResultExt};
use crate::instance::{create_instance, select_physical_device};
use crate::memory::GpuAllocator;
use ash::vk;
use gestalt_core::EngineConfig;
use parking_lot::Mutex;
use std::sync::Arc;

/// Vulkan instance, device and allocator without a presentation surface.
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) descriptor_device: VulkanDescriptorDevice,
    pub(crate) capabilities: GpuCapabilities,
    pub(crate) allocator: Mutex<GpuAllocator>,
    pub(crate) queue_family: u32,
    pub(crate) queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Descriptor operations on this context's device.
    pub fn descriptor_device(&self) -> &VulkanDescriptorDevice {
        &self.descriptor_device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get GPU capabilities.
    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.context("vkDeviceWaitIdle")
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Allocations must be freed before the device goes away
            self.allocator.lock().shutdown();

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
    physical_device_index: Option<usize>,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Gestalt".to_string(),
            enable_validation: cfg!(debug_assertions),
            physical_device_index: None,
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with the device settings of an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new()
            .app_name(config.application_name.clone())
            .validation(config.use_validation_layers)
            .physical_device_index(config.physical_device_index)
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Force a physical device instead of picking the best scoring one.
    pub fn physical_device_index(mut self, index: Option<usize>) -> Self {
        self.physical_device_index = index;
        self
    }

    /// Build the GPU context.
    pub fn build(self) -> Result<GpuContext> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        let instance = unsafe { create_instance(&entry, &self.app_name, self.enable_validation) }?;

        let (physical_device, capabilities) =
            match unsafe { select_physical_device(&instance, self.physical_device_index) } {
                Ok(selected) => selected,
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            };

        tracing::info!("Selected GPU: {}", capabilities.summary());

        let (device, queue_family, queue) =
            match unsafe { create_device(&instance, physical_device, &capabilities) } {
                Ok(created) => created,
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            };

        let device = Arc::new(device);
        let allocator =
            match unsafe { GpuAllocator::new(&instance, device.clone(), physical_device) } {
                Ok(allocator) => allocator,
                Err(e) => {
                    unsafe {
                        device.destroy_device(None);
                        instance.destroy_instance(None);
                    }
                    return Err(e);
                }
            };
        let descriptor_device = unsafe { VulkanDescriptorDevice::new(device.clone()) };

        Ok(GpuContext {
            entry,
            instance,
            physical_device,
            device,
            descriptor_device,
            capabilities,
            allocator: Mutex::new(allocator),
            queue_family,
            queue,
        })
    }
}

/// Find a queue family that supports graphics, or compute as a fallback.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn find_queue_family(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<u32> {
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let position = |flags: vk::QueueFlags| {
        families
            .iter()
            .position(|f| f.queue_flags.contains(flags))
            .map(|i| i as u32)
    };

    position(vk::QueueFlags::GRAPHICS)
        .or_else(|| position(vk::QueueFlags::COMPUTE))
        .ok_or(GpuError::NoSuitableDevice)
}

/// Create the logical device with the descriptor indexing features used by
/// bindless layouts.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    capabilities: &GpuCapabilities,
) -> Result<(ash::Device, u32, vk::Queue)> {
    let queue_family = unsafe { find_queue_family(instance, physical_device) }?;

    let queue_priority = 1.0_f32;
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family)
        .queue_priorities(std::slice::from_ref(&queue_priority))];

    let mut extension_names: Vec<*const std::ffi::c_char> = Vec::new();
    if capabilities.descriptor_buffer.is_some() {
        extension_names.push(ash::ext::descriptor_buffer::NAME.as_ptr());
    }

    let bindless = capabilities.supports_bindless();
    let mut vulkan_1_2_features = vk::PhysicalDeviceVulkan12Features::default()
        .descriptor_indexing(bindless)
        .runtime_descriptor_array(bindless)
        .descriptor_binding_partially_bound(bindless)
        .descriptor_binding_variable_descriptor_count(bindless)
        .shader_sampled_image_array_non_uniform_indexing(bindless)
        .buffer_device_address(capabilities.descriptor_buffer.is_some());

    let mut descriptor_buffer_features =
        vk::PhysicalDeviceDescriptorBufferFeaturesEXT::default().descriptor_buffer(true);

    let mut features2 =
        vk::PhysicalDeviceFeatures2::default().push_next(&mut vulkan_1_2_features);
    if capabilities.descriptor_buffer.is_some() {
        features2 = features2.push_next(&mut descriptor_buffer_features);
    }

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .push_next(&mut features2);

    let device = unsafe { instance.create_device(physical_device, &device_create_info, None) }
        .context("vkCreateDevice")?;
    let queue = unsafe { device.get_device_queue(queue_family, 0) };

    Ok((device, queue_family, queue))
}
