//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// Vulkan call failed, with the name of the failing call.
    #[error("Vulkan error: {result} in call: {call}")]
    VulkanCall {
        call: &'static str,
        result: vk::Result,
    },

    /// No descriptor pool could satisfy an allocation and growth is not possible.
    #[error("Descriptor pool exhausted: {0}")]
    PoolExhausted(String),

    /// Descriptor layout or binding description is invalid.
    #[error("Invalid descriptor layout: {0}")]
    InvalidLayout(String),

    /// Descriptor write request is invalid.
    #[error("Invalid descriptor write: {0}")]
    InvalidWrite(String),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl GpuError {
    /// Vulkan result carried by this error, if any.
    pub const fn vk_result(&self) -> Option<vk::Result> {
        match self {
            Self::Vulkan(result) | Self::VulkanCall { result, .. } => Some(*result),
            _ => None,
        }
    }

    /// True for the results a descriptor pool reports when it cannot fit another set.
    pub fn is_pool_out_of_memory(&self) -> bool {
        matches!(
            self.vk_result(),
            Some(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL)
        )
    }
}

/// Attach the name of the failing Vulkan call to a raw result.
pub trait VkResultExt<T> {
    fn context(self, call: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    fn context(self, call: &'static str) -> Result<T> {
        self.map_err(|result| {
            tracing::error!("Detected Vulkan error: {result} in call: {call}");
            GpuError::VulkanCall { call, result }
        })
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
