//! Runtime engine configuration.
//!
//! Configuration is read from a JSON file. Every field has a default, so a
//! partial file (or none at all) yields a usable configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub application_name: String,
    pub windowed_width: u32,
    pub windowed_height: u32,
    pub use_fullscreen: bool,
    pub use_vsync: bool,
    pub use_validation_layers: bool,
    /// Index into the enumerated physical devices, `None` picks the best scored device.
    pub physical_device_index: Option<usize>,
    pub lights: LightLimits,
    pub descriptor_pool: DescriptorPoolConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_name: "Gestalt Engine".to_string(),
            windowed_width: 1300,
            windowed_height: 900,
            use_fullscreen: false,
            use_vsync: false,
            use_validation_layers: cfg!(debug_assertions),
            physical_device_index: None,
            lights: LightLimits::default(),
            descriptor_pool: DescriptorPoolConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration, falling back to defaults if the file is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default config, failed to load {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save configuration to a JSON file with pretty formatting.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Aspect ratio of the windowed resolution.
    pub fn aspect_ratio(&self) -> f32 {
        self.windowed_width as f32 / self.windowed_height.max(1) as f32
    }

    fn validate(&self) -> Result<()> {
        if self.windowed_width == 0 || self.windowed_height == 0 {
            return Err(Error::InvalidData(format!(
                "resolution must be non-zero, got {}x{}",
                self.windowed_width, self.windowed_height
            )));
        }
        self.descriptor_pool.validate()
    }
}

/// Upper bounds on the number of lights packed into the light buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightLimits {
    pub max_directional_lights: u32,
    pub max_point_lights: u32,
    pub max_spot_lights: u32,
}

impl Default for LightLimits {
    fn default() -> Self {
        Self {
            // two keeps the directional light buffer 64 byte aligned
            max_directional_lights: 2,
            max_point_lights: 256,
            max_spot_lights: 256,
        }
    }
}

impl LightLimits {
    /// Total number of light slots.
    pub const fn max_lights(&self) -> u32 {
        self.max_directional_lights + self.max_point_lights + self.max_spot_lights
    }
}

/// Sizing and growth settings for growable descriptor allocators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorPoolConfig {
    /// Set count of the first pool.
    pub initial_sets: u32,
    /// Factor applied to the set count of each newly created pool.
    pub growth_factor: f32,
    /// Upper bound on the set count of a single pool.
    pub max_sets_per_pool: u32,
    /// Hard cap on the number of pools, `None` for unbounded growth.
    pub max_pools: Option<usize>,
}

impl Default for DescriptorPoolConfig {
    fn default() -> Self {
        Self {
            initial_sets: 1000,
            growth_factor: 1.5,
            max_sets_per_pool: 4092,
            max_pools: None,
        }
    }
}

impl DescriptorPoolConfig {
    fn validate(&self) -> Result<()> {
        if self.initial_sets == 0 || self.max_sets_per_pool == 0 {
            return Err(Error::InvalidData(
                "descriptor pool set counts must be non-zero".to_string(),
            ));
        }
        if self.growth_factor.is_nan() || self.growth_factor < 1.0 {
            return Err(Error::InvalidData(format!(
                "descriptor pool growth factor must be >= 1.0, got {}",
                self.growth_factor
            )));
        }
        Ok(())
    }
}
