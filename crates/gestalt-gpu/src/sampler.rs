//! Sampler descriptions and a deduplicating sampler cache.

use crate::error::{Result, VkResultExt};
use ash::vk;
use hashbrown::HashMap;
use std::hash::{Hash, Hasher};

/// Filtering, addressing and anisotropy state of a sampler.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub max_anisotropy: f32,
    pub anisotropy_enable: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
            address_mode_w: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: 16.0,
            anisotropy_enable: true,
        }
    }
}

impl SamplerConfig {
    /// Nearest filtering with clamped addressing, for lookup tables and G-buffers.
    pub fn nearest_clamped() -> Self {
        Self {
            mag_filter: vk::Filter::NEAREST,
            min_filter: vk::Filter::NEAREST,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            max_anisotropy: 1.0,
            anisotropy_enable: false,
        }
    }

    fn key(&self) -> (i32, i32, i32, i32, i32, i32, u32, bool) {
        (
            self.mag_filter.as_raw(),
            self.min_filter.as_raw(),
            self.mipmap_mode.as_raw(),
            self.address_mode_u.as_raw(),
            self.address_mode_v.as_raw(),
            self.address_mode_w.as_raw(),
            self.max_anisotropy.to_bits(),
            self.anisotropy_enable,
        )
    }

    /// Create info for this configuration, sampling all mip levels.
    pub fn create_info(&self) -> vk::SamplerCreateInfo<'static> {
        vk::SamplerCreateInfo::default()
            .mag_filter(self.mag_filter)
            .min_filter(self.min_filter)
            .mipmap_mode(self.mipmap_mode)
            .address_mode_u(self.address_mode_u)
            .address_mode_v(self.address_mode_v)
            .address_mode_w(self.address_mode_w)
            .anisotropy_enable(self.anisotropy_enable)
            .max_anisotropy(self.max_anisotropy)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
    }

    /// Create a sampler for this configuration.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn create_sampler(&self, device: &ash::Device) -> Result<vk::Sampler> {
        unsafe { device.create_sampler(&self.create_info(), None) }.context("vkCreateSampler")
    }
}

impl PartialEq for SamplerConfig {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SamplerConfig {}

impl Hash for SamplerConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// One sampler per distinct [`SamplerConfig`].
#[derive(Debug, Default)]
pub struct SamplerCache {
    samplers: HashMap<SamplerConfig, vk::Sampler>,
}

impl SamplerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the sampler for `config`, creating it with `create` on first use.
    pub fn get_or_create<F>(&mut self, config: &SamplerConfig, create: F) -> Result<vk::Sampler>
    where
        F: FnOnce(&SamplerConfig) -> Result<vk::Sampler>,
    {
        if let Some(&sampler) = self.samplers.get(config) {
            return Ok(sampler);
        }
        let sampler = create(config)?;
        tracing::debug!("Created sampler for {:?}", config);
        self.samplers.insert(*config, sampler);
        Ok(sampler)
    }

    /// Cached sampler for `config`, creating it on `device` if needed.
    ///
    /// # Safety
    /// The device must be valid and the same for every call on this cache.
    pub unsafe fn get_or_create_on(
        &mut self,
        device: &ash::Device,
        config: &SamplerConfig,
    ) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.samplers.get(config) {
            return Ok(sampler);
        }
        let sampler = unsafe { config.create_sampler(device) }?;
        self.samplers.insert(*config, sampler);
        Ok(sampler)
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }

    /// Remove every sampler, handing each to `destroy`.
    pub fn destroy_all<F: FnMut(vk::Sampler)>(&mut self, mut destroy: F) {
        for (_, sampler) in self.samplers.drain() {
            destroy(sampler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(config: &SamplerConfig) -> u64 {
        let mut hasher = DefaultHasher::new();
        config.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_configs_hash_equal() {
        let a = SamplerConfig::default();
        let b = SamplerConfig::default();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = SamplerConfig {
            max_anisotropy: 8.0,
            ..a
        };
        assert_ne!(a, c);
    }

    #[test]
    fn equal_configs_share_one_sampler() {
        let mut cache = SamplerCache::new();
        let mut created = 0u64;
        let mut create = |_: &SamplerConfig| -> Result<vk::Sampler> {
            created += 1;
            Ok(vk::Sampler::from_raw(created))
        };

        let a = cache.get_or_create(&SamplerConfig::default(), &mut create).unwrap();
        let b = cache.get_or_create(&SamplerConfig::default(), &mut create).unwrap();
        let c = cache
            .get_or_create(&SamplerConfig::nearest_clamped(), &mut create)
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.len(), 2);

        let mut destroyed = Vec::new();
        cache.destroy_all(|s| destroyed.push(s));
        destroyed.sort_by_key(|s| s.as_raw());
        assert_eq!(destroyed, vec![a, c]);
        assert!(cache.is_empty());
    }

    #[test]
    fn create_info_mirrors_config() {
        let info = SamplerConfig::nearest_clamped().create_info();
        assert_eq!(info.mag_filter, vk::Filter::NEAREST);
        assert_eq!(info.address_mode_v, vk::SamplerAddressMode::CLAMP_TO_EDGE);
        assert_eq!(info.anisotropy_enable, vk::FALSE);
    }
}
