//! PBR material constants as seen by the shaders.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use gestalt_entity::PbrMaterial;

/// Texture index marking a texture slot as unused.
pub const UNUSED_TEXTURE: u16 = u16::MAX;

bitflags! {
    /// Which texture slots of a [`GpuMaterial`] are populated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        const ALBEDO = 0x01;
        const METAL_ROUGH = 0x02;
        const NORMAL = 0x04;
        const EMISSIVE = 0x08;
        const OCCLUSION = 0x10;
    }
}

#[repr(C, align(64))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub albedo_tex_index: u16,
    pub metal_rough_tex_index: u16,
    pub normal_tex_index: u16,
    pub emissive_tex_index: u16,
    pub occlusion_tex_index: u16,
    pub _pad: u16,
    /// [`MaterialFlags`] bits.
    pub flags: u32,

    pub albedo_color: [f32; 4],
    /// Roughness, metallic.
    pub metal_rough_factor: [f32; 2],
    pub occlusion_strength: f32,
    pub alpha_cutoff: f32,
    pub emissive_color: [f32; 3],
    pub emissive_strength: f32,
}

impl Default for GpuMaterial {
    fn default() -> Self {
        Self::from(&PbrMaterial::default())
    }
}

impl GpuMaterial {
    pub const fn material_flags(&self) -> MaterialFlags {
        MaterialFlags::from_bits_truncate(self.flags)
    }
}

impl From<&PbrMaterial> for GpuMaterial {
    fn from(material: &PbrMaterial) -> Self {
        let textures = &material.textures;
        let mut flags = MaterialFlags::empty();
        let mut index = |slot: Option<u16>, flag: MaterialFlags| match slot {
            Some(i) if i != UNUSED_TEXTURE => {
                flags |= flag;
                i
            }
            _ => UNUSED_TEXTURE,
        };

        let albedo_tex_index = index(textures.albedo, MaterialFlags::ALBEDO);
        let metal_rough_tex_index = index(textures.metal_rough, MaterialFlags::METAL_ROUGH);
        let normal_tex_index = index(textures.normal, MaterialFlags::NORMAL);
        let emissive_tex_index = index(textures.emissive, MaterialFlags::EMISSIVE);
        let occlusion_tex_index = index(textures.occlusion, MaterialFlags::OCCLUSION);

        Self {
            albedo_tex_index,
            metal_rough_tex_index,
            normal_tex_index,
            emissive_tex_index,
            occlusion_tex_index,
            _pad: 0,
            flags: flags.bits(),
            albedo_color: material.albedo_color.to_array(),
            metal_rough_factor: material.metal_rough_factor.to_array(),
            occlusion_strength: material.occlusion_strength,
            alpha_cutoff: material.alpha_cutoff,
            emissive_color: material.emissive_color.to_array(),
            emissive_strength: material.emissive_strength,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gestalt_entity::PbrTextures;
    use std::mem::{align_of, size_of};

    #[test]
    fn layout() {
        assert_eq!(size_of::<GpuMaterial>(), 64);
        assert_eq!(align_of::<GpuMaterial>(), 64);
        assert_eq!(std::mem::offset_of!(GpuMaterial, flags), 12);
        assert_eq!(std::mem::offset_of!(GpuMaterial, albedo_color), 16);
    }

    #[test]
    fn defaults_have_no_textures() {
        let material = GpuMaterial::default();
        assert_eq!(material.albedo_tex_index, UNUSED_TEXTURE);
        assert_eq!(material.occlusion_tex_index, UNUSED_TEXTURE);
        assert!(material.material_flags().is_empty());
        assert_eq!(material.albedo_color, [1.0; 4]);
        assert_eq!(material.occlusion_strength, 1.0);
        assert_eq!(material.emissive_strength, 1.0);
    }

    #[test]
    fn flags_follow_present_textures() {
        let material = PbrMaterial {
            textures: PbrTextures {
                albedo: Some(3),
                normal: Some(4),
                emissive: Some(UNUSED_TEXTURE),
                ..PbrTextures::default()
            },
            ..PbrMaterial::default()
        };
        let gpu = GpuMaterial::from(&material);
        assert_eq!(gpu.flags, 0x01 | 0x04);
        assert_eq!(gpu.albedo_tex_index, 3);
        assert_eq!(gpu.normal_tex_index, 4);
        assert_eq!(gpu.emissive_tex_index, UNUSED_TEXTURE);
    }
}
