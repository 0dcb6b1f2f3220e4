//! PBR material description.

use glam::{Vec2, Vec3, Vec4};

/// Indices into the bindless texture array, `None` when the material has no
/// such texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PbrTextures {
    pub albedo: Option<u16>,
    pub metal_rough: Option<u16>,
    pub normal: Option<u16>,
    pub emissive: Option<u16>,
    pub occlusion: Option<u16>,
}

impl PbrTextures {
    /// Textures in binding order: albedo, metal-rough, normal, emissive, occlusion.
    pub const fn as_array(&self) -> [Option<u16>; 5] {
        [
            self.albedo,
            self.metal_rough,
            self.normal,
            self.emissive,
            self.occlusion,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PbrMaterial {
    pub double_sided: bool,
    pub transparent: bool,
    pub textures: PbrTextures,
    pub albedo_color: Vec4,
    /// Roughness in x, metallic in y.
    pub metal_rough_factor: Vec2,
    pub occlusion_strength: f32,
    pub alpha_cutoff: f32,
    pub emissive_color: Vec3,
    pub emissive_strength: f32,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            double_sided: false,
            transparent: false,
            textures: PbrTextures::default(),
            albedo_color: Vec4::ONE,
            metal_rough_factor: Vec2::ZERO,
            occlusion_strength: 1.0,
            alpha_cutoff: 0.0,
            emissive_color: Vec3::ZERO,
            emissive_strength: 1.0,
        }
    }
}

/// Named material with dirty tracking for re-upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialComponent {
    pub name: String,
    pub config: PbrMaterial,
    pub is_dirty: bool,
}

impl MaterialComponent {
    pub fn new(name: impl Into<String>, config: PbrMaterial) -> Self {
        Self {
            name: name.into(),
            config,
            is_dirty: true,
        }
    }

    pub fn set_config(&mut self, config: PbrMaterial) {
        self.config = config;
        self.is_dirty = true;
    }
}
