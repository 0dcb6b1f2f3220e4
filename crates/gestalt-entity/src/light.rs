//! Light components.

use glam::Vec3;

/// Light kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

/// Data only some light kinds have.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional {
        /// Index of the light's entry in the light view-projection buffer.
        light_view_projection: u32,
    },
    Point {
        range: f32,
        /// First of the six cube-face view-projection entries.
        first_light_view_projection: u32,
    },
    Spot {
        range: f32,
        /// Cosine of the inner cone angle.
        inner_cone_cos: f32,
        /// Cosine of the outer cone angle.
        outer_cone_cos: f32,
    },
}

/// A light attached to an entity. Position and direction come from the
/// entity's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightComponent {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
    pub is_dirty: bool,
}

impl LightComponent {
    pub const fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Directional {
                light_view_projection: 0,
            },
            is_dirty: true,
        }
    }

    pub const fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Point {
                range,
                first_light_view_projection: 0,
            },
            is_dirty: true,
        }
    }

    /// Spot light with cone angles given in radians.
    pub fn spot(color: Vec3, intensity: f32, range: f32, inner_cone: f32, outer_cone: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Spot {
                range,
                inner_cone_cos: inner_cone.cos(),
                outer_cone_cos: outer_cone.cos(),
            },
            is_dirty: true,
        }
    }

    pub const fn light_type(&self) -> LightType {
        match self.kind {
            LightKind::Directional { .. } => LightType::Directional,
            LightKind::Point { .. } => LightType::Point,
            LightKind::Spot { .. } => LightType::Spot,
        }
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
        self.is_dirty = true;
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
        self.is_dirty = true;
    }
}
