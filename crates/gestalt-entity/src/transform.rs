//! Rigid transform with uniform scale.

use glam::{Mat4, Quat, Vec3};
use std::ops::Mul;

/// Position, orientation and uniform scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
    pub is_dirty: bool,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, 1.0)
    }
}

impl TransformComponent {
    /// The rotation is normalized on construction.
    pub fn new(position: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
            is_dirty: true,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, 1.0)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.is_dirty = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        self.is_dirty = true;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.is_dirty = true;
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.position)
    }

    /// Transform a point from local into parent space.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }
}

impl Mul for TransformComponent {
    type Output = Self;

    /// Compose `self` (parent) with `local`.
    fn mul(self, local: Self) -> Self {
        Self {
            position: self.transform_point(local.position),
            rotation: self.rotation * local.rotation,
            scale: self.scale * local.scale,
            is_dirty: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn composition_applies_parent_scale_and_rotation() {
        let parent = TransformComponent::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2), 2.0);
        let local = TransformComponent::from_position(Vec3::new(0.0, 0.0, -1.0));
        let world = parent * local;

        // -Z rotated a quarter turn around Y is -X, scaled by 2
        assert_relative_eq!(world.position.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(world.position.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(world.scale, 2.0);
    }

    #[test]
    fn composition_matches_matrices() {
        let parent = TransformComponent::new(Vec3::new(3.0, -2.0, 1.0), Quat::from_rotation_x(0.4), 1.5);
        let local = TransformComponent::new(Vec3::new(0.5, 1.0, 2.0), Quat::from_rotation_z(1.1), 0.5);
        let composed = (parent * local).matrix();
        let expected = parent.matrix() * local.matrix();
        for (a, b) in composed.to_cols_array().iter().zip(expected.to_cols_array()) {
            assert_relative_eq!(*a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn setters_normalize_and_mark_dirty() {
        let mut t = TransformComponent::default();
        t.is_dirty = false;
        t.set_rotation(Quat::from_xyzw(0.0, 2.0, 0.0, 0.0));
        assert!(t.is_dirty);
        assert_relative_eq!(t.rotation.length(), 1.0);
    }
}
