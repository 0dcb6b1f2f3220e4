//! Packing light components into the light buffers.

use crate::error::Result;
use crate::gpu_types::{GpuDirectionalLight, GpuPointLight, GpuProjViewData, GpuSpotLight};
use crate::upload::{create_array_buffer, upload_slice};
use gestalt_core::LightLimits;
use gestalt_entity::{LightComponent, LightKind, TransformComponent, World};
use gestalt_gpu::ash::vk;
use gestalt_gpu::{GpuAllocator, GpuBuffer};
use glam::{Mat4, Vec3, Vec4};

/// Shadow map resolution used to snap directional light projections.
pub const SHADOW_MAP_RESOLUTION: f32 = 8192.0;
/// Depth slack added on both ends of a directional light projection.
pub const SHADOW_DEPTH_MARGIN: f32 = 10.0;

/// World-space corners of the volume `inv_view_proj` maps from NDC, with
/// NDC depth running from `ndc_min_z` to 1.
pub fn frustum_corners(inv_view_proj: Mat4, ndc_min_z: f32) -> [Vec3; 8] {
    let ndc = [
        Vec4::new(-1.0, -1.0, ndc_min_z, 1.0),
        Vec4::new(1.0, -1.0, ndc_min_z, 1.0),
        Vec4::new(1.0, 1.0, ndc_min_z, 1.0),
        Vec4::new(-1.0, 1.0, ndc_min_z, 1.0),
        Vec4::new(-1.0, -1.0, 1.0, 1.0),
        Vec4::new(1.0, -1.0, 1.0, 1.0),
        Vec4::new(1.0, 1.0, 1.0, 1.0),
        Vec4::new(-1.0, 1.0, 1.0, 1.0),
    ];
    ndc.map(|corner| {
        let world = inv_view_proj * corner;
        world.truncate() / world.w
    })
}

/// View matrix of a directional light looking at the center of the camera frustum.
pub fn directional_light_view(direction: Vec3, inv_view_proj: Mat4) -> Mat4 {
    let corners = frustum_corners(inv_view_proj, 0.0);
    let center = corners.iter().copied().sum::<Vec3>() / 8.0;

    let light_direction = (-direction).normalize_or_zero();
    let mut up = Vec3::Y;
    if up.dot(light_direction).abs() > 0.999 {
        up = Vec3::Z;
    }
    Mat4::look_at_rh(center - light_direction, center, up)
}

/// Orthographic projection enclosing the camera frustum in light space,
/// padded and snapped to shadow map texels.
pub fn directional_light_projection(light_view: Mat4, inv_view_proj: Mat4) -> Mat4 {
    let corners = frustum_corners(inv_view_proj, 0.0);
    let (mut min, mut max) = corners.iter().fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), corner| {
            let p = light_view.transform_point3(*corner);
            (min.min(p), max.max(p))
        },
    );

    let padding = (max - min) * 0.1;
    min -= padding;
    max += padding;
    min.z -= SHADOW_DEPTH_MARGIN;
    max.z += SHADOW_DEPTH_MARGIN;

    let texel = (max - min) / SHADOW_MAP_RESOLUTION;
    let snap = |value: f32, size: f32| {
        if size > f32::EPSILON {
            (value / size).floor() * size
        } else {
            value
        }
    };
    min.x = snap(min.x, texel.x);
    min.y = snap(min.y, texel.y);
    max.x = snap(max.x, texel.x);
    max.y = snap(max.y, texel.y);

    // view space looks down -Z, so the nearest plane is the largest z
    Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max.z, -min.z)
}

/// Number of lights packed and dropped by the last [`LightPacker::pack`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightCounts {
    pub directional: usize,
    pub point: usize,
    pub spot: usize,
    pub dropped: usize,
}

/// CPU-side light arrays, rebuilt every frame.
#[derive(Debug, Clone)]
pub struct LightPacker {
    limits: LightLimits,
    pub directional: Vec<GpuDirectionalLight>,
    pub point: Vec<GpuPointLight>,
    pub spot: Vec<GpuSpotLight>,
    pub view_projections: Vec<GpuProjViewData>,
}

impl LightPacker {
    pub fn new(limits: LightLimits) -> Self {
        Self {
            limits,
            directional: Vec::with_capacity(limits.max_directional_lights as usize),
            point: Vec::with_capacity(limits.max_point_lights as usize),
            spot: Vec::with_capacity(limits.max_spot_lights as usize),
            view_projections: Vec::with_capacity(limits.max_directional_lights as usize),
        }
    }

    pub const fn limits(&self) -> &LightLimits {
        &self.limits
    }

    pub fn clear(&mut self) {
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
        self.view_projections.clear();
    }

    /// Add one light. Returns false if its array is full.
    pub fn push(
        &mut self,
        light: &mut LightComponent,
        transform: &TransformComponent,
        inv_view_proj: Mat4,
    ) -> bool {
        let color = light.color.to_array();
        match &mut light.kind {
            LightKind::Directional {
                light_view_projection,
            } => {
                if self.directional.len() >= self.limits.max_directional_lights as usize {
                    return false;
                }
                let direction = -(transform.rotation * Vec3::NEG_Z).normalize();
                let index = self.view_projections.len() as u32;
                *light_view_projection = index;

                let view = directional_light_view(direction, inv_view_proj);
                let proj = directional_light_projection(view, inv_view_proj);
                self.view_projections.push(GpuProjViewData::new(view, proj));
                self.directional.push(GpuDirectionalLight {
                    color,
                    intensity: light.intensity,
                    direction: direction.to_array(),
                    view_proj: index,
                });
            }
            LightKind::Point { range, .. } => {
                if self.point.len() >= self.limits.max_point_lights as usize {
                    return false;
                }
                self.point.push(GpuPointLight {
                    color,
                    intensity: light.intensity,
                    position: transform.position.to_array(),
                    range: *range,
                });
            }
            LightKind::Spot {
                range,
                inner_cone_cos,
                outer_cone_cos,
            } => {
                if self.spot.len() >= self.limits.max_spot_lights as usize {
                    return false;
                }
                self.spot.push(GpuSpotLight {
                    color,
                    intensity: light.intensity,
                    position: transform.position.to_array(),
                    range: *range,
                    direction: (transform.rotation * Vec3::NEG_Z).normalize().to_array(),
                    inner_cone_cos: *inner_cone_cos,
                    outer_cone_cos: *outer_cone_cos,
                    _pad: [0.0; 3],
                });
            }
        }
        light.is_dirty = false;
        true
    }

    /// Rebuild all arrays from the lights in `world`. `inv_view_proj` is the
    /// active camera's inverse view-projection, used to fit shadow volumes.
    pub fn pack(&mut self, world: &mut World, inv_view_proj: Mat4) -> LightCounts {
        self.clear();
        let mut dropped = 0;
        for (_, (light, transform)) in
            world.query_mut::<(&mut LightComponent, &TransformComponent)>()
        {
            if !self.push(light, transform, inv_view_proj) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::warn!(
                "Dropped {dropped} lights over the configured maxima ({} directional, {} point, {} spot)",
                self.limits.max_directional_lights,
                self.limits.max_point_lights,
                self.limits.max_spot_lights
            );
        }
        LightCounts {
            directional: self.directional.len(),
            point: self.point.len(),
            spot: self.spot.len(),
            dropped,
        }
    }
}

/// Storage buffers backing the light arrays.
pub struct LightBuffers {
    pub directional: GpuBuffer,
    pub point: GpuBuffer,
    pub spot: GpuBuffer,
    pub view_projections: GpuBuffer,
}

impl LightBuffers {
    /// Maximum number of light view-projections: six per point light plus one per directional light.
    pub const fn max_view_projections(limits: &LightLimits) -> usize {
        limits.max_point_lights as usize * 6 + limits.max_directional_lights as usize
    }

    pub fn new(allocator: &mut GpuAllocator, limits: &LightLimits) -> Result<Self> {
        let usage = vk::BufferUsageFlags::STORAGE_BUFFER;
        Ok(Self {
            directional: create_array_buffer::<GpuDirectionalLight>(
                allocator,
                limits.max_directional_lights as usize,
                usage,
                "Directional Light Storage Buffer",
            )?,
            point: create_array_buffer::<GpuPointLight>(
                allocator,
                limits.max_point_lights as usize,
                usage,
                "Point Light Storage Buffer",
            )?,
            spot: create_array_buffer::<GpuSpotLight>(
                allocator,
                limits.max_spot_lights as usize,
                usage,
                "Spot Light Storage Buffer",
            )?,
            view_projections: create_array_buffer::<GpuProjViewData>(
                allocator,
                Self::max_view_projections(limits),
                usage,
                "View Proj Light Storage Buffer",
            )?,
        })
    }

    pub fn upload(&self, packer: &LightPacker) -> Result<()> {
        upload_slice("directional lights", &self.directional, &packer.directional)?;
        upload_slice("point lights", &self.point, &packer.point)?;
        upload_slice("spot lights", &self.spot, &packer.spot)?;
        upload_slice(
            "light view-projections",
            &self.view_projections,
            &packer.view_projections,
        )
    }

    pub fn destroy(mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.directional)?;
        allocator.free_buffer(&mut self.point)?;
        allocator.free_buffer(&mut self.spot)?;
        allocator.free_buffer(&mut self.view_projections)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    fn inv_camera() -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 50.0);
        (proj * view).inverse()
    }

    fn limits(directional: u32, point: u32, spot: u32) -> LightLimits {
        LightLimits {
            max_directional_lights: directional,
            max_point_lights: point,
            max_spot_lights: spot,
        }
    }

    #[test]
    fn directional_direction_points_toward_light() {
        let mut packer = LightPacker::new(LightLimits::default());
        let mut light = LightComponent::directional(Vec3::ONE, 3.0);
        // pitched down a quarter turn: shines along -Y
        let transform = TransformComponent::new(Vec3::ZERO, Quat::from_rotation_x(-FRAC_PI_2), 1.0);
        assert!(packer.push(&mut light, &transform, inv_camera()));

        let packed = packer.directional[0];
        assert_relative_eq!(packed.direction[1], 1.0, epsilon = 1e-5);
        assert_eq!(packed.view_proj, 0);
        assert_eq!(packer.view_projections.len(), 1);
        assert!(!light.is_dirty);
    }

    #[test]
    fn spot_direction_follows_rotation() {
        let mut packer = LightPacker::new(LightLimits::default());
        let mut light = LightComponent::spot(Vec3::ONE, 1.0, 8.0, 0.2, 0.4);
        let transform = TransformComponent::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(FRAC_PI_2),
            1.0,
        );
        packer.push(&mut light, &transform, inv_camera());
        let spot = packer.spot[0];
        assert_relative_eq!(spot.direction[0], -1.0, epsilon = 1e-5);
        assert_eq!(spot.position, [1.0, 2.0, 3.0]);
        assert_relative_eq!(spot.inner_cone_cos, 0.2_f32.cos());
    }

    #[test]
    fn shadow_volume_contains_camera_frustum() {
        let inv = inv_camera();
        let view = directional_light_view(Vec3::new(-0.3, -1.0, -0.2), inv);
        let proj = directional_light_projection(view, inv);
        for corner in frustum_corners(inv, 0.0) {
            let clip = proj.project_point3(view.transform_point3(corner));
            assert!(clip.x.abs() <= 1.0 + 1e-3, "x {}", clip.x);
            assert!(clip.y.abs() <= 1.0 + 1e-3, "y {}", clip.y);
            assert!((0.0..=1.0).contains(&clip.z), "z {}", clip.z);
        }
    }

    #[test]
    fn light_straight_down_uses_z_up() {
        let view = directional_light_view(Vec3::NEG_Y, inv_camera());
        assert!(view.is_finite());
    }

    #[test]
    fn pack_drops_lights_over_limit() {
        let mut world = World::new();
        for _ in 0..3 {
            world.spawn((
                LightComponent::point(Vec3::ONE, 1.0, 4.0),
                TransformComponent::default(),
            ));
        }
        world.spawn((
            LightComponent::directional(Vec3::ONE, 1.0),
            TransformComponent::default(),
        ));
        // lights without a transform are not packed
        world.spawn((LightComponent::point(Vec3::ONE, 1.0, 1.0),));

        let mut packer = LightPacker::new(limits(1, 2, 0));
        let counts = packer.pack(&mut world, inv_camera());
        assert_eq!(
            counts,
            LightCounts {
                directional: 1,
                point: 2,
                spot: 0,
                dropped: 1,
            }
        );

        // repacking starts from scratch
        let counts = packer.pack(&mut world, inv_camera());
        assert_eq!(counts.point, 2);
        assert_eq!(packer.view_projections.len(), 1);
    }

    #[test]
    fn view_projection_capacity() {
        assert_eq!(LightBuffers::max_view_projections(&limits(2, 4, 1)), 26);
    }
}
