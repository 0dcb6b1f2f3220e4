//! Structs mirrored by shader-side buffers.
//!
//! Field order and sizes must match the shader declarations. Every type is
//! `Pod` and copied verbatim into host-visible buffers.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};

/// Depth range of a frame slot that was never updated.
pub const DEFAULT_ZNEAR: f32 = 0.1;
pub const DEFAULT_ZFAR: f32 = 1000.0;

/// Per-frame camera block.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PerFrameData {
    pub view: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub cull_view: [[f32; 4]; 4],
    pub cull_proj: [[f32; 4]; 4],
    /// Symmetric projection parameters.
    pub p00: f32,
    pub p11: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Left, right, bottom, top, near, far.
    pub frustum: [[f32; 4]; 6],
}

impl Default for PerFrameData {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view: identity,
            inv_view: identity,
            proj: identity,
            inv_view_proj: identity,
            cull_view: identity,
            cull_proj: identity,
            p00: 0.0,
            p11: 0.0,
            znear: DEFAULT_ZNEAR,
            zfar: DEFAULT_ZFAR,
            frustum: [[0.0; 4]; 6],
        }
    }
}

impl PerFrameData {
    pub fn inv_view_proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.inv_view_proj)
    }

    pub fn frustum_plane(&self, index: usize) -> Vec4 {
        Vec4::from_array(self.frustum[index])
    }
}

#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub direction: [f32; 3],
    /// Index into the light view-projection buffer.
    pub view_proj: u32,
}

#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub range: f32,
}

#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSpotLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub range: f32,
    pub direction: [f32; 3],
    /// Cosine of the inner cone angle.
    pub inner_cone_cos: f32,
    /// Cosine of the outer cone angle.
    pub outer_cone_cos: f32,
    pub _pad: [f32; 3],
}

/// View and projection of a shadow-casting light.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuProjViewData {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl GpuProjViewData {
    pub fn new(view: Mat4, proj: Mat4) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.proj) * Mat4::from_cols_array_2d(&self.view)
    }
}

/// One drawable mesh instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshDraw {
    pub position: [f32; 3],
    /// Uniform scale.
    pub scale: f32,
    pub orientation: [f32; 4],

    /// Bounding sphere center in mesh space.
    pub center: [f32; 3],
    pub radius: f32,
    pub meshlet_offset: u32,
    pub meshlet_count: u32,

    pub vertex_count: u32,
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: u32,

    pub material_index: u32,
    pub _pad: u32,
}

impl MeshDraw {
    pub fn set_transform(&mut self, position: Vec3, orientation: Quat, scale: f32) {
        self.position = position.to_array();
        self.orientation = orientation.to_array();
        self.scale = scale;
    }
}

/// Task-shader work item for one mesh draw.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshTaskCommand {
    pub mesh_draw_id: u32,
    pub task_offset: u32,
    pub task_count: u32,
    pub _pad: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn default_frame_has_usable_depth_range() {
        let data = PerFrameData::default();
        assert_eq!(data.znear, DEFAULT_ZNEAR);
        assert_eq!(data.zfar, DEFAULT_ZFAR);
        assert!(data.znear > 0.0 && data.zfar > data.znear);
        assert_eq!(data.inv_view_proj(), Mat4::IDENTITY);
    }

    #[test]
    fn shader_layouts() {
        assert_eq!(size_of::<PerFrameData>(), 6 * 64 + 16 + 6 * 16);
        assert_eq!(align_of::<PerFrameData>(), 16);

        assert_eq!(size_of::<GpuDirectionalLight>(), 32);
        assert_eq!(align_of::<GpuDirectionalLight>(), 32);
        assert_eq!(size_of::<GpuPointLight>(), 32);
        assert_eq!(size_of::<GpuSpotLight>(), 64);
        assert_eq!(align_of::<GpuSpotLight>(), 32);
        assert_eq!(size_of::<GpuProjViewData>(), 128);

        assert_eq!(size_of::<MeshDraw>(), 80);
        assert_eq!(size_of::<MeshTaskCommand>(), 16);
        assert_eq!(align_of::<MeshTaskCommand>(), 16);
    }

    #[test]
    fn view_projection_order() {
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let proj = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
        assert_eq!(GpuProjViewData::new(view, proj).view_projection(), proj * view);
    }
}
