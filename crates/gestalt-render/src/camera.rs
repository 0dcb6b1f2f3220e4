//! Per-frame camera data.

use crate::error::{RenderError, Result};
use crate::gpu_types::PerFrameData;
use crate::upload::{create_array_buffer, upload_slice};
use gestalt_core::limits::FRAMES_IN_FLIGHT;
use gestalt_core::math::Frustum;
use gestalt_entity::CameraComponent;
use gestalt_gpu::ash::vk;
use gestalt_gpu::{GpuAllocator, GpuBuffer};
use glam::Mat4;

/// One [`PerFrameData`] per frame in flight.
#[derive(Debug, Clone, Default)]
pub struct PerFrameDataBuffers {
    pub data: [PerFrameData; FRAMES_IN_FLIGHT],
    /// Keep culling with the camera state captured when the flag was set.
    pub freeze_cull_camera: bool,
}

impl PerFrameDataBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self, frame: usize) -> Result<&PerFrameData> {
        self.data.get(frame).ok_or_else(|| frame_out_of_range(frame))
    }

    /// Rebuild the block of `frame`. The projection is flipped on Y for
    /// Vulkan clip space before it is stored.
    pub fn update(
        &mut self,
        frame: usize,
        view: Mat4,
        projection: Mat4,
        near: f32,
        far: f32,
    ) -> Result<&PerFrameData> {
        let freeze = self.freeze_cull_camera;
        let data = self
            .data
            .get_mut(frame)
            .ok_or_else(|| frame_out_of_range(frame))?;

        let mut projection = projection;
        projection.y_axis.y *= -1.0;

        data.view = view.to_cols_array_2d();
        data.proj = projection.to_cols_array_2d();
        data.inv_view = view.inverse().to_cols_array_2d();
        data.inv_view_proj = (projection * view).inverse().to_cols_array_2d();
        data.p00 = projection.x_axis.x;
        data.p11 = projection.y_axis.y;

        if !freeze {
            data.cull_view = data.view;
            data.cull_proj = data.proj;
            data.znear = near;
            data.zfar = far;
            let frustum = Frustum::from_matrix(projection);
            data.frustum = frustum.planes.map(|plane| plane.to_array());
        }

        Ok(data)
    }

    /// [`Self::update`] with the matrices of a camera component.
    pub fn update_from_camera(
        &mut self,
        frame: usize,
        camera: &CameraComponent,
    ) -> Result<&PerFrameData> {
        self.update(
            frame,
            camera.view_matrix,
            camera.projection_matrix,
            camera.near(),
            camera.far(),
        )
    }
}

/// Uniform buffers holding [`PerFrameData`], one per frame in flight.
pub struct PerFrameUniformBuffers {
    pub buffers: Vec<GpuBuffer>,
}

impl PerFrameUniformBuffers {
    pub fn new(allocator: &mut GpuAllocator) -> Result<Self> {
        let mut buffers = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for _ in 0..FRAMES_IN_FLIGHT {
            match create_array_buffer::<PerFrameData>(
                allocator,
                1,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                "perFrameBuffer",
            ) {
                Ok(buffer) => buffers.push(buffer),
                Err(e) => {
                    for mut buffer in buffers {
                        let _ = allocator.free_buffer(&mut buffer);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self { buffers })
    }

    pub fn buffer(&self, frame: usize) -> Result<&GpuBuffer> {
        self.buffers.get(frame).ok_or_else(|| frame_out_of_range(frame))
    }

    /// Copy the block of `frame` into that frame's buffer.
    pub fn upload(&self, frame: usize, data: &PerFrameDataBuffers) -> Result<()> {
        upload_slice(
            "per-frame data",
            self.buffer(frame)?,
            std::slice::from_ref(data.frame(frame)?),
        )
    }

    pub fn destroy(self, allocator: &mut GpuAllocator) -> Result<()> {
        for mut buffer in self.buffers {
            allocator.free_buffer(&mut buffer)?;
        }
        Ok(())
    }
}

fn frame_out_of_range(frame: usize) -> RenderError {
    RenderError::RangeOutOfBounds(format!(
        "frame index {frame} with {FRAMES_IN_FLIGHT} frames in flight"
    ))
}
