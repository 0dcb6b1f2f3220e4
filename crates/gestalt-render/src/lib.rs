//! GPU-side scene data for the Gestalt engine.
//!
//! This crate provides:
//! - Structs mirrored by shader buffers (per-frame data, lights, mesh draws, materials)
//! - Packers that fill them from scene components
//! - Upload helpers for host-visible buffers

pub mod camera;
pub mod error;
pub mod gpu_types;
pub mod lights;
pub mod material;
pub mod mesh;
pub mod upload;

pub use camera::{PerFrameDataBuffers, PerFrameUniformBuffers};
pub use error::{RenderError, Result};
pub use gpu_types::{
    GpuDirectionalLight, GpuPointLight, GpuProjViewData, GpuSpotLight, MeshDraw, MeshTaskCommand,
    PerFrameData,
};
pub use lights::{LightBuffers, LightCounts, LightPacker};
pub use material::{GpuMaterial, MaterialFlags, UNUSED_TEXTURE};
pub use mesh::{MeshBufferExtents, MeshDrawBuffers, MeshDrawTable, MeshSurface};
