//! Core types, configuration, and math for the Gestalt engine.
//!
//! This crate provides the foundational types used throughout the engine:
//! - Engine configuration loaded from JSON
//! - Frustum and bounding-volume math used for culling
//! - Frame bookkeeping (frames in flight, delta time)
//! - The input snapshot consumed by camera controllers
//! - Common error types

pub mod config;
pub mod error;
pub mod frame;
pub mod input;
pub mod math;

pub use config::{DescriptorPoolConfig, EngineConfig, LightLimits};
pub use error::{Error, Result};
pub use frame::{FrameProvider, FrameTimer};
pub use input::{Extent, MovementInput};
pub use math::{BoundingSphere, Frustum};

/// Engine-wide compile-time limits
pub mod limits {
    /// Number of CPU-side copies of per-frame resources
    pub const FRAMES_IN_FLIGHT: usize = 2;
    /// Maximum number of materials in the material buffer
    pub const MAX_MATERIALS: u32 = 256;
    /// Textures per PBR material (albedo, metal-rough, normal, emissive, occlusion)
    pub const PBR_MATERIAL_TEXTURES: u32 = 5;
    /// Maximum number of bindless textures
    pub const MAX_TEXTURES: u32 = MAX_MATERIALS * PBR_MATERIAL_TEXTURES;
    /// Maximum number of vertices in the global vertex buffer
    pub const MAX_VERTICES: u32 = 8_388_608;
    /// Maximum number of indices in the global index buffer
    pub const MAX_INDICES: u32 = 2 * MAX_VERTICES;
    /// Maximum number of mesh draws
    pub const MAX_MESHES: u32 = 4096;
    /// Maximum number of meshlets in the global meshlet buffer
    pub const MAX_MESHLETS: u32 = 131_072;
}
