//! Physics body description.
//!
//! Simulation runs in an external physics library. Entities only carry the
//! collider shape and opaque handles to the body and shape that library
//! created for them.

use glam::Vec3;
use std::path::PathBuf;

/// Whether the simulation moves the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BodyType {
    #[default]
    Static,
    Dynamic,
}

/// Opaque handle to an object owned by the physics library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicsHandle(pub u64);

/// Collider shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Collider {
    Box {
        /// Half extents along each axis.
        half_extents: Vec3,
    },
    Sphere {
        radius: f32,
    },
    Capsule {
        radius: f32,
        height: f32,
    },
    Mesh {
        mesh_path: PathBuf,
    },
    Terrain {
        heightmap_path: PathBuf,
        height_scale: f32,
        xz_scale: f32,
    },
}

/// Shape tag of a [`Collider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    Box,
    Sphere,
    Capsule,
    Mesh,
    Terrain,
}

impl Collider {
    pub const fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    pub const fn cuboid(half_extents: Vec3) -> Self {
        Self::Box { half_extents }
    }

    pub const fn kind(&self) -> ColliderKind {
        match self {
            Self::Box { .. } => ColliderKind::Box,
            Self::Sphere { .. } => ColliderKind::Sphere,
            Self::Capsule { .. } => ColliderKind::Capsule,
            Self::Mesh { .. } => ColliderKind::Mesh,
            Self::Terrain { .. } => ColliderKind::Terrain,
        }
    }

    /// Radius of a sphere enclosing the shape, `None` for shapes defined by external data.
    pub fn bounding_radius(&self) -> Option<f32> {
        match self {
            Self::Box { half_extents } => Some(half_extents.length()),
            Self::Sphere { radius } => Some(*radius),
            Self::Capsule { radius, height } => Some(height * 0.5 + radius),
            Self::Mesh { .. } | Self::Terrain { .. } => None,
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::sphere(1.0)
    }
}

/// Physics data attached to an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsComponent {
    pub body_type: BodyType,
    pub collider: Collider,
    /// Set once the physics library created the body.
    pub body: Option<PhysicsHandle>,
    pub shape: Option<PhysicsHandle>,
    pub is_dirty: bool,
}

impl PhysicsComponent {
    pub fn new(body_type: BodyType, collider: Collider) -> Self {
        Self {
            body_type,
            collider,
            body: None,
            shape: None,
            is_dirty: true,
        }
    }

    pub const fn collider_kind(&self) -> ColliderKind {
        self.collider.kind()
    }

    /// Record the handles returned by the physics library.
    pub fn attach(&mut self, body: PhysicsHandle, shape: PhysicsHandle) {
        self.body = Some(body);
        self.shape = Some(shape);
        self.is_dirty = false;
    }

    /// Forget the handles, returning them so the caller can release them.
    pub fn detach(&mut self) -> Option<(PhysicsHandle, PhysicsHandle)> {
        let handles = self.body.take().zip(self.shape.take());
        self.is_dirty = true;
        handles
    }

    pub const fn is_attached(&self) -> bool {
        self.body.is_some()
    }
}
