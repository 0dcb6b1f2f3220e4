//! Mesh draw records and their buffers.

use crate::error::{RenderError, Result};
use crate::gpu_types::{MeshDraw, MeshTaskCommand};
use crate::upload::{create_array_buffer, upload_slice};
use gestalt_core::limits::{MAX_INDICES, MAX_MATERIALS, MAX_MESHES, MAX_MESHLETS, MAX_VERTICES};
use gestalt_core::{BoundingSphere, Frustum};
use gestalt_entity::TransformComponent;
use gestalt_gpu::ash::vk;
use gestalt_gpu::{GpuAllocator, GpuBuffer};
use glam::{Quat, Vec3};

/// Element counts of the global vertex, index and meshlet buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBufferExtents {
    pub vertices: u32,
    pub indices: u32,
    pub meshlets: u32,
}

impl Default for MeshBufferExtents {
    fn default() -> Self {
        Self {
            vertices: MAX_VERTICES,
            indices: MAX_INDICES,
            meshlets: MAX_MESHLETS,
        }
    }
}

/// Ranges of one surface inside the global mesh buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshSurface {
    pub local_bounds: BoundingSphere,
    pub meshlet_offset: u32,
    pub meshlet_count: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: u32,
    pub material: u32,
}

fn check_range(what: &str, offset: u32, count: u32, total: u32) -> Result<()> {
    match offset.checked_add(count) {
        Some(end) if end <= total => Ok(()),
        _ => Err(RenderError::RangeOutOfBounds(format!(
            "{what} range {offset}+{count} exceeds buffer of {total}"
        ))),
    }
}

impl MeshSurface {
    fn validate(&self, extents: &MeshBufferExtents) -> Result<()> {
        check_range("vertex", self.vertex_offset, self.vertex_count, extents.vertices)?;
        check_range("index", self.first_index, self.index_count, extents.indices)?;
        check_range("meshlet", self.meshlet_offset, self.meshlet_count, extents.meshlets)?;
        if self.material >= MAX_MATERIALS {
            return Err(RenderError::RangeOutOfBounds(format!(
                "material index {} exceeds {MAX_MATERIALS} materials",
                self.material
            )));
        }
        Ok(())
    }
}

/// Mesh draws of the current scene, validated against the mesh buffers.
#[derive(Debug, Clone)]
pub struct MeshDrawTable {
    extents: MeshBufferExtents,
    max_draws: usize,
    draws: Vec<MeshDraw>,
}

impl Default for MeshDrawTable {
    fn default() -> Self {
        Self::new(MeshBufferExtents::default(), MAX_MESHES as usize)
    }
}

impl MeshDrawTable {
    pub const fn new(extents: MeshBufferExtents, max_draws: usize) -> Self {
        Self {
            extents,
            max_draws,
            draws: Vec::new(),
        }
    }

    pub const fn extents(&self) -> &MeshBufferExtents {
        &self.extents
    }

    pub const fn max_draws(&self) -> usize {
        self.max_draws
    }

    pub fn draws(&self) -> &[MeshDraw] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn clear(&mut self) {
        self.draws.clear();
    }

    /// Add a draw of `surface` placed by `world_transform`. Returns the draw id.
    pub fn push(&mut self, world_transform: &TransformComponent, surface: &MeshSurface) -> Result<u32> {
        if self.draws.len() >= self.max_draws {
            return Err(RenderError::CapacityExceeded {
                what: "mesh draws",
                requested: self.draws.len() + 1,
                capacity: self.max_draws,
            });
        }
        surface.validate(&self.extents)?;

        let mut draw = MeshDraw {
            center: surface.local_bounds.center.to_array(),
            radius: surface.local_bounds.radius,
            meshlet_offset: surface.meshlet_offset,
            meshlet_count: surface.meshlet_count,
            vertex_count: surface.vertex_count,
            index_count: surface.index_count,
            first_index: surface.first_index,
            vertex_offset: surface.vertex_offset,
            material_index: surface.material,
            ..MeshDraw::default()
        };
        draw.set_transform(
            world_transform.position,
            world_transform.rotation,
            world_transform.scale,
        );

        let id = self.draws.len() as u32;
        self.draws.push(draw);
        Ok(id)
    }

    /// Bounding sphere of a draw in world space.
    pub fn world_bounds(&self, id: u32) -> Option<BoundingSphere> {
        let draw = self.draws.get(id as usize)?;
        let local = BoundingSphere::new(Vec3::from_array(draw.center), draw.radius);
        Some(local.transformed(
            Vec3::from_array(draw.position),
            Quat::from_array(draw.orientation),
            draw.scale,
        ))
    }

    /// One task command per draw whose bounds intersect `frustum`.
    pub fn task_commands(&self, frustum: &Frustum) -> Vec<MeshTaskCommand> {
        (0..self.draws.len() as u32)
            .filter(|&id| {
                self.world_bounds(id)
                    .is_some_and(|bounds| frustum.test_sphere(&bounds))
            })
            .map(|id| {
                let draw = &self.draws[id as usize];
                MeshTaskCommand {
                    mesh_draw_id: id,
                    task_offset: draw.meshlet_offset,
                    task_count: draw.meshlet_count,
                    _pad: 0,
                }
            })
            .collect()
    }
}

/// Storage buffers for mesh draws and task commands.
pub struct MeshDrawBuffers {
    pub draws: GpuBuffer,
    pub task_commands: GpuBuffer,
}

impl MeshDrawBuffers {
    pub fn new(allocator: &mut GpuAllocator, max_draws: usize) -> Result<Self> {
        let usage = vk::BufferUsageFlags::STORAGE_BUFFER;
        Ok(Self {
            draws: create_array_buffer::<MeshDraw>(allocator, max_draws, usage, "Mesh Draw Buffer")?,
            task_commands: create_array_buffer::<MeshTaskCommand>(
                allocator,
                max_draws,
                usage | vk::BufferUsageFlags::INDIRECT_BUFFER,
                "Mesh Task Command Buffer",
            )?,
        })
    }

    pub fn upload(&self, table: &MeshDrawTable, commands: &[MeshTaskCommand]) -> Result<()> {
        upload_slice("mesh draws", &self.draws, table.draws())?;
        upload_slice("mesh task commands", &self.task_commands, commands)
    }

    pub fn destroy(mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.draws)?;
        allocator.free_buffer(&mut self.task_commands)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Mat4;

    fn surface() -> MeshSurface {
        MeshSurface {
            local_bounds: BoundingSphere::new(Vec3::ZERO, 1.0),
            meshlet_offset: 0,
            meshlet_count: 4,
            vertex_count: 100,
            index_count: 300,
            first_index: 0,
            vertex_offset: 0,
            material: 0,
        }
    }

    fn small_table() -> MeshDrawTable {
        MeshDrawTable::new(
            MeshBufferExtents {
                vertices: 1000,
                indices: 3000,
                meshlets: 16,
            },
            2,
        )
    }

    #[test]
    fn stores_transform_and_ranges() {
        let mut table = small_table();
        let transform = TransformComponent::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, 2.0);
        let id = table.push(&transform, &surface()).unwrap();
        assert_eq!(id, 0);
        let draw = table.draws()[0];
        assert_eq!(draw.position, [1.0, 2.0, 3.0]);
        assert_eq!(draw.scale, 2.0);
        assert_eq!(draw.index_count, 300);

        let bounds = table.world_bounds(0).unwrap();
        assert_relative_eq!(bounds.radius, 2.0);
        assert_eq!(bounds.center, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rejects_ranges_outside_buffers() {
        let mut table = small_table();
        let transform = TransformComponent::default();

        let vertices = MeshSurface {
            vertex_offset: 950,
            ..surface()
        };
        assert!(matches!(
            table.push(&transform, &vertices),
            Err(RenderError::RangeOutOfBounds(_))
        ));

        let meshlets = MeshSurface {
            meshlet_offset: 14,
            ..surface()
        };
        assert!(table.push(&transform, &meshlets).is_err());

        let overflow = MeshSurface {
            first_index: u32::MAX,
            ..surface()
        };
        assert!(table.push(&transform, &overflow).is_err());

        let material = MeshSurface {
            material: MAX_MATERIALS,
            ..surface()
        };
        assert!(table.push(&transform, &material).is_err());
        assert!(table.is_empty());

        // exactly filling the buffers is fine
        let full = MeshSurface {
            vertex_offset: 900,
            meshlet_offset: 12,
            ..surface()
        };
        assert!(table.push(&transform, &full).is_ok());
    }

    #[test]
    fn enforces_draw_capacity() {
        let mut table = small_table();
        let transform = TransformComponent::default();
        table.push(&transform, &surface()).unwrap();
        table.push(&transform, &surface()).unwrap();
        let err = table.push(&transform, &surface()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::CapacityExceeded {
                requested: 3,
                capacity: 2,
                ..
            }
        ));
        table.clear();
        assert!(table.push(&transform, &surface()).is_ok());
    }

    #[test]
    fn task_commands_skip_culled_draws() {
        let mut table = small_table();
        table
            .push(&TransformComponent::from_position(Vec3::new(0.0, 0.0, -10.0)), &surface())
            .unwrap();
        table
            .push(&TransformComponent::from_position(Vec3::new(0.0, 0.0, 50.0)), &surface())
            .unwrap();

        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_matrix(proj * view);

        let commands = table.task_commands(&frustum);
        assert_eq!(
            commands,
            vec![MeshTaskCommand {
                mesh_draw_id: 0,
                task_offset: 0,
                task_count: 4,
                _pad: 0,
            }]
        );
    }
}
