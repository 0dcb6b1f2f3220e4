//! Small demo scene: a camera, a few lights and a row of animated meshes.

use gestalt_core::{BoundingSphere, Extent, MovementInput};
use gestalt_entity::{
    AnimationComponent, BodyType, CameraComponent, Collider, Entity, FreeFlyCamera, Keyframe,
    LightComponent, MaterialComponent, PbrMaterial, PbrTextures, PerspectiveProjection,
    PhysicsComponent, Projection, TransformComponent, World,
};
use gestalt_render::MeshSurface;
use glam::{Quat, Vec3, Vec4};

/// Marks an entity that draws one mesh surface.
pub struct MeshComponent {
    pub surface: MeshSurface,
}

pub struct Scene {
    pub world: World,
    pub camera: Entity,
    pub materials: Vec<MaterialComponent>,
}

impl Scene {
    pub fn build(extent: Extent) -> Self {
        let mut world = World::new();

        let projection = Projection::Perspective(PerspectiveProjection {
            aspect_ratio: extent.aspect_ratio(),
            ..PerspectiveProjection::default()
        });
        let controller = FreeFlyCamera::new(Vec3::new(0.0, 3.0, 12.0), Vec3::ZERO, Vec3::Y);
        let camera = world.spawn((
            CameraComponent::new(projection, controller),
            TransformComponent::default(),
        ));

        world.spawn((
            LightComponent::directional(Vec3::new(1.0, 0.95, 0.9), 4.0),
            TransformComponent::new(Vec3::ZERO, Quat::from_rotation_x(-1.0), 1.0),
        ));
        world.spawn((
            LightComponent::point(Vec3::new(1.0, 0.4, 0.2), 20.0, 8.0),
            TransformComponent::from_position(Vec3::new(-3.0, 2.0, 0.0)),
        ));
        world.spawn((
            LightComponent::spot(
                Vec3::ONE,
                50.0,
                15.0,
                20.0_f32.to_radians(),
                30.0_f32.to_radians(),
            ),
            TransformComponent::new(
                Vec3::new(0.0, 6.0, 0.0),
                Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                1.0,
            ),
        ));

        let materials = vec![
            MaterialComponent::new("ground", PbrMaterial::default()),
            MaterialComponent::new(
                "brass",
                PbrMaterial {
                    textures: PbrTextures {
                        albedo: Some(0),
                        normal: Some(1),
                        ..PbrTextures::default()
                    },
                    albedo_color: Vec4::new(0.9, 0.7, 0.3, 1.0),
                    metal_rough_factor: glam::Vec2::new(0.3, 1.0),
                    ..PbrMaterial::default()
                },
            ),
        ];

        for i in 0..4_u32 {
            let x = i as f32 * 2.5 - 3.75;
            world.spawn((
                TransformComponent::from_position(Vec3::new(x, 0.5, 0.0)),
                MeshComponent {
                    surface: MeshSurface {
                        local_bounds: BoundingSphere::new(Vec3::ZERO, 0.87),
                        meshlet_offset: i * 2,
                        meshlet_count: 2,
                        vertex_count: 24,
                        index_count: 36,
                        first_index: i * 36,
                        vertex_offset: i * 24,
                        material: 1,
                    },
                },
                AnimationComponent::new(
                    vec![
                        Keyframe::linear(0.0, Vec3::new(x, 0.5, 0.0)),
                        Keyframe::linear(1.0, Vec3::new(x, 1.5, 0.0)),
                        Keyframe::linear(2.0, Vec3::new(x, 0.5, 0.0)),
                    ],
                    vec![
                        Keyframe::linear(0.0, Quat::IDENTITY),
                        Keyframe::linear(2.0, Quat::from_rotation_y(std::f32::consts::PI)),
                    ],
                    Vec::new(),
                ),
                PhysicsComponent::new(BodyType::Dynamic, Collider::cuboid(Vec3::splat(0.5))),
            ));
        }

        Self {
            world,
            camera,
            materials,
        }
    }

    /// Step camera and animations by one frame.
    pub fn update(&mut self, delta_seconds: f32, input: &MovementInput, extent: Extent) {
        if let Ok(mut camera) = self.world.get::<&mut CameraComponent>(self.camera) {
            camera.update(delta_seconds, input, extent);
        }
        let animated = gestalt_entity::update_animations(&mut self.world, delta_seconds);
        tracing::debug!("Animated {animated} entities");
    }
}
