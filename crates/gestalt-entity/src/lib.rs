//! Scene components for the Gestalt engine.
//!
//! Uses hecs as the ECS backend. Components here are plain data; the
//! renderer reads them to fill its GPU buffers.

pub mod animation;
pub mod camera;
pub mod light;
pub mod material;
pub mod physics;
pub mod transform;

pub use animation::{
    AnimationChannel, AnimationComponent, Interpolate, InterpolationType, Keyframe,
};
pub use camera::{
    CameraComponent, FreeFlyCamera, OrthographicProjection, PerspectiveProjection, Projection,
};
pub use hecs::{Entity, World};
pub use light::{LightComponent, LightKind, LightType};
pub use material::{MaterialComponent, PbrMaterial, PbrTextures};
pub use physics::{BodyType, Collider, ColliderKind, PhysicsComponent, PhysicsHandle};
pub use transform::TransformComponent;

/// Advance every animated entity's channels and apply them to its transform.
/// Returns the number of entities updated.
pub fn update_animations(world: &mut World, delta_seconds: f32) -> usize {
    let mut count = 0;
    for (_, (animation, transform)) in
        world.query_mut::<(&mut AnimationComponent, &mut TransformComponent)>()
    {
        animation.update(delta_seconds, transform);
        count += 1;
    }
    count
}

/// Clear the dirty flag on every transform and return the entities that had it set.
pub fn take_dirty_transforms(world: &mut World) -> Vec<Entity> {
    world
        .query_mut::<&mut TransformComponent>()
        .into_iter()
        .filter_map(|(entity, transform)| {
            std::mem::take(&mut transform.is_dirty).then_some(entity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn animations_drive_world_transforms() {
        let mut world = World::new();
        let animated = world.spawn((
            TransformComponent::default(),
            AnimationComponent::new(
                vec![Keyframe::linear(0.0, Vec3::ZERO), Keyframe::linear(2.0, Vec3::X * 4.0)],
                Vec::new(),
                Vec::new(),
            ),
        ));
        let still = world.spawn((TransformComponent::default(),));

        assert_eq!(take_dirty_transforms(&mut world).len(), 2);
        assert_eq!(update_animations(&mut world, 1.0), 1);
        assert_eq!(take_dirty_transforms(&mut world), vec![animated]);

        let transform = world.get::<&TransformComponent>(animated).unwrap();
        assert_eq!(transform.position, Vec3::X * 2.0);
        assert!(world.get::<&TransformComponent>(still).is_ok());
    }
}
