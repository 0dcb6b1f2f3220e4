//! Camera projections and the free-fly camera controller.

use gestalt_core::{Extent, MovementInput};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

/// Default vertical field of view (70 degrees).
pub const DEFAULT_FOV: f32 = 1.221_73;

const ORTHO_MIN_NEAR: f32 = 0.01;
const ORTHO_MAX_FAR: f32 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveProjection {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveProjection {
    fn default() -> Self {
        Self {
            fov: DEFAULT_FOV,
            aspect_ratio: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl PerspectiveProjection {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicProjection {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthographicProjection {
    /// Symmetric volume of half width `xmag` and half height `ymag`.
    pub const fn symmetric(xmag: f32, ymag: f32, near: f32, far: f32) -> Self {
        Self {
            left: -xmag,
            right: xmag,
            bottom: -ymag,
            top: ymag,
            near,
            far,
        }
    }

    /// Right-handed projection with a zero-to-one depth range.
    pub fn matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.depth_near(),
            self.depth_far(),
        )
    }

    /// Near plane as used by the matrix.
    pub fn depth_near(&self) -> f32 {
        self.near.max(ORTHO_MIN_NEAR)
    }

    /// Far plane as used by the matrix.
    pub fn depth_far(&self) -> f32 {
        self.far.min(ORTHO_MAX_FAR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective(PerspectiveProjection),
    Orthographic(OrthographicProjection),
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match self {
            Self::Perspective(p) => p.matrix(),
            Self::Orthographic(o) => o.matrix(),
        }
    }

    pub fn near(&self) -> f32 {
        match self {
            Self::Perspective(p) => p.near,
            Self::Orthographic(o) => o.depth_near(),
        }
    }

    pub fn far(&self) -> f32 {
        match self {
            Self::Perspective(p) => p.far,
            Self::Orthographic(o) => o.depth_far(),
        }
    }

    /// Follow the render target's aspect ratio. Orthographic volumes keep their extents.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if let Self::Perspective(p) = self {
            p.aspect_ratio = aspect_ratio;
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective(PerspectiveProjection::default())
    }
}

/// Mouse-look camera with damped, accelerated movement.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeFlyCamera {
    pub position: Vec3,
    /// World-to-view rotation.
    pub orientation: Quat,
    pub up: Vec3,
    pub move_speed: Vec3,
    mouse_position: Vec2,

    pub mouse_speed: f32,
    pub acceleration: f32,
    pub damping: f32,
    pub max_speed: f32,
    pub fast_coef: f32,
    pub slow_coef: f32,
}

impl FreeFlyCamera {
    pub fn new(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self {
            position,
            orientation: Quat::IDENTITY,
            up,
            move_speed: Vec3::ZERO,
            mouse_position: Vec2::ZERO,
            mouse_speed: 4.5,
            acceleration: 0.01,
            damping: 15.0,
            max_speed: 0.05,
            fast_coef: 5.0,
            slow_coef: 0.001,
        };
        camera.look_at(target, up);
        camera.set_up_vector(up);
        camera
    }

    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.orientation = Quat::from_mat4(&Mat4::look_at_rh(self.position, target, up));
    }

    /// Re-level the camera around `up`, keeping the view direction.
    pub fn set_up_vector(&mut self, up: Vec3) {
        self.up = up;
        let direction = self.forward();
        self.orientation = Quat::from_mat4(&Mat4::look_at_rh(
            self.position,
            self.position + direction,
            up,
        ));
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.orientation) * Mat4::from_translation(-self.position)
    }

    /// World-space view direction.
    pub fn forward(&self) -> Vec3 {
        let v = Mat4::from_quat(self.orientation);
        -Vec3::new(v.x_axis.z, v.y_axis.z, v.z_axis.z)
    }

    /// World-space right vector.
    pub fn right(&self) -> Vec3 {
        let v = Mat4::from_quat(self.orientation);
        Vec3::new(v.x_axis.x, v.y_axis.x, v.z_axis.x)
    }

    /// Reset the reference point for mouse-look deltas.
    pub fn reset_mouse_position(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    pub fn update(&mut self, delta_seconds: f32, input: &MovementInput) {
        let mouse = input.mouse_position();
        if input.right_mouse_button {
            let delta = mouse - self.mouse_position;
            let delta_rotation = Quat::from_euler(
                EulerRot::ZYX,
                0.0,
                self.mouse_speed * delta.x,
                self.mouse_speed * delta.y,
            );
            let rotated = (delta_rotation * self.orientation).normalize();

            // reject rotations that would look straight along the up axis
            let v = Mat4::from_quat(rotated);
            let forward = -Vec3::new(v.x_axis.z, v.y_axis.z, v.z_axis.z);
            if forward.normalize_or_zero().dot(self.up.normalize_or_zero()).abs() < 0.999 {
                self.orientation = rotated;
            }
            self.set_up_vector(self.up);
        }
        self.mouse_position = mouse;

        let forward = self.forward();
        let right = self.right();
        let up = right.cross(forward);

        let mut accel = Vec3::ZERO;
        if input.forward {
            accel += forward;
        }
        if input.backward {
            accel -= forward;
        }
        if input.left {
            accel -= right;
        }
        if input.right {
            accel += right;
        }
        if input.up {
            accel += up;
        }
        if input.down {
            accel -= up;
        }
        if input.left_control {
            accel *= self.fast_coef;
        }
        if input.crouch {
            accel *= self.slow_coef;
        }

        if accel == Vec3::ZERO {
            self.move_speed -= self.move_speed * (delta_seconds / self.damping).min(1.0);
        } else {
            self.move_speed += accel * self.acceleration * delta_seconds;
            let max_speed = if input.left_control {
                self.max_speed * self.fast_coef
            } else if input.crouch {
                self.max_speed * self.slow_coef
            } else {
                self.max_speed
            };
            if self.move_speed.length() > max_speed {
                self.move_speed = self.move_speed.normalize() * max_speed;
            }
        }

        self.position += self.move_speed * delta_seconds;
    }
}

impl Default for FreeFlyCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
    }
}

/// Camera attached to an entity, with the matrices of its last update.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    pub projection: Projection,
    pub controller: FreeFlyCamera,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub is_dirty: bool,
}

impl CameraComponent {
    pub fn new(projection: Projection, controller: FreeFlyCamera) -> Self {
        Self {
            view_matrix: controller.view_matrix(),
            projection_matrix: projection.matrix(),
            projection,
            controller,
            is_dirty: true,
        }
    }

    /// Advance the controller and recompute both matrices for `extent`.
    pub fn update(&mut self, delta_seconds: f32, input: &MovementInput, extent: Extent) {
        self.controller.update(delta_seconds, input);
        self.projection.set_aspect_ratio(extent.aspect_ratio());
        self.view_matrix = self.controller.view_matrix();
        self.projection_matrix = self.projection.matrix();
        self.is_dirty = true;
    }

    pub fn near(&self) -> f32 {
        self.projection.near()
    }

    pub fn far(&self) -> f32 {
        self.projection.far()
    }
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self::new(Projection::default(), FreeFlyCamera::default())
    }
}
