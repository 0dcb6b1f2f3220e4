//! Input snapshot and surface extent.
//!
//! The window and input backends live outside this workspace. They hand the
//! engine one [`MovementInput`] per frame and the current [`Extent`].

use serde::{Deserialize, Serialize};

/// Size of the render target in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height, 1.0 for a degenerate extent.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Per-frame snapshot of the user's movement input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MovementInput {
    pub mouse_position_x: f32,
    pub mouse_position_y: f32,
    pub mouse_position_x_rel: f32,
    pub mouse_position_y_rel: f32,
    pub scroll: f32,
    pub left_mouse_button: bool,
    pub right_mouse_button: bool,
    pub middle_mouse_button: bool,
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Speed modifier (sprint).
    pub left_control: bool,
    /// Slow modifier.
    pub crouch: bool,
}

impl MovementInput {
    /// Absolute mouse position.
    pub fn mouse_position(&self) -> glam::Vec2 {
        glam::Vec2::new(self.mouse_position_x, self.mouse_position_y)
    }

    /// True if any translation key is held.
    pub const fn is_moving(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.up || self.down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio() {
        assert_eq!(Extent::new(1600, 900).aspect_ratio(), 1600.0 / 900.0);
        assert_eq!(Extent::new(1600, 0).aspect_ratio(), 1.0);
        assert!(Extent::default().is_empty());
    }

    #[test]
    fn movement_keys() {
        let mut input = MovementInput::default();
        assert!(!input.is_moving());
        input.up = true;
        assert!(input.is_moving());
    }
}
