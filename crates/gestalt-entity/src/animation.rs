//! Keyframe animation channels.

use crate::transform::TransformComponent;
use glam::{Quat, Vec3};

/// How the value between a keyframe and its successor is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterpolationType {
    #[default]
    Linear,
    /// Hold the keyframe's value until the next keyframe.
    Step,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    /// Seconds from the start of the animation.
    pub time: f32,
    pub value: T,
    pub interpolation: InterpolationType,
}

impl<T> Keyframe<T> {
    pub const fn linear(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            interpolation: InterpolationType::Linear,
        }
    }

    pub const fn step(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            interpolation: InterpolationType::Step,
        }
    }
}

/// Values that can be blended between two keyframes.
pub trait Interpolate: Copy {
    fn interpolate(self, other: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolate for Quat {
    /// Normalized linear blend.
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t).normalize()
    }
}

/// Keyframes sorted by time plus a playback cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel<T> {
    keyframes: Vec<Keyframe<T>>,
    pub current_time: f32,
}

impl<T> Default for AnimationChannel<T> {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
            current_time: 0.0,
        }
    }
}

impl<T: Interpolate> AnimationChannel<T> {
    /// Keyframes are sorted by time.
    pub fn new(mut keyframes: Vec<Keyframe<T>>) -> Self {
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            keyframes,
            current_time: 0.0,
        }
    }

    pub fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe.
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Value at `time`. Past the last keyframe the last value is held.
    pub fn sample(&self, time: f32) -> Option<T> {
        let (first, rest) = self.keyframes.split_first()?;
        if rest.is_empty() || time <= first.time {
            return Some(first.value);
        }

        let Some(pair) = self
            .keyframes
            .windows(2)
            .find(|pair| time >= pair[0].time && time <= pair[1].time)
        else {
            return self.keyframes.last().map(|k| k.value);
        };

        let (start, end) = (&pair[0], &pair[1]);
        match start.interpolation {
            InterpolationType::Step => Some(start.value),
            InterpolationType::Linear => {
                let span = end.time - start.time;
                if span <= f32::EPSILON {
                    return Some(end.value);
                }
                let t = (time - start.time) / span;
                Some(start.value.interpolate(end.value, t))
            }
        }
    }

    /// Advance the cursor by `delta_seconds` and sample. A looping channel
    /// rewinds to zero once it passes its last keyframe.
    pub fn advance(&mut self, delta_seconds: f32, looping: bool) -> Option<T> {
        self.current_time += delta_seconds;
        let value = self.sample(self.current_time);
        if looping && self.current_time > self.duration() {
            self.current_time = 0.0;
        }
        value
    }
}

/// Translation, rotation and scale channels driving an entity's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationComponent {
    pub translation: AnimationChannel<Vec3>,
    pub rotation: AnimationChannel<Quat>,
    pub scale: AnimationChannel<f32>,
    pub looping: bool,
}

impl AnimationComponent {
    pub fn new(
        translation: Vec<Keyframe<Vec3>>,
        rotation: Vec<Keyframe<Quat>>,
        scale: Vec<Keyframe<f32>>,
    ) -> Self {
        Self {
            translation: AnimationChannel::new(translation),
            rotation: AnimationChannel::new(rotation),
            scale: AnimationChannel::new(scale),
            looping: true,
        }
    }

    /// Advance all channels and write their values into `transform`.
    /// Empty channels leave the corresponding property untouched.
    pub fn update(&mut self, delta_seconds: f32, transform: &mut TransformComponent) {
        if let Some(position) = self.translation.advance(delta_seconds, self.looping) {
            transform.set_position(position);
        }
        if let Some(rotation) = self.rotation.advance(delta_seconds, self.looping) {
            transform.set_rotation(rotation);
        }
        if let Some(scale) = self.scale.advance(delta_seconds, self.looping) {
            transform.set_scale(scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn ramp() -> AnimationChannel<Vec3> {
        AnimationChannel::new(vec![
            Keyframe::linear(0.0, Vec3::ZERO),
            Keyframe::linear(1.0, Vec3::X),
            Keyframe::linear(2.0, Vec3::new(1.0, 2.0, 0.0)),
        ])
    }

    #[test]
    fn linear_sampling() {
        let channel = ramp();
        assert_relative_eq!(channel.sample(0.5).unwrap().x, 0.5);
        let v = channel.sample(1.5).unwrap();
        assert_relative_eq!(v.x, 1.0);
        assert_relative_eq!(v.y, 1.0);
    }

    #[test]
    fn holds_last_value_past_end() {
        let channel = ramp();
        assert_eq!(channel.sample(10.0), Some(Vec3::new(1.0, 2.0, 0.0)));
    }

    #[test]
    fn single_keyframe_is_constant() {
        let channel = AnimationChannel::new(vec![Keyframe::linear(0.5, 3.0_f32)]);
        assert_eq!(channel.sample(0.0), Some(3.0));
        assert_eq!(channel.sample(7.0), Some(3.0));
        assert_eq!(AnimationChannel::<f32>::default().sample(0.0), None);
    }

    #[test]
    fn step_holds_until_next_key() {
        let channel = AnimationChannel::new(vec![
            Keyframe::step(0.0, 1.0_f32),
            Keyframe::step(1.0, 5.0),
        ]);
        assert_eq!(channel.sample(0.99), Some(1.0));
        assert_eq!(channel.sample(1.0), Some(1.0));
        assert_eq!(channel.sample(1.5), Some(5.0));
    }

    #[test]
    fn rotation_is_normalized() {
        let channel = AnimationChannel::new(vec![
            Keyframe::linear(0.0, Quat::IDENTITY),
            Keyframe::linear(1.0, Quat::from_rotation_y(FRAC_PI_2)),
        ]);
        let q = channel.sample(0.5).unwrap();
        assert_relative_eq!(q.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn looping_rewinds() {
        let mut channel = ramp();
        channel.advance(2.5, true);
        assert_eq!(channel.current_time, 0.0);

        let mut channel = ramp();
        channel.advance(2.5, false);
        assert_relative_eq!(channel.current_time, 2.5);
    }

    #[test]
    fn component_drives_transform() {
        let mut animation = AnimationComponent::new(
            vec![Keyframe::linear(0.0, Vec3::ZERO), Keyframe::linear(1.0, Vec3::Y)],
            Vec::new(),
            vec![Keyframe::linear(0.0, 1.0), Keyframe::linear(1.0, 3.0)],
        );
        let mut transform = TransformComponent::default();
        transform.is_dirty = false;
        animation.update(0.5, &mut transform);
        assert_relative_eq!(transform.position.y, 0.5);
        assert_relative_eq!(transform.scale, 2.0);
        assert_eq!(transform.rotation, Quat::IDENTITY);
        assert!(transform.is_dirty);
    }
}
