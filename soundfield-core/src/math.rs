//! Math types for Soundfield

pub use glam::{Quat, Vec3};

/// Degrees in one full turn.
pub const FULL_TURN_DEGREES: f32 = 360.0;

/// Wraps any finite angle in degrees into `[0, 360)`.
///
/// Negative inputs in `(-360, 0)` come out as `value + 360`.
pub fn wrap_degrees(value: f32) -> f32 {
    let wrapped = value.rem_euclid(FULL_TURN_DEGREES);
    // rem_euclid rounds tiny negatives up to exactly 360.0 in f32
    if wrapped >= FULL_TURN_DEGREES {
        0.0
    } else {
        wrapped
    }
}

/// Renderer-facing rotation, a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationRotation(Quat);

impl OrientationRotation {
    pub const IDENTITY: Self = Self(Quat::IDENTITY);

    pub fn from_quat(quat: Quat) -> Self {
        Self(quat.normalize())
    }

    pub fn quat(&self) -> Quat {
        self.0
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }

    pub fn z(&self) -> f32 {
        self.0.z
    }

    pub fn w(&self) -> f32 {
        self.0.w
    }

    /// Components in the `(w, x, y, z)` order renderers expect.
    pub fn to_wxyz(&self) -> [f32; 4] {
        [self.0.w, self.0.x, self.0.y, self.0.z]
    }

    pub fn norm(&self) -> f32 {
        self.0.length()
    }
}

impl Default for OrientationRotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}
