//! Heading angle to renderer rotation.

use crate::math::{OrientationRotation, Quat};

/// Builds the rotation handed to the spatial renderer for a heading.
///
/// The result is the inverse of a rotation about the vertical (Y) axis by
/// `angle_degrees`: turning the listener by +θ turns the sound field by −θ.
pub fn compose(angle_degrees: f32) -> OrientationRotation {
    let heading = Quat::from_rotation_y(angle_degrees.to_radians());
    OrientationRotation::from_quat(heading.inverse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_1_SQRT_2;

    #[test]
    fn test_compose_zero_is_identity() {
        let rotation = compose(0.0);
        assert_relative_eq!(rotation.w(), 1.0);
        assert_relative_eq!(rotation.x(), 0.0);
        assert_relative_eq!(rotation.y(), 0.0);
        assert_relative_eq!(rotation.z(), 0.0);
    }

    #[test]
    fn test_compose_is_unit_norm() {
        let mut angle = 0.0f32;
        while angle < 360.0 {
            assert_relative_eq!(compose(angle).norm(), 1.0, epsilon = 1e-5);
            angle += 7.5;
        }
        assert_relative_eq!(compose(359.999).norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_compose_inverts_heading() {
        // +90 degrees heading -> sound field rotated -90 degrees about Y
        let rotation = compose(90.0);
        assert_relative_eq!(rotation.w(), FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(rotation.y(), -FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(rotation.x(), 0.0);
        assert_relative_eq!(rotation.z(), 0.0);

        let expected = Quat::from_rotation_y((-90.0f32).to_radians());
        assert!(rotation.quat().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_compose_rotates_front_to_side() {
        let rotation = compose(90.0).quat();
        let front = crate::math::Vec3::new(0.0, 0.0, -1.0);
        let rotated = rotation * front;
        assert_relative_eq!(rotated.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(rotated.z, 0.0, epsilon = 1e-6);
    }
}
