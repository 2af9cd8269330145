use crate::math::wrap_degrees;

/// Converts a pointer position on a square dial into a heading in `[0, 360)`.
///
/// The dial's top edge is 0°, right is 90°, bottom 180° and left 270°.
/// Returns `None` for a degenerate surface (zero, negative or non-finite size)
/// or a non-finite pointer position.
///
/// # Arguments
/// * `x`, `y` - Pointer position relative to the surface's top-left corner
/// * `width`, `height` - Surface size in the same units
pub fn touch_to_angle(x: f32, y: f32, width: f32, height: f32) -> Option<f32> {
    let usable = |v: f32| v.is_finite() && v > 0.0;
    if !usable(width) || !usable(height) || !x.is_finite() || !y.is_finite() {
        return None;
    }

    let nx = f64::from(x) / f64::from(width) * 2.0 - 1.0;
    let ny = f64::from(y) / f64::from(height) * 2.0 - 1.0;
    let angle = ny.atan2(nx).to_degrees() + 90.0;
    let angle = if angle < 0.0 { angle + 360.0 } else { angle };

    // Narrowing can round 359.99.. up to 360.0
    Some(wrap_degrees(angle as f32))
}
