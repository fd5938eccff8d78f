//! Turning an oriented bounding box into a true size and a straightening rotation.
//!
//! The bounding-box query assigns `size.0`/`size.1` to whichever edge happens
//! to sit at the reported angle, so neither the reported width nor the angle
//! tells which way the physical part leans. Both are resolved here against the
//! caller's knowledge of whether the part is taller than it is wide.

use crate::models::RotatedRect;

/// Width and height of the physical object inside `rect`.
pub fn true_size(rect: &RotatedRect, height_greater_than_width: bool) -> (f32, f32) {
    let (w, h) = rect.size;
    let (short, long) = if w <= h { (w, h) } else { (h, w) };
    if height_greater_than_width {
        (short, long)
    } else {
        (long, short)
    }
}

/// Which way the rectangle leans relative to its straight pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tilt {
    Left,
    Right,
}

/// Classify the lean of `rect` from its two lowest corners.
///
/// The lowest corner's side (left or right of the second lowest) together
/// with the expected long axis picks which reported dimension the bottom edge
/// is compared against.
pub fn tilt(rect: &RotatedRect, height_greater_than_width: bool) -> Tilt {
    let mut corners = rect.corners_i32();
    // Lowest on screen first; stable so equal rows keep corner order
    corners.sort_by(|a, b| b.y.cmp(&a.y));
    let lowest = corners[0];
    let second_lowest = corners[1];

    let lowest_on_left = lowest.x < second_lowest.x;
    let dx = (lowest.x - second_lowest.x) as f32;
    let dy = (lowest.y - second_lowest.y) as f32;
    let bottom_edge = (dx * dx + dy * dy).sqrt();

    let (w, h) = rect.size;
    let tilted_left = match (height_greater_than_width, lowest_on_left) {
        (true, true) => w > bottom_edge,
        (true, false) => h < bottom_edge,
        (false, true) => w < bottom_edge,
        (false, false) => h > bottom_edge,
    };

    if tilted_left { Tilt::Left } else { Tilt::Right }
}

/// Rotation in degrees (positive is counter-clockwise on screen) that brings
/// the object's height axis to vertical.
///
/// Assumes the skew never needs more than a single quadrant of correction.
pub fn straightening_angle(rect: &RotatedRect, height_greater_than_width: bool) -> f32 {
    if rect.angle == 0.0 || rect.angle == 90.0 {
        return 0.0;
    }

    match tilt(rect, height_greater_than_width) {
        Tilt::Left => rect.angle - 90.0,
        Tilt::Right => rect.angle,
    }
}

/// The other quadrant's candidate, used when the first straightening guess
/// turned out wrong.
pub fn flipped_angle(angle: f32) -> f32 {
    if angle > 0.0 { angle - 90.0 } else { angle + 90.0 }
}
