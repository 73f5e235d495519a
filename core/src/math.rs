//! Angle helpers shared by steering and weapon aiming.
//!
//! Rotation is measured in radians around the Y axis. A rotation of zero faces
//! the positive Z axis and positive angles turn toward positive X.

use std::f32::consts::PI;

use glam::Vec3;

/// Angular units per full turn used by the scripting VM.
const SCRIPT_ANGLE_UNITS_PER_TURN: f32 = 65_536.0;

/// Wraps an angle into the `[-π, π)` interval.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    let full_turn = 2.0 * PI;
    angle - full_turn * ((angle + PI) / full_turn).floor()
}

/// Converts a planar direction into a rotation around the Y axis.
#[must_use]
pub fn to_rotation(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Converts a rotation around the Y axis into a unit-length planar direction.
#[must_use]
pub fn to_direction(rotation: f32) -> Vec3 {
    Vec3::new(rotation.sin(), 0.0, rotation.cos())
}

/// Computes the heading and pitch needed to aim from `from` toward `to`.
///
/// Heading is relative to `rotation` and wrapped to `[-π, π)`. Pitch is the
/// signed elevation of the aim vector above the horizontal plane.
#[must_use]
pub fn heading_and_pitch(rotation: f32, from: Vec3, to: Vec3) -> (f32, f32) {
    let aim = to - from;
    let planar = Vec3::new(aim.x, 0.0, aim.z);

    let heading = wrap_angle(to_rotation(planar) - rotation);
    let pitch = aim.y.atan2(planar.length());

    (heading, pitch)
}

/// Converts radians into the integer angular units understood by scripts.
#[must_use]
pub fn to_script_angle(radians: f32) -> i32 {
    (radians * (SCRIPT_ANGLE_UNITS_PER_TURN / (2.0 * PI))).round() as i32
}
