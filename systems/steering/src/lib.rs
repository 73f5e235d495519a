#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Steering integrator that turns desired heading and speed into motion.
//!
//! Rotation and speed converge toward the targets written by the behavior
//! system. Positions are committed straight into the occupancy index so units
//! updated later in the same tick see the new footprint.

use glam::Vec3;
use log::trace;
use skirmish_core::{wrap_angle, Occupancy, Terrain, UnitId};
use skirmish_world::{Unit, World};

/// System that integrates steering for one unit per call, committing the
/// new pose and footprint directly.
#[derive(Debug, Default)]
pub struct Steering;

impl Steering {
    /// Creates a new steering system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Applies rotation and speed steering to `unit`.
    pub fn steer(&mut self, world: &mut World, unit: UnitId) {
        let Some(parts) = world.unit_parts(unit) else {
            return;
        };

        update_rotation(parts.unit);
        update_speed(parts.unit, parts.terrain, parts.tuning.water_speed_factor);
    }

    /// Moves `unit` along its facing and commits the result.
    pub fn advance(&mut self, world: &mut World, unit: UnitId) {
        let Some(parts) = world.unit_parts(unit) else {
            return;
        };

        update_position(parts.unit, parts.terrain, parts.occupancy);
    }
}

/// Turns toward the target angle by at most the unit's turn rate.
pub fn update_rotation(unit: &mut Unit) {
    let delta = wrap_angle(unit.target_angle - unit.rotation);
    let turn = delta.clamp(-unit.turn_rate, unit.turn_rate);
    unit.rotation = wrap_angle(unit.rotation + turn);
}

/// Accelerates or brakes toward the target speed.
///
/// Below sea level the top speed is scaled by `water_speed_factor`.
pub fn update_speed<T: Terrain>(unit: &mut Unit, terrain: &T, water_speed_factor: f32) {
    let effective_max_speed = if unit.position.y < terrain.sea_level() {
        unit.max_speed * water_speed_factor
    } else {
        unit.max_speed
    };

    let speed = if unit.target_speed > unit.current_speed {
        (unit.current_speed + unit.acceleration).min(unit.target_speed)
    } else {
        (unit.current_speed - unit.brake_rate).max(unit.target_speed)
    };

    unit.current_speed = speed.clamp(0.0, effective_max_speed.max(0.0));
}

/// Moves the unit by its current speed along its facing.
///
/// A blocked move marks the unit as colliding and retries the move along each
/// planar axis alone, larger component first.
pub fn update_position<T: Terrain, O: Occupancy>(unit: &mut Unit, terrain: &T, occupancy: &mut O) {
    unit.in_collision = false;
    if unit.current_speed <= 0.0 {
        return;
    }

    let direction = unit.direction();
    let step = direction * unit.current_speed;
    let candidate = grounded(terrain, unit.position + step);
    if try_commit_position(unit, terrain, occupancy, candidate) {
        return;
    }

    unit.in_collision = true;
    let along_x = grounded(terrain, unit.position + Vec3::new(step.x, 0.0, 0.0));
    let along_z = grounded(terrain, unit.position + Vec3::new(0.0, 0.0, step.z));
    // Axis with the larger component magnitude goes first.
    let fallbacks = if direction.x.abs() >= direction.z.abs() {
        [along_x, along_z]
    } else {
        [along_z, along_x]
    };

    for fallback in fallbacks {
        if try_commit_position(unit, terrain, occupancy, fallback) {
            return;
        }
    }
    trace!("unit {} blocked at {:?}", unit.id.get(), unit.position);
}

/// Moves the unit to `candidate` if its footprint there is walkable and free.
///
/// Walkability is checked against the unit's own movement limits. On failure
/// neither the position nor the occupancy index changes.
pub fn try_commit_position<T: Terrain, O: Occupancy>(
    unit: &mut Unit,
    terrain: &T,
    occupancy: &mut O,
    candidate: Vec3,
) -> bool {
    let region = terrain.footprint_region(candidate, unit.footprint_x, unit.footprint_z);
    if !terrain.is_walkable(&unit.movement_profile(), region) {
        return false;
    }
    if occupancy.is_collision_at(region, unit.id) {
        return false;
    }

    let current = terrain.footprint_region(unit.position, unit.footprint_x, unit.footprint_z);
    occupancy.move_unit(current, region, unit.id);
    unit.position = candidate;
    true
}

fn grounded<T: Terrain>(terrain: &T, position: Vec3) -> Vec3 {
    Vec3::new(position.x, terrain.height_at(position.x, position.z), position.z)
}
