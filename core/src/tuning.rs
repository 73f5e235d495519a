//! Simulation constants that hosts may override.

use serde::{Deserialize, Serialize};

use crate::GameTimeDelta;

/// Behavior and movement parameters shared by every unit.
///
/// Values must be identical for every peer of a simulation; changing them
/// mid-game breaks reproducibility.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Planar distance at which a waypoint counts as reached.
    pub waypoint_arrival_distance: f32,
    /// Minimum age of a path before a collision may trigger a new request.
    pub path_refresh_cooldown: GameTimeDelta,
    /// Factor applied to maximum speed while a unit is below sea level.
    pub water_speed_factor: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            waypoint_arrival_distance: 8.0,
            path_refresh_cooldown: GameTimeDelta::new(60),
            water_speed_factor: 0.5,
        }
    }
}
