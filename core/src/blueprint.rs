//! Per-type unit attributes used when spawning.

use serde::{Deserialize, Serialize};

use crate::{SoundId, WeaponDefinition};

/// Attributes shared by every unit of a type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitBlueprint {
    /// Name of the unit type.
    pub unit_type: String,
    /// Turn rate in radians per tick.
    pub turn_rate: f32,
    /// Top speed in world units per tick.
    pub max_speed: f32,
    /// Speed gained per tick while accelerating.
    pub acceleration: f32,
    /// Speed lost per tick while braking.
    pub brake_rate: f32,
    /// Footprint width in cells.
    pub footprint_x: u32,
    /// Footprint depth in cells.
    pub footprint_z: u32,
    /// Steepest land slope the unit can stand on.
    pub max_slope: u32,
    /// Steepest underwater slope the unit can stand on.
    pub max_water_slope: u32,
    /// Shallowest water the unit can enter; non-zero for ships.
    pub min_water_depth: u32,
    /// Deepest water the unit can enter.
    pub max_water_depth: u32,
    /// Hit points of a freshly built unit.
    pub max_hit_points: u32,
    /// Weapons mounted in the three slots.
    #[serde(default)]
    pub weapons: [Option<WeaponDefinition>; 3],
    /// Weapon detonated when the unit dies.
    #[serde(default)]
    pub explosion_weapon: Option<WeaponDefinition>,
    /// Cue played when a move order completes.
    #[serde(default)]
    pub arrived_sound: Option<SoundId>,
}
