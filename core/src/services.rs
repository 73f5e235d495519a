//! Collaborator contracts consumed from the host simulation.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{DiscreteRect, MovingGoal, ThreadId, UnitId, UnitPath};

/// Outcome of running a synchronous script thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    /// The thread ran to its end and returned `value` in its first local.
    Finished {
        /// First return local of the thread.
        value: i32,
    },
    /// The thread is waiting on something and did not finish.
    Suspended,
}

/// Script execution environment owned exclusively by a single unit.
///
/// The interpreter itself is outside this crate; only the launch/poll contract
/// is relied upon. Thread handles are only meaningful to the environment that
/// issued them.
pub trait ScriptEnvironment: fmt::Debug {
    /// Starts a schedulable thread running `script`.
    ///
    /// Returns `None` when the unit has no such script.
    fn launch(&mut self, script: &str, args: &[i32]) -> Option<ThreadId>;

    /// Prepares an unscheduled thread for a synchronous query.
    ///
    /// Returns `None` when the unit has no such script.
    fn launch_query(&mut self, script: &str, args: &[i32]) -> Option<ThreadId>;

    /// Runs an unscheduled query thread as far as it goes in one step.
    fn run_to_completion(&mut self, thread: ThreadId) -> ThreadStatus;

    /// Reaps a schedulable thread.
    ///
    /// `None` while the thread is still running, otherwise whether the script
    /// reported success.
    fn poll(&mut self, thread: ThreadId) -> Option<bool>;

    /// Offset of a model piece in the unit's local frame.
    ///
    /// Returns `None` when the piece index is unknown.
    fn piece_offset(&self, piece: i32) -> Option<Vec3>;
}

/// Slope, water-depth and footprint limits a mover is tested against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementProfile {
    /// Footprint width in cells.
    pub footprint_x: u32,
    /// Footprint depth in cells.
    pub footprint_z: u32,
    /// Steepest land slope permitted.
    pub max_slope: u32,
    /// Steepest underwater slope permitted.
    pub max_water_slope: u32,
    /// Shallowest water permitted; zero allows dry land.
    pub min_water_depth: u32,
    /// Deepest water permitted.
    pub max_water_depth: u32,
}

/// Terrain queries used for movement.
pub trait Terrain {
    /// Ground height at a planar position.
    fn height_at(&self, x: f32, z: f32) -> f32;

    /// Height of the water surface.
    fn sea_level(&self) -> f32;

    /// Cells covered by a footprint centred on `position`.
    fn footprint_region(&self, position: Vec3, footprint_x: u32, footprint_z: u32)
        -> DiscreteRect;

    /// Reports whether every cell of `region` is passable for `profile`.
    fn is_walkable(&self, profile: &MovementProfile, region: DiscreteRect) -> bool;
}

/// Spatial occupancy index mapping cells to the things standing on them.
pub trait Occupancy {
    /// Reports whether anything other than `mover` occupies a cell of `region`.
    fn is_collision_at(&self, region: DiscreteRect, mover: UnitId) -> bool;

    /// Moves `unit` from the cells of `from` to the cells of `to`.
    fn move_unit(&mut self, from: DiscreteRect, to: DiscreteRect, unit: UnitId);
}

/// Request handed to the pathfinding service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathRequest {
    /// Unit awaiting the path.
    pub unit: UnitId,
    /// Position of the unit when the request was taken.
    pub start: Vec3,
    /// Where the unit wants to go.
    pub goal: MovingGoal,
}

/// Asynchronous pathfinding service.
///
/// Requests are collected by the world during a tick; the host hands them to
/// the service and delivers results back as paths on later ticks.
pub trait Pathfinder {
    /// Computes a path for `request`, or `None` if no route exists yet.
    fn find_path(&mut self, request: &PathRequest) -> Option<UnitPath>;
}
