//! Straight-line stand-in for the pathfinding service.

use glam::Vec3;
use skirmish_core::{MovingGoal, PathRequest, Pathfinder, Terrain, UnitPath};

use crate::{GridTerrain, CELL_SIZE};

/// Routes every unit straight to its goal with a single waypoint.
///
/// Region goals resolve to the centre of the region. Obstacles are ignored;
/// blocked units rely on the collision fallback and path refresh instead.
#[derive(Clone, Debug)]
pub struct DirectPathfinder {
    terrain: GridTerrain,
}

impl DirectPathfinder {
    /// Creates a pathfinder sampling goal heights from `terrain`.
    #[must_use]
    pub fn new(terrain: GridTerrain) -> Self {
        Self { terrain }
    }
}

impl Pathfinder for DirectPathfinder {
    fn find_path(&mut self, request: &PathRequest) -> Option<UnitPath> {
        let (x, z) = match request.goal {
            MovingGoal::Point(point) => (point.x, point.z),
            MovingGoal::Region(region) => (
                (region.x as f32 + region.width as f32 / 2.0) * CELL_SIZE,
                (region.y as f32 + region.height as f32 / 2.0) * CELL_SIZE,
            ),
        };
        let waypoint = Vec3::new(x, self.terrain.height_at(x, z), z);
        Some(UnitPath::new(vec![waypoint]))
    }
}
