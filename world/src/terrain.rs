//! Vertex heightmap terrain with a fixed cell size.

use glam::Vec3;
use skirmish_core::{DiscreteRect, MovementProfile, Terrain};

/// Side length of a terrain cell in world units.
pub const CELL_SIZE: f32 = 16.0;

/// Heightmap sampled at cell corners.
///
/// A grid of `columns` x `rows` cells carries `(columns + 1) * (rows + 1)`
/// vertex heights in row-major order. Cell `(column, row)` spans the world
/// rectangle starting at `(column * CELL_SIZE, row * CELL_SIZE)` on the XZ plane.
#[derive(Clone, Debug, PartialEq)]
pub struct GridTerrain {
    columns: u32,
    rows: u32,
    heights: Vec<f32>,
    sea_level: f32,
}

impl GridTerrain {
    /// Creates level terrain at `base_height`.
    #[must_use]
    pub fn flat(columns: u32, rows: u32, base_height: f32, sea_level: f32) -> Self {
        let vertices = vertex_count(columns, rows);
        Self {
            columns,
            rows,
            heights: vec![base_height; vertices],
            sea_level,
        }
    }

    /// Number of cell columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cell rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Overwrites the height of a single vertex.
    ///
    /// Vertices outside the grid are ignored and `false` is returned.
    pub fn set_vertex_height(&mut self, x: u32, z: u32, height: f32) -> bool {
        match self.vertex_index(x, z) {
            Some(index) => {
                self.heights[index] = height;
                true
            }
            None => false,
        }
    }

    /// Height stored at a vertex.
    #[must_use]
    pub fn vertex_height(&self, x: u32, z: u32) -> Option<f32> {
        self.vertex_index(x, z).map(|index| self.heights[index])
    }

    /// Reports whether every cell of `region` lies inside the grid.
    #[must_use]
    pub fn contains_region(&self, region: DiscreteRect) -> bool {
        let right = i64::from(region.x) + i64::from(region.width);
        let bottom = i64::from(region.y) + i64::from(region.height);
        region.x >= 0
            && region.y >= 0
            && right <= i64::from(self.columns)
            && bottom <= i64::from(self.rows)
    }

    /// Lowest corner height and corner height spread of a cell.
    fn cell_extent(&self, column: i32, row: i32) -> Option<(f32, f32)> {
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let corners = [
            self.vertex_height(column, row)?,
            self.vertex_height(column + 1, row)?,
            self.vertex_height(column, row + 1)?,
            self.vertex_height(column + 1, row + 1)?,
        ];
        let lowest = corners.iter().copied().fold(f32::INFINITY, f32::min);
        let highest = corners.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Some((lowest, highest - lowest))
    }

    fn is_cell_walkable(&self, profile: &MovementProfile, column: i32, row: i32) -> bool {
        let Some((lowest, slope)) = self.cell_extent(column, row) else {
            return false;
        };

        let depth = self.sea_level - lowest;
        if depth > 0.0 {
            depth >= profile.min_water_depth as f32
                && depth <= profile.max_water_depth as f32
                && slope <= profile.max_water_slope as f32
        } else {
            profile.min_water_depth == 0 && slope <= profile.max_slope as f32
        }
    }

    fn vertex_index(&self, x: u32, z: u32) -> Option<usize> {
        if x > self.columns || z > self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()? + 1;
        let x = usize::try_from(x).ok()?;
        let z = usize::try_from(z).ok()?;
        Some(z * width + x)
    }
}

impl Terrain for GridTerrain {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        if self.columns == 0 || self.rows == 0 {
            return self.heights.first().copied().unwrap_or(0.0);
        }

        let grid_x = (x / CELL_SIZE).clamp(0.0, self.columns as f32);
        let grid_z = (z / CELL_SIZE).clamp(0.0, self.rows as f32);
        let column = (grid_x.floor() as u32).min(self.columns - 1);
        let row = (grid_z.floor() as u32).min(self.rows - 1);
        let tx = grid_x - column as f32;
        let tz = grid_z - row as f32;

        let sample = |dx: u32, dz: u32| self.vertex_height(column + dx, row + dz).unwrap_or(0.0);
        let top = sample(0, 0) + (sample(1, 0) - sample(0, 0)) * tx;
        let bottom = sample(0, 1) + (sample(1, 1) - sample(0, 1)) * tx;
        top + (bottom - top) * tz
    }

    fn sea_level(&self) -> f32 {
        self.sea_level
    }

    fn footprint_region(&self, position: Vec3, footprint_x: u32, footprint_z: u32) -> DiscreteRect {
        let left = position.x - footprint_x as f32 * CELL_SIZE / 2.0;
        let top = position.z - footprint_z as f32 * CELL_SIZE / 2.0;
        DiscreteRect::new(
            (left / CELL_SIZE).round() as i32,
            (top / CELL_SIZE).round() as i32,
            footprint_x,
            footprint_z,
        )
    }

    fn is_walkable(&self, profile: &MovementProfile, region: DiscreteRect) -> bool {
        region
            .cells()
            .all(|(column, row)| self.is_cell_walkable(profile, column, row))
    }
}

fn vertex_count(columns: u32, rows: u32) -> usize {
    let count = (u64::from(columns) + 1) * (u64::from(rows) + 1);
    usize::try_from(count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> MovementProfile {
        MovementProfile {
            footprint_x: 2,
            footprint_z: 2,
            max_slope: 10,
            max_water_slope: 10,
            min_water_depth: 0,
            max_water_depth: 20,
        }
    }

    #[test]
    fn height_is_interpolated_between_vertices() {
        let mut terrain = GridTerrain::flat(4, 4, 0.0, -5.0);
        assert!(terrain.set_vertex_height(1, 0, 16.0));
        assert!(terrain.set_vertex_height(1, 1, 16.0));

        assert!((terrain.height_at(8.0, 8.0) - 8.0).abs() < 1e-4);
        assert!((terrain.height_at(16.0, 0.0) - 16.0).abs() < 1e-4);
        assert!((terrain.height_at(-50.0, 0.0)).abs() < 1e-4);
    }

    #[test]
    fn footprint_is_anchored_at_the_nearest_cell() {
        let terrain = GridTerrain::flat(16, 16, 0.0, -5.0);
        let region = terrain.footprint_region(Vec3::new(48.0, 0.0, 48.0), 2, 2);
        assert_eq!(region, DiscreteRect::new(2, 2, 2, 2));

        let region = terrain.footprint_region(Vec3::new(55.0, 0.0, 41.0), 2, 2);
        assert_eq!(region, DiscreteRect::new(2, 2, 2, 2));
    }

    #[test]
    fn regions_leaving_the_grid_are_not_walkable() {
        let terrain = GridTerrain::flat(4, 4, 0.0, -5.0);
        assert!(terrain.is_walkable(&tank(), DiscreteRect::new(2, 2, 2, 2)));
        assert!(!terrain.is_walkable(&tank(), DiscreteRect::new(3, 3, 2, 2)));
        assert!(!terrain.is_walkable(&tank(), DiscreteRect::new(-1, 0, 2, 2)));
    }

    #[test]
    fn steep_cells_block_land_units() {
        let mut terrain = GridTerrain::flat(4, 4, 0.0, -5.0);
        let _ = terrain.set_vertex_height(1, 1, 30.0);

        assert!(!terrain.is_walkable(&tank(), DiscreteRect::new(0, 0, 1, 1)));
        assert!(terrain.is_walkable(&tank(), DiscreteRect::new(2, 2, 2, 2)));
    }

    #[test]
    fn ships_need_water_and_tanks_need_shallows() {
        let terrain = GridTerrain::flat(4, 4, 0.0, 10.0);
        let ship = MovementProfile {
            min_water_depth: 5,
            ..tank()
        };
        let region = DiscreteRect::new(0, 0, 2, 2);
        assert!(terrain.is_walkable(&ship, region));
        assert!(terrain.is_walkable(&tank(), region));

        let deep = GridTerrain::flat(4, 4, 0.0, 40.0);
        assert!(!deep.is_walkable(&tank(), region));

        let dry = GridTerrain::flat(4, 4, 0.0, -1.0);
        assert!(!dry.is_walkable(&ship, region));
    }
}
