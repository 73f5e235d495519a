//! Cell occupancy index shared by every unit and map feature.

use skirmish_core::{DiscreteRect, Occupancy, UnitId};

/// Thing standing on a terrain cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Occupant {
    /// A live unit.
    Unit(UnitId),
    /// A blocking map feature such as a rock or wreck.
    Feature,
}

/// Dense row-major grid recording the occupant of each terrain cell.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<Occupant>>,
}

impl OccupancyGrid {
    /// Creates an empty grid of the given dimensions.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    /// Occupant of a cell, or `None` for free or out-of-grid cells.
    #[must_use]
    pub fn occupant(&self, column: i32, row: i32) -> Option<Occupant> {
        self.index(column, row)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    pub(crate) fn stamp_unit(&mut self, region: DiscreteRect, unit: UnitId) {
        self.fill(region, Some(Occupant::Unit(unit)));
    }

    pub(crate) fn stamp_feature(&mut self, region: DiscreteRect) {
        self.fill(region, Some(Occupant::Feature));
    }

    pub(crate) fn vacate_unit(&mut self, region: DiscreteRect, unit: UnitId) {
        for (column, row) in region.cells() {
            if let Some(index) = self.index(column, row) {
                if let Some(slot) = self.cells.get_mut(index) {
                    if *slot == Some(Occupant::Unit(unit)) {
                        *slot = None;
                    }
                }
            }
        }
    }

    fn fill(&mut self, region: DiscreteRect, value: Option<Occupant>) {
        for (column, row) in region.cells() {
            if let Some(index) = self.index(column, row) {
                if let Some(slot) = self.cells.get_mut(index) {
                    *slot = value;
                }
            }
        }
    }

    fn index(&self, column: i32, row: i32) -> Option<usize> {
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        if column < self.columns && row < self.rows {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

impl Occupancy for OccupancyGrid {
    fn is_collision_at(&self, region: DiscreteRect, mover: UnitId) -> bool {
        region.cells().any(|(column, row)| {
            matches!(
                self.occupant(column, row),
                Some(occupant) if occupant != Occupant::Unit(mover)
            )
        })
    }

    fn move_unit(&mut self, from: DiscreteRect, to: DiscreteRect, unit: UnitId) {
        self.vacate_unit(from, unit);
        self.stamp_unit(to, unit);
    }
}
