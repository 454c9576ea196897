//! Placement validity: the external check every PLACE must pass

use ahash::AHashSet;

use crate::core::types::{CellCoord, EmplacementKind, Vec2};
use crate::spatial::grid::Grid;
use crate::world::snapshot::WorldSnapshot;

/// Whether an emplacement of `kind` may be built on `cell`
///
/// Hosts with their own rules implement this; closures work too.
pub trait PlacementValidator {
    fn is_valid_placement(&self, cell: CellCoord, kind: EmplacementKind) -> bool;
}

impl<F> PlacementValidator for F
where
    F: Fn(CellCoord, EmplacementKind) -> bool,
{
    fn is_valid_placement(&self, cell: CellCoord, kind: EmplacementKind) -> bool {
        self(cell, kind)
    }
}

/// Bounds, blocked cells, overlap with existing emplacements and an optional
/// keep-out disc around the objective
#[derive(Debug, Clone)]
pub struct PlacementRules {
    grid: Grid,
    blocked: AHashSet<usize>,
    occupied: AHashSet<CellCoord>,
    safe_zone: Option<(Vec2, f32)>,
}

impl PlacementRules {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            blocked: AHashSet::new(),
            occupied: AHashSet::new(),
            safe_zone: None,
        }
    }

    /// Reject cells whose center lies closer than `radius` to `center`
    pub fn with_safe_zone(mut self, center: Vec2, radius: f32) -> Self {
        self.safe_zone = (center.is_finite() && radius > 0.0).then_some((center, radius));
        self
    }

    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Self {
        let grid = snapshot.grid;
        let mut rules = Self::new(grid);
        for cell in snapshot.blocked_cells.iter().filter_map(|&i| grid.coord(i)) {
            rules.block(cell);
        }
        for emplacement in &snapshot.emplacements {
            if let Some(cell) = grid.world_to_cell_checked(emplacement.position) {
                rules.occupy(cell);
            }
        }
        rules
    }

    pub fn block(&mut self, cell: CellCoord) {
        if let Some(index) = self.grid.index(cell) {
            self.blocked.insert(index);
        }
    }

    pub fn occupy(&mut self, cell: CellCoord) {
        self.occupied.insert(cell);
    }
}

impl PlacementValidator for PlacementRules {
    fn is_valid_placement(&self, cell: CellCoord, _kind: EmplacementKind) -> bool {
        let Some(index) = self.grid.index(cell) else {
            return false;
        };
        if self.blocked.contains(&index) || self.occupied.contains(&cell) {
            return false;
        }
        match self.safe_zone {
            Some((center, radius)) => self.grid.cell_center(cell).distance(&center) >= radius,
            None => true,
        }
    }
}
