//! Decision grid: dimensions, cell size and coordinate conversion

use serde::{Deserialize, Serialize};

use crate::core::error::{AgentError, Result};
use crate::core::types::{CellCoord, Vec2};

/// Offsets of the 8 neighbours, cardinals first
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

/// 2D lattice shared read-only by every field built during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub cell_size: f32,
    pub origin: Vec2,
}

impl Grid {
    pub fn new(width: usize, height: usize, cell_size: f32) -> Result<Self> {
        Self::with_origin(width, height, cell_size, Vec2::ZERO)
    }

    pub fn with_origin(width: usize, height: usize, cell_size: f32, origin: Vec2) -> Result<Self> {
        if width == 0 || height == 0 || !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(AgentError::InvalidGrid {
                width,
                height,
                cell_size,
            });
        }
        Ok(Self {
            width,
            height,
            cell_size,
            origin,
        })
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    #[inline]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.y as usize * self.width + cell.x as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn coord(&self, index: usize) -> Option<CellCoord> {
        if index < self.cell_count() {
            Some(CellCoord::new((index % self.width) as i32, (index / self.width) as i32))
        } else {
            None
        }
    }

    /// Convert world position to cell coordinates, clamped to the grid
    #[inline]
    pub fn world_to_cell(&self, pos: Vec2) -> CellCoord {
        let x = ((pos.x - self.origin.x) / self.cell_size).floor() as i32;
        let y = ((pos.y - self.origin.y) / self.cell_size).floor() as i32;
        CellCoord::new(
            x.max(0).min(self.width as i32 - 1),
            y.max(0).min(self.height as i32 - 1),
        )
    }

    /// Like `world_to_cell` but `None` outside the grid
    pub fn world_to_cell_checked(&self, pos: Vec2) -> Option<CellCoord> {
        if !pos.is_finite() {
            return None;
        }
        let x = ((pos.x - self.origin.x) / self.cell_size).floor();
        let y = ((pos.y - self.origin.y) / self.cell_size).floor();
        let cell = CellCoord::new(x as i32, y as i32);
        self.contains(cell).then_some(cell)
    }

    /// Cell center in world coordinates
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            self.origin.x + (cell.x as f32 + 0.5) * self.cell_size,
            self.origin.y + (cell.y as f32 + 0.5) * self.cell_size,
        )
    }

    /// In-bounds 8-neighbourhood of a cell
    pub fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |&(dx, dy)| cell.offset(dx, dy))
            .filter(move |c| self.contains(*c))
    }

    /// Cells whose centers lie within `radius` world units of `center`
    pub fn cells_within(&self, center: Vec2, radius: f32) -> Vec<CellCoord> {
        if !(radius >= 0.0) || !radius.is_finite() || !center.is_finite() {
            return Vec::new();
        }
        // beyond the grid's own extent a larger reach adds nothing
        let span = self.width.max(self.height) as f32;
        let reach = (radius / self.cell_size).ceil().min(span) as i32 + 1;
        let mid = self.world_to_cell(center);
        let (max_x, max_y) = (self.width as i32 - 1, self.height as i32 - 1);
        let mut cells = Vec::new();
        for y in (mid.y - reach).max(0)..=(mid.y + reach).min(max_y) {
            for x in (mid.x - reach).max(0)..=(mid.x + reach).min(max_x) {
                let cell = CellCoord::new(x, y);
                if self.cell_center(cell).distance(&center) <= radius {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Length of the grid diagonal in world units
    pub fn diagonal(&self) -> f32 {
        let w = self.width as f32 * self.cell_size;
        let h = self.height as f32 * self.cell_size;
        (w * w + h * h).sqrt()
    }

    /// Indices of every cell on the outer ring
    pub fn boundary_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if x == 0 || y == 0 || x == self.width - 1 || y == self.height - 1 {
                    indices.push(y * self.width + x);
                }
            }
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_grid() {
        assert!(Grid::new(0, 4, 1.0).is_err());
        assert!(Grid::new(4, 4, 0.0).is_err());
        assert!(Grid::new(4, 4, f32::NAN).is_err());
    }

    #[test]
    fn test_index_round_trip_at_corners() {
        let grid = Grid::new(7, 3, 1.0).unwrap();
        assert_eq!(grid.index(CellCoord::new(6, 2)), Some(20));
        assert_eq!(grid.coord(20), Some(CellCoord::new(6, 2)));
        assert_eq!(grid.index(CellCoord::new(7, 0)), None);
        assert_eq!(grid.coord(21), None);
    }

    #[test]
    fn test_world_to_cell_clamps() {
        let grid = Grid::new(4, 4, 2.0).unwrap();
        assert_eq!(grid.world_to_cell(Vec2::new(-5.0, 3.0)), CellCoord::new(0, 1));
        assert_eq!(grid.world_to_cell(Vec2::new(100.0, 100.0)), CellCoord::new(3, 3));
        assert_eq!(grid.world_to_cell_checked(Vec2::new(100.0, 1.0)), None);
    }

    #[test]
    fn test_corner_has_three_neighbors() {
        let grid = Grid::new(5, 5, 1.0).unwrap();
        assert_eq!(grid.neighbors(CellCoord::new(0, 0)).count(), 3);
        assert_eq!(grid.neighbors(CellCoord::new(2, 2)).count(), 8);
    }

    #[test]
    fn test_cells_within_radius() {
        let grid = Grid::new(10, 10, 1.0).unwrap();
        let cells = grid.cells_within(Vec2::new(5.5, 5.5), 1.0);
        // center plus the four cardinals
        assert_eq!(cells.len(), 5);
    }

    #[test]
    fn test_cells_within_unbounded_radius() {
        let grid = Grid::new(10, 6, 1.0).unwrap();
        assert!(grid.cells_within(Vec2::new(5.5, 2.5), f32::INFINITY).is_empty());
        assert!(grid.cells_within(Vec2::new(5.5, 2.5), f32::NAN).is_empty());

        let all = grid.cells_within(Vec2::new(5.5, 2.5), 1e30);
        assert_eq!(all.len(), grid.cell_count());
        let from_outside = grid.cells_within(Vec2::new(-40.0, 80.0), f32::MAX);
        assert_eq!(from_outside.len(), grid.cell_count());
    }

    #[test]
    fn test_boundary_count() {
        let grid = Grid::new(4, 3, 1.0).unwrap();
        assert_eq!(grid.boundary_indices().len(), 10);
    }
}
