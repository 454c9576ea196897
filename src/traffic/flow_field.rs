//! Read-only view over the externally supplied flow field

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::types::Vec2;
use crate::spatial::grid::Grid;

const SINK_EPSILON: f32 = 1e-3;
const MIN_COST: f32 = 0.05;

/// One cell of the pathfinding collaborator's output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowFieldSample {
    /// Unit direction toward the goal; zero at the goal itself
    pub direction: Vec2,
    /// Traversal cost; non-finite or negative means impassable
    pub cost: f32,
}

impl FlowFieldSample {
    pub fn new(direction: Vec2, cost: f32) -> Self {
        Self { direction, cost }
    }

    pub fn blocked() -> Self {
        Self {
            direction: Vec2::ZERO,
            cost: f32::INFINITY,
        }
    }

    pub fn is_traversable(&self) -> bool {
        self.cost.is_finite() && self.cost >= 0.0
    }

    /// No usable direction: the goal, or a cell the solver left unset
    pub fn is_sink(&self) -> bool {
        !self.direction.is_finite() || self.direction.length() < SINK_EPSILON
    }
}

/// Flow field paired with the grid it is keyed on
///
/// Samples beyond the end of an undersized array read as impassable.
#[derive(Debug, Clone, Copy)]
pub struct FlowFieldView<'a> {
    grid: &'a Grid,
    samples: &'a [FlowFieldSample],
}

impl<'a> FlowFieldView<'a> {
    pub fn new(grid: &'a Grid, samples: &'a [FlowFieldSample]) -> Self {
        if samples.len() < grid.cell_count() {
            warn!(
                expected = grid.cell_count(),
                actual = samples.len(),
                "flow field undersized, missing cells treated as impassable"
            );
        }
        Self { grid, samples }
    }

    pub fn grid(&self) -> &Grid {
        self.grid
    }

    /// Whether the array covers every grid cell
    pub fn is_complete(&self) -> bool {
        self.samples.len() >= self.grid.cell_count()
    }

    pub fn sample(&self, index: usize) -> Option<&FlowFieldSample> {
        if index < self.grid.cell_count() {
            self.samples.get(index)
        } else {
            None
        }
    }

    pub fn is_traversable(&self, index: usize) -> bool {
        self.sample(index).is_some_and(|s| s.is_traversable())
    }

    pub fn cost(&self, index: usize) -> f32 {
        self.sample(index)
            .filter(|s| s.is_traversable())
            .map_or(f32::INFINITY, |s| s.cost)
    }

    /// Unit flow direction, zero for sinks and impassable cells
    pub fn direction(&self, index: usize) -> Vec2 {
        match self.sample(index) {
            Some(s) if s.is_traversable() && !s.is_sink() => s.direction.normalize(),
            _ => Vec2::ZERO,
        }
    }

    /// Relative movement speed through a cell (inverse cost)
    pub fn speed(&self, index: usize) -> f32 {
        let cost = self.cost(index);
        if cost.is_finite() {
            1.0 / cost.max(MIN_COST)
        } else {
            0.0
        }
    }

    /// Traversable cells on the grid boundary, the default trace origins
    pub fn boundary_origins(&self) -> Vec<usize> {
        self.grid
            .boundary_indices()
            .into_iter()
            .filter(|i| self.is_traversable(*i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_sample() {
        let s = FlowFieldSample::blocked();
        assert!(!s.is_traversable());
        assert!(s.is_sink());
    }

    #[test]
    fn test_undersized_view_reads_impassable() {
        let grid = Grid::new(2, 2, 1.0).unwrap();
        let samples = vec![FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0); 3];
        let view = FlowFieldView::new(&grid, &samples);
        assert!(!view.is_complete());
        assert!(view.is_traversable(2));
        assert!(!view.is_traversable(3));
        assert_eq!(view.speed(3), 0.0);
    }

    #[test]
    fn test_speed_is_inverse_cost() {
        let grid = Grid::new(2, 1, 1.0).unwrap();
        let samples = vec![
            FlowFieldSample::new(Vec2::new(1.0, 0.0), 2.0),
            FlowFieldSample::new(Vec2::ZERO, 0.0),
        ];
        let view = FlowFieldView::new(&grid, &samples);
        assert_eq!(view.speed(0), 0.5);
        assert_eq!(view.direction(1), Vec2::ZERO);
        assert!(view.speed(1) > 1.0);
    }

    #[test]
    fn test_boundary_origins_skip_walls() {
        let grid = Grid::new(3, 3, 1.0).unwrap();
        let mut samples = vec![FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0); 9];
        samples[0] = FlowFieldSample::blocked();
        let view = FlowFieldView::new(&grid, &samples);
        let origins = view.boundary_origins();
        assert_eq!(origins.len(), 7);
        assert!(!origins.contains(&0));
        assert!(!origins.contains(&4));
    }
}
