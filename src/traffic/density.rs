//! Traffic density: how many potential enemy paths cross each cell
//!
//! Each origin is walked down the flow field until it reaches the objective,
//! a sink or a dead end. Every cell on a finished walk gets one count; the
//! counts are divided by the number of origins traced.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::TrafficConfig;
use crate::core::types::Vec2;
use crate::spatial::field::ScalarField;
use crate::spatial::grid::NEIGHBOR_OFFSETS;
use crate::traffic::flow_field::FlowFieldView;

/// Why a trace stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEnd {
    /// Reached the objective cell
    Objective,
    /// Reached a cell with no flow direction
    Sink,
    /// No traversable neighbour along the flow
    DeadEnd,
    /// Revisited a cell; abandoned
    Cycle,
    /// Hit the step cap; abandoned
    StepCap,
}

impl TraceEnd {
    pub fn is_abandoned(&self) -> bool {
        matches!(self, TraceEnd::Cycle | TraceEnd::StepCap)
    }
}

/// Density field plus bookkeeping about the traces behind it
#[derive(Debug, Clone)]
pub struct TrafficReport {
    pub field: ScalarField,
    /// Origins that were valid and walked
    pub traced: usize,
    /// Walks discarded because of a cycle or the step cap
    pub abandoned: usize,
    /// Origins skipped as out of range or impassable
    pub skipped: usize,
}

/// Trace every origin through the flow field and accumulate traffic
///
/// Accumulation is a plain count per cell, so the result does not depend on
/// the order of `origins`.
pub fn compute_traffic_density(
    flow: &FlowFieldView,
    origins: &[usize],
    objective: Option<usize>,
    config: &TrafficConfig,
) -> TrafficReport {
    let grid = *flow.grid();
    let mut counts = vec![0u32; grid.cell_count()];
    let mut marks = vec![0u32; grid.cell_count()];
    let mut path = Vec::new();

    let mut traced = 0usize;
    let mut abandoned = 0usize;
    let mut skipped = 0usize;

    for &origin in origins {
        if origin >= grid.cell_count() || !flow.is_traversable(origin) {
            warn!(origin, "traffic origin out of range or impassable, skipped");
            skipped += 1;
            continue;
        }

        traced += 1;
        let generation = traced as u32;
        let end = trace(flow, origin, objective, config, &mut marks, generation, &mut path);

        if end.is_abandoned() {
            warn!(origin, steps = path.len(), reason = ?end, "traffic trace abandoned");
            abandoned += 1;
            continue;
        }
        if end == TraceEnd::DeadEnd {
            debug!(origin, steps = path.len(), "traffic trace stalled at dead end");
        }
        for &cell in &path {
            counts[cell] += 1;
        }
    }

    let mut field = ScalarField::zeros(&grid);
    if traced > 0 {
        let scale = 1.0 / traced as f32;
        for (value, count) in field.values_mut().iter_mut().zip(counts) {
            *value = (count as f32 * scale).min(1.0);
        }
    }

    TrafficReport {
        field,
        traced,
        abandoned,
        skipped,
    }
}

fn trace(
    flow: &FlowFieldView,
    origin: usize,
    objective: Option<usize>,
    config: &TrafficConfig,
    marks: &mut [u32],
    generation: u32,
    path: &mut Vec<usize>,
) -> TraceEnd {
    path.clear();
    let mut current = origin;
    let mut steps = 0usize;

    loop {
        if marks[current] == generation {
            return TraceEnd::Cycle;
        }
        marks[current] = generation;
        path.push(current);

        if Some(current) == objective {
            return TraceEnd::Objective;
        }
        if flow.direction(current) == Vec2::ZERO {
            return TraceEnd::Sink;
        }
        if steps >= config.max_steps {
            return TraceEnd::StepCap;
        }
        match next_cell(flow, current, config.tie_epsilon) {
            Some(next) => current = next,
            None => return TraceEnd::DeadEnd,
        }
        steps += 1;
    }
}

/// Neighbour best aligned with the flow; near-ties go to the cheaper cell
pub fn next_cell(flow: &FlowFieldView, index: usize, tie_epsilon: f32) -> Option<usize> {
    let grid = flow.grid();
    let cell = grid.coord(index)?;
    let dir = flow.direction(index);

    let mut options: Vec<(usize, f32, f32)> = Vec::with_capacity(8);
    for &(dx, dy) in NEIGHBOR_OFFSETS.iter() {
        let Some(n) = grid.index(cell.offset(dx, dy)) else {
            continue;
        };
        if !flow.is_traversable(n) {
            continue;
        }
        let alignment = dir.dot(&Vec2::new(dx as f32, dy as f32).normalize());
        if alignment > 0.0 {
            options.push((n, alignment, flow.cost(n)));
        }
    }

    let best = options.iter().map(|o| o.1).fold(f32::MIN, f32::max);
    options
        .into_iter()
        .filter(|o| o.1 >= best - tie_epsilon)
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|o| o.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CellCoord;
    use crate::spatial::grid::Grid;
    use crate::traffic::flow_field::FlowFieldSample;

    fn east_corridor(grid: &Grid) -> Vec<FlowFieldSample> {
        let mut samples = vec![FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0); grid.cell_count()];
        let last = grid.width - 1;
        for y in 0..grid.height {
            samples[y * grid.width + last] = FlowFieldSample::new(Vec2::ZERO, 0.0);
        }
        samples
    }

    #[test]
    fn test_straight_corridor_density() {
        let grid = Grid::new(5, 1, 1.0).unwrap();
        let samples = east_corridor(&grid);
        let view = FlowFieldView::new(&grid, &samples);
        let report = compute_traffic_density(&view, &[0], Some(4), &TrafficConfig::default());
        assert_eq!(report.traced, 1);
        assert_eq!(report.field.values(), &[1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_converging_paths_are_denser() {
        let grid = Grid::new(5, 3, 1.0).unwrap();
        let mut samples = east_corridor(&grid);
        // top and bottom rows bend into the middle row at x = 2
        samples[2] = FlowFieldSample::new(Vec2::new(0.0, 1.0), 1.0);
        samples[2 * 5 + 2] = FlowFieldSample::new(Vec2::new(0.0, -1.0), 1.0);
        let view = FlowFieldView::new(&grid, &samples);
        let origins = [0, 5, 10];
        let report = compute_traffic_density(&view, &origins, None, &TrafficConfig::default());

        let merged = grid.index(CellCoord::new(3, 1)).unwrap();
        let top_only = grid.index(CellCoord::new(1, 0)).unwrap();
        assert_eq!(report.field.get(merged), 1.0);
        assert!((report.field.get(top_only) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_cycle_is_abandoned() {
        let grid = Grid::new(2, 1, 1.0).unwrap();
        let samples = vec![
            FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0),
            FlowFieldSample::new(Vec2::new(-1.0, 0.0), 1.0),
        ];
        let view = FlowFieldView::new(&grid, &samples);
        let report = compute_traffic_density(&view, &[0], None, &TrafficConfig::default());
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.field.max(), 0.0);
    }

    #[test]
    fn test_step_cap_abandons_only_long_traces() {
        let grid = Grid::new(10, 1, 1.0).unwrap();
        let samples = east_corridor(&grid);
        let view = FlowFieldView::new(&grid, &samples);
        let config = TrafficConfig {
            max_steps: 4,
            ..TrafficConfig::default()
        };
        // origin 0 needs 9 steps, origin 7 needs 2
        let report = compute_traffic_density(&view, &[0, 7], Some(9), &config);
        assert_eq!(report.traced, 2);
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.field.get(8), 0.5);
        assert_eq!(report.field.get(1), 0.0);
    }

    #[test]
    fn test_bad_origins_skipped() {
        let grid = Grid::new(3, 1, 1.0).unwrap();
        let mut samples = east_corridor(&grid);
        samples[1] = FlowFieldSample::blocked();
        let view = FlowFieldView::new(&grid, &samples);
        let report = compute_traffic_density(&view, &[1, 99], None, &TrafficConfig::default());
        assert_eq!(report.skipped, 2);
        assert_eq!(report.traced, 0);
        assert_eq!(report.field.max(), 0.0);
    }

    #[test]
    fn test_tie_prefers_cheaper_neighbor() {
        let grid = Grid::new(3, 3, 1.0).unwrap();
        let mut samples = vec![FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0); 9];
        // pointing between east and north-east from the middle-left cell
        let diag = Vec2::new(1.0, 0.0).lerp(&Vec2::new(1.0, 1.0).normalize(), 0.5).normalize();
        samples[3] = FlowFieldSample::new(diag, 1.0);
        samples[4] = FlowFieldSample::new(Vec2::new(1.0, 0.0), 5.0);
        samples[7] = FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0);
        let view = FlowFieldView::new(&grid, &samples);
        assert_eq!(next_cell(&view, 3, 0.01), Some(7));
    }
}
