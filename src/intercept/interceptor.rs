//! Path Interceptor: ranks cells where an emplacement would meet the most traffic
//!
//! Composite score per (cell, emplacement kind):
//!
//! ```text
//! score = (w_traffic * traffic + w_perp * perpendicularity + w_paths * paths_covered
//!          + w_threat * threat_intercept + w_dwell * dwell_time) / sum(w)
//! final = (1 - counter_weight) * score + counter_weight * counter_effectiveness
//! ```
//!
//! Each cell yields at most one proposal: its best kind, with near-ties going
//! to the cheaper kind.

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::behavior::archetype::Archetype;
use crate::behavior::effectiveness::EffectivenessMatrix;
use crate::core::config::{AgentConfig, InterceptConfig};
use crate::core::types::{CellCoord, EmplacementKind, Vec2};
use crate::decision::candidate::{CandidateAction, PriorityBucket, Provenance, ScoreBreakdown};
use crate::influence::peaks::find_local_minima;
use crate::intercept::validity::PlacementValidator;
use crate::spatial::field::ScalarField;
use crate::spatial::grid::Grid;
use crate::traffic::flow_field::FlowFieldView;
use crate::world::snapshot::CostTable;

/// An emplacement kind the economy currently offers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateType {
    pub kind: EmplacementKind,
    pub cost: i64,
    pub range: f32,
}

/// Kinds that are both offered and have stats, in declaration order
pub fn candidate_types(config: &AgentConfig, costs: &CostTable) -> Vec<CandidateType> {
    costs
        .offered()
        .into_iter()
        .filter_map(|(kind, cost)| {
            config.stats(kind).map(|stats| CandidateType {
                kind,
                cost,
                range: stats.range,
            })
        })
        .collect()
}

/// Per-location counter effectiveness from threat hot-spots
///
/// Each hot-spot carries the archetype dominating it. A position takes the
/// nearest hot-spot within `reach`, else the match-wide fallback; with
/// neither, every kind is equally effective.
#[derive(Debug, Clone)]
pub struct CounterBias<'a> {
    matrix: &'a EffectivenessMatrix,
    hot_spots: Vec<(Vec2, Archetype)>,
    fallback: Option<Archetype>,
    reach: f32,
}

impl<'a> CounterBias<'a> {
    pub fn new(matrix: &'a EffectivenessMatrix, hot_spots: Vec<(Vec2, Archetype)>, fallback: Option<Archetype>, reach: f32) -> Self {
        Self {
            matrix,
            hot_spots,
            fallback,
            reach,
        }
    }

    pub fn neutral(matrix: &'a EffectivenessMatrix) -> Self {
        Self::new(matrix, Vec::new(), None, 0.0)
    }

    pub fn archetype_at(&self, position: Vec2) -> Option<Archetype> {
        self.hot_spots
            .iter()
            .map(|(spot, archetype)| (spot.distance(&position), *archetype))
            .filter(|(d, _)| *d <= self.reach)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, archetype)| archetype)
            .or(self.fallback)
    }

    pub fn effectiveness(&self, position: Vec2, kind: EmplacementKind) -> f32 {
        match self.archetype_at(position) {
            Some(archetype) => self.matrix.relative(archetype, kind),
            None => 1.0,
        }
    }
}

/// Read-only fields the interceptor scores against
#[derive(Debug, Clone, Copy)]
pub struct InterceptInputs<'a> {
    pub flow: FlowFieldView<'a>,
    pub traffic: &'a ScalarField,
    pub threat: &'a ScalarField,
    pub coverage: &'a ScalarField,
    pub objective: Vec2,
}

impl<'a> InterceptInputs<'a> {
    fn grid(&self) -> &Grid {
        self.flow.grid()
    }
}

/// Proposes PLACE candidates along high-traffic paths
#[derive(Debug, Clone)]
pub struct PathInterceptor {
    config: InterceptConfig,
}

impl PathInterceptor {
    pub fn new(config: &InterceptConfig) -> Self {
        Self { config: config.clone() }
    }

    pub fn config(&self) -> &InterceptConfig {
        &self.config
    }

    /// DEFENSE placement candidates, best first
    pub fn propose_placements(
        &self,
        inputs: &InterceptInputs,
        types: &[CandidateType],
        validator: &dyn PlacementValidator,
        counter: &CounterBias,
    ) -> Vec<CandidateAction> {
        let grid = *inputs.grid();
        let mut proposals = Vec::new();
        let mut rejected_invalid = 0usize;

        for index in 0..grid.cell_count() {
            if inputs.traffic.get(index) <= self.config.traffic_threshold {
                continue;
            }
            if inputs.coverage.get(index) >= self.config.coverage_threshold {
                continue;
            }
            let Some(cell) = grid.coord(index) else {
                continue;
            };
            if self.in_safe_zone(&grid, cell, inputs.objective) {
                continue;
            }

            match self.best_for_cell(inputs, cell, types, validator, counter) {
                Some(candidate) => proposals.push((index, candidate)),
                None => rejected_invalid += 1,
            }
        }

        let proposals = self.rank(proposals);
        debug!(
            proposals = proposals.len(),
            rejected_invalid,
            "placement proposals"
        );
        proposals
    }

    /// OPPORTUNISTIC candidates at coverage gaps on traversable ground
    ///
    /// Gaps are local minima of the coverage map over traversable cells that
    /// see any traffic at all; cells in `exclude` are skipped.
    pub fn propose_gap_fills(
        &self,
        inputs: &InterceptInputs,
        types: &[CandidateType],
        validator: &dyn PlacementValidator,
        counter: &CounterBias,
        min_separation: usize,
        exclude: &[CellCoord],
    ) -> Vec<CandidateAction> {
        let grid = *inputs.grid();
        let include = |i: usize| {
            inputs.flow.is_traversable(i)
                && inputs.traffic.get(i) > 0.0
                && inputs.coverage.get(i) < self.config.coverage_threshold
        };

        let mut proposals = Vec::new();
        for cell in find_local_minima(inputs.coverage, &grid, min_separation, include) {
            if exclude.contains(&cell) || self.in_safe_zone(&grid, cell, inputs.objective) {
                continue;
            }
            let Some(index) = grid.index(cell) else {
                continue;
            };
            if let Some(mut candidate) = self.best_for_cell(inputs, cell, types, validator, counter) {
                let gap = 1.0 - inputs.coverage.get(index);
                candidate.score *= gap;
                candidate.utility = candidate.score;
                candidate.bucket = PriorityBucket::Opportunistic;
                candidate.source = Provenance::CoverageGap;
                proposals.push((index, candidate));
            }
        }
        self.rank(proposals)
    }

    fn in_safe_zone(&self, grid: &Grid, cell: CellCoord, objective: Vec2) -> bool {
        grid.cell_center(cell).distance(&objective) < self.config.safe_zone_radius
    }

    fn rank(&self, mut proposals: Vec<(usize, CandidateAction)>) -> Vec<CandidateAction> {
        proposals.sort_by(|a, b| {
            OrderedFloat(b.1.score)
                .cmp(&OrderedFloat(a.1.score))
                .then(a.0.cmp(&b.0))
        });
        proposals
            .into_iter()
            .take(self.config.max_proposals)
            .map(|(_, c)| c)
            .collect()
    }

    /// Best valid kind for one cell; `None` when no kind may be built there
    fn best_for_cell(
        &self,
        inputs: &InterceptInputs,
        cell: CellCoord,
        types: &[CandidateType],
        validator: &dyn PlacementValidator,
        counter: &CounterBias,
    ) -> Option<CandidateAction> {
        let position = inputs.grid().cell_center(cell);
        let mut best: Option<(f32, CandidateType, ScoreBreakdown)> = None;

        for ty in types {
            if !validator.is_valid_placement(cell, ty.kind) {
                continue;
            }
            let mut breakdown = self.score_terms(inputs, cell, ty.range);
            breakdown.counter = counter.effectiveness(position, ty.kind);
            let score = self.combine(&breakdown);

            best = match best {
                None => Some((score, *ty, breakdown)),
                Some((best_score, best_ty, best_breakdown)) => {
                    let tied = (score - best_score).abs() <= self.config.cost_epsilon;
                    let better = if tied { ty.cost < best_ty.cost } else { score > best_score };
                    if better {
                        Some((score, *ty, breakdown))
                    } else {
                        Some((best_score, best_ty, best_breakdown))
                    }
                }
            };
        }

        best.map(|(score, ty, breakdown)| {
            CandidateAction::place(ty.kind, cell, score, ty.cost, Provenance::PathInterceptor).with_breakdown(breakdown)
        })
    }

    fn combine(&self, b: &ScoreBreakdown) -> f32 {
        let w = &self.config.weights;
        let total = w.total();
        let composite = if total > 0.0 {
            (w.traffic * b.traffic
                + w.perpendicularity * b.perpendicularity
                + w.paths_covered * b.paths_covered
                + w.threat_intercept * b.threat_intercept
                + w.dwell_time * b.dwell_time)
                / total
        } else {
            0.0
        };
        let cw = self.config.counter_weight;
        let score = (1.0 - cw) * composite + cw * b.counter;
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Geometry terms for an emplacement of `range` placed on `cell`
    pub fn score_terms(&self, inputs: &InterceptInputs, cell: CellCoord, range: f32) -> ScoreBreakdown {
        let grid = inputs.grid();
        let Some(home) = grid.index(cell) else {
            return ScoreBreakdown::default();
        };
        let center = grid.cell_center(cell);
        let range = range.max(grid.cell_size * 0.5);

        let mut traffic_sum = 0.0f32;
        let mut traffic_max = 0.0f32;
        let mut threat_max = 0.0f32;
        let mut heading = Vec2::ZERO;
        let mut chord_sum = 0.0f32;
        let mut transit = 0.0f32;

        let in_range: Vec<(usize, f32)> = grid
            .cells_within(center, range)
            .into_iter()
            .filter_map(|c| grid.index(c))
            .map(|i| (i, inputs.traffic.get(i)))
            .collect();

        for &(i, t) in &in_range {
            threat_max = threat_max.max(inputs.threat.get(i));
            if t <= 0.0 {
                continue;
            }
            traffic_sum += t;
            traffic_max = traffic_max.max(t);

            let dir = inputs.flow.direction(i);
            heading = heading + dir * t;

            // chord of the circle cut by the flow line through this cell
            let Some(c) = grid.coord(i) else {
                continue;
            };
            let offset = grid.cell_center(c) - center;
            let miss = dir.cross(&offset).abs().min(range);
            chord_sum += t * (1.0 - (miss / range).powi(2)).sqrt();
        }

        for &(i, t) in &in_range {
            if t > 0.0 && traffic_max > 0.0 {
                let cost = inputs.flow.cost(i);
                if cost.is_finite() {
                    transit += (t / traffic_max) * grid.cell_size * cost;
                }
            }
        }

        let (perpendicularity, paths_covered) = if traffic_sum > 0.0 {
            let turning = 1.0 - (heading.length() / traffic_sum).clamp(0.0, 1.0);
            let chord = chord_sum / traffic_sum;
            let diameter_cells = 2.0 * range / grid.cell_size;
            (
                0.5 * chord + 0.5 * turning,
                (traffic_sum / diameter_cells.max(1.0)).clamp(0.0, 1.0),
            )
        } else {
            (0.0, 0.0)
        };

        let dwell_time = if self.config.dwell_scale > 0.0 {
            1.0 - (-transit / self.config.dwell_scale).exp()
        } else {
            0.0
        };

        ScoreBreakdown {
            traffic: inputs.traffic.get(home),
            perpendicularity,
            paths_covered,
            threat_intercept: threat_max,
            dwell_time,
            ..ScoreBreakdown::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::effectiveness::default_effectiveness_rows;
    use crate::intercept::validity::PlacementRules;
    use crate::traffic::flow_field::FlowFieldSample;

    struct Board {
        grid: Grid,
        flow: Vec<FlowFieldSample>,
        traffic: ScalarField,
        zeros: ScalarField,
    }

    /// 9x9 board with an eastward corridor on row 4
    fn corridor() -> Board {
        let grid = Grid::new(9, 9, 1.0).unwrap();
        let mut flow = vec![FlowFieldSample::new(Vec2::new(0.0, 1.0), 1.0); grid.cell_count()];
        let mut values = vec![0.0; grid.cell_count()];
        for x in 0..9 {
            let i = grid.index(CellCoord::new(x, 4)).unwrap();
            flow[i] = FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0);
            values[i] = 1.0;
        }
        Board {
            traffic: ScalarField::from_values(&grid, values).unwrap(),
            zeros: ScalarField::zeros(&grid),
            grid,
            flow,
        }
    }

    fn types() -> Vec<CandidateType> {
        vec![
            CandidateType {
                kind: EmplacementKind::Gatling,
                cost: 50,
                range: 3.0,
            },
            CandidateType {
                kind: EmplacementKind::Cannon,
                cost: 120,
                range: 3.0,
            },
        ]
    }

    fn matrix() -> EffectivenessMatrix {
        EffectivenessMatrix::from_entries(&default_effectiveness_rows()).unwrap()
    }

    #[test]
    fn test_proposals_sit_on_traffic() {
        let board = corridor();
        let m = matrix();
        let inputs = InterceptInputs {
            flow: FlowFieldView::new(&board.grid, &board.flow),
            traffic: &board.traffic,
            threat: &board.zeros,
            coverage: &board.zeros,
            objective: Vec2::new(8.5, 4.5),
        };
        let interceptor = PathInterceptor::new(&InterceptConfig::default());
        let proposals = interceptor.propose_placements(&inputs, &types(), &PlacementRules::new(board.grid), &CounterBias::neutral(&m));

        assert!(!proposals.is_empty());
        for p in &proposals {
            match p.action {
                crate::decision::candidate::ActionKind::Place { cell, .. } => {
                    assert_eq!(cell.y, 4);
                    assert!(board.grid.cell_center(cell).distance(&inputs.objective) >= 1.5);
                }
                _ => panic!("only placements expected"),
            }
        }
    }

    #[test]
    fn test_equal_scores_prefer_cheaper_kind() {
        let board = corridor();
        let m = matrix();
        let inputs = InterceptInputs {
            flow: FlowFieldView::new(&board.grid, &board.flow),
            traffic: &board.traffic,
            threat: &board.zeros,
            coverage: &board.zeros,
            objective: Vec2::new(8.5, 4.5),
        };
        let interceptor = PathInterceptor::new(&InterceptConfig::default());
        let proposals = interceptor.propose_placements(&inputs, &types(), &PlacementRules::new(board.grid), &CounterBias::neutral(&m));
        assert!(proposals.iter().all(|p| p.cost == 50));
    }

    #[test]
    fn test_covered_cells_excluded() {
        let board = corridor();
        let m = matrix();
        let full = ScalarField::from_values(&board.grid, vec![1.0; board.grid.cell_count()]).unwrap();
        let inputs = InterceptInputs {
            flow: FlowFieldView::new(&board.grid, &board.flow),
            traffic: &board.traffic,
            threat: &board.zeros,
            coverage: &full,
            objective: Vec2::new(8.5, 4.5),
        };
        let interceptor = PathInterceptor::new(&InterceptConfig::default());
        let proposals = interceptor.propose_placements(&inputs, &types(), &PlacementRules::new(board.grid), &CounterBias::neutral(&m));
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_invalid_cells_rejected() {
        let board = corridor();
        let m = matrix();
        let inputs = InterceptInputs {
            flow: FlowFieldView::new(&board.grid, &board.flow),
            traffic: &board.traffic,
            threat: &board.zeros,
            coverage: &board.zeros,
            objective: Vec2::new(8.5, 4.5),
        };
        let nowhere = |_: CellCoord, _: EmplacementKind| false;
        let interceptor = PathInterceptor::new(&InterceptConfig::default());
        assert!(interceptor
            .propose_placements(&inputs, &types(), &nowhere, &CounterBias::neutral(&m))
            .is_empty());
    }

    #[test]
    fn test_counter_bias_picks_effective_kind() {
        let board = corridor();
        let m = matrix();
        let inputs = InterceptInputs {
            flow: FlowFieldView::new(&board.grid, &board.flow),
            traffic: &board.traffic,
            threat: &board.zeros,
            coverage: &board.zeros,
            objective: Vec2::new(8.5, 4.5),
        };
        // swarms favour cannons by a wide margin
        let bias = CounterBias::new(&m, vec![(Vec2::new(2.5, 4.5), Archetype::Swarming)], None, 10.0);
        let mut config = InterceptConfig::default();
        config.counter_weight = 0.5;
        let proposals = PathInterceptor::new(&config).propose_placements(&inputs, &types(), &PlacementRules::new(board.grid), &bias);
        assert!(proposals.iter().all(|p| p.cost == 120));
    }

    #[test]
    fn test_corner_scores_higher_perpendicularity() {
        let grid = Grid::new(9, 9, 1.0).unwrap();
        let mut flow = vec![FlowFieldSample::blocked(); grid.cell_count()];
        let mut values = vec![0.0; grid.cell_count()];
        // east along row 1, then south along column 7
        for x in 0..=7 {
            let i = grid.index(CellCoord::new(x, 1)).unwrap();
            flow[i] = FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0);
            values[i] = 1.0;
        }
        for y in 1..9 {
            let i = grid.index(CellCoord::new(7, y)).unwrap();
            flow[i] = FlowFieldSample::new(Vec2::new(0.0, 1.0), 1.0);
            values[i] = 1.0;
        }
        let traffic = ScalarField::from_values(&grid, values).unwrap();
        let zeros = ScalarField::zeros(&grid);
        let inputs = InterceptInputs {
            flow: FlowFieldView::new(&grid, &flow),
            traffic: &traffic,
            threat: &zeros,
            coverage: &zeros,
            objective: Vec2::new(7.5, 8.5),
        };
        let interceptor = PathInterceptor::new(&InterceptConfig::default());
        let corner = interceptor.score_terms(&inputs, CellCoord::new(7, 1), 2.0);
        let straight = interceptor.score_terms(&inputs, CellCoord::new(3, 1), 2.0);
        assert!(corner.perpendicularity > straight.perpendicularity);
    }

    #[test]
    fn test_gap_fills_are_opportunistic() {
        let board = corridor();
        let m = matrix();
        let inputs = InterceptInputs {
            flow: FlowFieldView::new(&board.grid, &board.flow),
            traffic: &board.traffic,
            threat: &board.zeros,
            coverage: &board.zeros,
            objective: Vec2::new(8.5, 4.5),
        };
        let interceptor = PathInterceptor::new(&InterceptConfig::default());
        let gaps = interceptor.propose_gap_fills(&inputs, &types(), &PlacementRules::new(board.grid), &CounterBias::neutral(&m), 3, &[]);
        assert!(!gaps.is_empty());
        assert!(gaps
            .iter()
            .all(|g| g.bucket == PriorityBucket::Opportunistic && g.source == Provenance::CoverageGap));
    }
}
