//! Influence map construction
//!
//! A map is built by stamping point sources onto the grid, optionally
//! spreading them to neighbours, then normalising into [0, 1]. The threat map
//! and the coverage map are the two standing instances.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{AgentConfig, InfluenceParams};
use crate::core::types::Vec2;
use crate::spatial::field::ScalarField;
use crate::spatial::grid::Grid;
use crate::world::snapshot::{EmplacementSnapshot, EnemySnapshot};

/// A point contribution to an influence map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfluenceSource {
    pub position: Vec2,
    pub magnitude: f32,
    /// World units beyond which the source contributes nothing directly
    pub radius: f32,
}

impl InfluenceSource {
    pub fn new(position: Vec2, magnitude: f32, radius: f32) -> Self {
        Self {
            position,
            magnitude,
            radius,
        }
    }
}

/// Build a normalised influence map from point sources
///
/// Overlapping sources sum. With no usable sources the result is all zeros.
pub fn build_map(grid: &Grid, sources: &[InfluenceSource], params: &InfluenceParams) -> ScalarField {
    let mut field = ScalarField::zeros(grid);

    let mut stamped = 0usize;
    for source in sources {
        if stamp_source(grid, &mut field, source, params) {
            stamped += 1;
        }
    }
    if stamped == 0 {
        return field;
    }

    propagate(grid, &mut field, params.decay, params.propagation_steps);
    params.normalization.apply(&mut field);
    field
}

fn stamp_source(grid: &Grid, field: &mut ScalarField, source: &InfluenceSource, params: &InfluenceParams) -> bool {
    if !source.magnitude.is_finite() || source.magnitude <= 0.0 {
        return false;
    }
    let Some(home) = grid.world_to_cell_checked(source.position) else {
        debug!(x = source.position.x, y = source.position.y, "influence source outside grid, skipped");
        return false;
    };
    let Some(home_index) = grid.index(home) else {
        return false;
    };

    field.add(home_index, source.magnitude);

    let radius = if source.radius.is_finite() { source.radius.max(0.0) } else { 0.0 };
    if radius <= 0.0 {
        return true;
    }
    for cell in grid.cells_within(source.position, radius) {
        if cell == home {
            continue;
        }
        if let Some(index) = grid.index(cell) {
            let t = grid.cell_center(cell).distance(&source.position) / radius;
            field.add(index, source.magnitude * params.falloff.attenuate(t));
        }
    }
    true
}

/// Spread values to neighbours: each pass a cell takes the larger of its own
/// value and its strongest neighbour scaled by `decay`.
fn propagate(grid: &Grid, field: &mut ScalarField, decay: f32, steps: usize) {
    if decay <= 0.0 || steps == 0 {
        return;
    }
    let decay = decay.min(1.0);
    for _ in 0..steps {
        let snapshot = field.values().to_vec();
        let values = field.values_mut();
        for (index, value) in values.iter_mut().enumerate() {
            let Some(cell) = grid.coord(index) else {
                continue;
            };
            let strongest = grid
                .neighbors(cell)
                .filter_map(|n| grid.index(n))
                .map(|n| snapshot[n])
                .fold(0.0f32, f32::max);
            *value = value.max(strongest * decay);
        }
    }
}

/// Threat contributed by one enemy: healthier and closer to the objective is worse
pub fn threat_magnitude(enemy: &EnemySnapshot, objective: Vec2, reach: f32) -> f32 {
    let health = if enemy.health.is_finite() { enemy.health.clamp(0.0, 1.0) } else { 1.0 };
    let proximity = if reach > 0.0 {
        1.0 - (enemy.position.distance(&objective) / reach).clamp(0.0, 1.0)
    } else {
        1.0
    };
    (0.4 + 0.6 * health) * (0.3 + 0.7 * proximity)
}

/// Threat sources for observed enemies plus their attenuated predicted positions
///
/// `predictions[i]` holds the forecast for `enemies[i]`; missing entries are fine.
pub fn threat_sources(
    grid: &Grid,
    enemies: &[EnemySnapshot],
    predictions: &[Vec<Vec2>],
    objective: Vec2,
    config: &AgentConfig,
) -> Vec<InfluenceSource> {
    let reach = grid.diagonal();
    let radius = config.influence.threat_radius;
    let mut sources = Vec::with_capacity(enemies.len() * (1 + config.influence.prediction_horizon));

    for (i, enemy) in enemies.iter().enumerate() {
        let magnitude = threat_magnitude(enemy, objective, reach);
        sources.push(InfluenceSource::new(enemy.position, magnitude, radius));

        if let Some(path) = predictions.get(i) {
            let steps = path.len().max(1) as f32;
            for (step, position) in path.iter().enumerate() {
                let fade = 1.0 - step as f32 / steps;
                sources.push(InfluenceSource::new(
                    *position,
                    magnitude * config.influence.predicted_weight * fade,
                    radius,
                ));
            }
        }
    }
    sources
}

/// Effective DPS of an emplacement, with each level adding a quarter of base
pub fn effective_dps(emplacement: &EmplacementSnapshot, config: &AgentConfig) -> f32 {
    let base = config.stats(emplacement.kind).map(|s| s.dps).unwrap_or(0.0);
    base * (1.0 + 0.25 * emplacement.level as f32)
}

/// Coverage sources: one per emplacement, radius = its range
pub fn coverage_sources(emplacements: &[EmplacementSnapshot], config: &AgentConfig) -> Vec<InfluenceSource> {
    emplacements
        .iter()
        .map(|e| InfluenceSource::new(e.position, effective_dps(e, config), e.range))
        .collect()
}
