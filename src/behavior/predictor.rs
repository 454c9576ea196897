//! Short-horizon trajectory forecasting per archetype

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::archetype::Archetype;
use crate::behavior::effectiveness::EffectivenessMatrix;
use crate::core::config::BehaviorConfig;
use crate::core::error::Result;
use crate::core::types::{EmplacementKind, Vec2};
use crate::world::snapshot::{EmplacementSnapshot, EnemySnapshot};

/// What a forecast may depend on besides the enemy itself
#[derive(Debug, Clone, Copy)]
pub struct PredictionContext<'a> {
    pub objective: Vec2,
    pub emplacements: &'a [EmplacementSnapshot],
}

/// Archetype mix seen this cycle and over the match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeCensus {
    current: [u32; 5],
    total: [u64; 5],
}

impl ArchetypeCensus {
    pub fn current(&self, archetype: Archetype) -> u32 {
        self.current[archetype.index()]
    }

    pub fn total(&self, archetype: Archetype) -> u64 {
        self.total[archetype.index()]
    }

    /// Most common archetype this cycle; ties go to the one seen more over the match
    pub fn dominant(&self) -> Option<Archetype> {
        Archetype::ALL
            .iter()
            .copied()
            .filter(|a| self.current(*a) > 0)
            .max_by(|a, b| {
                self.current(*a)
                    .cmp(&self.current(*b))
                    .then(self.total(*a).cmp(&self.total(*b)))
                    .then(b.cmp(a))
            })
    }
}

/// Forecasts enemy motion and picks counter emplacements
#[derive(Debug, Clone)]
pub struct BehaviorPredictor {
    config: BehaviorConfig,
    matrix: EffectivenessMatrix,
    census: ArchetypeCensus,
    rng: ChaCha8Rng,
}

impl BehaviorPredictor {
    /// Fails if the configured effectiveness matrix is incomplete
    pub fn new(config: &BehaviorConfig, seed: u64) -> Result<Self> {
        Ok(Self {
            matrix: EffectivenessMatrix::from_entries(&config.effectiveness)?,
            config: config.clone(),
            census: ArchetypeCensus::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn matrix(&self) -> &EffectivenessMatrix {
        &self.matrix
    }

    pub fn census(&self) -> &ArchetypeCensus {
        &self.census
    }

    /// Record the archetype mix for this cycle
    pub fn observe(&mut self, enemies: &[EnemySnapshot]) {
        self.census.current = [0; 5];
        for enemy in enemies {
            let i = enemy.archetype.index();
            self.census.current[i] += 1;
            self.census.total[i] += 1;
        }
    }

    /// Emplacement kind that best counters an archetype
    pub fn select_counter(&self, archetype: Archetype) -> EmplacementKind {
        self.matrix.select_counter(archetype)
    }

    /// Predicted positions for steps 1..=horizon
    ///
    /// Malformed enemies (non-finite position or velocity) produce no forecast.
    pub fn predict_trajectory(
        &mut self,
        enemy: &EnemySnapshot,
        horizon: usize,
        ctx: &PredictionContext,
    ) -> Vec<Vec2> {
        if !enemy.position.is_finite() || !enemy.velocity.is_finite() {
            debug!(archetype = %enemy.archetype, "non-finite enemy state, no forecast");
            return Vec::new();
        }

        let dt = self.config.step_seconds;
        match enemy.archetype {
            Archetype::Direct => predict_direct(enemy, horizon, dt),
            Archetype::Strafing => {
                predict_strafe(enemy, horizon, dt, self.config.strafe_amplitude, self.config.strafe_frequency)
            }
            Archetype::Orbiting => predict_orbit(enemy, horizon, dt, ctx.objective),
            Archetype::Swarming => {
                let jitter = self.config.swarm_jitter;
                predict_direct(enemy, horizon, dt)
                    .into_iter()
                    .map(|p| p + random_offset(&mut self.rng, jitter))
                    .collect()
            }
            Archetype::Hunting => predict_hunt(enemy, horizon, dt, ctx),
        }
    }

    /// Most common archetype among enemies within `radius` of `center`
    pub fn dominant_near(enemies: &[EnemySnapshot], center: Vec2, radius: f32) -> Option<Archetype> {
        let mut counts = [0u32; 5];
        for enemy in enemies {
            if enemy.position.distance(&center) <= radius {
                counts[enemy.archetype.index()] += 1;
            }
        }
        Archetype::ALL
            .iter()
            .copied()
            .filter(|a| counts[a.index()] > 0)
            .max_by(|a, b| counts[a.index()].cmp(&counts[b.index()]).then(b.cmp(a)))
    }
}

fn predict_direct(enemy: &EnemySnapshot, horizon: usize, dt: f32) -> Vec<Vec2> {
    (1..=horizon)
        .map(|step| enemy.position + enemy.velocity * (step as f32 * dt))
        .collect()
}

fn predict_strafe(enemy: &EnemySnapshot, horizon: usize, dt: f32, amplitude: f32, frequency: f32) -> Vec<Vec2> {
    let lateral = enemy.velocity.normalize().perp();
    (1..=horizon)
        .map(|step| {
            let t = step as f32 * dt;
            enemy.position + enemy.velocity * t + lateral * (amplitude * (frequency * t).sin())
        })
        .collect()
}

/// Circular motion about the objective at the current radius and angular rate
fn predict_orbit(enemy: &EnemySnapshot, horizon: usize, dt: f32, objective: Vec2) -> Vec<Vec2> {
    let rel = enemy.position - objective;
    let radius = rel.length();
    if radius < 1e-3 {
        return predict_direct(enemy, horizon, dt);
    }
    let angular_rate = rel.cross(&enemy.velocity) / (radius * radius);
    let theta = rel.y.atan2(rel.x);
    (1..=horizon)
        .map(|step| {
            let angle = theta + angular_rate * step as f32 * dt;
            objective + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Heads for the nearest emplacement, or the objective when there is none
fn predict_hunt(enemy: &EnemySnapshot, horizon: usize, dt: f32, ctx: &PredictionContext) -> Vec<Vec2> {
    let target = ctx
        .emplacements
        .iter()
        .map(|e| e.position)
        .min_by(|a, b| a.distance(&enemy.position).total_cmp(&b.distance(&enemy.position)))
        .unwrap_or(ctx.objective);

    let stride = enemy.velocity.length() * dt;
    let mut position = enemy.position;
    let mut path = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let remaining = target - position;
        let distance = remaining.length();
        position = if distance <= stride {
            target
        } else {
            position + remaining.normalize() * stride
        };
        path.push(position);
    }
    path
}

fn random_offset(rng: &mut ChaCha8Rng, max_radius: f32) -> Vec2 {
    if max_radius <= 0.0 {
        return Vec2::ZERO;
    }
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let radius = rng.gen::<f32>() * max_radius;
    Vec2::new(angle.cos(), angle.sin()) * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EmplacementId;

    fn predictor() -> BehaviorPredictor {
        BehaviorPredictor::new(&BehaviorConfig::default(), 7).unwrap()
    }

    fn ctx(emplacements: &[EmplacementSnapshot]) -> PredictionContext<'_> {
        PredictionContext {
            objective: Vec2::ZERO,
            emplacements,
        }
    }

    #[test]
    fn test_direct_is_linear() {
        let enemy = EnemySnapshot::new(Vec2::new(10.0, 0.0), Vec2::new(-4.0, 0.0), Archetype::Direct, 1.0);
        let path = predictor().predict_trajectory(&enemy, 4, &ctx(&[]));
        assert_eq!(path.len(), 4);
        assert!((path[3].x - 6.0).abs() < 1e-5);
        assert_eq!(path[3].y, 0.0);
    }

    #[test]
    fn test_strafe_offset_is_bounded() {
        let config = BehaviorConfig::default();
        let enemy = EnemySnapshot::new(Vec2::new(10.0, 0.0), Vec2::new(-2.0, 0.0), Archetype::Strafing, 1.0);
        let path = predictor().predict_trajectory(&enemy, 20, &ctx(&[]));
        assert!(path.iter().all(|p| p.y.abs() <= config.strafe_amplitude + 1e-5));
        assert!(path.iter().any(|p| p.y.abs() > 0.1));
    }

    #[test]
    fn test_orbit_keeps_radius() {
        let enemy = EnemySnapshot::new(Vec2::new(5.0, 0.0), Vec2::new(0.0, 2.0), Archetype::Orbiting, 1.0);
        let path = predictor().predict_trajectory(&enemy, 30, &ctx(&[]));
        for p in &path {
            assert!((p.length() - 5.0).abs() < 1e-3);
        }
        // counter-clockwise motion starts upward
        assert!(path[0].y > 0.0);
    }

    #[test]
    fn test_swarm_stays_near_direct_path() {
        let config = BehaviorConfig::default();
        let enemy = EnemySnapshot::new(Vec2::new(10.0, 0.0), Vec2::new(-4.0, 0.0), Archetype::Swarming, 1.0);
        let mut p = predictor();
        let jittered = p.predict_trajectory(&enemy, 8, &ctx(&[]));
        let direct = predict_direct(&enemy, 8, config.step_seconds);
        for (a, b) in jittered.iter().zip(direct.iter()) {
            assert!(a.distance(b) <= config.swarm_jitter + 1e-5);
        }
    }

    #[test]
    fn test_hunter_targets_nearest_emplacement() {
        let near = EmplacementSnapshot::new(EmplacementId::new(1), EmplacementKind::Gatling, Vec2::new(10.0, 3.0), 3.0);
        let far = EmplacementSnapshot::new(EmplacementId::new(2), EmplacementKind::Gatling, Vec2::new(-10.0, 0.0), 3.0);
        let emplacements = [near, far];
        let enemy = EnemySnapshot::new(Vec2::new(10.0, 0.0), Vec2::new(-4.0, 0.0), Archetype::Hunting, 1.0);
        let path = predictor().predict_trajectory(&enemy, 10, &ctx(&emplacements));
        let last = path.last().unwrap();
        assert!(last.distance(&Vec2::new(10.0, 3.0)) < 1e-4, "hunter should stop on its target");
    }

    #[test]
    fn test_non_finite_enemy_has_no_forecast() {
        let enemy = EnemySnapshot::new(Vec2::new(f32::NAN, 0.0), Vec2::ZERO, Archetype::Direct, 1.0);
        assert!(predictor().predict_trajectory(&enemy, 5, &ctx(&[])).is_empty());
    }

    #[test]
    fn test_census_dominant() {
        let mut p = predictor();
        let make = |a| EnemySnapshot::new(Vec2::ZERO, Vec2::ZERO, a, 1.0);
        p.observe(&[make(Archetype::Swarming), make(Archetype::Swarming), make(Archetype::Hunting)]);
        assert_eq!(p.census().dominant(), Some(Archetype::Swarming));
        p.observe(&[]);
        assert_eq!(p.census().dominant(), None);
        assert_eq!(p.census().total(Archetype::Swarming), 2);
    }

    #[test]
    fn test_dominant_near_ignores_distant() {
        let enemies = [
            EnemySnapshot::new(Vec2::new(0.0, 0.0), Vec2::ZERO, Archetype::Orbiting, 1.0),
            EnemySnapshot::new(Vec2::new(50.0, 0.0), Vec2::ZERO, Archetype::Hunting, 1.0),
            EnemySnapshot::new(Vec2::new(51.0, 0.0), Vec2::ZERO, Archetype::Hunting, 1.0),
        ];
        assert_eq!(
            BehaviorPredictor::dominant_near(&enemies, Vec2::ZERO, 5.0),
            Some(Archetype::Orbiting)
        );
    }
}
