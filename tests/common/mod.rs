//! Shared boards for integration tests

#![allow(dead_code)]

use siegeward::behavior::Archetype;
use siegeward::core::types::{CellCoord, EmplacementKind, Vec2};
use siegeward::spatial::Grid;
use siegeward::traffic::FlowFieldSample;
use siegeward::world::{CostTable, EnemySnapshot, WaveInfo, WorldSnapshot};

pub const CORRIDOR_ROW: i32 = 3;

pub fn costs() -> CostTable {
    CostTable::new()
        .with(EmplacementKind::Gatling, 50)
        .with(EmplacementKind::Cannon, 90)
        .with(EmplacementKind::Frost, 60)
}

/// 16x7 board with a single east-bound corridor on row 3; objective at its east end
pub fn corridor(resources: i64) -> WorldSnapshot {
    let grid = Grid::new(16, 7, 1.0).unwrap();
    let mut flow = vec![FlowFieldSample::blocked(); grid.cell_count()];
    for x in 0..16 {
        let i = grid.index(CellCoord::new(x, CORRIDOR_ROW)).unwrap();
        let dir = if x == 15 { Vec2::ZERO } else { Vec2::new(1.0, 0.0) };
        flow[i] = FlowFieldSample::new(dir, 1.0);
    }
    WorldSnapshot {
        cycle: 1,
        grid,
        flow,
        objective: grid.cell_center(CellCoord::new(15, CORRIDOR_ROW)),
        objective_health: 1.0,
        enemies: vec![EnemySnapshot::new(
            grid.cell_center(CellCoord::new(1, CORRIDOR_ROW)),
            Vec2::new(1.5, 0.0),
            Archetype::Direct,
            1.0,
        )],
        emplacements: Vec::new(),
        resources,
        costs: costs(),
        wave: WaveInfo {
            number: 5,
            boss_imminent: false,
        },
        spawn_cells: vec![grid.index(CellCoord::new(0, CORRIDOR_ROW)).unwrap()],
        blocked_cells: Vec::new(),
    }
}
