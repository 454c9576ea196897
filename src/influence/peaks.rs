//! Hot-spot and gap detection over scalar fields

use crate::core::types::CellCoord;
use crate::spatial::field::ScalarField;
use crate::spatial::grid::Grid;

/// Local maxima of a field, strongest first
///
/// A cell qualifies when it is positive and no cell within a window of
/// `min_separation` (Chebyshev, at least 1) is larger. Qualifying cells closer
/// than `min_separation` to an already accepted stronger peak are dropped.
pub fn find_local_maxima(field: &ScalarField, grid: &Grid, min_separation: usize) -> Vec<CellCoord> {
    let window = min_separation.max(1) as i32;
    let mut peaks: Vec<(CellCoord, f32)> = Vec::new();

    for index in 0..grid.cell_count() {
        let value = field.get(index);
        if value <= 0.0 {
            continue;
        }
        let Some(cell) = grid.coord(index) else {
            continue;
        };
        if window_all(grid, cell, window, |other| field.at(other) <= value) {
            peaks.push((cell, value));
        }
    }

    peaks.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    separate(peaks, min_separation)
}

/// Local minima of a field over the cells accepted by `include`, weakest first
///
/// Used with the coverage map restricted to traversable cells to find gaps.
pub fn find_local_minima(
    field: &ScalarField,
    grid: &Grid,
    min_separation: usize,
    include: impl Fn(usize) -> bool,
) -> Vec<CellCoord> {
    let window = min_separation.max(1) as i32;
    let mut troughs: Vec<(CellCoord, f32)> = Vec::new();

    for index in 0..grid.cell_count() {
        if !include(index) {
            continue;
        }
        let Some(cell) = grid.coord(index) else {
            continue;
        };
        let value = field.get(index);
        let is_min = window_all(grid, cell, window, |other| {
            grid.index(other).map_or(true, |i| !include(i) || field.get(i) >= value)
        });
        if is_min {
            troughs.push((cell, value));
        }
    }

    troughs.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    separate(troughs, min_separation)
}

fn window_all(grid: &Grid, cell: CellCoord, window: i32, pred: impl Fn(CellCoord) -> bool) -> bool {
    for dy in -window..=window {
        for dx in -window..=window {
            if dx == 0 && dy == 0 {
                continue;
            }
            let other = cell.offset(dx, dy);
            if grid.contains(other) && !pred(other) {
                return false;
            }
        }
    }
    true
}

fn separate(ranked: Vec<(CellCoord, f32)>, min_separation: usize) -> Vec<CellCoord> {
    let min_sep = min_separation as i32;
    let mut accepted: Vec<CellCoord> = Vec::new();
    for (cell, _) in ranked {
        if accepted.iter().all(|a| a.chebyshev(&cell) >= min_sep) {
            accepted.push(cell);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_from(grid: &Grid, values: &[f32]) -> ScalarField {
        ScalarField::from_values(grid, values.to_vec()).unwrap()
    }

    #[test]
    fn test_two_separate_peaks() {
        let grid = Grid::new(7, 1, 1.0).unwrap();
        let field = field_from(&grid, &[0.1, 0.9, 0.2, 0.0, 0.3, 0.6, 0.1]);
        let peaks = find_local_maxima(&field, &grid, 2);
        assert_eq!(peaks, vec![CellCoord::new(1, 0), CellCoord::new(5, 0)]);
    }

    #[test]
    fn test_plateau_peaks_spaced_by_min_separation() {
        let grid = Grid::new(4, 1, 1.0).unwrap();
        let field = field_from(&grid, &[0.5, 0.5, 0.5, 0.5]);
        let peaks = find_local_maxima(&field, &grid, 2);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0], CellCoord::new(0, 0));
        assert!(peaks[0].chebyshev(&peaks[1]) >= 2);
    }

    #[test]
    fn test_zero_field_has_no_peaks() {
        let grid = Grid::new(5, 5, 1.0).unwrap();
        assert!(find_local_maxima(&ScalarField::zeros(&grid), &grid, 1).is_empty());
    }

    #[test]
    fn test_minima_respect_mask() {
        let grid = Grid::new(5, 1, 1.0).unwrap();
        let field = field_from(&grid, &[0.0, 0.8, 0.4, 0.9, 0.7]);
        // cell 0 is not traversable
        let gaps = find_local_minima(&field, &grid, 1, |i| i != 0);
        assert_eq!(gaps, vec![CellCoord::new(2, 0), CellCoord::new(4, 0)]);
    }
}
