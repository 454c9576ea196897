//! Per-cell scalar fields rebuilt every cycle

use serde::{Deserialize, Serialize};

use crate::core::error::{AgentError, Result};
use crate::core::types::CellCoord;
use crate::spatial::grid::Grid;

/// Mapping from cell index to a floating value
///
/// Only the component that built a field mutates it; everyone else gets `&ScalarField`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl ScalarField {
    pub fn zeros(grid: &Grid) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            values: vec![0.0; grid.cell_count()],
        }
    }

    pub fn from_values(grid: &Grid, values: Vec<f32>) -> Result<Self> {
        if values.len() != grid.cell_count() {
            return Err(AgentError::FieldSizeMismatch {
                expected: grid.cell_count(),
                actual: values.len(),
            });
        }
        Ok(Self {
            width: grid.width,
            height: grid.height,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same dimensions as the grid
    pub fn matches(&self, grid: &Grid) -> bool {
        self.width == grid.width && self.height == grid.height
    }

    /// Value at index; 0.0 outside the field
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn at(&self, cell: CellCoord) -> f32 {
        if cell.x < 0 || cell.y < 0 || cell.x as usize >= self.width || cell.y as usize >= self.height {
            return 0.0;
        }
        self.values[cell.y as usize * self.width + cell.x as usize]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    /// All values finite and in [0, 1]
    pub fn is_normalized(&self) -> bool {
        self.values.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    #[inline]
    pub(crate) fn add(&mut self, index: usize, amount: f32) {
        if let Some(v) = self.values.get_mut(index) {
            *v += amount;
        }
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Replace non-finite or negative entries with zero
    pub(crate) fn sanitize(&mut self) -> usize {
        let mut fixed = 0;
        for v in &mut self.values {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
                fixed += 1;
            }
        }
        fixed
    }
}
