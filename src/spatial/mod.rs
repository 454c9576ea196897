//! Spatial primitives: the decision grid and per-cell scalar fields

pub mod field;
pub mod grid;

pub use field::ScalarField;
pub use grid::{Grid, NEIGHBOR_OFFSETS};
