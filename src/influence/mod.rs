//! Influence Map Engine
//!
//! Generic 2D scalar fields built from attenuated point sources. The threat
//! map (sources = enemies) and the coverage map (sources = emplacement ranges)
//! are both built here, as is the peak finding used for hot-spots and gaps.

pub mod falloff;
pub mod map;
pub mod peaks;

pub use falloff::{Falloff, Normalization};
pub use map::{build_map, coverage_sources, effective_dps, threat_magnitude, threat_sources, InfluenceSource};
pub use peaks::{find_local_maxima, find_local_minima};
