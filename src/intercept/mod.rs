//! Path Interceptor
//!
//! Turns the traffic, threat and coverage fields into ranked PLACE candidates.
//! Placement legality is delegated to a `PlacementValidator`.

pub mod interceptor;
pub mod validity;

pub use interceptor::{candidate_types, CandidateType, CounterBias, InterceptInputs, PathInterceptor};
pub use validity::{PlacementRules, PlacementValidator};
