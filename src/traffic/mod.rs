//! Flow-Field Traffic Analyzer
//!
//! Consumes the pathfinding collaborator's flow field (direction + cost per
//! cell) and estimates where enemy paths converge.

pub mod density;
pub mod flow_field;

pub use density::{compute_traffic_density, next_cell, TraceEnd, TrafficReport};
pub use flow_field::{FlowFieldSample, FlowFieldView};
