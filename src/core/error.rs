use thiserror::Error;

use crate::core::types::EmplacementKind;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid grid dimensions: {width}x{height} with cell size {cell_size}")]
    InvalidGrid {
        width: usize,
        height: usize,
        cell_size: f32,
    },

    #[error("Field size mismatch: expected {expected} cells, got {actual}")]
    FieldSizeMismatch { expected: usize, actual: usize },

    #[error("Effectiveness matrix has no entry for {archetype} against {emplacement:?}")]
    IncompleteMatrix {
        archetype: String,
        emplacement: EmplacementKind,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
