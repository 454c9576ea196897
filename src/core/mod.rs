pub mod config;
pub mod error;
pub mod types;

pub use config::{load_agent_config, AgentConfig};
pub use error::{AgentError, Result};
