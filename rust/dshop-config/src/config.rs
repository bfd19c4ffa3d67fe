//! Configuration loading and management

use crate::env::apply_env_overrides;
use crate::schema::{ConfigError, SimulationConfig};
use std::path::Path;

/// Load configuration from an optional file and environment variables
///
/// Loading hierarchy: env > file > defaults
pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig, ConfigError> {
    let mut config = match path {
        Some(p) => load_from_file(p)?,
        None => SimulationConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;

    Ok(config)
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path) -> Result<SimulationConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}
