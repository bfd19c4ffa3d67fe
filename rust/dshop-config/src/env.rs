//! Environment variable overrides

use crate::schema::{ConfigError, SimulationConfig};

/// Apply `DSHOP_*` environment variable overrides to a configuration
///
/// Recognized variables:
/// - `DSHOP_SIMULATION_TIME`
/// - `DSHOP_WORKLOAD_NORM`
/// - `DSHOP_POOL_RULE`
/// - `DSHOP_DISPATCH_RULE`
/// - `DSHOP_ROUND_TIME`
/// - `DSHOP_PST_ALLOWANCE`
/// - `DSHOP_SEED`
pub fn apply_env_overrides(config: &mut SimulationConfig) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var("DSHOP_SIMULATION_TIME") {
        config.simulation_time = parse_f64("DSHOP_SIMULATION_TIME", &value)?;
    }
    if let Ok(value) = std::env::var("DSHOP_WORKLOAD_NORM") {
        config.workload_norm = parse_f64("DSHOP_WORKLOAD_NORM", &value)?;
    }
    if let Ok(value) = std::env::var("DSHOP_POOL_RULE") {
        config.pool_sequencing_rule = value.parse()?;
    }
    if let Ok(value) = std::env::var("DSHOP_DISPATCH_RULE") {
        config.dispatching_rule = value.parse()?;
    }
    if let Ok(value) = std::env::var("DSHOP_ROUND_TIME") {
        config.round_time = parse_f64("DSHOP_ROUND_TIME", &value)?;
    }
    if let Ok(value) = std::env::var("DSHOP_PST_ALLOWANCE") {
        config.planned_start_time_allowance = parse_f64("DSHOP_PST_ALLOWANCE", &value)?;
    }
    if let Ok(value) = std::env::var("DSHOP_SEED") {
        config.seed = value
            .parse()
            .map_err(|_| ConfigError::Validation(format!("Invalid DSHOP_SEED: {}", value)))?;
    }
    Ok(())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PoolRule;

    // Env tests mutate process state; keep them in one test to avoid races.
    #[test]
    fn overrides_take_precedence() {
        std::env::set_var("DSHOP_WORKLOAD_NORM", "6.5");
        std::env::set_var("DSHOP_POOL_RULE", "cr");
        let mut config = SimulationConfig::default();
        apply_env_overrides(&mut config).unwrap();
        assert_eq!(config.workload_norm, 6.5);
        assert_eq!(config.pool_sequencing_rule, PoolRule::Cr);

        std::env::set_var("DSHOP_WORKLOAD_NORM", "plenty");
        let mut config = SimulationConfig::default();
        assert!(apply_env_overrides(&mut config).is_err());

        std::env::remove_var("DSHOP_WORKLOAD_NORM");
        std::env::remove_var("DSHOP_POOL_RULE");
    }
}
