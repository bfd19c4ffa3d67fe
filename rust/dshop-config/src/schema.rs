//! Configuration schema for the simulation framework

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// TOML parsing failed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A field failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown rule name
    #[error("Invalid rule '{name}', please choose from {expected}")]
    InvalidRule { name: String, expected: &'static str },
}

/// Pool sequencing rule: the order in which the controller scans the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoolRule {
    /// First come first served (arrival time)
    Fcfs,
    /// Earliest due date
    Edd,
    /// Critical ratio: (due date - now) / total process time
    Cr,
}

impl FromStr for PoolRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FCFS" => Ok(PoolRule::Fcfs),
            "EDD" => Ok(PoolRule::Edd),
            "CR" => Ok(PoolRule::Cr),
            _ => Err(ConfigError::InvalidRule {
                name: s.to_string(),
                expected: "FCFS, EDD, CR",
            }),
        }
    }
}

impl fmt::Display for PoolRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolRule::Fcfs => write!(f, "FCFS"),
            PoolRule::Edd => write!(f, "EDD"),
            PoolRule::Cr => write!(f, "CR"),
        }
    }
}

/// Dispatching rule: the order in which a workstation pulls from its queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispatchRule {
    /// First come first served (queue order)
    Fcfs,
    /// Shortest processing time
    Spt,
    /// Planned start time
    Pst,
}

impl FromStr for DispatchRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FCFS" => Ok(DispatchRule::Fcfs),
            "SPT" => Ok(DispatchRule::Spt),
            "PST" => Ok(DispatchRule::Pst),
            _ => Err(ConfigError::InvalidRule {
                name: s.to_string(),
                expected: "FCFS, SPT, PST",
            }),
        }
    }
}

impl fmt::Display for DispatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchRule::Fcfs => write!(f, "FCFS"),
            DispatchRule::Spt => write!(f, "SPT"),
            DispatchRule::Pst => write!(f, "PST"),
        }
    }
}

/// Order generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderGenConfig {
    /// Total number of orders to generate
    pub total_orders: u32,
    /// Mean inter-arrival time (exponential distribution)
    pub inter_arrival_mean: f64,
    /// Range for the random due-date slack added to the arrival time
    pub due_date_range: (f64, f64),
    /// Maximum depth to which a process plan is pruned
    pub max_plan_depth: u32,
    /// Selection weights for priorities 0, 1, 2
    pub priority_weights: [f64; 3],
}

impl Default for OrderGenConfig {
    fn default() -> Self {
        Self {
            total_orders: 70,
            inter_arrival_mean: 0.648,
            due_date_range: (40.0, 50.0),
            max_plan_depth: 4,
            priority_weights: [0.1, 0.2, 0.7],
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Total simulation duration in time units
    pub simulation_time: f64,
    /// Workload norm for order release control
    pub workload_norm: f64,
    /// Pool sequencing rule
    pub pool_sequencing_rule: PoolRule,
    /// Dispatching rule
    pub dispatching_rule: DispatchRule,
    /// Allowance for the waiting time per operation (PST dispatching)
    pub planned_start_time_allowance: f64,
    /// Periodic release period
    pub round_time: f64,
    /// Workstation types, in creation order
    pub station_types: Vec<String>,
    /// Number of instances per workstation type
    pub station_instances: BTreeMap<String, u32>,
    /// Cost per time unit of workstation operation
    pub cost_per_time_unit: f64,
    /// RNG seed for order generation
    pub seed: u64,
    /// Order generation parameters
    pub order_generation: OrderGenConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let station_types: Vec<String> =
            ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
        let station_instances = [("A", 2), ("B", 2), ("C", 2), ("D", 3), ("E", 1)]
            .iter()
            .map(|(t, n)| (t.to_string(), *n))
            .collect();
        Self {
            simulation_time: 100.0,
            workload_norm: 10.0,
            pool_sequencing_rule: PoolRule::Fcfs,
            dispatching_rule: DispatchRule::Fcfs,
            planned_start_time_allowance: 0.2,
            round_time: 4.0,
            station_types,
            station_instances,
            cost_per_time_unit: 10.0,
            seed: 44,
            order_generation: OrderGenConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Validate the configuration, failing fast on the first problem
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_time <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "simulation_time must be > 0, got {}",
                self.simulation_time
            )));
        }
        if self.workload_norm <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "workload_norm must be > 0, got {}",
                self.workload_norm
            )));
        }
        if self.planned_start_time_allowance < 0.0 {
            return Err(ConfigError::Validation(format!(
                "planned_start_time_allowance must be >= 0, got {}",
                self.planned_start_time_allowance
            )));
        }
        if self.round_time <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "round_time must be > 0, got {}",
                self.round_time
            )));
        }
        if self.station_types.is_empty() {
            return Err(ConfigError::Validation(
                "station_types must not be empty".to_string(),
            ));
        }
        for type_id in &self.station_types {
            match self.station_instances.get(type_id) {
                Some(n) if *n >= 1 => {}
                Some(_) => {
                    return Err(ConfigError::Validation(format!(
                        "station type {} must have at least one instance",
                        type_id
                    )));
                }
                None => {
                    return Err(ConfigError::Validation(format!(
                        "station type {} has no instance count",
                        type_id
                    )));
                }
            }
        }
        if self.cost_per_time_unit < 0.0 {
            return Err(ConfigError::Validation(format!(
                "cost_per_time_unit must be >= 0, got {}",
                self.cost_per_time_unit
            )));
        }
        let gen = &self.order_generation;
        if gen.inter_arrival_mean <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "inter_arrival_mean must be > 0, got {}",
                gen.inter_arrival_mean
            )));
        }
        if gen.due_date_range.0 > gen.due_date_range.1 {
            return Err(ConfigError::Validation(format!(
                "due_date_range must be ordered, got ({}, {})",
                gen.due_date_range.0, gen.due_date_range.1
            )));
        }
        if gen.max_plan_depth == 0 {
            return Err(ConfigError::Validation(
                "max_plan_depth must be >= 1".to_string(),
            ));
        }
        if gen.priority_weights.iter().any(|w| *w < 0.0)
            || gen.priority_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(ConfigError::Validation(
                "priority_weights must be non-negative with a positive sum".to_string(),
            ));
        }
        Ok(())
    }

    /// Label used in logs and summaries, e.g. "EDD + SPT"
    pub fn rules_label(&self) -> String {
        format!("{} + {}", self.pool_sequencing_rule, self.dispatching_rule)
    }
}

/// A named pool/dispatch rule combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario identifier, e.g. "Simulation1"
    pub id: String,
    /// Pool sequencing rule
    pub pool: PoolRule,
    /// Dispatching rule
    pub dispatch: DispatchRule,
}

/// The nine scenarios: the cross-product of pool and dispatch rules
pub fn scenarios() -> Vec<Scenario> {
    let pools = [PoolRule::Fcfs, PoolRule::Cr, PoolRule::Edd];
    let dispatches = [DispatchRule::Fcfs, DispatchRule::Spt, DispatchRule::Pst];
    let mut out = Vec::with_capacity(9);
    for (i, pool) in pools.iter().enumerate() {
        for (j, dispatch) in dispatches.iter().enumerate() {
            out.push(Scenario {
                id: format!("Simulation{}", i * dispatches.len() + j + 1),
                pool: *pool,
                dispatch: *dispatch,
            });
        }
    }
    out
}
