//! KPI aggregation over a finished run
//!
//! Summaries are plain serializable records; emission (CSV, display) is the
//! caller's business.

use crate::sim::Simulation;
use serde::Serialize;

/// Per-order outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    /// Order identifier
    pub order_id: String,
    /// Order priority
    pub priority: u8,
    /// Arrival time
    pub arrival_time: f64,
    /// Due date
    pub due_date: f64,
    /// Completion time; None if unfinished at the cut-off
    pub finish_time: Option<f64>,
    /// Arrival-to-completion time; None if unfinished
    pub throughput_time: Option<f64>,
    /// Sum of process times over the plan
    pub total_process_time: f64,
    /// Revenue of completed tasks
    pub revenue: f64,
}

/// Per-station outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    /// Station identifier
    pub station_id: String,
    /// Accumulated work time
    pub total_work_time: f64,
    /// Accumulated idle time
    pub total_idle_time: f64,
    /// Work time over run length, in percent
    pub utilization: f64,
    /// Operating cost
    pub total_cost: f64,
}

/// Whole-run outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Scenario identifier
    pub simulation_id: String,
    /// "pool + dispatch" label
    pub rules: String,
    /// Run length
    pub simulation_time: f64,
    /// Orders in the stream
    pub total_orders: usize,
    /// Workload norm in force
    pub workload_norm: f64,
    /// Finished orders that missed their due date
    pub overdue_orders: usize,
    /// Orders unfinished at the cut-off
    pub unfinished_orders: usize,
    /// Mean throughput time over finished orders (0 if none finished)
    pub throughput_time_mean: f64,
    /// Summed idle time over stations
    pub total_idle_time: f64,
    /// Summed work time over stations
    pub total_work_time: f64,
    /// Revenue of completed tasks over all orders
    pub revenue: f64,
    /// Summed station operating cost
    pub process_cost: f64,
    /// Revenue minus cost
    pub net_profit: f64,
}

/// Summarize every order of a run
pub fn order_summaries(sim: &Simulation) -> Vec<OrderSummary> {
    sim.orders
        .iter()
        .map(|order| OrderSummary {
            order_id: order.id.clone(),
            priority: order.priority,
            arrival_time: order.arrival_time,
            due_date: order.due_date,
            finish_time: order.is_finished().then_some(order.finish_time),
            throughput_time: order.throughput_time(),
            total_process_time: order.total_process_time(),
            revenue: order.total_revenue(),
        })
        .collect()
}

/// Summarize every station of a run
pub fn station_summaries(sim: &Simulation) -> Vec<StationSummary> {
    let simulation_time = sim.simulation_time();
    sim.stations
        .iter()
        .map(|station| StationSummary {
            station_id: station.id.clone(),
            total_work_time: station.total_work_time,
            total_idle_time: station.total_idle_time,
            utilization: station.utilization(simulation_time),
            total_cost: station.total_cost(),
        })
        .collect()
}

/// Summarize a whole run
pub fn run_summary(sim: &Simulation, simulation_id: &str) -> RunSummary {
    let finished: Vec<_> = sim.orders.iter().filter(|o| o.is_finished()).collect();
    let overdue = finished
        .iter()
        .filter(|o| o.is_overdue() == Some(true))
        .count();
    let throughput_time_mean = if finished.is_empty() {
        0.0
    } else {
        finished
            .iter()
            .filter_map(|o| o.throughput_time())
            .sum::<f64>()
            / finished.len() as f64
    };
    let revenue: f64 = sim.orders.iter().map(|o| o.total_revenue()).sum();
    let process_cost: f64 = sim.stations.iter().map(|s| s.total_cost()).sum();

    RunSummary {
        simulation_id: simulation_id.to_string(),
        rules: sim.rules_label(),
        simulation_time: sim.simulation_time(),
        total_orders: sim.orders.len(),
        workload_norm: sim.workload_norm(),
        overdue_orders: overdue,
        unfinished_orders: sim.orders.len() - finished.len(),
        throughput_time_mean,
        total_idle_time: sim.stations.iter().map(|s| s.total_idle_time).sum(),
        total_work_time: sim.stations.iter().map(|s| s.total_work_time).sum(),
        revenue,
        process_cost,
        net_profit: revenue - process_cost,
    }
}
