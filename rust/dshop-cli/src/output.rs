//! CSV emission
//!
//! One event-log file and three summary files per invocation, each carrying
//! the scenario id and rule label so the nine scenarios land in shared
//! files. Rows are flat structs; the csv serializer does not take nested
//! ones.

use anyhow::{Context, Result};
use dshop_engine::{EventLog, EventRecord, OrderSummary, RunSummary, StationSummary};
use serde::Serialize;
use std::path::Path;

/// One event-log CSV row
#[derive(Debug, Serialize)]
struct EventCsvRow<'a> {
    simulation_id: &'a str,
    rules: &'a str,
    timestamp: f64,
    station_id: &'a str,
    order_id: &'a str,
    task_name: &'a str,
    event_type: String,
    details: &'a str,
}

/// Per-order summary row with its scenario id
#[derive(Debug, Serialize)]
pub struct OrderCsvRow {
    simulation_id: String,
    rules: String,
    order_id: String,
    priority: u8,
    arrival_time: f64,
    due_date: f64,
    finish_time: Option<f64>,
    throughput_time: Option<f64>,
    total_process_time: f64,
    revenue: f64,
}

impl OrderCsvRow {
    /// Tag a summary with its scenario
    pub fn new(simulation_id: &str, rules: &str, summary: &OrderSummary) -> Self {
        Self {
            simulation_id: simulation_id.to_string(),
            rules: rules.to_string(),
            order_id: summary.order_id.clone(),
            priority: summary.priority,
            arrival_time: summary.arrival_time,
            due_date: summary.due_date,
            finish_time: summary.finish_time,
            throughput_time: summary.throughput_time,
            total_process_time: summary.total_process_time,
            revenue: summary.revenue,
        }
    }
}

/// Per-station summary row with its scenario id
#[derive(Debug, Serialize)]
pub struct StationCsvRow {
    simulation_id: String,
    rules: String,
    station_id: String,
    total_work_time: f64,
    total_idle_time: f64,
    utilization: f64,
    total_cost: f64,
}

impl StationCsvRow {
    /// Tag a summary with its scenario
    pub fn new(simulation_id: &str, rules: &str, summary: &StationSummary) -> Self {
        Self {
            simulation_id: simulation_id.to_string(),
            rules: rules.to_string(),
            station_id: summary.station_id.clone(),
            total_work_time: summary.total_work_time,
            total_idle_time: summary.total_idle_time,
            utilization: summary.utilization,
            total_cost: summary.total_cost,
        }
    }
}

/// Append one scenario's event log to the collected rows
pub fn collect_event_rows(
    rows: &mut Vec<(String, String, EventRecord)>,
    log: &EventLog,
    simulation_id: &str,
    rules: &str,
) {
    for record in log.records() {
        rows.push((simulation_id.to_string(), rules.to_string(), record.clone()));
    }
}

/// Write the collected event rows to `log_events.csv`
pub fn write_events(dir: &Path, rows: &[(String, String, EventRecord)]) -> Result<()> {
    let path = dir.join("log_events.csv");
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    for (simulation_id, rules, record) in rows {
        writer.serialize(EventCsvRow {
            simulation_id,
            rules,
            timestamp: record.timestamp,
            station_id: record.station.as_deref().unwrap_or("N/A"),
            order_id: record.order.as_deref().unwrap_or("N/A"),
            task_name: record.task.as_deref().unwrap_or("N/A"),
            event_type: record.kind.to_string(),
            details: record.details.as_deref().unwrap_or(""),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write per-order summaries to `summary_orders.csv`
pub fn write_order_summaries(dir: &Path, rows: &[OrderCsvRow]) -> Result<()> {
    write_rows(&dir.join("summary_orders.csv"), rows)
}

/// Write per-station summaries to `summary_stations.csv`
pub fn write_station_summaries(dir: &Path, rows: &[StationCsvRow]) -> Result<()> {
    write_rows(&dir.join("summary_stations.csv"), rows)
}

/// Write one row per scenario to `summary_simulation.csv`
pub fn write_run_summaries(dir: &Path, rows: &[RunSummary]) -> Result<()> {
    write_rows(&dir.join("summary_simulation.csv"), rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dshop_engine::{EventKind, EventLog};

    #[test]
    fn event_csv_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = EventLog::new();
        log.record(0.0, None, None, None, EventKind::SimulationStart, None);
        log.record(
            1.0,
            Some("A-1"),
            Some("O-1"),
            Some("T1"),
            EventKind::TaskAdded,
            Some("queued".to_string()),
        );

        let mut rows = Vec::new();
        collect_event_rows(&mut rows, &log, "Simulation1", "FCFS + FCFS");
        write_events(dir.path(), &rows).unwrap();

        let content = std::fs::read_to_string(dir.path().join("log_events.csv")).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "simulation_id,rules,timestamp,station_id,order_id,task_name,event_type,details"
        );
        assert!(content.contains("Simulation Start"));
        assert!(content.contains("A-1,O-1,T1,Task Added,queued"));
    }

    #[test]
    fn summary_files_include_the_scenario_id() {
        let dir = tempfile::tempdir().unwrap();
        let summary = OrderSummary {
            order_id: "O-1".to_string(),
            priority: 2,
            arrival_time: 0.0,
            due_date: 10.0,
            finish_time: Some(4.0),
            throughput_time: Some(4.0),
            total_process_time: 4.0,
            revenue: 55.0,
        };
        let rows = vec![OrderCsvRow::new("Simulation1", "FCFS + SPT", &summary)];
        write_order_summaries(dir.path(), &rows).unwrap();
        let content = std::fs::read_to_string(dir.path().join("summary_orders.csv")).unwrap();
        assert!(content.contains("Simulation1"));
        assert!(content.contains("O-1"));
    }

    #[test]
    fn unfinished_orders_serialize_with_empty_finish_time() {
        let dir = tempfile::tempdir().unwrap();
        let summary = OrderSummary {
            order_id: "O-2".to_string(),
            priority: 0,
            arrival_time: 1.0,
            due_date: 5.0,
            finish_time: None,
            throughput_time: None,
            total_process_time: 3.0,
            revenue: 0.0,
        };
        let rows = vec![OrderCsvRow::new("Simulation2", "CR + PST", &summary)];
        write_order_summaries(dir.path(), &rows).unwrap();
        let content = std::fs::read_to_string(dir.path().join("summary_orders.csv")).unwrap();
        assert!(content.contains("O-2,0,1.0,5.0,,,3.0,0.0"));
    }
}
