//! Structured event log
//!
//! Every observable state change in a run is appended to an in-memory event
//! log consumed by external KPI and CSV collaborators. The core only ever
//! writes to the log, never reads it back.

use serde::Serialize;
use std::fmt;

/// Event types emitted during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    #[serde(rename = "Simulation Start")]
    SimulationStart,
    #[serde(rename = "Simulation End")]
    SimulationEnd,
    #[serde(rename = "Order Arrival")]
    OrderArrival,
    #[serde(rename = "Order Released")]
    OrderReleased,
    #[serde(rename = "Order Release Rejected")]
    OrderReleaseRejected,
    #[serde(rename = "Task Added")]
    TaskAdded,
    #[serde(rename = "Task Start")]
    TaskStart,
    #[serde(rename = "Task Complete")]
    TaskComplete,
    #[serde(rename = "Idle Start")]
    IdleStart,
    #[serde(rename = "Idle End")]
    IdleEnd,
    #[serde(rename = "Order Finished")]
    OrderFinished,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::SimulationStart => "Simulation Start",
            EventKind::SimulationEnd => "Simulation End",
            EventKind::OrderArrival => "Order Arrival",
            EventKind::OrderReleased => "Order Released",
            EventKind::OrderReleaseRejected => "Order Release Rejected",
            EventKind::TaskAdded => "Task Added",
            EventKind::TaskStart => "Task Start",
            EventKind::TaskComplete => "Task Complete",
            EventKind::IdleStart => "Idle Start",
            EventKind::IdleEnd => "Idle End",
            EventKind::OrderFinished => "Order Finished",
        };
        write!(f, "{}", name)
    }
}

/// One event log record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// Simulated timestamp
    pub timestamp: f64,
    /// Station id, if the event concerns one
    pub station: Option<String>,
    /// Order id, if the event concerns one
    pub order: Option<String>,
    /// Task name, if the event concerns one
    pub task: Option<String>,
    /// Event type
    pub kind: EventKind,
    /// Free-form details
    pub details: Option<String>,
}

/// Append-only event log for one run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn record(
        &mut self,
        timestamp: f64,
        station: Option<&str>,
        order: Option<&str>,
        task: Option<&str>,
        kind: EventKind,
        details: Option<String>,
    ) {
        self.records.push(EventRecord {
            timestamp,
            station: station.map(str::to_string),
            order: order.map(str::to_string),
            task: task.map(str::to_string),
            kind,
            details,
        });
    }

    /// All records, in emission order
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of one kind, in emission order
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keep_emission_order() {
        let mut log = EventLog::new();
        log.record(0.0, None, Some("O-1"), None, EventKind::OrderArrival, None);
        log.record(
            1.0,
            Some("A-1"),
            Some("O-1"),
            Some("T1"),
            EventKind::TaskAdded,
            None,
        );
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].kind, EventKind::OrderArrival);
        assert_eq!(log.records()[1].station.as_deref(), Some("A-1"));
    }

    #[test]
    fn kinds_render_with_spaces() {
        assert_eq!(EventKind::OrderReleaseRejected.to_string(), "Order Release Rejected");
        assert_eq!(EventKind::IdleStart.to_string(), "Idle Start");
    }

    #[test]
    fn of_kind_filters() {
        let mut log = EventLog::new();
        log.record(0.0, Some("A-1"), None, None, EventKind::IdleStart, None);
        log.record(1.0, Some("A-1"), None, None, EventKind::IdleEnd, None);
        log.record(2.0, Some("B-1"), None, None, EventKind::IdleStart, None);
        assert_eq!(log.of_kind(EventKind::IdleStart).count(), 2);
        assert_eq!(log.of_kind(EventKind::IdleEnd).count(), 1);
    }
}
