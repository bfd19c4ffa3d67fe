//! Disassembly tasks
//!
//! Tasks live in a per-order arena; topology (`parent`, `next_steps`) is by
//! index, so the precedence forest has no pointer cycles and is trivially
//! serializable.

use crate::station::StationId;
use serde::{Deserialize, Serialize};

/// Index of a task within its order's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    /// Waiting on incomplete predecessors
    Pending,
    /// All predecessors completed, not yet enqueued
    Ready,
    /// In a workstation queue
    Queued,
    /// Being processed
    Running,
    /// Finished
    Completed,
}

/// One disassembly operation
#[derive(Debug, Clone)]
pub struct Task {
    /// Name, unique within the order
    pub name: String,
    /// Service demand
    pub process_time: f64,
    /// Workstation type that can execute this task
    pub station_type: String,
    /// Component deposited in the output warehouse on completion
    pub produced_component: Option<String>,
    /// Revenue generated on completion
    pub revenue: f64,
    /// Predecessor task
    pub parent: Option<TaskId>,
    /// Immediate successors in the precedence tree
    pub next_steps: Vec<TaskId>,
    /// Depth in the process plan at construction time
    pub structural_depth: u32,
    /// Remaining depth; decremented as upstream tasks complete
    pub remaining_depth: i32,
    /// Lifecycle state
    pub state: TaskState,
    /// Workstation instance chosen at routing
    pub assigned_station: Option<StationId>,
    /// Set when the task enters a workstation queue
    pub planned_start_time: Option<f64>,
}

impl Task {
    /// Corrected load: process time discounted by the remaining depth
    ///
    /// Downstream tasks are further from execution, so their projected
    /// demand on a station shrinks with depth and rises as predecessors
    /// complete.
    pub fn corrected_load(&self) -> f64 {
        debug_assert!(self.remaining_depth > 0, "corrected load of a completed task");
        self.process_time / self.remaining_depth as f64
    }

    /// Whether the task has finished
    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }
}

/// Input node of a disassembly process plan
///
/// This is the interface to the external order source: a tree of plan nodes
/// is flattened into the order's task arena at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanNode {
    /// Task name
    pub name: String,
    /// Service demand
    pub process_time: f64,
    /// Required workstation type
    pub station_type: String,
    /// Component produced by the task
    #[serde(default)]
    pub produced_component: Option<String>,
    /// Revenue on completion
    #[serde(default)]
    pub revenue: f64,
    /// Successor tasks
    #[serde(default)]
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Create a leaf node
    pub fn new(name: &str, process_time: f64, station_type: &str) -> Self {
        Self {
            name: name.to_string(),
            process_time,
            station_type: station_type.to_string(),
            produced_component: None,
            revenue: 0.0,
            children: Vec::new(),
        }
    }

    /// Attach a child node
    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set the revenue
    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = revenue;
        self
    }

    /// Set the produced component
    pub fn with_component(mut self, component: &str) -> Self {
        self.produced_component = Some(component.to_string());
        self
    }
}
