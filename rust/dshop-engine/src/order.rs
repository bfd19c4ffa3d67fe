//! Orders and their task arenas

use crate::error::{SimError, SimResult};
use crate::station::StationId;
use crate::task::{PlanNode, Task, TaskId, TaskState};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Index of an order within the simulation's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderId(pub usize);

/// Projected demand of one task on one station
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    /// Depth-corrected load
    pub load: f64,
    /// Remaining depth at computation time
    pub depth: i32,
}

/// A customer order carrying a tree-structured disassembly plan
#[derive(Debug, Clone)]
pub struct Order {
    /// Order identifier, e.g. "O-1"
    pub id: String,
    /// 0 = highest, 2 = lowest; smaller wins ties
    pub priority: u8,
    /// Time at which the order enters the system
    pub arrival_time: f64,
    /// Due date
    pub due_date: f64,
    /// Name of the disassembly process plan
    pub plan_name: String,
    /// Task arena; topology is by index
    pub tasks: Vec<Task>,
    /// Roots of the precedence forest
    pub roots: Vec<TaskId>,
    /// Pre-order flattening of all tasks, derived once
    pub flat_plan: Vec<TaskId>,
    /// Tasks already finished
    pub completed: BTreeSet<TaskId>,
    /// Tasks with all predecessors completed and not yet enqueued
    pub ready_tasks: Vec<TaskId>,
    /// 0 until all tasks complete, then the clock value at last completion
    pub finish_time: f64,
    /// Whether the order has left the pre-shop pool
    pub released: bool,
    /// Projection of remaining demand per station, rebuilt after routing
    /// and after each completion
    pub load_contributions: BTreeMap<StationId, BTreeMap<String, Contribution>>,
}

impl Order {
    /// Build an order from a disassembly process plan
    ///
    /// The plan forest is flattened pre-order into the task arena; roots
    /// start ready, everything else pending.
    pub fn new(
        id: &str,
        priority: u8,
        arrival_time: f64,
        due_date: f64,
        plan_name: &str,
        plan: Vec<PlanNode>,
    ) -> SimResult<Self> {
        if plan.is_empty() {
            return Err(SimError::EmptyPlan {
                order: id.to_string(),
            });
        }

        let mut tasks = Vec::new();
        let mut roots = Vec::new();
        for node in plan {
            let root = Self::add_node(&mut tasks, node, None, 1, id)?;
            roots.push(root);
        }
        let flat_plan: Vec<TaskId> = (0..tasks.len()).map(TaskId).collect();

        let ready_tasks = roots.clone();
        for &root in &roots {
            tasks[root.0].state = TaskState::Ready;
        }

        Ok(Self {
            id: id.to_string(),
            priority,
            arrival_time,
            due_date,
            plan_name: plan_name.to_string(),
            tasks,
            roots,
            flat_plan,
            completed: BTreeSet::new(),
            ready_tasks,
            finish_time: 0.0,
            released: false,
            load_contributions: BTreeMap::new(),
        })
    }

    fn add_node(
        tasks: &mut Vec<Task>,
        node: PlanNode,
        parent: Option<TaskId>,
        depth: u32,
        order_id: &str,
    ) -> SimResult<TaskId> {
        if node.process_time <= 0.0 {
            return Err(SimError::InvalidProcessTime {
                order: order_id.to_string(),
                task: node.name,
                process_time: node.process_time,
            });
        }
        let id = TaskId(tasks.len());
        tasks.push(Task {
            name: node.name,
            process_time: node.process_time,
            station_type: node.station_type,
            produced_component: node.produced_component,
            revenue: node.revenue,
            parent,
            next_steps: Vec::new(),
            structural_depth: depth,
            remaining_depth: depth as i32,
            state: TaskState::Pending,
            assigned_station: None,
            planned_start_time: None,
        });
        for child in node.children {
            let child_id = Self::add_node(tasks, child, Some(id), depth + 1, order_id)?;
            tasks[id.0].next_steps.push(child_id);
        }
        Ok(id)
    }

    /// Task by id
    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    /// Mutable task by id
    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0]
    }

    /// Sum of process times over the whole plan
    pub fn total_process_time(&self) -> f64 {
        self.tasks.iter().map(|t| t.process_time).sum()
    }

    /// Revenue of completed tasks
    pub fn total_revenue(&self) -> f64 {
        self.completed
            .iter()
            .map(|&id| self.tasks[id.0].revenue)
            .sum()
    }

    /// Whether every task has completed
    pub fn is_finished(&self) -> bool {
        self.completed.len() == self.flat_plan.len()
    }

    /// Whether the order finished past its due date; None while unfinished
    pub fn is_overdue(&self) -> Option<bool> {
        if self.is_finished() {
            Some(self.finish_time > self.due_date)
        } else {
            None
        }
    }

    /// Time from arrival to completion; None while unfinished
    pub fn throughput_time(&self) -> Option<f64> {
        if self.is_finished() {
            Some(self.finish_time - self.arrival_time)
        } else {
            None
        }
    }
}
