//! Error types for the simulation core

use thiserror::Error;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Fatal simulation errors
///
/// Consistency violations are bugs in the control flow and carry the
/// offending identifiers; they are never silently recovered from.
/// Admission rejections and unfinished orders are normal outcomes and do
/// not appear here.
#[derive(Debug, Error)]
pub enum SimError {
    /// A station's indirect load went negative beyond tolerance
    #[error("negative indirect load {load} for task {task} at station {station}")]
    NegativeLoad {
        station: String,
        task: String,
        load: f64,
    },

    /// A task reached the head of a queue it is not assigned to
    #[error("task {task} of order {order} is not assigned to station {station}")]
    StationMismatch {
        station: String,
        order: String,
        task: String,
    },

    /// A completing task was not found in its station's queue
    #[error("task {task} of order {order} is not in the queue of station {station}")]
    TaskNotInQueue {
        station: String,
        order: String,
        task: String,
    },

    /// A task was enqueued without being in its order's ready set
    #[error("task {task} of order {order} is not ready")]
    TaskNotReady { order: String, task: String },

    /// A task reached a release path without routing
    #[error("task {task} of order {order} has no assigned station")]
    UnroutedTask { order: String, task: String },

    /// No workstation instance exists for a required type
    #[error("no workstation of type {type_id}")]
    NoStationForType { type_id: String },

    /// An order left the pool twice
    #[error("order {order} is not in the pre-shop pool")]
    OrderNotInPool { order: String },

    /// An order was created with an empty process plan
    #[error("order {order} has an empty process plan")]
    EmptyPlan { order: String },

    /// A task was created with a non-positive process time
    #[error("task {task} of order {order} has non-positive process time {process_time}")]
    InvalidProcessTime {
        order: String,
        task: String,
        process_time: f64,
    },

    /// Station indirect loads diverged from the per-order projection
    #[error("load conservation violated at station {station}: expected {expected}, found {actual}")]
    LoadConservation {
        station: String,
        expected: f64,
        actual: f64,
    },
}
