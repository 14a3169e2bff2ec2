//! Error types for the `downlink-sched` crate.
//!
//! Every error here is an invariant violation raised synchronously by the
//! operation that detected it. Nothing is retried internally, and a failed
//! admission leaves the pool exactly as it was.

use rust_decimal::Decimal;

use downlink_types::{ChallengeId, TaskId};

/// Errors that can occur while scheduling tasks on a CPU pool.
#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    /// A task is already running on the pool for the same challenge.
    #[error("task {0} is already on the pool for this challenge")]
    DuplicateTask(TaskId),

    /// The argument is not a schedulable unit of work.
    #[error("invalid task: {reason}")]
    InvalidTask {
        /// Why the task cannot be scheduled.
        reason: String,
    },

    /// The task's minimum exceeds the pool's free capacity.
    #[error("pool does not have the required cycles for {task}: need {required} but only have {available}")]
    InsufficientCapacity {
        /// Name of the rejected task.
        task: String,
        /// The task's minimum required cycles.
        required: Decimal,
        /// The pool's free cycles at the time of the request.
        available: Decimal,
    },

    /// An assignment below the task's declared minimum was attempted.
    #[error("tried to run {task} with {requested} cycles but it requires {minimum}")]
    OverloadAssignment {
        /// Name of the task.
        task: String,
        /// The rejected assignment.
        requested: Decimal,
        /// The task's minimum required cycles.
        minimum: Decimal,
    },

    /// No running task has the given id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A task refers to a challenge that is not in the registry.
    #[error("challenge not found: {0}")]
    ChallengeNotFound(ChallengeId),

    /// A dictionary password was requested from an empty word list.
    #[error("dictionary has no usable entries")]
    EmptyDictionary,

    /// A machine was built with more compute units than it has slots for.
    #[error("machine has {count} compute units but only {max} slots")]
    TooManyUnits {
        /// Number of units supplied.
        count: usize,
        /// Number of slots available.
        max: usize,
    },
}
