//! Serialized execution of transport operations
//!
//! Every operation a transport performs against its handler runs as a task
//! of one [`AwaitQueue`]: submission order is execution order and a task
//! starts only after all previous ones settled. [`PendingTaskBatcher`]s sit
//! in front of the queue and coalesce bursts of same-kind consumer operations
//! into one queued task.

pub mod await_queue;
pub mod batcher;

use std::time::Duration;

use thiserror::Error;

pub use await_queue::{AwaitQueue, QueueOptions};
pub use batcher::PendingTaskBatcher;

/// Rejections produced by the queue itself
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was stopped before or while the task ran
    #[error("queue stopped")]
    Stopped,

    /// The task was removed before it started
    #[error("queue task removed")]
    Removed,

    /// The task panicked while running
    #[error("queue task panicked")]
    Panicked,
}

/// Point-in-time view of one queued task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Position in the queue
    pub index: usize,
    /// Task id, unique per queue
    pub id: u64,
    /// Task name
    pub name: String,
    /// Time spent waiting before execution (so far, if not started)
    pub enqueued_for: Duration,
    /// Time spent executing, zero if not started
    pub executing_for: Duration,
}
