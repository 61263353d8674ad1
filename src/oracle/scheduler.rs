//! Task scheduler interface
//!
//! The oracle never waits or sets timers. It computes when the first sample
//! should be taken and publishes that request; an external automation network
//! (or the bundled keeper) is expected to call `exec` at that time.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use super::error::{OracleError, Result};
use crate::types::OracleId;

/// Activation request published by `schedule_start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub id: OracleId,
    pub start_oracle_time: u64,
}

/// Sink for activation requests
#[cfg_attr(test, mockall::automock)]
pub trait TaskNotifier: Send + Sync {
    fn notify(&self, task: TaskSubmission);
}

/// `reference_time + delay - period`, rejecting delays shorter than `period`
pub fn start_oracle_time(delay: u64, reference_time: u64, period: u64) -> Result<u64> {
    if delay < period {
        return Err(OracleError::InvalidSchedule { delay, period });
    }
    reference_time
        .checked_add(delay - period)
        .ok_or(OracleError::Overflow("start oracle time"))
}

/// Forwards submissions over an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<TaskSubmission>,
}

impl ChannelNotifier {
    pub fn new(tx: UnboundedSender<TaskSubmission>) -> Self {
        Self { tx }
    }

    /// Notifier plus the receiving end a keeper listens on
    pub fn channel() -> (Self, UnboundedReceiver<TaskSubmission>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl TaskNotifier for ChannelNotifier {
    fn notify(&self, task: TaskSubmission) {
        if self.tx.send(task).is_err() {
            warn!(
                oracle_id = task.id,
                start_oracle_time = task.start_oracle_time,
                "Task receiver dropped; submission not delivered"
            );
        }
    }
}

/// Publishes submissions as log events only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl TaskNotifier for LogNotifier {
    fn notify(&self, task: TaskSubmission) {
        info!(
            oracle_id = task.id,
            start_oracle_time = task.start_oracle_time,
            "LogTaskSubmitted"
        );
    }
}
