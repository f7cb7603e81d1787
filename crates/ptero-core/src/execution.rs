//! Per-(node, color) execution status and the workflow-level aggregate.
//!
//! Status only ever moves forward: `new -> running -> {succeeded, failed,
//! errored, canceled}`. Once a terminal state is recorded, later writes are
//! absorbed rather than applied — mirroring the at-least-once callback
//! delivery contract (`backend.py`'s `handle_task_callback` dispatch is
//! tolerant of redundant firings).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    New,
    Running,
    Succeeded,
    Failed,
    Errored,
    Canceled,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Succeeded | Status::Failed | Status::Errored | Status::Canceled
        )
    }

    /// Whether `self -> next` is a legal forward move. Terminal states
    /// accept no further transition; `New -> Running -> <terminal>` is the
    /// only path for everything else.
    fn can_advance_to(self, next: Status) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Status::New, Status::Running) => true,
            (Status::New, _) if next.is_terminal() => true,
            (Status::Running, _) if next.is_terminal() => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: Status,
    pub timestamp: DateTime<Utc>,
}

/// The status history for one (node, color) execution. `ptero-storage`
/// persists each pushed event as a row in `execution_status_history`; this
/// type only owns the in-memory invariant enforcement.
#[derive(Debug, Clone)]
pub struct Execution {
    pub node_id: NodeId,
    pub color: Color,
    history: Vec<StatusEvent>,
}

impl Execution {
    pub fn new(node_id: NodeId, color: Color, started_at: DateTime<Utc>) -> Self {
        Self {
            node_id,
            color,
            history: vec![StatusEvent {
                status: Status::New,
                timestamp: started_at,
            }],
        }
    }

    pub fn from_history(node_id: NodeId, color: Color, history: Vec<StatusEvent>) -> Self {
        Self {
            node_id,
            color,
            history,
        }
    }

    pub fn current(&self) -> Status {
        self.history
            .last()
            .map(|e| e.status)
            .unwrap_or(Status::New)
    }

    pub fn history(&self) -> &[StatusEvent] {
        &self.history
    }

    /// Records a new status if it legally advances from the current one.
    /// Redundant or already-terminal pushes are absorbed silently rather
    /// than erroring, so a duplicate callback delivery is a no-op.
    pub fn push_status(&mut self, status: Status, at: DateTime<Utc>) -> Result<()> {
        let cur = self.current();
        if cur == status || cur.is_terminal() {
            return Ok(());
        }
        if !cur.can_advance_to(status) {
            return Err(Error::UpdateError(format!(
                "cannot move execution of {} at color {} from {cur:?} to {status:?}",
                self.node_id, self.color
            )));
        }
        self.history.push(StatusEvent {
            status,
            timestamp: at,
        });
        Ok(())
    }
}

/// Workflow-level status, derived rather than stored: running until every
/// leaf execution is terminal, then the worst outcome wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    New,
    Running,
    Succeeded,
    Failed,
    Errored,
    Canceled,
}

pub fn aggregate_workflow_status(leaf_statuses: &[Status]) -> WorkflowStatus {
    if leaf_statuses.iter().any(|s| *s == Status::Canceled) {
        return WorkflowStatus::Canceled;
    }
    if !leaf_statuses.iter().all(|s| s.is_terminal()) {
        return WorkflowStatus::Running;
    }
    if leaf_statuses.iter().any(|s| *s == Status::Errored) {
        WorkflowStatus::Errored
    } else if leaf_statuses.iter().any(|s| *s == Status::Failed) {
        WorkflowStatus::Failed
    } else {
        WorkflowStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn status_moves_forward_only() {
        let mut exec = Execution::new(Uuid::new_v4(), 0, now());
        exec.push_status(Status::Running, now()).unwrap();
        exec.push_status(Status::Succeeded, now()).unwrap();
        assert_eq!(exec.current(), Status::Succeeded);

        let err = exec.push_status(Status::Running, now());
        assert!(err.is_ok(), "terminal state absorbs redundant pushes");
        assert_eq!(exec.current(), Status::Succeeded);
    }

    #[test]
    fn new_cannot_jump_straight_to_itself_twice() {
        let mut exec = Execution::new(Uuid::new_v4(), 0, now());
        exec.push_status(Status::New, now()).unwrap();
        assert_eq!(exec.current(), Status::New);
    }

    #[test]
    fn workflow_status_aggregates_worst_outcome() {
        assert_eq!(
            aggregate_workflow_status(&[Status::Succeeded, Status::Running]),
            WorkflowStatus::Running
        );
        assert_eq!(
            aggregate_workflow_status(&[Status::Succeeded, Status::Failed]),
            WorkflowStatus::Failed
        );
        assert_eq!(
            aggregate_workflow_status(&[Status::Succeeded, Status::Succeeded]),
            WorkflowStatus::Succeeded
        );
        assert_eq!(
            aggregate_workflow_status(&[Status::Succeeded, Status::Canceled]),
            WorkflowStatus::Canceled
        );
    }
}
