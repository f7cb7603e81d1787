//! Execution report DTOs, mirroring `workflow_executions.py`'s report
//! shape: an `updateUrl` for polling forward and the executions since the
//! last poll.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusDto {
    New,
    Running,
    Succeeded,
    Failed,
    Errored,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusEventDto {
    pub status: StatusDto,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecutionDto {
    pub node_id: Uuid,
    pub node_name: String,
    pub color: i64,
    pub status: StatusDto,
    pub history: Vec<StatusEventDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowExecutionsReport {
    /// Poll this URL again to receive only executions recorded after the
    /// timestamp embedded in it. `None` when this call returned no
    /// executions — there is no new cursor to advance to.
    #[serde(rename = "updateUrl")]
    pub update_url: Option<String>,
    pub executions: Vec<ExecutionDto>,
}
