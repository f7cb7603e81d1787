//! Shapes for the read-only report endpoints: status, skeleton (shape
//! without executions), details (shape with executions), and outputs.

use serde_json::Value;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::execution::ExecutionDto;
use crate::workflow::WorkflowStatusDto;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowStatusReport {
    pub id: Uuid,
    pub name: String,
    pub status: WorkflowStatusDto,
}

/// One node's shape in the submitted graph: its identity, kind, and
/// children, recursing through method/task boundaries the same way the
/// translator walks them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeSkeletonDto {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_by: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSkeletonDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowSkeletonReport {
    pub id: Uuid,
    pub name: String,
    pub root: NodeSkeletonDto,
}

/// A skeleton node annotated with every execution recorded against it,
/// across colors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeDetailsDto {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_by: Option<String>,
    #[serde(default)]
    pub executions: Vec<ExecutionDto>,
    #[serde(default)]
    pub children: Vec<NodeDetailsDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowDetailsReport {
    pub id: Uuid,
    pub name: String,
    pub status: WorkflowStatusDto,
    pub root: NodeDetailsDto,
}

/// Flat `(task name).(property)@(color) -> value` view of everything the
/// workflow has produced so far.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowOutputsReport {
    pub id: Uuid,
    pub name: String,
    pub outputs: BTreeMap<String, Value>,
}
