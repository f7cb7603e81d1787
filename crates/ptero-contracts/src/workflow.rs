//! Workflow submission and lifecycle DTOs, mirroring the request bodies
//! `ptero-api::workflows` accepts and returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MethodRequest {
    ShellCommand { command_line: Vec<String> },
    Dag,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskRequest {
    pub name: String,
    pub methods: Vec<NamedMethodRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NamedMethodRequest {
    pub name: String,
    #[serde(flatten)]
    pub method: MethodRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataFlowEntryRequest {
    pub source_property: String,
    pub destination_property: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkRequest {
    /// Task name, or the literal `"input connector"`.
    pub source: String,
    /// Task name, or the literal `"output connector"`.
    pub destination: String,
    pub data_flow: Vec<DataFlowEntryRequest>,
}

/// A subscriber interested in one lifecycle event (or `"*"` for all of
/// them) of a submitted workflow; see §4.3's lifecycle event list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookRequest {
    pub event: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub tasks: Vec<TaskRequest>,
    pub links: Vec<LinkRequest>,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub webhooks: Vec<WebhookRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatchWorkflowRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_canceled: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatusDto {
    New,
    Running,
    Succeeded,
    Failed,
    Errored,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowResponse {
    pub id: Uuid,
    pub name: String,
    pub status: WorkflowStatusDto,
    pub created_at: DateTime<Utc>,
}

/// Report URLs handed back on workflow creation so a caller never has to
/// hand-build them from the id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportLinks {
    pub workflow_status: String,
    pub workflow_details: String,
    pub workflow_skeleton: String,
    pub workflow_outputs: String,
    pub workflow_executions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkflowResponse {
    pub name: String,
    pub id: Uuid,
    pub status: WorkflowStatusDto,
    pub reports: ReportLinks,
}
