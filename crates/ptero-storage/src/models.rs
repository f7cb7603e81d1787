//! Database row types. These mirror the Postgres schema in `migrations/`
//! and intentionally differ from the wire DTOs in `ptero-contracts` —
//! rows carry storage concerns (foreign keys, JSONB columns) the API
//! layer never exposes directly.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkflow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct NodeRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    /// Serialized `ptero_core::node::NodeKind`.
    pub kind: sqlx::types::JsonValue,
    pub index: i64,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct CreateNode {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub kind: sqlx::types::JsonValue,
    pub index: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct LinkRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub source_id: Uuid,
    pub destination_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct DataFlowEntryRow {
    pub link_id: Uuid,
    pub source_property: String,
    pub destination_property: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub node_id: Uuid,
    pub method_name: String,
    pub color: i64,
    pub job_id: String,
    pub stdin: sqlx::types::JsonValue,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResponseLinkRow {
    pub node_id: Uuid,
    pub job_id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExecutionStatusRow {
    pub node_id: Uuid,
    pub color: i64,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OutputRow {
    pub node_id: Uuid,
    pub property: String,
    pub color: i64,
    pub value: sqlx::types::JsonValue,
}

#[derive(Debug, Clone, FromRow)]
pub struct ColorGroupRow {
    pub node_id: Uuid,
    pub parent_color: i64,
    pub range_begin: i64,
    pub range_end: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct WebhookSubscriptionRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub event: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct CreateWebhookSubscription {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub event: String,
    pub url: String,
}
