//! Read-only report routes (§4.6): status, skeleton, details, outputs,
//! and the polling executions feed.

use std::collections::BTreeMap;

use axum::{extract::Query, extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use ptero_core::execution::{Execution, Status, StatusEvent};
use ptero_core::node::{Graph, Node, NodeId, NodeKind};
use ptero_contracts::{
    ExecutionDto, NodeDetailsDto, NodeSkeletonDto, StatusDto, StatusEventDto,
    WorkflowDetailsReport, WorkflowExecutionsReport, WorkflowOutputsReport, WorkflowStatusReport,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::timestamp;
use crate::workflows::status_dto;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/reports/workflow-status", get(workflow_status))
        .route("/v1/reports/workflow-skeleton", get(workflow_skeleton))
        .route("/v1/reports/workflow-details", get(workflow_details))
        .route("/v1/reports/workflow-outputs", get(workflow_outputs))
        .route("/v1/reports/workflow-executions", get(workflow_executions))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct WorkflowIdParam {
    pub workflow_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionsParams {
    pub workflow_id: Uuid,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub since: Option<DateTime<Utc>>,
}

fn kind_label(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::RootTask => "root_task",
        NodeKind::Task { .. } => "task",
        NodeKind::Method(_) => "method",
        NodeKind::InputConnector => "input_connector",
        NodeKind::OutputConnector => "output_connector",
        NodeKind::InputHolder => "input_holder",
    }
}

fn skeleton_of(graph: &Graph, node: &Node) -> NodeSkeletonDto {
    NodeSkeletonDto {
        id: node.id,
        name: node.name.clone(),
        kind: kind_label(&node.kind).to_string(),
        parallel_by: node.kind.parallel_by().map(str::to_string),
        children: graph
            .children(node.id)
            .into_iter()
            .map(|child| skeleton_of(graph, child))
            .collect(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/reports/workflow-status",
    params(("workflow_id" = Uuid, Query, description = "Workflow id")),
    responses((status = 200, description = "Workflow status", body = WorkflowStatusReport)),
    tag = "reports"
)]
pub async fn workflow_status(
    State(state): State<AppState>,
    Query(params): Query<WorkflowIdParam>,
) -> Result<Json<WorkflowStatusReport>, ApiError> {
    let row = state
        .db
        .get_workflow(params.workflow_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", params.workflow_id))?;

    Ok(Json(WorkflowStatusReport {
        id: row.id,
        name: row.name,
        status: status_dto(&row.status),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/reports/workflow-skeleton",
    params(("workflow_id" = Uuid, Query, description = "Workflow id")),
    responses((status = 200, description = "Workflow shape", body = ptero_contracts::WorkflowSkeletonReport)),
    tag = "reports"
)]
pub async fn workflow_skeleton(
    State(state): State<AppState>,
    Query(params): Query<WorkflowIdParam>,
) -> Result<Json<ptero_contracts::WorkflowSkeletonReport>, ApiError> {
    let row = state
        .db
        .get_workflow(params.workflow_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", params.workflow_id))?;
    let graph = ptero_storage::load_graph(&state.db, params.workflow_id).await?;
    let root = graph
        .nodes()
        .iter()
        .find(|n| matches!(n.kind, NodeKind::RootTask))
        .ok_or_else(|| ptero_core::Error::no_such("root task", params.workflow_id))?;

    Ok(Json(ptero_contracts::WorkflowSkeletonReport {
        id: row.id,
        name: row.name,
        root: skeleton_of(&graph, root),
    }))
}

/// Groups execution history rows into one `Execution` per `(node_id,
/// color)`, preserving first-seen order so the flattened history reads
/// oldest-first the way `list_execution_history` returns it.
fn group_executions(rows: Vec<ptero_storage::ExecutionStatusRow>) -> Vec<Execution> {
    let mut order: Vec<(NodeId, i64)> = Vec::new();
    let mut grouped: BTreeMap<(NodeId, i64), Vec<StatusEvent>> = BTreeMap::new();

    for row in rows {
        let key = (row.node_id, row.color);
        let status = match row.status.as_str() {
            "new" => Status::New,
            "running" => Status::Running,
            "succeeded" => Status::Succeeded,
            "failed" => Status::Failed,
            "errored" => Status::Errored,
            "canceled" => Status::Canceled,
            _ => continue,
        };
        if !grouped.contains_key(&key) {
            order.push(key);
        }
        grouped.entry(key).or_default().push(StatusEvent {
            status,
            timestamp: row.timestamp,
        });
    }

    order
        .into_iter()
        .map(|(node_id, color)| {
            let history = grouped.remove(&(node_id, color)).unwrap_or_default();
            Execution::from_history(node_id, color, history)
        })
        .collect()
}

fn status_to_dto(status: Status) -> StatusDto {
    match status {
        Status::New => StatusDto::New,
        Status::Running => StatusDto::Running,
        Status::Succeeded => StatusDto::Succeeded,
        Status::Failed => StatusDto::Failed,
        Status::Errored => StatusDto::Errored,
        Status::Canceled => StatusDto::Canceled,
    }
}

fn execution_dto(node_name: &str, execution: &Execution) -> ExecutionDto {
    ExecutionDto {
        node_id: execution.node_id,
        node_name: node_name.to_string(),
        color: execution.color,
        status: status_to_dto(execution.current()),
        history: execution
            .history()
            .iter()
            .map(|e| StatusEventDto {
                status: status_to_dto(e.status),
                timestamp: e.timestamp,
            })
            .collect(),
    }
}

fn details_of(graph: &Graph, node: &Node, executions: &[Execution]) -> NodeDetailsDto {
    NodeDetailsDto {
        id: node.id,
        name: node.name.clone(),
        kind: kind_label(&node.kind).to_string(),
        parallel_by: node.kind.parallel_by().map(str::to_string),
        executions: executions
            .iter()
            .filter(|e| e.node_id == node.id)
            .map(|e| execution_dto(&node.name, e))
            .collect(),
        children: graph
            .children(node.id)
            .into_iter()
            .map(|child| details_of(graph, child, executions))
            .collect(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/reports/workflow-details",
    params(("workflow_id" = Uuid, Query, description = "Workflow id")),
    responses((status = 200, description = "Workflow shape with execution history", body = WorkflowDetailsReport)),
    tag = "reports"
)]
pub async fn workflow_details(
    State(state): State<AppState>,
    Query(params): Query<WorkflowIdParam>,
) -> Result<Json<WorkflowDetailsReport>, ApiError> {
    let row = state
        .db
        .get_workflow(params.workflow_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", params.workflow_id))?;
    let graph = ptero_storage::load_graph(&state.db, params.workflow_id).await?;
    let root = graph
        .nodes()
        .iter()
        .find(|n| matches!(n.kind, NodeKind::RootTask))
        .ok_or_else(|| ptero_core::Error::no_such("root task", params.workflow_id))?;

    let rows = state
        .db
        .list_executions_since(params.workflow_id, None)
        .await?;
    let executions = group_executions(rows);

    Ok(Json(WorkflowDetailsReport {
        id: row.id,
        name: row.name,
        status: status_dto(&row.status),
        root: details_of(&graph, root, &executions),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/reports/workflow-outputs",
    params(("workflow_id" = Uuid, Query, description = "Workflow id")),
    responses((status = 200, description = "Flat view of every produced output", body = WorkflowOutputsReport)),
    tag = "reports"
)]
pub async fn workflow_outputs(
    State(state): State<AppState>,
    Query(params): Query<WorkflowIdParam>,
) -> Result<Json<WorkflowOutputsReport>, ApiError> {
    let row = state
        .db
        .get_workflow(params.workflow_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", params.workflow_id))?;
    let graph = ptero_storage::load_graph(&state.db, params.workflow_id).await?;
    let store = ptero_storage::load_output_store(&state.db, params.workflow_id).await?;

    let mut outputs = BTreeMap::new();
    for output in store.all() {
        let name = graph
            .node(output.node_id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| output.node_id.to_string());
        let key = format!("{name}.{}@{}", output.property, output.color);
        outputs.insert(key, output.value.clone());
    }

    Ok(Json(WorkflowOutputsReport {
        id: row.id,
        name: row.name,
        outputs,
    }))
}

/// `since` is echoed back into `update_url` as the latest timestamp seen
/// this call, so polling it again only returns what's new.
#[utoipa::path(
    get,
    path = "/v1/reports/workflow-executions",
    params(
        ("workflow_id" = Uuid, Query, description = "Workflow id"),
        ("since" = Option<DateTime<Utc>>, Query, description = "Only executions recorded after this timestamp")
    ),
    responses((status = 200, description = "Executions recorded since the given timestamp", body = WorkflowExecutionsReport)),
    tag = "reports"
)]
pub async fn workflow_executions(
    State(state): State<AppState>,
    Query(params): Query<ExecutionsParams>,
) -> Result<Json<WorkflowExecutionsReport>, ApiError> {
    state
        .db
        .get_workflow(params.workflow_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", params.workflow_id))?;

    let graph = ptero_storage::load_graph(&state.db, params.workflow_id).await?;
    let rows = state
        .db
        .list_executions_since(params.workflow_id, params.since)
        .await?;
    let latest = rows.iter().map(|r| r.timestamp).max();
    let executions = group_executions(rows)
        .iter()
        .map(|e| {
            let name = graph
                .node(e.node_id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| e.node_id.to_string());
            execution_dto(&name, e)
        })
        .collect();

    Ok(Json(WorkflowExecutionsReport {
        update_url: latest.map(|ts| {
            format!(
                "/v1/reports/workflow-executions?workflow_id={}&since={}",
                params.workflow_id,
                timestamp::format(ts)
            )
        }),
        executions,
    }))
}
