//! Workflow lifecycle routes: create, fetch, cancel, delete — §4.6.
//!
//! Create persists the submitted graph node-by-node (parents always
//! precede children in `Graph::nodes()`, so foreign keys are satisfied in
//! one pass), commits, then translates and submits the Petri program in
//! the background so the HTTP response isn't held on the engine's accept.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use ptero_contracts::{
    CreateWorkflowRequest, CreateWorkflowResponse, PatchWorkflowRequest, ReportLinks,
    WorkflowResponse, WorkflowStatusDto,
};
use ptero_core::node::{DataFlowEntry, MethodSpec};
use ptero_core::workflow::{
    build_workflow_graph, LinkSubmission, MethodSubmission, TaskSubmission, WorkflowSubmission,
};
use ptero_storage::{CreateNode, CreateWebhookSubscription, CreateWorkflow};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/workflows", get(get_workflow_by_name).post(create_workflow))
        .route(
            "/v1/workflows/:id",
            get(get_workflow).patch(patch_workflow).delete(delete_workflow),
        )
        .with_state(state)
}

fn to_submission(req: &CreateWorkflowRequest) -> WorkflowSubmission {
    let tasks = req
        .tasks
        .iter()
        .map(|t| TaskSubmission {
            name: t.name.clone(),
            parallel_by: t.parallel_by.clone(),
            methods: t
                .methods
                .iter()
                .map(|m| MethodSubmission {
                    name: m.name.clone(),
                    spec: match &m.method {
                        ptero_contracts::MethodRequest::ShellCommand { command_line } => {
                            MethodSpec::ShellCommand {
                                command_line: command_line.clone(),
                            }
                        }
                        ptero_contracts::MethodRequest::Dag => MethodSpec::Dag,
                    },
                })
                .collect(),
        })
        .collect();

    let links = req
        .links
        .iter()
        .map(|l| LinkSubmission {
            source: l.source.clone(),
            destination: l.destination.clone(),
            entries: l
                .data_flow
                .iter()
                .map(|e| (e.source_property.clone(), e.destination_property.clone()))
                .collect(),
        })
        .collect();

    WorkflowSubmission {
        name: req.name.clone(),
        tasks,
        links,
        inputs: req.inputs.clone(),
    }
}

fn report_links(workflow_id: Uuid) -> ReportLinks {
    ReportLinks {
        workflow_status: format!("/v1/reports/workflow-status?workflow_id={workflow_id}"),
        workflow_details: format!("/v1/reports/workflow-details?workflow_id={workflow_id}"),
        workflow_skeleton: format!("/v1/reports/workflow-skeleton?workflow_id={workflow_id}"),
        workflow_outputs: format!("/v1/reports/workflow-outputs?workflow_id={workflow_id}"),
        workflow_executions: format!("/v1/reports/workflow-executions?workflow_id={workflow_id}"),
    }
}

/// `_save_workflow`'s duplicate-name classification: a unique-constraint
/// violation on `workflow.name` is `NonUniqueName`; anything else from the
/// database is an unclassified integrity failure.
fn classify_create_error(err: sqlx::Error, name: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return ptero_core::Error::NonUniqueName(name.to_string()).into();
        }
    }
    anyhow::Error::from(err).into()
}

#[utoipa::path(
    post,
    path = "/v1/workflows",
    request_body = CreateWorkflowRequest,
    responses(
        (status = 201, description = "Workflow created", body = CreateWorkflowResponse),
        (status = 400, description = "Missing required inputs or duplicate link destinations"),
        (status = 409, description = "Workflow name already exists")
    ),
    tag = "workflows"
)]
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkflowRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<CreateWorkflowResponse>), ApiError> {
    let workflow_id = Uuid::new_v4();
    let submission = to_submission(&req);
    let (graph, root_id) = build_workflow_graph(workflow_id, &submission)?;

    let workflow_row = state
        .db
        .create_workflow(CreateWorkflow {
            id: workflow_id,
            name: req.name.clone(),
        })
        .await
        .map_err(|err| classify_create_error(err, &req.name))?;

    for node in graph.nodes() {
        let kind =
            serde_json::to_value(&node.kind).expect("NodeKind always serializes to JSON");
        state
            .db
            .create_node(CreateNode {
                id: node.id,
                workflow_id,
                parent_id: node.parent_id,
                name: node.name.clone(),
                kind,
                index: node.index,
            })
            .await?;
    }

    for link in graph.links() {
        let entries: Vec<(String, String)> = link
            .entries
            .iter()
            .map(|e: &DataFlowEntry| (e.source_property.clone(), e.destination_property.clone()))
            .collect();
        state
            .db
            .create_link(link.id, workflow_id, link.source_id, link.destination_id, &entries)
            .await?;
    }

    for webhook in &req.webhooks {
        state
            .db
            .create_webhook_subscription(CreateWebhookSubscription {
                id: Uuid::new_v4(),
                workflow_id,
                event: webhook.event.clone(),
                url: webhook.url.clone(),
            })
            .await?;
    }

    let program = ptero_core::translate::translate(&graph, root_id, &state.self_base_url);
    let petri = state.petri.clone();
    tokio::spawn(async move {
        if let Err(err) = petri.submit_net(workflow_id, &program).await {
            tracing::error!(%workflow_id, error = %err, "failed to submit translated net to the Petri engine");
        }
    });

    let response = CreateWorkflowResponse {
        name: workflow_row.name,
        id: workflow_row.id,
        status: WorkflowStatusDto::New,
        reports: report_links(workflow_id),
    };

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/v1/workflows/{workflow_id}"))],
        Json(response),
    ))
}

pub(crate) fn status_dto(raw: &str) -> WorkflowStatusDto {
    match raw {
        "running" => WorkflowStatusDto::Running,
        "succeeded" => WorkflowStatusDto::Succeeded,
        "failed" => WorkflowStatusDto::Failed,
        "errored" => WorkflowStatusDto::Errored,
        "canceled" => WorkflowStatusDto::Canceled,
        _ => WorkflowStatusDto::New,
    }
}

fn to_response(row: ptero_storage::WorkflowRow) -> WorkflowResponse {
    WorkflowResponse {
        id: row.id,
        name: row.name,
        status: status_dto(&row.status),
        created_at: row.created_at,
    }
}

#[utoipa::path(
    get,
    path = "/v1/workflows/{id}",
    params(("id" = Uuid, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow found", body = WorkflowResponse),
        (status = 404, description = "Workflow not found")
    ),
    tag = "workflows"
)]
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let row = state
        .db
        .get_workflow(id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", id))?;
    Ok(Json(to_response(row)))
}

#[derive(Debug, Deserialize)]
pub struct GetByNameParams {
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/v1/workflows",
    params(("name" = String, Query, description = "Workflow name")),
    responses(
        (status = 200, description = "Workflow found", body = WorkflowResponse),
        (status = 404, description = "Workflow not found")
    ),
    tag = "workflows"
)]
pub async fn get_workflow_by_name(
    State(state): State<AppState>,
    Query(params): Query<GetByNameParams>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let row = state
        .db
        .get_workflow_by_name(&params.name)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", &params.name))?;
    Ok(Json(to_response(row)))
}

/// Cancellation is cooperative (§5): mark the workflow canceled and
/// best-effort ask the Petri engine to cancel the net. Tokens already in
/// flight are left alone; lifecycle webhooks fire as the net finishes
/// firing, handled by the node-event callback, not here.
#[utoipa::path(
    patch,
    path = "/v1/workflows/{id}",
    params(("id" = Uuid, Path, description = "Workflow id")),
    request_body = PatchWorkflowRequest,
    responses(
        (status = 200, description = "Workflow updated", body = WorkflowResponse),
        (status = 404, description = "Workflow not found")
    ),
    tag = "workflows"
)]
pub async fn patch_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let mut row = state
        .db
        .get_workflow(id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("workflow", id))?;

    if req.is_canceled == Some(true) {
        state.db.set_workflow_status(id, "canceled").await?;
        row.status = "canceled".to_string();

        let petri = state.petri.clone();
        tokio::spawn(async move {
            if let Err(err) = petri.cancel_net(id).await {
                tracing::warn!(workflow_id = %id, error = %err, "best-effort net cancellation failed");
            }
        });
    }

    Ok(Json(to_response(row)))
}

#[utoipa::path(
    delete,
    path = "/v1/workflows/{id}",
    params(("id" = Uuid, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow deleted"),
        (status = 404, description = "Workflow not found")
    ),
    tag = "workflows"
)]
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.db.delete_workflow(id).await?;
    if deleted {
        Ok(StatusCode::OK)
    } else {
        Err(ptero_core::Error::no_such("workflow", id).into())
    }
}
