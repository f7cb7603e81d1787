//! `/v1/callbacks/nodes/<id>/events/<event>` and
//! `/v1/callbacks/methods/<id>/events/<event>` — the Petri engine's and
//! fork service's only way to talk back into this service (§4.3).
//!
//! Handlers stay thin: reconstruct the in-memory domain state the pure
//! logic in `ptero_core::{dispatch,resolve}` needs, run that logic, persist
//! the outcome, ack whichever response link the engine is waiting on.

use axum::{
    extract::{Path, Query, State},
    routing::put,
    Json, Router,
};
use chrono::Utc;
use ptero_core::color::Color;
use ptero_core::dispatch::{self, LifecycleEvent, MethodEvent, NodeEvent};
use ptero_core::execution::{Execution, Status, StatusEvent};
use ptero_core::job::{Job, ResponseLink};
use ptero_core::node::NodeKind;
use ptero_core::resolve;
use ptero_contracts::{CallbackAck, JobEndedRequest, NodeEventPayload};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/callbacks/nodes/:id/events/:event", put(node_event))
        .route("/v1/callbacks/methods/:id/events/:event", put(method_event))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct NodeEventQuery {
    /// Only present on `get_split_size`: the task's `parallel_by` property.
    #[serde(default)]
    pub property: Option<String>,
}

fn status_from_wire(status: &str) -> Option<Status> {
    match status {
        "new" => Some(Status::New),
        "running" => Some(Status::Running),
        "succeeded" => Some(Status::Succeeded),
        "failed" => Some(Status::Failed),
        "errored" => Some(Status::Errored),
        "canceled" => Some(Status::Canceled),
        _ => None,
    }
}

fn status_to_wire(status: Status) -> &'static str {
    match status {
        Status::New => "new",
        Status::Running => "running",
        Status::Succeeded => "succeeded",
        Status::Failed => "failed",
        Status::Errored => "errored",
        Status::Canceled => "canceled",
    }
}

#[utoipa::path(
    put,
    path = "/v1/callbacks/nodes/{id}/events/{event}",
    params(
        ("id" = Uuid, Path, description = "Node id"),
        ("event" = String, Path, description = "get_split_size | color_group_created | a lifecycle event name")
    ),
    request_body = NodeEventPayload,
    responses((status = 200, description = "Event resolved", body = CallbackAck)),
    tag = "callbacks"
)]
pub async fn node_event(
    State(state): State<AppState>,
    Path((node_id, event)): Path<(Uuid, String)>,
    Query(query): Query<NodeEventQuery>,
    Json(payload): Json<NodeEventPayload>,
) -> Result<Json<CallbackAck>, ApiError> {
    let event = NodeEvent::parse(&event)?;
    let node_row = state
        .db
        .get_node(node_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("node", node_id))?;

    match event {
        NodeEvent::GetSplitSize => {
            handle_get_split_size(&state, node_row.workflow_id, node_id, &query, &payload).await?;
        }
        NodeEvent::ColorGroupCreated => {
            handle_color_group_created(&state, node_row.workflow_id, node_id, &payload).await?;
        }
        NodeEvent::Lifecycle(lifecycle) => {
            handle_lifecycle(&state, &node_row, lifecycle, payload.color).await?;
        }
    }

    for url in payload.response_links.values() {
        if !matches!(event, NodeEvent::GetSplitSize | NodeEvent::ColorGroupCreated) {
            state.petri.ack(url).await?;
        }
    }

    Ok(Json(CallbackAck::ok()))
}

/// `get_split_size`: find the upstream node/property feeding this task's
/// `parallel_by` slot, read the array length it produced at the task's own
/// color, and ack it into the engine's `size` response place.
async fn handle_get_split_size(
    state: &AppState,
    workflow_id: Uuid,
    node_id: Uuid,
    query: &NodeEventQuery,
    payload: &NodeEventPayload,
) -> Result<(), ApiError> {
    let graph = ptero_storage::load_graph(&state.db, workflow_id).await?;
    let task = graph
        .node(node_id)
        .ok_or_else(|| ptero_core::Error::no_such("node", node_id))?;

    let property = query
        .property
        .as_deref()
        .or_else(|| task.kind.parallel_by())
        .ok_or_else(|| {
            ptero_core::Error::UpdateError(format!("node {node_id} has no parallel_by property"))
        })?;

    let (source_id, source_property) = resolve::parallel_by_source(&graph, task)
        .ok_or_else(|| ptero_core::Error::UpdateError(format!("no link feeds {node_id}.{property}")))?;

    let outputs = ptero_storage::load_output_store(&state.db, task.workflow_id).await?;
    let size = outputs.split_size(source_id, source_property, payload.color)?;

    if let Some(url) = payload.response_links.get("size") {
        state
            .petri
            .ack_with_body(url, ptero_contracts::SplitSizeAck { size })
            .await?;
    }

    Ok(())
}

/// `color_group_created`: re-derive the same split size (idempotent if
/// re-delivered), allocate the color group, persist it, and ack the
/// allocated range into the engine's `created` response place.
async fn handle_color_group_created(
    state: &AppState,
    workflow_id: Uuid,
    node_id: Uuid,
    payload: &NodeEventPayload,
) -> Result<(), ApiError> {
    let graph = ptero_storage::load_graph(&state.db, workflow_id).await?;
    let task = graph
        .node(node_id)
        .ok_or_else(|| ptero_core::Error::no_such("node", node_id))?;

    let (source_id, source_property) = resolve::parallel_by_source(&graph, task)
        .ok_or_else(|| ptero_core::Error::UpdateError(format!("no link feeds {node_id}'s parallel_by")))?;

    let outputs = ptero_storage::load_output_store(&state.db, workflow_id).await?;
    let size = outputs.split_size(source_id, source_property, payload.color)?;

    let mut colors = ptero_storage::load_color_store(&state.db, workflow_id).await?;
    let group = colors.allocate(node_id, payload.color, size);

    state
        .db
        .create_color_group(node_id, group.parent_color, group.begin, group.end)
        .await?;

    if let Some(url) = payload.response_links.get("created") {
        state
            .petri
            .ack_with_body(
                url,
                ptero_contracts::ColorGroupCreatedAck {
                    begin: group.begin,
                    end: group.end,
                },
            )
            .await?;
    }

    Ok(())
}

/// Advances the (node, color) execution's status, persists only if it
/// actually moved, then forwards to any subscriber whose declared event
/// matches. When the node is the workflow's root task, its terminal status
/// also becomes the workflow's own.
async fn handle_lifecycle(
    state: &AppState,
    node_row: &ptero_storage::NodeRow,
    lifecycle: LifecycleEvent,
    color: Color,
) -> Result<(), ApiError> {
    if let Some(status) = lifecycle.status() {
        let history_rows = state.db.list_execution_history(node_row.id, color).await?;
        let history: Vec<StatusEvent> = history_rows
            .into_iter()
            .filter_map(|row| {
                status_from_wire(&row.status).map(|status| StatusEvent {
                    status,
                    timestamp: row.timestamp,
                })
            })
            .collect();
        let mut execution = Execution::from_history(node_row.id, color, history);
        let before = execution.current();
        execution.push_status(status, Utc::now())?;
        if execution.current() != before {
            state
                .db
                .append_execution_status(node_row.id, color, status_to_wire(status))
                .await?;
            state.db.set_node_status(node_row.id, status_to_wire(status)).await?;

            if node_row.parent_id.is_none() && status.is_terminal() {
                state
                    .db
                    .set_workflow_status(node_row.workflow_id, status_to_wire(status))
                    .await?;
            }
        }
    }

    let subscriptions = state.db.list_webhook_subscriptions(node_row.workflow_id).await?;
    let envelope = dispatch::webhook_envelope(lifecycle, node_row.id, color);
    let body: Value = json!({
        "event": envelope.event,
        "node_id": envelope.node_id,
        "color": envelope.color,
    });

    for subscription in subscriptions {
        if dispatch::webhook_matches(&subscription.event, lifecycle) {
            let webhook = state.webhook.clone();
            let url = subscription.url.clone();
            let body = body.clone();
            tokio::spawn(async move {
                webhook.notify(&url, &body).await;
            });
        }
    }

    Ok(())
}

#[utoipa::path(
    put,
    path = "/v1/callbacks/methods/{id}/events/{event}",
    params(
        ("id" = Uuid, Path, description = "Method node id"),
        ("event" = String, Path, description = "execute | ended | done")
    ),
    responses((status = 200, description = "Event resolved", body = CallbackAck)),
    tag = "callbacks"
)]
pub async fn method_event(
    State(state): State<AppState>,
    Path((method_id, event)): Path<(Uuid, String)>,
    body: axum::body::Bytes,
) -> Result<Json<CallbackAck>, ApiError> {
    let event = MethodEvent::parse(&event)?;
    let method_row = state
        .db
        .get_node(method_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("node", method_id))?;

    match event {
        MethodEvent::Execute => {
            let payload: NodeEventPayload = serde_json::from_slice(&body)
                .map_err(|e| anyhow::anyhow!("invalid execute payload: {e}"))?;
            handle_execute(&state, &method_row, payload).await?;
        }
        MethodEvent::Ended => {
            let payload: JobEndedRequest = serde_json::from_slice(&body)
                .map_err(|e| anyhow::anyhow!("invalid ended payload: {e}"))?;
            handle_ended(&state, &method_row, payload).await?;
        }
        MethodEvent::Done => {
            tracing::debug!(method_id = %method_id, "nested DAG method reported done");
        }
    }

    Ok(Json(CallbackAck::ok()))
}

/// `execute`: resolve the task's inputs at this color into the method's
/// stdin, hand the shell command to the fork service, and record the job
/// with every response link the engine is waiting for an outcome on. A
/// redelivery of this callback for a `(method, color)` already dispatched
/// is recognized by `get_job_by_color` and never reaches the fork service
/// a second time; only newly-seen response links are added.
async fn handle_execute(
    state: &AppState,
    method_row: &ptero_storage::NodeRow,
    payload: NodeEventPayload,
) -> Result<(), ApiError> {
    let response_links: Vec<(String, String)> = payload.response_links.into_iter().collect();

    if let Some(existing) = state.db.get_job_by_color(method_row.id, payload.color).await? {
        state
            .db
            .add_response_links(method_row.id, &existing.job_id, &response_links)
            .await?;
        return Ok(());
    }

    let NodeKind::Method(ptero_core::node::MethodSpec::ShellCommand { command_line }) =
        serde_json::from_value::<NodeKind>(method_row.kind.clone())
            .map_err(|e| anyhow::Error::from(e))?
    else {
        return Err(ptero_core::Error::UpdateError(format!(
            "method {} is not a shell command",
            method_row.id
        ))
        .into());
    };

    let task_id = method_row
        .parent_id
        .ok_or_else(|| ptero_core::Error::UpdateError(format!("method {} has no parent task", method_row.id)))?;

    let graph = ptero_storage::load_graph(&state.db, method_row.workflow_id).await?;
    let task = graph
        .node(task_id)
        .ok_or_else(|| ptero_core::Error::no_such("node", task_id))?;
    let colors = ptero_storage::load_color_store(&state.db, method_row.workflow_id).await?;
    let outputs = ptero_storage::load_output_store(&state.db, method_row.workflow_id).await?;

    let stdin = resolve::resolve_task_inputs(&graph, &outputs, &colors, task, payload.color)?;

    let ended_url = format!(
        "{}/v1/callbacks/methods/{}/events/ended",
        state.self_base_url, method_row.id
    );
    let job_id = state
        .fork
        .submit_job(command_line, Value::Object(stdin), &ended_url)
        .await?;

    // A racing duplicate delivery can still lose this insert to a
    // concurrent one; that's a unique-constraint violation on
    // `job_node_id_color_idx`, surfaced as a 409 rather than silently
    // dispatching twice.
    state
        .db
        .create_job(
            method_row.id,
            &method_row.name,
            payload.color,
            &job_id,
            Value::Null,
            &response_links,
        )
        .await?;

    Ok(())
}

/// `ended`: the fork service reporting a dispatched job's outcome. Exit 0
/// writes the parsed stdout object as the owning task's outputs at the
/// job's color and acks `success`; anything else acks `failure`.
async fn handle_ended(
    state: &AppState,
    method_row: &ptero_storage::NodeRow,
    request: JobEndedRequest,
) -> Result<(), ApiError> {
    let job_row = state
        .db
        .get_job(method_row.id, &request.job_id)
        .await?
        .ok_or_else(|| ptero_core::Error::no_such("job", &request.job_id))?;
    let response_link_rows = state.db.list_response_links(method_row.id, &request.job_id).await?;

    let job = Job {
        node_id: job_row.node_id,
        method_name: job_row.method_name,
        color: job_row.color,
        job_id: job_row.job_id,
        stdin: job_row.stdin,
        response_links: response_link_rows
            .into_iter()
            .map(|r| ResponseLink { name: r.name, url: r.url })
            .collect(),
    };

    let outcome = dispatch::handle_ended(request.exit_code, request.stdout.as_deref())?;

    if outcome.response_link == "success" {
        let task_id = method_row
            .parent_id
            .ok_or_else(|| ptero_core::Error::UpdateError(format!("method {} has no parent task", method_row.id)))?;
        for (property, value) in outcome.outputs {
            state.db.put_output(task_id, &property, job.color, value).await?;
        }
    }

    if let Some(link) = job.response_link(outcome.response_link) {
        state.petri.ack(&link.url).await?;
    }

    Ok(())
}
