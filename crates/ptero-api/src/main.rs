//! HTTP entry point for the workflow orchestration core: binds the
//! workflow lifecycle, report, and Petri/fork callback routers onto one
//! `AppState`, wires tracing and the OpenAPI doc, and listens on
//! `PTERO_WORKFLOW_HOST`/`PTERO_WORKFLOW_PORT` (default `0.0.0.0:80`).

mod callbacks;
mod config;
mod error;
mod reports;
mod state;
mod timestamp;
mod workflows;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use ptero_clients::{ClientsConfig, ForkClient, PetriClient, WebhookClient};
use ptero_storage::Database;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ApiConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        workflows::create_workflow,
        workflows::get_workflow,
        workflows::get_workflow_by_name,
        workflows::patch_workflow,
        workflows::delete_workflow,
        reports::workflow_status,
        reports::workflow_skeleton,
        reports::workflow_details,
        reports::workflow_outputs,
        reports::workflow_executions,
        callbacks::node_event,
        callbacks::method_event,
    ),
    components(schemas(
        ptero_contracts::MethodRequest,
        ptero_contracts::TaskRequest,
        ptero_contracts::NamedMethodRequest,
        ptero_contracts::DataFlowEntryRequest,
        ptero_contracts::LinkRequest,
        ptero_contracts::WebhookRequest,
        ptero_contracts::CreateWorkflowRequest,
        ptero_contracts::PatchWorkflowRequest,
        ptero_contracts::WorkflowStatusDto,
        ptero_contracts::WorkflowResponse,
        ptero_contracts::ReportLinks,
        ptero_contracts::CreateWorkflowResponse,
        ptero_contracts::WorkflowStatusReport,
        ptero_contracts::NodeSkeletonDto,
        ptero_contracts::WorkflowSkeletonReport,
        ptero_contracts::NodeDetailsDto,
        ptero_contracts::WorkflowDetailsReport,
        ptero_contracts::WorkflowOutputsReport,
        ptero_contracts::StatusDto,
        ptero_contracts::StatusEventDto,
        ptero_contracts::ExecutionDto,
        ptero_contracts::WorkflowExecutionsReport,
        ptero_contracts::NodeEventPayload,
        ptero_contracts::JobEndedRequest,
        ptero_contracts::SplitSizeAck,
        ptero_contracts::ColorGroupCreatedAck,
        ptero_contracts::CallbackAck,
    )),
    tags(
        (name = "workflows", description = "Workflow lifecycle: create, fetch, cancel, delete"),
        (name = "reports", description = "Read-only workflow/task/execution status reports"),
        (name = "callbacks", description = "Inbound events from the Petri engine and the job executor"),
    ),
    info(
        title = "Ptero Workflow API",
        version = "0.2.0",
        description = "Orchestration core for a distributed workflow execution service",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(workflows::routes(state.clone()))
        .merge(reports::routes(state.clone()))
        .merge(callbacks::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ptero_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_config = ApiConfig::from_env()?;
    let clients_config = ClientsConfig::from_env();

    tracing::info!(
        petri = %clients_config.petri_base_url(),
        fork = %clients_config.fork_base_url(),
        "ptero-api starting"
    );

    let db = Database::from_url(&api_config.database_url)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;
    tracing::info!("connected to database and applied migrations");

    let state = AppState {
        db: Arc::new(db),
        petri: PetriClient::new(clients_config.petri_base_url()),
        fork: ForkClient::new(clients_config.fork_base_url()),
        webhook: WebhookClient::new(),
        self_base_url: clients_config.self_base_url(),
    };

    let app = build_router(state);

    let addr = api_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
