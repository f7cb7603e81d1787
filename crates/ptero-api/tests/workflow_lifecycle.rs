// Integration tests against a running instance.
// Run with: cargo test -p ptero-api --test workflow_lifecycle -- --ignored --test-threads=1
// Requires: ptero-api listening on API_BASE_URL, migrations applied, DATABASE_URL set.
// The Petri engine and fork service don't need to be reachable for these —
// workflow submission to them happens on a spawned task after the HTTP
// response is sent, so these only exercise persistence and the report
// routes.

use ptero_contracts::{
    CreateWorkflowRequest, CreateWorkflowResponse, LinkRequest, MethodRequest,
    NamedMethodRequest, TaskRequest, WorkflowExecutionsReport, WorkflowResponse,
    WorkflowSkeletonReport, WorkflowStatusDto, WorkflowStatusReport,
};
use serde_json::json;

const API_BASE_URL: &str = "http://localhost:9100";

fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn test_create_get_and_cancel_workflow() {
    let client = reqwest::Client::new();
    let name = unique_name("lifecycle");

    let req = CreateWorkflowRequest {
        name: name.clone(),
        tasks: vec![TaskRequest {
            name: "greet".to_string(),
            parallel_by: None,
            methods: vec![NamedMethodRequest {
                name: "say-hello".to_string(),
                method: MethodRequest::ShellCommand {
                    command_line: vec!["echo".to_string(), "hello".to_string()],
                },
            }],
        }],
        links: vec![],
        inputs: Default::default(),
        webhooks: vec![],
    };

    let create_response = client
        .post(format!("{API_BASE_URL}/v1/workflows"))
        .json(&req)
        .send()
        .await
        .expect("failed to create workflow");
    assert_eq!(create_response.status(), 201);

    let created: CreateWorkflowResponse = create_response
        .json()
        .await
        .expect("failed to parse create response");
    assert_eq!(created.name, name);
    assert_eq!(created.status, WorkflowStatusDto::New);

    let get_response = client
        .get(format!("{API_BASE_URL}/v1/workflows/{}", created.id))
        .send()
        .await
        .expect("failed to fetch workflow");
    assert_eq!(get_response.status(), 200);
    let fetched: WorkflowResponse = get_response.json().await.expect("failed to parse workflow");
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.status, WorkflowStatusDto::New);

    let skeleton_response = client
        .get(format!(
            "{API_BASE_URL}/v1/reports/workflow-skeleton?workflow_id={}",
            created.id
        ))
        .send()
        .await
        .expect("failed to fetch skeleton");
    assert_eq!(skeleton_response.status(), 200);
    let skeleton: WorkflowSkeletonReport = skeleton_response
        .json()
        .await
        .expect("failed to parse skeleton");
    assert_eq!(skeleton.root.kind, "root_task");
    assert!(skeleton
        .root
        .children
        .iter()
        .any(|child| child.name == "greet"));

    let cancel_response = client
        .patch(format!("{API_BASE_URL}/v1/workflows/{}", created.id))
        .json(&json!({ "is_canceled": true }))
        .send()
        .await
        .expect("failed to cancel workflow");
    assert_eq!(cancel_response.status(), 200);
    let canceled: WorkflowResponse = cancel_response.json().await.expect("failed to parse");
    assert_eq!(canceled.status, WorkflowStatusDto::Canceled);

    let status_response = client
        .get(format!(
            "{API_BASE_URL}/v1/reports/workflow-status?workflow_id={}",
            created.id
        ))
        .send()
        .await
        .expect("failed to fetch status report");
    let status: WorkflowStatusReport = status_response.json().await.expect("failed to parse");
    assert_eq!(status.status, WorkflowStatusDto::Canceled);

    let delete_response = client
        .delete(format!("{API_BASE_URL}/v1/workflows/{}", created.id))
        .send()
        .await
        .expect("failed to delete workflow");
    assert_eq!(delete_response.status(), 200);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_name_is_rejected() {
    let client = reqwest::Client::new();
    let name = unique_name("duplicate");

    let req = CreateWorkflowRequest {
        name: name.clone(),
        tasks: vec![],
        links: vec![],
        inputs: Default::default(),
        webhooks: vec![],
    };

    let first = client
        .post(format!("{API_BASE_URL}/v1/workflows"))
        .json(&req)
        .send()
        .await
        .expect("failed to create workflow");
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{API_BASE_URL}/v1/workflows"))
        .json(&req)
        .send()
        .await
        .expect("failed to resend create workflow");
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_missing_workflow_is_404() {
    let client = reqwest::Client::new();
    let response = client
        .get(format!(
            "{API_BASE_URL}/v1/workflows/{}",
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .expect("failed to fetch missing workflow");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_invalid_link_destination_is_rejected() {
    let client = reqwest::Client::new();
    let name = unique_name("bad-link");

    let req = CreateWorkflowRequest {
        name,
        tasks: vec![TaskRequest {
            name: "only-task".to_string(),
            parallel_by: None,
            methods: vec![NamedMethodRequest {
                name: "m".to_string(),
                method: MethodRequest::ShellCommand {
                    command_line: vec!["true".to_string()],
                },
            }],
        }],
        links: vec![LinkRequest {
            source: "does-not-exist".to_string(),
            destination: "only-task".to_string(),
            data_flow: vec![],
        }],
        inputs: Default::default(),
        webhooks: vec![],
    };

    let response = client
        .post(format!("{API_BASE_URL}/v1/workflows"))
        .json(&req)
        .send()
        .await
        .expect("failed to submit workflow with a bad link");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_workflow_executions_empty_cursor_is_null() {
    let client = reqwest::Client::new();
    let name = unique_name("no-executions-yet");

    let req = CreateWorkflowRequest {
        name,
        tasks: vec![],
        links: vec![],
        inputs: Default::default(),
        webhooks: vec![],
    };
    let created: CreateWorkflowResponse = client
        .post(format!("{API_BASE_URL}/v1/workflows"))
        .json(&req)
        .send()
        .await
        .expect("failed to create workflow")
        .json()
        .await
        .expect("failed to parse create response");

    let executions_response = client
        .get(format!(
            "{API_BASE_URL}/v1/reports/workflow-executions?workflow_id={}",
            created.id
        ))
        .send()
        .await
        .expect("failed to fetch executions report");
    assert_eq!(executions_response.status(), 200);
    let report: WorkflowExecutionsReport = executions_response
        .json()
        .await
        .expect("failed to parse executions report");
    assert!(report.executions.is_empty());
    assert!(report.update_url.is_none());
}
