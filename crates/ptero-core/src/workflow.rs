//! Workflow aggregate: the submitted graph plus the scaffolding every
//! workflow gets wrapped in before translation.
//!
//! Grounded in `backend.py`'s `_save_workflow`: a submitted workflow's
//! tasks/links become the real children of a single synthetic root Task
//! whose one method is a `Dag`, bracketed by an `InputHolder` (the
//! caller-supplied inputs) and an `InputConnector`/`OutputConnector` pair.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::node::{Graph, Link, MethodSpec, Node, NodeId, NodeKind, NodeStatus, WorkflowId};

#[derive(Debug, Clone)]
pub struct TaskSubmission {
    pub name: String,
    pub methods: Vec<MethodSubmission>,
    pub parallel_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MethodSubmission {
    pub name: String,
    pub spec: MethodSpec,
}

#[derive(Debug, Clone)]
pub struct LinkSubmission {
    pub source: String,
    pub destination: String,
    pub entries: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct WorkflowSubmission {
    pub name: String,
    pub tasks: Vec<TaskSubmission>,
    pub links: Vec<LinkSubmission>,
    pub inputs: Map<String, Value>,
}

/// The "input connector" / "output connector" sentinel names a link may
/// reference instead of a real task name, per `backend.py`'s treatment of
/// `source == 'input connector'` / `destination == 'output connector'`.
const INPUT_CONNECTOR: &str = "input connector";
const OUTPUT_CONNECTOR: &str = "output connector";

/// Builds the full node/link graph for a newly submitted workflow:
/// `RootTask -> Method(Dag) -> { InputHolder, InputConnector,
/// OutputConnector, <submitted tasks> }`, validates required inputs, and
/// returns the assembled `Graph` together with the root task's id.
pub fn build_workflow_graph(
    workflow_id: WorkflowId,
    submission: &WorkflowSubmission,
) -> Result<(Graph, NodeId)> {
    let mut nodes = Vec::new();
    let mut links = Vec::new();

    let root_task_id = Uuid::new_v4();
    nodes.push(Node {
        id: root_task_id,
        workflow_id,
        parent_id: None,
        name: "root".to_string(),
        kind: NodeKind::RootTask,
        index: 0,
        status: NodeStatus::New,
    });

    let root_method_id = Uuid::new_v4();
    nodes.push(Node {
        id: root_method_id,
        workflow_id,
        parent_id: Some(root_task_id),
        name: "root".to_string(),
        kind: NodeKind::Method(MethodSpec::Dag),
        index: 0,
        status: NodeStatus::New,
    });

    let input_holder_id = Uuid::new_v4();
    nodes.push(Node {
        id: input_holder_id,
        workflow_id,
        parent_id: Some(root_method_id),
        name: "input holder".to_string(),
        kind: NodeKind::InputHolder,
        index: 0,
        status: NodeStatus::New,
    });

    let input_connector_id = Uuid::new_v4();
    nodes.push(Node {
        id: input_connector_id,
        workflow_id,
        parent_id: Some(root_method_id),
        name: INPUT_CONNECTOR.to_string(),
        kind: NodeKind::InputConnector,
        index: 1,
        status: NodeStatus::New,
    });

    let output_connector_id = Uuid::new_v4();
    nodes.push(Node {
        id: output_connector_id,
        workflow_id,
        parent_id: Some(root_method_id),
        name: OUTPUT_CONNECTOR.to_string(),
        kind: NodeKind::OutputConnector,
        index: 2,
        status: NodeStatus::New,
    });

    let mut name_to_id = std::collections::HashMap::new();
    name_to_id.insert(INPUT_CONNECTOR.to_string(), input_connector_id);
    name_to_id.insert(OUTPUT_CONNECTOR.to_string(), output_connector_id);

    for (i, task) in submission.tasks.iter().enumerate() {
        let task_id = Uuid::new_v4();
        nodes.push(Node {
            id: task_id,
            workflow_id,
            parent_id: Some(root_method_id),
            name: task.name.clone(),
            kind: NodeKind::Task {
                parallel_by: task.parallel_by.clone(),
            },
            index: (i + 3) as i64,
            status: NodeStatus::New,
        });
        name_to_id.insert(task.name.clone(), task_id);

        for (j, method) in task.methods.iter().enumerate() {
            nodes.push(Node {
                id: Uuid::new_v4(),
                workflow_id,
                parent_id: Some(task_id),
                name: method.name.clone(),
                kind: NodeKind::Method(method.spec.clone()),
                index: j as i64,
                status: NodeStatus::New,
            });
        }
    }

    for link in &submission.links {
        let source_id = if link.source == INPUT_CONNECTOR {
            input_connector_id
        } else {
            *name_to_id.get(&link.source).ok_or_else(|| {
                Error::InvalidLinks(vec![(link.source.clone(), link.destination.clone())])
            })?
        };
        let destination_id = if link.destination == OUTPUT_CONNECTOR {
            output_connector_id
        } else {
            *name_to_id.get(&link.destination).ok_or_else(|| {
                Error::InvalidLinks(vec![(link.source.clone(), link.destination.clone())])
            })?
        };

        links.push(Link {
            id: Uuid::new_v4(),
            workflow_id,
            source_id,
            destination_id,
            entries: link
                .entries
                .iter()
                .map(|(s, d)| crate::node::DataFlowEntry {
                    source_property: s.clone(),
                    destination_property: d.clone(),
                })
                .collect(),
        });
    }

    crate::node::validate_unique_links(&links).map_err(Error::InvalidLinks)?;

    let graph = Graph::new(nodes, links);
    ensure_required_inputs(&graph, submission, input_connector_id)?;

    Ok((graph, root_task_id))
}

/// `_ensure_required_inputs`: every link whose source is the input
/// connector names a required input property; any not present in the
/// submitted inputs map is reported together.
fn ensure_required_inputs(
    graph: &Graph,
    submission: &WorkflowSubmission,
    input_connector_id: NodeId,
) -> Result<()> {
    let mut missing = Vec::new();
    for link in graph.links() {
        if link.source_id != input_connector_id {
            continue;
        }
        for entry in &link.entries {
            if !submission.inputs.contains_key(&entry.source_property) {
                missing.push(entry.source_property.clone());
            }
        }
    }
    missing.sort();
    missing.dedup();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingInputs(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> WorkflowSubmission {
        let mut inputs = Map::new();
        inputs.insert("greeting".to_string(), Value::String("hi".to_string()));
        WorkflowSubmission {
            name: "wf".to_string(),
            tasks: vec![TaskSubmission {
                name: "say".to_string(),
                methods: vec![MethodSubmission {
                    name: "run".to_string(),
                    spec: MethodSpec::ShellCommand {
                        command_line: vec!["echo".to_string()],
                    },
                }],
                parallel_by: None,
            }],
            links: vec![LinkSubmission {
                source: INPUT_CONNECTOR.to_string(),
                destination: "say".to_string(),
                entries: vec![("greeting".to_string(), "text".to_string())],
            }],
            inputs,
        }
    }

    #[test]
    fn builds_root_wrapped_graph() {
        let (graph, root) = build_workflow_graph(Uuid::new_v4(), &submission()).unwrap();
        assert!(matches!(graph.node(root).unwrap().kind, NodeKind::RootTask));
        let methods = graph.methods_of(root);
        assert_eq!(methods.len(), 1);
        assert!(matches!(methods[0].kind, NodeKind::Method(MethodSpec::Dag)));
    }

    #[test]
    fn missing_input_is_rejected() {
        let mut sub = submission();
        sub.inputs.clear();
        let err = build_workflow_graph(Uuid::new_v4(), &sub).unwrap_err();
        assert!(matches!(err, Error::MissingInputs(ref m) if m == &vec!["greeting".to_string()]));
    }

    #[test]
    fn unknown_link_endpoint_is_rejected() {
        let mut sub = submission();
        sub.links[0].destination = "does not exist".to_string();
        assert!(build_workflow_graph(Uuid::new_v4(), &sub).is_err());
    }
}
