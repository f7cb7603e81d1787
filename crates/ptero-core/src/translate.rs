//! Workflow → Petri-net translation.
//!
//! Each node contributes a handful of places and transitions; wiring them
//! together by shared place names is what lets the external Petri engine
//! drive the whole graph without knowing anything about tasks, methods,
//! or colors. The per-task shape mirrors `TaskPetriMixin.get_petri_transitions`
//! in `task.py`: input-dep, split (parallel-by only), action (method
//! fall-through), join (parallel-by only), output-dep, in that order.
//! Parallel-by wiring mirrors `ParallelPetriMixin` in `parallel.py`; the
//! nested-DAG and connector wiring mirrors `ModelOperation`/
//! `InputConnectorOperation`/`OutputConnectorOperation` in `operation.py`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::naming;
use crate::node::{Graph, MethodSpec, Node, NodeId, NodeKind};

/// What a transition does beyond moving tokens: either nothing (a pure
/// synchronization point) or a notification back to this service, which
/// answers asynchronously by depositing a token in one of `response_places`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Calls back to `url`; the handler resolves the event against stored
    /// state and acks into the place named under the matching outcome key.
    Notify {
        url: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
        response_places: BTreeMap<String, String>,
    },
    /// Deposits one token per color in a previously created group.
    Split,
    /// Fires once every color in a group has reported a terminal status.
    Join,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PetriProgram {
    pub transitions: Vec<Transition>,
}

impl PetriProgram {
    fn push(
        &mut self,
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        action: Option<Action>,
    ) {
        self.transitions.push(Transition {
            name: name.into(),
            inputs,
            outputs,
            action,
        });
    }
}

fn notify_url(self_base_url: &str, node_id: NodeId, event: &str) -> String {
    format!("{self_base_url}/v1/callbacks/nodes/{node_id}/events/{event}")
}

fn method_notify_url(self_base_url: &str, method_id: NodeId, event: &str) -> String {
    format!("{self_base_url}/v1/callbacks/methods/{method_id}/events/{event}")
}

/// Translates every task reachable from `root` into `program`, recursing
/// into nested DAG methods. `self_base_url` is this service's own
/// externally reachable address, used to build notify callback URLs
/// (`PTERO_WORKFLOW_HOST`/`PTERO_WORKFLOW_PORT` at the API layer).
pub fn translate(graph: &Graph, root: NodeId, self_base_url: &str) -> PetriProgram {
    let mut program = PetriProgram::default();
    let root_node = graph
        .node(root)
        .expect("translate called with an id not present in the graph");
    emit_task(graph, root_node, self_base_url, &mut program);
    program
}

fn emit_task(graph: &Graph, task: &Node, base: &str, program: &mut PetriProgram) {
    let tname = task.unique_name();
    let ready = naming::ready_place(&tname);
    let success = naming::success_place(&tname);
    let task_failure = naming::task_failure_place(&tname);

    attach_input_deps(graph, task, &tname, &ready, program);

    let parallel_by = task.kind.parallel_by().map(str::to_string);
    let action_source = if let Some(ref by) = parallel_by {
        attach_split(task, &tname, &ready, by, base, program)
    } else {
        ready.clone()
    };

    attach_action(graph, task, base, &action_source, &success, &task_failure, program);

    let joined_success = if parallel_by.is_some() {
        attach_join(&tname, &success, program)
    } else {
        success.clone()
    };

    attach_output_deps(graph, task, &tname, &joined_success, program);

    for method in graph.methods_of(task.id) {
        if let NodeKind::Method(MethodSpec::Dag) = &method.kind {
            emit_dag_method(graph, task, method, base, program);
        }
    }
}

/// `inputs = [success-for(upstream, self) for upstream in input_nodes]`,
/// `outputs = [ready]`. An empty `input_nodes` list (the root task, or any
/// task with no incoming data-flow links) yields a transition with no
/// inputs, which fires immediately — the task becomes ready with nothing
/// to wait on.
fn attach_input_deps(
    graph: &Graph,
    task: &Node,
    tname: &str,
    ready: &str,
    program: &mut PetriProgram,
) {
    let inputs: Vec<String> = graph
        .input_nodes(task.id)
        .into_iter()
        .filter_map(|upstream_id| graph.node(upstream_id))
        .map(|upstream| naming::success_place_for(&upstream.unique_name(), tname))
        .collect();

    program.push(format!("{tname}-input-dep"), inputs, vec![ready.to_string()], None);
}

/// The four-transition split sequence from `ParallelPetriMixin._attach_split`:
/// `ready` fires a `get_split_size` notify to this node's callback URL; our
/// ack lands in `split_size_place`. That in turn fires a `color_group_created`
/// notify — same node, different event — whose ack (after we allocate the
/// `ColorGroup` row) lands in `cg_created`. Finally one token per allocated
/// color is deposited into `split_place`, which becomes the action phase's
/// entry point. Both notifies target `…/callbacks/nodes/<id>/events/<event>`
/// per §4.3's URL shape table, not an ad hoc endpoint.
fn attach_split(
    task: &Node,
    tname: &str,
    ready: &str,
    parallel_by: &str,
    base_url: &str,
    program: &mut PetriProgram,
) -> String {
    let split_size_wait = naming::split_size_wait_place(tname);
    let split_size = naming::split_size_place(tname);
    let create_cg = naming::create_color_group_place(tname);
    let cg_ack = format!("{create_cg}-ack");
    let cg_created = naming::color_group_created_place(tname);
    let split = naming::split_place(tname);

    program.push(
        format!("{tname}-request-split-size"),
        vec![ready.to_string()],
        vec![split_size_wait.clone()],
        Some(Action::Notify {
            url: format!(
                "{}?property={parallel_by}",
                notify_url(base_url, task.id, "get_split_size")
            ),
            response_places: BTreeMap::from([("size".to_string(), split_size.clone())]),
        }),
    );
    program.push(
        format!("{tname}-request-color-group"),
        vec![split_size_wait, split_size],
        vec![create_cg.clone()],
        Some(Action::Notify {
            url: notify_url(base_url, task.id, "color_group_created"),
            response_places: BTreeMap::from([("created".to_string(), cg_ack.clone())]),
        }),
    );
    program.push(
        format!("{tname}-color-group-created"),
        vec![create_cg, cg_ack],
        vec![cg_created.clone()],
        None,
    );
    program.push(
        format!("{tname}-split"),
        vec![cg_created],
        vec![split.clone()],
        Some(Action::Split),
    );

    split
}

/// `ParallelPetriMixin._attach_join`: a single barrier transition that
/// fires once every color allocated by the split has reported a terminal
/// status, producing the task's externally visible success token.
fn attach_join(tname: &str, per_color_success: &str, program: &mut PetriProgram) -> String {
    let joined = naming::joined_place(tname);
    program.push(
        format!("{tname}-join"),
        vec![per_color_success.to_string()],
        vec![joined.clone()],
        Some(Action::Join),
    );
    joined
}

/// Walks `method_list` in declared order. Each method's failure place
/// feeds the next method's ready place; the final method's failure place
/// feeds an explicit `task-failure` place with no further transition
/// (an Open Question in the source material — see DESIGN.md). Every
/// method's success place feeds the task's shared success place.
fn attach_action(
    graph: &Graph,
    task: &Node,
    base: &str,
    entry: &str,
    task_success: &str,
    task_failure: &str,
    program: &mut PetriProgram,
) {
    let methods = graph.methods_of(task.id);
    let mut next_input = entry.to_string();

    for method in &methods {
        let (success, failure) = match &method.kind {
            NodeKind::Method(MethodSpec::ShellCommand { .. }) => {
                attach_shell_command_method(task, method, base, &next_input, program)
            }
            NodeKind::Method(MethodSpec::Dag) => {
                attach_dag_method(graph, task, method, base, &next_input, program)
            }
            _ => unreachable!("methods_of only returns Method nodes"),
        };

        program.push(
            format!("{}-into-task-success", method.unique_name()),
            vec![success],
            vec![task_success.to_string()],
            None,
        );
        next_input = failure;
    }

    program.push(
        format!("{}-exhausted", task.unique_name()),
        vec![next_input],
        vec![task_failure.to_string()],
        None,
    );
}

/// `ready -> response-wait` (notify-execute), then `[response-wait,
/// callback-success] -> method-success` and `[response-wait,
/// callback-failure] -> method-failure`. Two response-callback places
/// rather than the source's single one, so a success and a failure ack
/// can never be confused for the same token.
fn attach_shell_command_method(
    task: &Node,
    method: &Node,
    base: &str,
    entry: &str,
    program: &mut PetriProgram,
) -> (String, String) {
    let mname = method.unique_name();
    let response_wait = naming::response_wait_place(&mname);
    let cb_success = naming::response_callback_place(&mname, "success");
    let cb_failure = naming::response_callback_place(&mname, "failure");
    let method_success = naming::method_place(&task.unique_name(), &method.name, "success");
    let method_failure = naming::method_place(&task.unique_name(), &method.name, "failure");

    program.push(
        format!("{mname}-execute"),
        vec![entry.to_string()],
        vec![response_wait.clone()],
        Some(Action::Notify {
            url: method_notify_url(base, method.id, "execute"),
            response_places: BTreeMap::from([
                ("success".to_string(), cb_success.clone()),
                ("failure".to_string(), cb_failure.clone()),
            ]),
        }),
    );
    program.push(
        format!("{mname}-succeeded"),
        vec![response_wait.clone(), cb_success],
        vec![method_success.clone()],
        None,
    );
    program.push(
        format!("{mname}-failed"),
        vec![response_wait, cb_failure],
        vec![method_failure.clone()],
        None,
    );

    (method_success, method_failure)
}

/// A DAG method's `ready` bridges directly into its own InputConnector's
/// success (so the connector's consumers fire with no extra hop), and a
/// barrier over every real child's success-for-parent token produces the
/// method's own success. The method's failure place is a dead end: a DAG
/// method has no way to fail except by never reaching the barrier.
fn attach_dag_method(
    graph: &Graph,
    task: &Node,
    method: &Node,
    base: &str,
    entry: &str,
    program: &mut PetriProgram,
) -> (String, String) {
    emit_dag_method(graph, task, method, base, program);

    let mname = method.unique_name();
    let method_success = naming::method_place(&task.unique_name(), &method.name, "success");
    let method_failure = naming::method_place(&task.unique_name(), &method.name, "failure");

    if let Some(ic) = graph.input_connector_of(method.id) {
        let ic_success = naming::success_place(&ic.unique_name());
        program.push(
            format!("{mname}-ready-into-input-connector"),
            vec![entry.to_string()],
            vec![ic_success],
            None,
        );
    }

    let real_children = graph.real_children(method.id);
    let barrier_inputs: Vec<String> = real_children
        .iter()
        .map(|child| naming::success_place_for(&child.unique_name(), &mname))
        .collect();

    program.push(
        format!("{mname}-barrier"),
        barrier_inputs,
        vec![method_success.clone()],
        Some(Action::Notify {
            url: method_notify_url(base, method.id, "done"),
            response_places: BTreeMap::new(),
        }),
    );

    (method_success, method_failure)
}

/// Recurses translation into a DAG method's nested subgraph. The
/// InputConnector and OutputConnector are pure data-resolution proxies —
/// see `resolve` module — and contribute no transitions of their own, so
/// only the real task children need emitting here.
fn emit_dag_method(graph: &Graph, _parent_task: &Node, method: &Node, base: &str, program: &mut PetriProgram) {
    for child in graph.real_children(method.id) {
        emit_task(graph, child, base, program);
    }
}

/// `output-dep`: the task's (possibly join-aggregated) success place feeds
/// one success-for-pair token per declared consumer, plus one for the
/// parent so a nested DAG's barrier can observe it.
fn attach_output_deps(
    graph: &Graph,
    task: &Node,
    tname: &str,
    success: &str,
    program: &mut PetriProgram,
) {
    let mut outputs: Vec<String> = graph
        .output_nodes(task.id)
        .into_iter()
        .filter_map(|downstream_id| graph.node(downstream_id))
        .map(|downstream| naming::success_place_for(tname, &downstream.unique_name()))
        .collect();

    if let Some(parent_id) = task.parent_id {
        if let Some(parent) = graph.node(parent_id) {
            if parent.kind.is_method() {
                outputs.push(naming::success_place_for(tname, &parent.unique_name()));
            }
        }
    }

    if outputs.is_empty() {
        return;
    }

    program.push(format!("{tname}-output-dep"), vec![success.to_string()], outputs, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Link, NodeStatus};
    use uuid::Uuid;

    fn task(id: NodeId, workflow: NodeId, parent: Option<NodeId>, name: &str, index: i64) -> Node {
        Node {
            id,
            workflow_id: workflow,
            parent_id: parent,
            name: name.to_string(),
            kind: NodeKind::Task { parallel_by: None },
            index,
            status: NodeStatus::New,
        }
    }

    fn shell_method(id: NodeId, parent: NodeId, workflow: NodeId, name: &str, index: i64) -> Node {
        Node {
            id,
            workflow_id: workflow,
            parent_id: Some(parent),
            name: name.to_string(),
            kind: NodeKind::Method(MethodSpec::ShellCommand {
                command_line: vec!["true".to_string()],
            }),
            index,
            status: NodeStatus::New,
        }
    }

    #[test]
    fn single_task_with_one_method_translates_without_panicking() {
        let workflow = Uuid::new_v4();
        let t = Uuid::new_v4();
        let m = Uuid::new_v4();

        let root = task(t, workflow, None, "root", 0);
        let method = shell_method(m, t, workflow, "run", 0);
        let graph = Graph::new(vec![root, method], vec![]);

        let program = translate(&graph, t, "http://localhost:80");
        assert!(!program.transitions.is_empty());
        assert!(program
            .transitions
            .iter()
            .any(|tr| tr.name.ends_with("-exhausted")));
    }

    #[test]
    fn linked_tasks_share_a_success_for_place() {
        let workflow = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ma = Uuid::new_v4();
        let mb = Uuid::new_v4();

        let task_a = task(a, workflow, None, "a", 0);
        let task_b = task(b, workflow, None, "b", 1);
        let method_a = shell_method(ma, a, workflow, "run", 0);
        let method_b = shell_method(mb, b, workflow, "run", 0);
        let link = Link {
            id: Uuid::new_v4(),
            workflow_id: workflow,
            source_id: a,
            destination_id: b,
            entries: vec![],
        };

        let graph = Graph::new(
            vec![task_a, task_b, method_a, method_b],
            vec![link],
        );

        let program_a = translate(&graph, a, "http://localhost:80");
        let a_name = graph.node(a).unwrap().unique_name();
        let b_name = graph.node(b).unwrap().unique_name();
        let expected = naming::success_place_for(&a_name, &b_name);

        let produces = program_a
            .transitions
            .iter()
            .any(|tr| tr.outputs.contains(&expected));
        assert!(produces, "task a's output-dep should produce a success-for-b place");
    }
}
