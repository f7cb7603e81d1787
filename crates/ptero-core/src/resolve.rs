//! Resolves a task's input properties against the color & output stores.
//!
//! Two paths, mirroring `_convert_output` in `parallel.py`: when the
//! destination property is the task's own `parallel_by` key, the source
//! array is read at the task's *parent* color and indexed by offset
//! within its color group; every other property is read straight off the
//! source at the resolving color.

use serde_json::{Map, Value};

use crate::color::{Color, ColorStore};
use crate::error::Result;
use crate::node::{Graph, Node, NodeId};
use crate::output::OutputStore;

/// Finds the single incoming link entry feeding `task`'s `parallel_by`
/// property, returning the upstream node id and the source property name
/// to read the split-size array from — the lookup `get_split_size`
/// performs before calling `OutputStore::split_size`.
pub fn parallel_by_source<'g>(graph: &'g Graph, task: &Node) -> Option<(NodeId, &'g str)> {
    let by = task.kind.parallel_by()?;
    graph.links_into(task.id).into_iter().find_map(|link| {
        link.entries
            .iter()
            .find(|entry| entry.destination_property == by)
            .map(|entry| (link.source_id, entry.source_property.as_str()))
    })
}

/// Resolves every data-flow entry targeting `task` from its incoming
/// links, at `color`, into a single JSON object ready to hand to a
/// `ShellCommand` invocation's stdin or a nested DAG's `InputHolder`.
pub fn resolve_task_inputs(
    graph: &Graph,
    outputs: &OutputStore,
    colors: &ColorStore,
    task: &Node,
    color: Color,
) -> Result<Map<String, Value>> {
    let mut result = Map::new();

    for link in graph.links_into(task.id) {
        let Some(source) = graph.node(link.source_id) else {
            continue;
        };
        for entry in &link.entries {
            let value = resolve_property(
                outputs,
                colors,
                source.id,
                &entry.source_property,
                task,
                &entry.destination_property,
                color,
            )?;
            result.insert(entry.destination_property.clone(), value);
        }
    }

    Ok(result)
}

fn resolve_property(
    outputs: &OutputStore,
    colors: &ColorStore,
    source_id: NodeId,
    source_property: &str,
    task: &Node,
    destination_property: &str,
    color: Color,
) -> Result<Value> {
    let is_split_source = task
        .kind
        .parallel_by()
        .map(|by| by == destination_property)
        .unwrap_or(false);

    if is_split_source {
        let group = colors.require_group_containing(task.id, color)?;
        outputs.resolve_parallel_element(source_id, source_property, group, color)
    } else {
        outputs.resolve_for_consumer(colors, source_id, source_property, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Link, NodeKind, NodeStatus};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn plain_property_resolves_at_the_same_color() {
        let workflow = Uuid::new_v4();
        let source_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let source = Node {
            id: source_id,
            workflow_id: workflow,
            parent_id: None,
            name: "source".into(),
            kind: NodeKind::Task { parallel_by: None },
            index: 0,
            status: NodeStatus::New,
        };
        let task = Node {
            id: task_id,
            workflow_id: workflow,
            parent_id: None,
            name: "sink".into(),
            kind: NodeKind::Task { parallel_by: None },
            index: 1,
            status: NodeStatus::New,
        };
        let link = Link {
            id: Uuid::new_v4(),
            workflow_id: workflow,
            source_id,
            destination_id: task_id,
            entries: vec![crate::node::DataFlowEntry {
                source_property: "greeting".into(),
                destination_property: "text".into(),
            }],
        };

        let graph = Graph::new(vec![source, task.clone()], vec![link]);
        let mut outputs = OutputStore::new();
        outputs.put(source_id, "greeting", 0, json!("hi"));
        let colors = ColorStore::new();

        let resolved = resolve_task_inputs(&graph, &outputs, &colors, &task, 0).unwrap();
        assert_eq!(resolved.get("text"), Some(&json!("hi")));
    }

    #[test]
    fn parallel_by_property_indexes_the_parent_color_array() {
        let workflow = Uuid::new_v4();
        let source_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let source = Node {
            id: source_id,
            workflow_id: workflow,
            parent_id: None,
            name: "source".into(),
            kind: NodeKind::Task { parallel_by: None },
            index: 0,
            status: NodeStatus::New,
        };
        let task = Node {
            id: task_id,
            workflow_id: workflow,
            parent_id: None,
            name: "sink".into(),
            kind: NodeKind::Task {
                parallel_by: Some("item".into()),
            },
            index: 1,
            status: NodeStatus::New,
        };
        let link = Link {
            id: Uuid::new_v4(),
            workflow_id: workflow,
            source_id,
            destination_id: task_id,
            entries: vec![crate::node::DataFlowEntry {
                source_property: "items".into(),
                destination_property: "item".into(),
            }],
        };

        let graph = Graph::new(vec![source, task.clone()], vec![link]);
        let mut outputs = OutputStore::new();
        outputs.put(source_id, "items", 0, json!(["a", "b", "c"]));
        let mut colors = ColorStore::new();
        let group = colors.allocate(task_id, 0, 3);

        let resolved =
            resolve_task_inputs(&graph, &outputs, &colors, &task, group.begin + 1).unwrap();
        assert_eq!(resolved.get("item"), Some(&json!("b")));
    }
}
