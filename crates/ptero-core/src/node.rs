//! The polymorphic node graph.
//!
//! The source models this as class inheritance keyed by a discriminator
//! column; here it is a tagged sum (`NodeKind`) dispatched through plain
//! matches rather than a class hierarchy, with parent/child relationships
//! expressed as stored ids rather than owning references (see
//! `Graph::children`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NodeId = Uuid;
pub type WorkflowId = Uuid;
pub type LinkId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    New,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Errored,
}

/// A strategy attached to a Task. ShellCommand runs an external command
/// line; Dag nests a subgraph of its own Tasks behind an InputConnector/
/// OutputConnector boundary, recursively translated and executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MethodSpec {
    ShellCommand { command_line: Vec<String> },
    Dag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Distinguished Task whose parent is the workflow itself.
    RootTask,
    Task {
        #[serde(skip_serializing_if = "Option::is_none")]
        parallel_by: Option<String>,
    },
    Method(MethodSpec),
    InputConnector,
    OutputConnector,
    InputHolder,
}

impl NodeKind {
    pub fn is_task_like(&self) -> bool {
        matches!(self, NodeKind::RootTask | NodeKind::Task { .. })
    }

    pub fn is_method(&self) -> bool {
        matches!(self, NodeKind::Method(_))
    }

    pub fn parallel_by(&self) -> Option<&str> {
        match self {
            NodeKind::Task {
                parallel_by: Some(p),
            } => Some(p.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub workflow_id: WorkflowId,
    pub parent_id: Option<NodeId>,
    /// Unique among siblings.
    pub name: String,
    pub kind: NodeKind,
    /// Position among siblings: child ordering for a DAG, method ordering
    /// for a Task's method_list. Recovered explicitly rather than relying
    /// on an ordered attribute-keyed collection.
    pub index: i64,
    pub status: NodeStatus,
}

impl Node {
    pub fn unique_name(&self) -> String {
        crate::naming::unique_name(self.id, &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowEntry {
    pub source_property: String,
    pub destination_property: String,
}

/// Directed edge from a source node to a destination node carrying a set
/// of data-flow entries. Valid iff every (destination, destination_property)
/// appears at most once across all incoming links of that destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub workflow_id: WorkflowId,
    pub source_id: NodeId,
    pub destination_id: NodeId,
    pub entries: Vec<DataFlowEntry>,
}

/// Validates that no (destination, destination_property) pair is targeted
/// by more than one link's entries; returns the offending pairs so the
/// caller can build a precise `Error::InvalidLinks`.
pub fn validate_unique_links(links: &[Link]) -> Result<(), Vec<(String, String)>> {
    use std::collections::HashMap;

    let mut seen: HashMap<(NodeId, String), usize> = HashMap::new();
    let mut dupes = Vec::new();
    for link in links {
        for entry in &link.entries {
            let key = (link.destination_id, entry.destination_property.clone());
            let count = seen.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == 2 {
                dupes.push((link.destination_id.to_string(), key.1));
            }
        }
    }

    if dupes.is_empty() {
        Ok(())
    } else {
        Err(dupes)
    }
}

/// A flat view over one workflow's nodes and links. Replaces the source's
/// bidirectional owning references (parent, source_task) with stored ids
/// resolved through lookups here; the parent relation is a forest and the
/// link relation is a DAG by construction (never cyclic — a node can only
/// reference ids created strictly before it during submission).
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Every node in the workflow, in the order they were assembled —
    /// parents always precede children, which is what lets the storage
    /// layer insert them in one pass without violating the `parent_id`
    /// foreign key.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Children ordered by `index`, ascending — the order translation and
    /// method fall-through must walk to stay byte-stable.
    pub fn children(&self, parent: NodeId) -> Vec<&Node> {
        let mut kids: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|n| n.parent_id == Some(parent))
            .collect();
        kids.sort_by_key(|n| n.index);
        kids
    }

    pub fn methods_of(&self, task_id: NodeId) -> Vec<&Node> {
        self.children(task_id)
            .into_iter()
            .filter(|n| n.kind.is_method())
            .collect()
    }

    pub fn real_children(&self, dag_node_id: NodeId) -> Vec<&Node> {
        self.children(dag_node_id)
            .into_iter()
            .filter(|n| n.kind.is_task_like())
            .collect()
    }

    pub fn input_connector_of(&self, parent: NodeId) -> Option<&Node> {
        self.children(parent)
            .into_iter()
            .find(|n| matches!(n.kind, NodeKind::InputConnector))
    }

    pub fn output_connector_of(&self, parent: NodeId) -> Option<&Node> {
        self.children(parent)
            .into_iter()
            .find(|n| matches!(n.kind, NodeKind::OutputConnector))
    }

    /// Distinct upstream node ids linked into `dest`, in link-id order.
    pub fn input_nodes(&self, dest: NodeId) -> Vec<NodeId> {
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for link in self.links.iter().filter(|l| l.destination_id == dest) {
            if seen.insert(link.source_id) {
                out.push(link.source_id);
            }
        }
        out
    }

    /// Distinct downstream node ids linked out of `src`, in link-id order.
    pub fn output_nodes(&self, src: NodeId) -> Vec<NodeId> {
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for link in self.links.iter().filter(|l| l.source_id == src) {
            if seen.insert(link.destination_id) {
                out.push(link.destination_id);
            }
        }
        out
    }

    pub fn links_into(&self, dest: NodeId) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|l| l.destination_id == dest)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(dest: NodeId, entries: Vec<(&str, &str)>) -> Link {
        Link {
            id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            destination_id: dest,
            entries: entries
                .into_iter()
                .map(|(s, d)| DataFlowEntry {
                    source_property: s.into(),
                    destination_property: d.into(),
                })
                .collect(),
        }
    }

    #[test]
    fn duplicate_destination_property_is_rejected() {
        let dest = Uuid::new_v4();
        let links = vec![link(dest, vec![("a", "x")]), link(dest, vec![("b", "x")])];
        let err = validate_unique_links(&links).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].1, "x");
    }

    #[test]
    fn distinct_destination_properties_are_fine() {
        let dest = Uuid::new_v4();
        let links = vec![link(dest, vec![("a", "x")]), link(dest, vec![("b", "y")])];
        assert!(validate_unique_links(&links).is_ok());
    }
}
