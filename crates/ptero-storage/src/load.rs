//! Reconstructs `ptero-core` domain types from persisted rows. Callback
//! handlers need a full `Graph`/`ColorStore`/`OutputStore` in memory to run
//! the pure resolution logic in `ptero_core::resolve`/`dispatch`; this is
//! the one place that bridges row shapes back to those domain types.

use anyhow::{Context, Result};
use ptero_core::color::{Color, ColorGroup, ColorStore};
use ptero_core::node::{DataFlowEntry, Graph, Link, Node, NodeKind, NodeStatus};
use ptero_core::output::{Output, OutputStore};
use uuid::Uuid;

use crate::models::{ColorGroupRow, LinkRow, NodeRow, OutputRow};
use crate::Database;

fn node_status_from_str(status: &str) -> Result<NodeStatus> {
    match status {
        "new" => Ok(NodeStatus::New),
        "running" => Ok(NodeStatus::Running),
        "succeeded" => Ok(NodeStatus::Succeeded),
        "failed" => Ok(NodeStatus::Failed),
        "canceled" => Ok(NodeStatus::Canceled),
        "errored" => Ok(NodeStatus::Errored),
        other => anyhow::bail!("unrecognized node status {other:?}"),
    }
}

fn node_from_row(row: NodeRow) -> Result<Node> {
    let kind: NodeKind = serde_json::from_value(row.kind)
        .with_context(|| format!("node {} has unparseable kind column", row.id))?;
    Ok(Node {
        id: row.id,
        workflow_id: row.workflow_id,
        parent_id: row.parent_id,
        name: row.name,
        kind,
        index: row.index,
        status: node_status_from_str(&row.status)?,
    })
}

async fn link_from_row(db: &Database, row: LinkRow) -> Result<Link> {
    let entries = db
        .list_data_flow_entries(row.id)
        .await?
        .into_iter()
        .map(|e| DataFlowEntry {
            source_property: e.source_property,
            destination_property: e.destination_property,
        })
        .collect();
    Ok(Link {
        id: row.id,
        workflow_id: row.workflow_id,
        source_id: row.source_id,
        destination_id: row.destination_id,
        entries,
    })
}

/// Loads every node and link of `workflow_id` into an in-memory `Graph`.
pub async fn load_graph(db: &Database, workflow_id: Uuid) -> Result<Graph> {
    let node_rows = db.list_nodes_for_workflow(workflow_id).await?;
    let nodes = node_rows
        .into_iter()
        .map(node_from_row)
        .collect::<Result<Vec<_>>>()?;

    let link_rows = db.list_links_for_workflow(workflow_id).await?;
    let mut links = Vec::with_capacity(link_rows.len());
    for row in link_rows {
        links.push(link_from_row(db, row).await?);
    }

    Ok(Graph::new(nodes, links))
}

fn color_group_from_row(row: ColorGroupRow) -> ColorGroup {
    ColorGroup {
        node_id: row.node_id,
        parent_color: row.parent_color,
        begin: row.range_begin,
        end: row.range_end,
    }
}

/// Loads every color group allocated anywhere in `workflow_id` into a
/// `ColorStore` whose next-color counter picks up where persistence left
/// off.
pub async fn load_color_store(db: &Database, workflow_id: Uuid) -> Result<ColorStore> {
    let rows = db.list_color_groups_for_workflow(workflow_id).await?;
    Ok(ColorStore::from_groups(
        rows.into_iter().map(color_group_from_row).collect(),
    ))
}

fn output_from_row(row: OutputRow) -> Output {
    Output {
        node_id: row.node_id,
        property: row.property,
        color: row.color as Color,
        value: row.value,
    }
}

/// Loads every output produced anywhere in `workflow_id` into an
/// `OutputStore`.
pub async fn load_output_store(db: &Database, workflow_id: Uuid) -> Result<OutputStore> {
    let rows = db.list_outputs_for_workflow(workflow_id).await?;
    Ok(OutputStore::from_outputs(
        rows.into_iter().map(output_from_row).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_status_rejects_unknown_strings() {
        assert!(node_status_from_str("bogus").is_err());
        assert!(node_status_from_str("succeeded").is_ok());
    }
}
