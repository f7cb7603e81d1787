//! Deterministic Petri place/transition names derived from node identity.
//!
//! Grounded in the original `Operation.unique_name` / `*_place_name`
//! properties: a node's unique name embeds its primary id so names never
//! collide across a workflow, and every place name is a pure function of
//! that unique name plus a fixed suffix.

use crate::node::NodeId;

/// `op-<id>-<name with spaces replaced by underscores>`
pub fn unique_name(id: NodeId, name: &str) -> String {
    format!("op-{id}-{}", name.replace(' ', "_"))
}

#[cfg(test)]
fn test_id(n: u128) -> NodeId {
    NodeId::from_u128(n)
}

pub fn ready_place(unique_name: &str) -> String {
    format!("{unique_name}-ready")
}

pub fn success_place(unique_name: &str) -> String {
    format!("{unique_name}-success")
}

/// One place per (node, successor) pair so multi-successor fan-out never races.
pub fn success_place_for(unique_name: &str, successor_unique_name: &str) -> String {
    format!("{unique_name}-success-for-{successor_unique_name}")
}

pub fn task_failure_place(unique_name: &str) -> String {
    format!("{unique_name}-task-failure")
}

pub fn response_wait_place(unique_name: &str) -> String {
    format!("{unique_name}-response-wait")
}

/// Named so success/failure response callbacks don't collide for one node.
pub fn response_callback_place(unique_name: &str, outcome: &str) -> String {
    format!("{unique_name}-response-callback-{outcome}")
}

pub fn split_size_wait_place(unique_name: &str) -> String {
    format!("{unique_name}-split-size-wait")
}

pub fn split_size_place(unique_name: &str) -> String {
    format!("{unique_name}-split-size")
}

pub fn create_color_group_place(unique_name: &str) -> String {
    format!("{unique_name}-create-color-group")
}

pub fn color_group_created_place(unique_name: &str) -> String {
    format!("{unique_name}-color-group-created")
}

pub fn split_place(unique_name: &str) -> String {
    format!("{unique_name}-split")
}

pub fn joined_place(unique_name: &str) -> String {
    format!("{unique_name}-joined")
}

/// `n-<method>-<kind>` with kind in {ready, success, failure}.
pub fn method_place(task_unique_name: &str, method_name: &str, kind: &str) -> String {
    format!("{task_unique_name}-{method_name}-{kind}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_name_replaces_spaces() {
        let id = test_id(7);
        assert_eq!(unique_name(id, "input connector"), format!("op-{id}-input_connector"));
    }

    #[test]
    fn places_embed_unique_name_and_are_collision_free_across_suffixes() {
        let n = unique_name(test_id(3), "A");
        let places = vec![
            ready_place(&n),
            success_place(&n),
            task_failure_place(&n),
            split_place(&n),
            joined_place(&n),
        ];
        let unique: std::collections::HashSet<_> = places.iter().collect();
        assert_eq!(unique.len(), places.len());
    }

    #[test]
    fn success_place_for_differs_per_successor() {
        let n = unique_name(test_id(1), "A");
        let a = success_place_for(&n, "op-2-B");
        let b = success_place_for(&n, "op-3-C");
        assert_ne!(a, b);
    }
}
