//! Per-(node, property, color) data storage and resolution.
//!
//! Mirrors `set_outputs`/`get_outputs`/`_convert_output` in
//! `parallel.py`: a plain read returns the value produced at a node's own
//! color; a `parallel_by` read aggregates every color in the relevant
//! group, ordered by color, into an array.

use serde_json::Value;

use crate::color::{Color, ColorGroup};
use crate::error::{Error, Result};
use crate::node::NodeId;

#[derive(Debug, Clone)]
pub struct Output {
    pub node_id: NodeId,
    pub property: String,
    pub color: Color,
    pub value: Value,
}

/// Flat store of produced outputs. Writes are idempotent on
/// `(node_id, property, color)` — a redundant `ended` delivery re-writing
/// the same value is a no-op, consistent with the execution registry's
/// absorption of duplicate callbacks.
#[derive(Debug, Default)]
pub struct OutputStore {
    outputs: Vec<Output>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self {
            outputs: Vec::new(),
        }
    }

    pub fn from_outputs(outputs: Vec<Output>) -> Self {
        Self { outputs }
    }

    pub fn all(&self) -> &[Output] {
        &self.outputs
    }

    /// Records `property = value` produced by `node_id` at `color`,
    /// overwriting any prior value for the same key so retried writes
    /// converge rather than accumulate duplicates.
    pub fn put(&mut self, node_id: NodeId, property: &str, color: Color, value: Value) {
        if let Some(existing) = self
            .outputs
            .iter_mut()
            .find(|o| o.node_id == node_id && o.property == property && o.color == color)
        {
            existing.value = value;
        } else {
            self.outputs.push(Output {
                node_id,
                property: property.to_string(),
                color,
                value,
            });
        }
    }

    pub fn get(&self, node_id: NodeId, property: &str, color: Color) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|o| o.node_id == node_id && o.property == property && o.color == color)
            .map(|o| &o.value)
    }

    /// The plain resolution path: read a source node's output at the
    /// color the consuming execution runs at (or its parent color, when
    /// the consumer didn't itself introduce a new color split).
    pub fn resolve(&self, node_id: NodeId, property: &str, color: Color) -> Result<&Value> {
        self.get(node_id, property, color).ok_or_else(|| {
            Error::no_such(
                "output",
                format!("{node_id}.{property}@{color}"),
            )
        })
    }

    /// The parallel-by resolution path: `group` is the color group the
    /// consuming task split into; the array element at `color`'s offset
    /// within that group is returned, reading the source at the group's
    /// parent color (`_convert_output`'s `property_name == parallel_by`
    /// branch).
    pub fn resolve_parallel_element(
        &self,
        node_id: NodeId,
        property: &str,
        group: ColorGroup,
        color: Color,
    ) -> Result<Value> {
        let offset = group.offset_of(color).ok_or_else(|| {
            Error::UpdateError(format!("color {color} is not a member of {group:?}"))
        })?;
        let array = self.resolve(node_id, property, group.parent_color)?;
        array
            .as_array()
            .and_then(|a| a.get(offset as usize))
            .cloned()
            .ok_or_else(|| {
                Error::UpdateError(format!(
                    "{node_id}.{property}@{} has no element at offset {offset}",
                    group.parent_color
                ))
            })
    }

    /// The split-size source read: the length of the array produced for
    /// `property` at `parent_color`, used to size a fresh `ColorGroup`.
    pub fn split_size(&self, node_id: NodeId, property: &str, parent_color: Color) -> Result<i64> {
        let value = self.resolve(node_id, property, parent_color)?;
        value
            .as_array()
            .map(|a| a.len() as i64)
            .ok_or_else(|| {
                Error::UpdateError(format!(
                    "{node_id}.{property}@{parent_color} is not an array, cannot split on it"
                ))
            })
    }

    /// `get_outputs`: the per-color values `node_id` produced for `property`
    /// across every color in `group`, sorted ascending by color — the value
    /// downstream consumers see when they read `node_id`'s output at the
    /// group's parent color.
    pub fn aggregate_group(
        &self,
        node_id: NodeId,
        property: &str,
        group: ColorGroup,
    ) -> Result<Value> {
        let mut values = Vec::with_capacity(group.len() as usize);
        for color in group.begin..group.end {
            values.push(self.resolve(node_id, property, color)?.clone());
        }
        Ok(Value::Array(values))
    }

    /// The read path a downstream consumer actually takes: if `node_id`
    /// itself split into a color group whose parent color is `color`, the
    /// consumer sees the aggregated array rather than a single value —
    /// `_convert_output`'s branch for reading a parallel-by task's own
    /// output from outside its fan-out.
    pub fn resolve_for_consumer(
        &self,
        colors: &crate::color::ColorStore,
        node_id: NodeId,
        property: &str,
        color: Color,
    ) -> Result<Value> {
        match colors.group_for(node_id, color) {
            Some(group) => self.aggregate_group(node_id, property, group),
            None => self.resolve(node_id, property, color).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn put_then_get_round_trips() {
        let mut store = OutputStore::new();
        let node = Uuid::new_v4();
        store.put(node, "x", 0, json!(42));
        assert_eq!(store.get(node, "x", 0), Some(&json!(42)));
    }

    #[test]
    fn put_is_idempotent_on_the_same_key() {
        let mut store = OutputStore::new();
        let node = Uuid::new_v4();
        store.put(node, "x", 0, json!(1));
        store.put(node, "x", 0, json!(1));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn parallel_element_reads_parent_color_array_by_offset() {
        let mut store = OutputStore::new();
        let node = Uuid::new_v4();
        store.put(node, "items", 0, json!(["a", "b", "c"]));
        let group = ColorGroup {
            node_id: Uuid::new_v4(),
            parent_color: 0,
            begin: 1,
            end: 4,
        };
        let elem = store
            .resolve_parallel_element(node, "items", group, 2)
            .unwrap();
        assert_eq!(elem, json!("b"));
    }

    #[test]
    fn split_size_reports_array_length() {
        let mut store = OutputStore::new();
        let node = Uuid::new_v4();
        store.put(node, "items", 0, json!(["a", "b"]));
        assert_eq!(store.split_size(node, "items", 0).unwrap(), 2);
    }
}
