//! Slot array rows for regenerated part documents

use crate::graph::SlotGraph;
use crate::types::{AssetRole, NodeId};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value;
use slot_document::{Options, SLOT_HEADER};

/// One `[type, default, description, options?]` row
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRow {
    /// Slot type
    pub slot_type: String,
    /// Default part (empty for an intentionally empty slot)
    pub default_part: String,
    /// Description
    pub description: String,
    /// Options; omitted from the row when `None`
    pub options: Option<Options>,
}

impl SlotRow {
    /// Row as a JSON array
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut cells = vec![
            Value::String(self.slot_type.clone()),
            Value::String(self.default_part.clone()),
            Value::String(self.description.clone()),
        ];
        if let Some(options) = &self.options {
            cells.push(Value::Object(options.iter().map(|(k, v)| (k.clone(), v.clone())).collect()));
        }
        Value::Array(cells)
    }
}

impl Serialize for SlotRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.options.is_some() { 4 } else { 3 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.slot_type)?;
        seq.serialize_element(&self.default_part)?;
        seq.serialize_element(&self.description)?;
        if let Some(options) = &self.options {
            seq.serialize_element(options)?;
        }
        seq.end()
    }
}

/// Rows for the surviving children of `node`, in child order
///
/// Pruned children and SOURCE / INTERNAL children are left out. Unknown
/// ids yield no rows.
#[must_use]
pub fn slot_rows(graph: &SlotGraph, node: NodeId) -> Vec<SlotRow> {
    let Some(parent) = graph.node(node) else {
        return Vec::new();
    };
    parent
        .children
        .iter()
        .filter_map(|c| graph.node(*c))
        .filter(|c| {
            !graph.is_effectively_pruned(c.id)
                && !matches!(c.asset_role, AssetRole::Source | AssetRole::Internal)
        })
        .map(|c| SlotRow {
            slot_type: c.slot_type.clone(),
            default_part: c.default_part.clone(),
            description: c.description.clone(),
            options: (!c.options.is_empty()).then(|| c.options.clone()),
        })
        .collect()
}

/// Rows for the first surviving slot currently filled by `part`
#[must_use]
pub fn slot_rows_for_part(graph: &SlotGraph, part: &str) -> Option<Vec<SlotRow>> {
    graph
        .nodes_with_part(part)
        .into_iter()
        .find(|n| !graph.is_effectively_pruned(n.id))
        .map(|n| slot_rows(graph, n.id))
}

/// Slot array with the header row first
#[must_use]
pub fn with_header(rows: &[SlotRow]) -> Value {
    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(Value::Array(
        SLOT_HEADER.iter().map(|h| Value::String((*h).to_string())).collect(),
    ));
    out.extend(rows.iter().map(SlotRow::to_value));
    Value::Array(out)
}
