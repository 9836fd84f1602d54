//! Transformation records
//!
//! A [`Transformation`] is created by the planner, applied once by the
//! executor and then kept, unchanged, in the target node's history.

use crate::types::{AssetRole, Disposition, NodeId, SlotState};
use serde::{Deserialize, Serialize};
use slot_document::Options;
use std::fmt;

/// Operation carried by a transformation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformOp {
    /// Record the disposition / asset-role decision
    Classify,
    /// Explicit no-op for nodes that keep their shape
    Retain,
    /// Change the slot type
    RenameSlotType,
    /// Change the default part
    RemapDefault,
    /// Create a node absent from the donor
    InjectSlot,
    /// Move a node and its subtree under a new parent (absorption)
    AbsorbSlot,
    /// Drop a slot from output; children still attached are pruned
    RemoveSlot,
    /// Drop a slot and everything below it from output
    PruneSubtree,
    /// Merge options into the slot's options
    AddOptions,
    /// Replace the slot description
    UpdateDescription,
}

impl TransformOp {
    /// All operations in declaration order
    pub const ALL: [Self; 10] = [
        Self::Classify,
        Self::Retain,
        Self::RenameSlotType,
        Self::RemapDefault,
        Self::InjectSlot,
        Self::AbsorbSlot,
        Self::RemoveSlot,
        Self::PruneSubtree,
        Self::AddOptions,
        Self::UpdateDescription,
    ];

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classify => "CLASSIFY",
            Self::Retain => "RETAIN",
            Self::RenameSlotType => "RENAME_SLOT_TYPE",
            Self::RemapDefault => "REMAP_DEFAULT",
            Self::InjectSlot => "INJECT_SLOT",
            Self::AbsorbSlot => "ABSORB_SLOT",
            Self::RemoveSlot => "REMOVE_SLOT",
            Self::PruneSubtree => "PRUNE_SUBTREE",
            Self::AddOptions => "ADD_OPTIONS",
            Self::UpdateDescription => "UPDATE_DESCRIPTION",
        }
    }

    /// State the target node is driven into
    #[must_use]
    pub const fn resulting_state(self) -> SlotState {
        match self {
            Self::Classify => SlotState::Planned,
            Self::RemoveSlot | Self::PruneSubtree => SlotState::Pruned,
            Self::Retain
            | Self::RenameSlotType
            | Self::RemapDefault
            | Self::InjectSlot
            | Self::AbsorbSlot
            | Self::AddOptions
            | Self::UpdateDescription => SlotState::Transformed,
        }
    }

    /// Whether the operation changes parent/child links
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(
            self,
            Self::InjectSlot | Self::AbsorbSlot | Self::RemoveSlot | Self::PruneSubtree
        )
    }
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a planned value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// Read from externally supplied discovery data
    Discovered,
    /// Taken from adaptation configuration
    Configured,
    /// Follows from the donor tree's own structure
    Structural,
    /// Built-in policy (default classification, retain)
    Policy,
    /// Last-resort namespace substitution
    Fallback,
}

impl Derivation {
    /// Canonical lower-case name, used as the reason prefix
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Configured => "configured",
            Self::Structural => "structural",
            Self::Policy => "policy",
            Self::Fallback => "fallback",
        }
    }

    /// Whether callers should treat the value as a guess
    #[inline]
    #[must_use]
    pub const fn is_low_confidence(self) -> bool {
        matches!(self, Self::Fallback)
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement of a node among its parent's children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Parent node
    pub parent: NodeId,
    /// Sibling to insert after; `None` appends
    pub after: Option<NodeId>,
}

/// Full description of a node created by `INJECT_SLOT`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedSlot {
    /// Slot type of the new node
    pub slot_type: String,
    /// Default part of the new node
    pub default_part: String,
    /// Description of the new node
    pub description: String,
    /// Options of the new node
    pub options: Options,
    /// Where the node is linked in
    pub placement: Placement,
    /// Disposition of the new node
    pub disposition: Disposition,
    /// Asset role of the new node
    pub asset_role: AssetRole,
}

/// Before / after snapshot carried by a transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TransformValue {
    /// A slot type
    SlotType(String),
    /// A default part name
    DefaultPart(String),
    /// A description
    Description(String),
    /// An options map
    Options(Options),
    /// A position in the tree
    Placement(Placement),
    /// A node to create
    Slot(InjectedSlot),
    /// A classification decision
    Classification {
        /// Disposition
        disposition: Disposition,
        /// Asset role
        asset_role: AssetRole,
    },
}

impl TransformValue {
    /// Short rendering for tree output and logs
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::SlotType(s) | Self::DefaultPart(s) | Self::Description(s) => s.clone(),
            Self::Options(opts) => serde_json::to_string(opts).unwrap_or_default(),
            Self::Placement(p) => match p.after {
                Some(after) => format!("under {} after {after}", p.parent),
                None => format!("under {}", p.parent),
            },
            Self::Slot(slot) => format!("{} = {}", slot.slot_type, slot.default_part),
            Self::Classification {
                disposition,
                asset_role,
            } => format!("{disposition}/{asset_role}"),
        }
    }
}

/// An immutable transformation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    /// Position in the plan; strictly increasing
    pub seq: u64,
    /// Operation
    pub operation: TransformOp,
    /// Node the record applies to (reserved id for injections)
    pub target: NodeId,
    /// Value before the operation
    pub before: Option<TransformValue>,
    /// Value after the operation
    pub after: Option<TransformValue>,
    /// How the new value was derived
    pub derivation: Derivation,
    /// `"<derivation>: <detail>"`
    pub reason: String,
}

impl Transformation {
    /// Create a record; `reason` is prefixed with the derivation
    pub fn new(
        seq: u64,
        operation: TransformOp,
        target: NodeId,
        derivation: Derivation,
        detail: impl fmt::Display,
    ) -> Self {
        Self {
            seq,
            operation,
            target,
            before: None,
            after: None,
            derivation,
            reason: format!("{derivation}: {detail}"),
        }
    }

    /// Set the before snapshot
    #[must_use]
    pub fn before(mut self, value: TransformValue) -> Self {
        self.before = Some(value);
        self
    }

    /// Set the after snapshot
    #[must_use]
    pub fn after(mut self, value: TransformValue) -> Self {
        self.after = Some(value);
        self
    }

    /// Whether the recorded value is a guess
    #[inline]
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        self.derivation.is_low_confidence()
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.seq, self.operation, self.target)?;
        match (&self.before, &self.after) {
            (Some(b), Some(a)) => write!(f, " {} -> {}", b.summary(), a.summary())?,
            (None, Some(a)) => write!(f, " -> {}", a.summary())?,
            _ => {}
        }
        write!(f, " ({})", self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_is_prefixed_with_derivation() {
        let t = Transformation::new(
            3,
            TransformOp::RenameSlotType,
            NodeId(1),
            Derivation::Discovered,
            "engine_slot -> vehicleX_engine",
        );
        assert_eq!(t.reason, "discovered: engine_slot -> vehicleX_engine");
        assert!(!t.is_low_confidence());
    }

    #[test]
    fn fallback_is_low_confidence() {
        let t = Transformation::new(0, TransformOp::RemapDefault, NodeId(0), Derivation::Fallback, "x");
        assert!(t.is_low_confidence());
    }

    #[test]
    fn resulting_states() {
        assert_eq!(TransformOp::Classify.resulting_state(), SlotState::Planned);
        assert_eq!(TransformOp::PruneSubtree.resulting_state(), SlotState::Pruned);
        assert_eq!(TransformOp::RemoveSlot.resulting_state(), SlotState::Pruned);
        assert_eq!(TransformOp::Retain.resulting_state(), SlotState::Transformed);
    }

    #[test]
    fn display_includes_values() {
        let t = Transformation::new(1, TransformOp::RenameSlotType, NodeId(2), Derivation::Fallback, "ns")
            .before(TransformValue::SlotType("Camso_Engine".into()))
            .after(TransformValue::SlotType("vx_engine".into()));
        assert_eq!(
            t.to_string(),
            "[1] RENAME_SLOT_TYPE #2 Camso_Engine -> vx_engine (fallback: ns)"
        );
    }

    #[test]
    fn values_serialize_tagged() {
        let v = TransformValue::DefaultPart("vx_engine".into());
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            serde_json::json!({"kind": "default_part", "value": "vx_engine"})
        );
    }
}
