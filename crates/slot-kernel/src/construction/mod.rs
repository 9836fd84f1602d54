//! Graph construction
//!
//! Documents are registered with a [`SlotGraphBuilder`] and expanded into a
//! [`crate::graph::SlotGraph`] by a breadth-first walk from the root part.
//! Problems that leave the graph usable are recorded as [`BuildWarning`]s.

mod builder;

pub use builder::SlotGraphBuilder;

use crate::types::{NodeId, SourceId};
use serde::{Deserialize, Serialize};

/// Non-fatal builder finding, stored on the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildWarning {
    /// A non-root slot default matches no registered part
    #[error("unresolved default '{default_part}' for slot '{slot_type}' ({node})")]
    UnresolvedDefault {
        /// Node holding the default
        node: NodeId,
        /// Its slot type
        slot_type: String,
        /// The unresolved part name
        default_part: String,
    },

    /// Two documents define the same part name; the first one wins
    #[error("part '{part}' defined in both '{kept}' and '{ignored}'; keeping '{kept}'")]
    DuplicatePart {
        /// Part name
        part: String,
        /// Document whose definition is used
        kept: SourceId,
        /// Document whose definition is ignored
        ignored: SourceId,
    },

    /// A part appears again on its own ancestor path; not expanded
    #[error("part '{part}' is its own ancestor at {node}; not expanded again")]
    RecursivePart {
        /// Node whose default closes the loop
        node: NodeId,
        /// Part name
        part: String,
    },

    /// A slot row could not be read
    #[error("malformed slot row in part '{part}' ({document}): {row}")]
    MalformedSlotRow {
        /// Declaring part
        part: String,
        /// Declaring document
        document: SourceId,
        /// Raw row
        row: String,
    },
}

impl BuildWarning {
    /// Node the warning refers to, if any
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            BuildWarning::UnresolvedDefault { node, .. } | BuildWarning::RecursivePart { node, .. } => {
                Some(*node)
            }
            BuildWarning::DuplicatePart { .. } | BuildWarning::MalformedSlotRow { .. } => None,
        }
    }
}
