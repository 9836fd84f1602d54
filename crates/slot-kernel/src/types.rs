//! Core identifiers and closed enumerations
//!
//! `Disposition`, `AssetRole` and `SlotState` are closed sets; the executor
//! matches on them exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Arena index of a [`crate::graph::SlotNode`]
///
/// Allocated sequentially by the graph, so ids are deterministic for a given
/// set of input documents and reflect breadth-first construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Raw index value
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// The id allocated after this one
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of one adaptation run, used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Generate a new random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of an input document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Wrap a document identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem: last path component without its extension
    #[must_use]
    pub fn stem(&self) -> &str {
        let file = self
            .0
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.0.as_str());
        match file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Policy applied to a slot during adaptation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Copied unchanged
    #[default]
    Preserve,
    /// Renamed / remapped into the target namespace
    Adapt,
    /// Not present in the donor; added for the target
    Inject,
    /// Removed together with its subtree
    Prune,
    /// Slot type kept, default part remapped
    RemapDefault,
}

impl Disposition {
    /// All dispositions in declaration order
    pub const ALL: [Self; 5] = [
        Self::Preserve,
        Self::Adapt,
        Self::Inject,
        Self::Prune,
        Self::RemapDefault,
    ];

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preserve => "PRESERVE",
            Self::Adapt => "ADAPT",
            Self::Inject => "INJECT",
            Self::Prune => "PRUNE",
            Self::RemapDefault => "REMAP_DEFAULT",
        }
    }

    /// Single-letter marker used by tree rendering
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Preserve => 'P',
            Self::Adapt => 'A',
            Self::Inject => 'I',
            Self::Prune => 'X',
            Self::RemapDefault => 'R',
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export classification of a node
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    /// Extraction-only; never emitted
    Source,
    /// Generated for the target
    Target,
    /// Copied as-is
    #[default]
    Preserve,
    /// Bookkeeping only; never exported
    Internal,
}

impl AssetRole {
    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "SOURCE",
            Self::Target => "TARGET",
            Self::Preserve => "PRESERVE",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether nodes with this role appear in exported output
    #[inline]
    #[must_use]
    pub const fn is_exported(self) -> bool {
        matches!(self, Self::Target | Self::Preserve)
    }

    /// Single-letter marker used by tree rendering
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Source => 's',
            Self::Target => 't',
            Self::Preserve => 'p',
            Self::Internal => 'i',
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a node
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// As built from the donor documents
    #[default]
    Original,
    /// Classified by the planner
    Planned,
    /// At least one effect applied
    Transformed,
    /// Sealed after a clean validation
    Validated,
    /// Excluded from export (terminal)
    Pruned,
}

impl SlotState {
    /// All states in lifecycle order
    pub const ALL: [Self; 5] = [
        Self::Original,
        Self::Planned,
        Self::Transformed,
        Self::Validated,
        Self::Pruned,
    ];

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "ORIGINAL",
            Self::Planned => "PLANNED",
            Self::Transformed => "TRANSFORMED",
            Self::Validated => "VALIDATED",
            Self::Pruned => "PRUNED",
        }
    }

    /// Single-letter marker used by tree rendering
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Original => 'o',
            Self::Planned => 'p',
            Self::Transformed => 'T',
            Self::Validated => 'V',
            Self::Pruned => 'X',
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_stem() {
        assert_eq!(SourceId::from("vehicles/camso/camso_engine.jbeam").stem(), "camso_engine");
        assert_eq!(SourceId::from("C:\\mods\\engine.v2.json").stem(), "engine.v2");
        assert_eq!(SourceId::from("engine").stem(), "engine");
        assert_eq!(SourceId::from(".hidden").stem(), ".hidden");
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&Disposition::RemapDefault).unwrap(),
            "\"remap_default\""
        );
        assert_eq!(serde_json::to_string(&AssetRole::Source).unwrap(), "\"source\"");
        assert_eq!(serde_json::to_string(&SlotState::Pruned).unwrap(), "\"pruned\"");
    }

    #[test]
    fn display_uses_upper_case_names() {
        assert_eq!(Disposition::RemapDefault.to_string(), "REMAP_DEFAULT");
        assert_eq!(SlotState::Transformed.to_string(), "TRANSFORMED");
        assert_eq!(NodeId(7).to_string(), "#7");
    }

    #[test]
    fn only_target_and_preserve_are_exported() {
        assert!(AssetRole::Target.is_exported());
        assert!(AssetRole::Preserve.is_exported());
        assert!(!AssetRole::Source.is_exported());
        assert!(!AssetRole::Internal.is_exported());
    }
}
