//! Slot graph arena
//!
//! Nodes live in a flat id → node map and refer to each other only by
//! [`NodeId`]. Three auxiliary indices (`by_slot_type`, `by_part_name`,
//! `by_source_file`) are maintained by every mutation. Mutation is
//! crate-private: the builder populates the graph and the executor is the
//! only component that changes it afterwards.

mod render;

use crate::construction::BuildWarning;
use crate::provenance::ProvenanceLog;
use crate::suffix::{matches_base, split_suffix};
use crate::transform::{TransformOp, TransformValue, Transformation};
use crate::types::{AssetRole, Disposition, GraphId, NodeId, SlotState, SourceId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use slot_document::Options;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// One entry in a part's component hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotNode {
    /// Arena id
    pub id: NodeId,
    /// Current slot type
    pub slot_type: String,
    /// Slot type as first seen
    pub original_slot_type: String,
    /// Part currently filling the slot (empty = intentionally empty)
    pub default_part: String,
    /// Default part as first seen
    pub original_default_part: String,
    /// Catalog part the builder expanded for this slot, if any
    pub resolved_part: Option<String>,
    /// Opaque description
    pub description: String,
    /// Opaque options
    pub options: Options,
    /// Parent node; `None` for the root
    pub parent: Option<NodeId>,
    /// Ordered children
    pub children: Vec<NodeId>,
    /// Originating document; `None` for synthesised nodes
    pub source_file: Option<SourceId>,
    /// Adaptation policy
    pub disposition: Disposition,
    /// Export classification
    pub asset_role: AssetRole,
    /// Lifecycle state
    pub state: SlotState,
    /// Applied transformations in order
    pub transformation_history: Vec<Transformation>,
    /// Donor suffix extracted from the default part
    pub suffix: Option<String>,
}

impl SlotNode {
    pub(crate) fn new(
        id: NodeId,
        slot_type: impl Into<String>,
        default_part: impl Into<String>,
        description: impl Into<String>,
        options: Options,
        source_file: Option<SourceId>,
    ) -> Self {
        let slot_type = slot_type.into();
        let default_part = default_part.into();
        let suffix = split_suffix(&default_part).1.map(str::to_string);
        Self {
            id,
            original_slot_type: slot_type.clone(),
            slot_type,
            original_default_part: default_part.clone(),
            default_part,
            resolved_part: None,
            description: description.into(),
            options,
            parent: None,
            children: Vec::new(),
            source_file,
            disposition: Disposition::Preserve,
            asset_role: AssetRole::Preserve,
            state: SlotState::Original,
            transformation_history: Vec::new(),
            suffix,
        }
    }

    /// Whether this node itself is pruned (ancestors not considered)
    #[inline]
    #[must_use]
    pub fn is_pruned(&self) -> bool {
        self.state == SlotState::Pruned
    }

    /// Whether this node is the tree root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether the slot is intentionally empty
    #[inline]
    #[must_use]
    pub fn is_empty_slot(&self) -> bool {
        self.default_part.is_empty()
    }

    /// Sequence number of the last applied transformation
    #[must_use]
    pub fn last_seq(&self) -> Option<u64> {
        self.transformation_history.last().map(|t| t.seq)
    }

    /// Whether slot type or default differ from what was first seen
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.slot_type != self.original_slot_type
            || self.default_part != self.original_default_part
    }

    /// Whether any applied transformation produced `part` as a default
    #[must_use]
    pub fn produced_default(&self, part: &str) -> bool {
        self.transformation_history.iter().any(|t| match (&t.operation, &t.after) {
            (TransformOp::RemapDefault, Some(TransformValue::DefaultPart(p))) => p == part,
            (TransformOp::InjectSlot, Some(TransformValue::Slot(s))) => s.default_part == part,
            _ => false,
        })
    }
}

/// A part registered with the builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Part name
    pub name: String,
    /// Document that defines it
    pub source: SourceId,
    /// Slot type the part declares it fills
    pub slot_type: String,
}

/// Counts over every applied transformation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationSummary {
    /// Total records applied
    pub total: usize,
    /// Records per operation
    pub by_operation: BTreeMap<TransformOp, usize>,
    /// Records with a fallback derivation
    pub low_confidence: usize,
}

type Index = IndexMap<String, Vec<NodeId>>;

/// The slot dependency graph for one adaptation run
#[derive(Debug)]
pub struct SlotGraph {
    id: GraphId,
    nodes: BTreeMap<NodeId, SlotNode>,
    root: NodeId,
    next_id: u32,
    target_namespace: String,
    by_slot_type: Index,
    by_part_name: Index,
    by_source_file: Index,
    catalog: IndexMap<String, CatalogEntry>,
    warnings: Vec<BuildWarning>,
    provenance: ProvenanceLog,
    descendant_cache: RefCell<HashMap<NodeId, Vec<NodeId>>>,
}

impl SlotGraph {
    /// Create a graph holding only `root`, which receives `NodeId(0)`
    pub(crate) fn with_root(root: SlotNode) -> Self {
        let mut graph = Self {
            id: GraphId::new(),
            nodes: BTreeMap::new(),
            root: NodeId(0),
            next_id: 0,
            target_namespace: String::new(),
            by_slot_type: Index::new(),
            by_part_name: Index::new(),
            by_source_file: Index::new(),
            catalog: IndexMap::new(),
            warnings: Vec::new(),
            provenance: ProvenanceLog::new(),
            descendant_cache: RefCell::new(HashMap::new()),
        };
        graph.insert(root);
        graph
    }

    // ------------------------------------------------------------------
    // Identity and bookkeeping
    // ------------------------------------------------------------------

    /// Run identity
    #[must_use]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Root node id
    #[must_use]
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Root node
    #[must_use]
    pub fn root(&self) -> &SlotNode {
        &self.nodes[&self.root]
    }

    /// Namespace the graph is transformed toward (empty before execution)
    #[must_use]
    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    /// Id the next inserted node will receive
    #[must_use]
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_id)
    }

    /// Number of nodes (pruned included)
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false once built; present for API symmetry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builder warnings
    #[must_use]
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Every part registered with the builder
    #[must_use]
    pub fn catalog(&self) -> &IndexMap<String, CatalogEntry> {
        &self.catalog
    }

    /// Hash-chained log of applied transformations
    #[must_use]
    pub fn provenance(&self) -> &ProvenanceLog {
        &self.provenance
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Node by id
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SlotNode> {
        self.nodes.get(&id)
    }

    /// Whether a node exists
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &SlotNode> {
        self.nodes.values()
    }

    /// Node ids in id order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// First node with this current slot type, else this original slot type
    #[must_use]
    pub fn find(&self, slot_type: &str) -> Option<&SlotNode> {
        self.by_slot_type
            .get(slot_type)
            .and_then(|ids| ids.first())
            .and_then(|id| self.nodes.get(id))
            .or_else(|| self.iter().find(|n| n.original_slot_type == slot_type))
    }

    /// Nodes whose current slot type is `slot_type`
    #[must_use]
    pub fn nodes_with_slot_type(&self, slot_type: &str) -> Vec<&SlotNode> {
        self.lookup(&self.by_slot_type, slot_type)
    }

    /// Nodes whose current default part is `part`
    #[must_use]
    pub fn nodes_with_part(&self, part: &str) -> Vec<&SlotNode> {
        self.lookup(&self.by_part_name, part)
    }

    /// Nodes built from `source`
    #[must_use]
    pub fn nodes_from_source(&self, source: &str) -> Vec<&SlotNode> {
        self.lookup(&self.by_source_file, source)
    }

    /// Distinct source documents, in first-seen order
    pub fn source_files(&self) -> impl Iterator<Item = &str> {
        self.by_source_file.keys().map(String::as_str)
    }

    fn lookup(&self, index: &Index, key: &str) -> Vec<&SlotNode> {
        index
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Catalog entry for `part`, exact name first, then suffix-agnostic
    #[must_use]
    pub fn catalog_lookup(&self, part: &str) -> Option<&CatalogEntry> {
        self.catalog
            .get(part)
            .or_else(|| self.catalog.values().find(|e| matches_base(&e.name, part)))
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Ancestors of `id`, nearest first
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(p) = current {
            if out.contains(&p) || p == id {
                break;
            }
            out.push(p);
            current = self.nodes.get(&p).and_then(|n| n.parent);
        }
        out
    }

    /// Distance from the root
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// All descendants of `id` in breadth-first order
    ///
    /// Cached per node; the cache is dropped on every structural change.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        if let Some(hit) = self.descendant_cache.borrow().get(&id) {
            return hit.clone();
        }
        let mut out = Vec::new();
        let mut queue: VecDeque<NodeId> = self
            .nodes
            .get(&id)
            .map(|n| n.children.iter().copied().collect())
            .unwrap_or_default();
        while let Some(next) = queue.pop_front() {
            if next == id || out.contains(&next) {
                continue;
            }
            out.push(next);
            if let Some(n) = self.nodes.get(&next) {
                queue.extend(n.children.iter().copied());
            }
        }
        self.descendant_cache.borrow_mut().insert(id, out.clone());
        out
    }

    /// Node or any ancestor is pruned
    #[must_use]
    pub fn is_effectively_pruned(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(SlotNode::is_pruned)
            || self
                .ancestors(id)
                .iter()
                .any(|a| self.nodes.get(a).is_some_and(SlotNode::is_pruned))
    }

    /// Nodes that are not effectively pruned
    #[must_use]
    pub fn active_nodes(&self) -> Vec<&SlotNode> {
        self.iter()
            .filter(|n| !self.is_effectively_pruned(n.id))
            .collect()
    }

    /// Nodes with the given disposition
    #[must_use]
    pub fn nodes_by_disposition(&self, disposition: Disposition) -> Vec<&SlotNode> {
        self.iter().filter(|n| n.disposition == disposition).collect()
    }

    /// Nodes with the given asset role
    #[must_use]
    pub fn nodes_by_role(&self, role: AssetRole) -> Vec<&SlotNode> {
        self.iter().filter(|n| n.asset_role == role).collect()
    }

    /// Slots that appear in output: exported role and not effectively pruned
    #[must_use]
    pub fn exportable_slots(&self) -> Vec<&SlotNode> {
        self.iter()
            .filter(|n| n.asset_role.is_exported() && !self.is_effectively_pruned(n.id))
            .collect()
    }

    /// Extraction-only nodes
    #[must_use]
    pub fn source_nodes(&self) -> Vec<&SlotNode> {
        self.nodes_by_role(AssetRole::Source)
    }

    // ------------------------------------------------------------------
    // History-derived views
    // ------------------------------------------------------------------

    /// Counts over every applied transformation
    #[must_use]
    pub fn transformation_summary(&self) -> TransformationSummary {
        let mut summary = TransformationSummary::default();
        for t in self.iter().flat_map(|n| n.transformation_history.iter()) {
            summary.total += 1;
            *summary.by_operation.entry(t.operation).or_default() += 1;
            if t.is_low_confidence() {
                summary.low_confidence += 1;
            }
        }
        summary
    }

    /// Original → current slot type for every renamed surviving node
    #[must_use]
    pub fn slot_type_mappings(&self) -> IndexMap<String, String> {
        self.iter()
            .filter(|n| n.slot_type != n.original_slot_type && !self.is_effectively_pruned(n.id))
            .map(|n| (n.original_slot_type.clone(), n.slot_type.clone()))
            .collect()
    }

    /// Original → current default part for every remapped surviving node
    #[must_use]
    pub fn part_name_mappings(&self) -> IndexMap<String, String> {
        self.iter()
            .filter(|n| {
                !n.original_default_part.is_empty()
                    && n.default_part != n.original_default_part
                    && !self.is_effectively_pruned(n.id)
            })
            .map(|n| (n.original_default_part.clone(), n.default_part.clone()))
            .collect()
    }

    /// Compare the auxiliary indices against the node map
    ///
    /// Returns one message per mismatch; empty when consistent.
    #[must_use]
    pub fn index_mismatches(&self) -> Vec<String> {
        let mut expected_types = Index::new();
        let mut expected_parts = Index::new();
        let mut expected_sources = Index::new();
        for n in self.iter() {
            index_add(&mut expected_types, &n.slot_type, n.id);
            if !n.default_part.is_empty() {
                index_add(&mut expected_parts, &n.default_part, n.id);
            }
            if let Some(src) = &n.source_file {
                index_add(&mut expected_sources, src.as_str(), n.id);
            }
        }

        let mut out = Vec::new();
        for (name, actual, expected) in [
            ("by_slot_type", &self.by_slot_type, &expected_types),
            ("by_part_name", &self.by_part_name, &expected_parts),
            ("by_source_file", &self.by_source_file, &expected_sources),
        ] {
            for (key, ids) in expected {
                let mut want = ids.clone();
                want.sort_unstable();
                let mut have = actual.get(key).cloned().unwrap_or_default();
                have.sort_unstable();
                if want != have {
                    out.push(format!("{name}['{key}']: expected {want:?}, found {have:?}"));
                }
            }
            for key in actual.keys().filter(|k| !expected.contains_key(*k)) {
                out.push(format!("{name}['{key}']: stale entry"));
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Crate-private mutation
    // ------------------------------------------------------------------

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut SlotNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn set_target_namespace(&mut self, namespace: &str) {
        self.target_namespace = namespace.to_string();
    }

    pub(crate) fn set_catalog(&mut self, catalog: IndexMap<String, CatalogEntry>) {
        self.catalog = catalog;
    }

    pub(crate) fn push_warning(&mut self, warning: BuildWarning) {
        self.warnings.push(warning);
    }

    /// Insert a node at `next_node_id()` and index it (unlinked)
    pub(crate) fn insert(&mut self, mut node: SlotNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.id = id;
        index_add(&mut self.by_slot_type, &node.slot_type, id);
        if !node.default_part.is_empty() {
            index_add(&mut self.by_part_name, &node.default_part, id);
        }
        if let Some(src) = &node.source_file {
            index_add(&mut self.by_source_file, src.as_str(), id);
        }
        self.nodes.insert(id, node);
        self.invalidate_descendants();
        id
    }

    /// Link `child` under `parent`, after `after` if given and present
    pub(crate) fn link(&mut self, child: NodeId, parent: NodeId, after: Option<NodeId>) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            let position = after
                .and_then(|a| p.children.iter().position(|c| *c == a))
                .map_or(p.children.len(), |i| i + 1);
            p.children.insert(position, child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        self.invalidate_descendants();
    }

    /// Detach `child` from its parent; returns the old parent and predecessor
    pub(crate) fn unlink(&mut self, child: NodeId) -> Option<(NodeId, Option<NodeId>)> {
        let parent = self.nodes.get(&child)?.parent?;
        let mut previous = None;
        if let Some(p) = self.nodes.get_mut(&parent) {
            if let Some(i) = p.children.iter().position(|c| *c == child) {
                previous = i.checked_sub(1).map(|j| p.children[j]);
                p.children.remove(i);
            }
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = None;
        }
        self.invalidate_descendants();
        Some((parent, previous))
    }

    pub(crate) fn set_slot_type(&mut self, id: NodeId, slot_type: &str) -> Option<String> {
        let node = self.nodes.get_mut(&id)?;
        let old = std::mem::replace(&mut node.slot_type, slot_type.to_string());
        index_remove(&mut self.by_slot_type, &old, id);
        index_add(&mut self.by_slot_type, slot_type, id);
        Some(old)
    }

    pub(crate) fn set_default_part(&mut self, id: NodeId, part: &str) -> Option<String> {
        let node = self.nodes.get_mut(&id)?;
        let old = std::mem::replace(&mut node.default_part, part.to_string());
        node.suffix = split_suffix(part).1.map(str::to_string);
        if !old.is_empty() {
            index_remove(&mut self.by_part_name, &old, id);
        }
        if !part.is_empty() {
            index_add(&mut self.by_part_name, part, id);
        }
        Some(old)
    }

    pub(crate) fn record(&mut self, transformation: Transformation) {
        self.provenance.append(&transformation);
        if let Some(node) = self.nodes.get_mut(&transformation.target) {
            node.transformation_history.push(transformation);
        }
    }

    fn invalidate_descendants(&self) {
        self.descendant_cache.borrow_mut().clear();
    }

    #[cfg(test)]
    pub(crate) fn index_mut_for_test(&mut self) -> &mut IndexMap<String, Vec<NodeId>> {
        &mut self.by_slot_type
    }

    #[cfg(test)]
    pub(crate) fn provenance_mut_for_test(&mut self) -> &mut ProvenanceLog {
        &mut self.provenance
    }
}

fn index_add(index: &mut Index, key: &str, id: NodeId) {
    let ids = index.entry(key.to_string()).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn index_remove(index: &mut Index, key: &str, id: NodeId) {
    if let Some(ids) = index.get_mut(key) {
        ids.retain(|i| *i != id);
        if ids.is_empty() {
            index.shift_remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(slot_type: &str, default: &str) -> SlotNode {
        SlotNode::new(NodeId(0), slot_type, default, "", Options::new(), Some("a.json".into()))
    }

    fn small_graph() -> (SlotGraph, NodeId, NodeId) {
        let mut g = SlotGraph::with_root(node("main", "root_part"));
        let a = g.insert(node("Camso_Engine", "camso_engine_ec8ba"));
        g.link(a, g.root_id(), None);
        let b = g.insert(node("Camso_Intake", "camso_intake"));
        g.link(b, a, None);
        (g, a, b)
    }

    #[test]
    fn ids_are_sequential() {
        let (g, a, b) = small_graph();
        assert_eq!(g.root_id(), NodeId(0));
        assert_eq!(a, NodeId(1));
        assert_eq!(b, NodeId(2));
        assert_eq!(g.next_node_id(), NodeId(3));
    }

    #[test]
    fn suffix_taken_from_default() {
        let (g, a, _) = small_graph();
        assert_eq!(g.node(a).unwrap().suffix.as_deref(), Some("ec8ba"));
    }

    #[test]
    fn suffix_follows_remapped_default() {
        let (mut g, a, _) = small_graph();
        g.set_default_part(a, "camso_engine_f00d1");
        assert_eq!(g.node(a).unwrap().suffix.as_deref(), Some("f00d1"));

        g.set_default_part(a, "vx_engine");
        assert_eq!(g.node(a).unwrap().suffix, None);
    }

    #[test]
    fn structure_queries() {
        let (g, a, b) = small_graph();
        assert_eq!(g.ancestors(b), vec![a, g.root_id()]);
        assert_eq!(g.depth(b), 2);
        assert_eq!(g.descendants(g.root_id()), vec![a, b]);
    }

    #[test]
    fn descendant_cache_cleared_on_relink() {
        let (mut g, a, b) = small_graph();
        assert_eq!(g.descendants(a), vec![b]);
        g.unlink(b);
        g.link(b, g.root_id(), Some(a));
        assert!(g.descendants(a).is_empty());
        assert_eq!(g.root().children, vec![a, b]);
    }

    #[test]
    fn rename_keeps_indices_consistent() {
        let (mut g, a, _) = small_graph();
        g.set_slot_type(a, "vx_engine");
        g.set_default_part(a, "vx_engine_part");

        assert!(g.nodes_with_slot_type("Camso_Engine").is_empty());
        assert_eq!(g.nodes_with_slot_type("vx_engine")[0].id, a);
        assert_eq!(g.nodes_with_part("vx_engine_part")[0].id, a);
        assert!(g.index_mismatches().is_empty());
        assert_eq!(g.find("Camso_Engine").map(|n| n.id), Some(a));
    }

    #[test]
    fn stale_index_is_reported() {
        let (mut g, a, _) = small_graph();
        g.index_mut_for_test().insert("ghost".into(), vec![a]);
        let mismatches = g.index_mismatches();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].contains("ghost"));
    }

    #[test]
    fn pruning_is_inherited() {
        let (mut g, a, b) = small_graph();
        g.node_mut(a).unwrap().state = SlotState::Pruned;
        assert!(g.is_effectively_pruned(b));
        assert!(!g.is_effectively_pruned(g.root_id()));
        assert_eq!(g.active_nodes().len(), 1);
    }
}
