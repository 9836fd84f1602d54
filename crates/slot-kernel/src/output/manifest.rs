//! Export manifest
//!
//! Breadth-first listing of surviving slots plus the document copy plan a
//! packager needs: which donor documents are copied as-is, which are
//! regenerated under a target-namespace name, and which are dropped
//! entirely.

use crate::graph::{SlotGraph, SlotNode};
use crate::types::{AssetRole, Disposition, NodeId, SlotState, SourceId};
use crate::validation::ValidationReport;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use slot_document::Options;
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::{debug, info};

/// One surviving slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Node id
    pub node: NodeId,
    /// Current slot type
    pub slot_type: String,
    /// Slot type as first seen
    pub original_slot_type: String,
    /// Current default part
    pub default_part: String,
    /// Default part as first seen
    pub original_default_part: String,
    /// Description
    pub description: String,
    /// Disposition
    pub disposition: Disposition,
    /// Asset role
    pub asset_role: AssetRole,
    /// Lifecycle state
    pub state: SlotState,
    /// Originating document
    pub source_file: Option<SourceId>,
    /// Output needs a regenerated document
    pub requires_generation: bool,
    /// Non-pruned children
    pub children: Vec<NodeId>,
    /// Options
    pub options: Options,
}

impl ManifestEntry {
    fn from_node(graph: &SlotGraph, node: &SlotNode) -> Self {
        Self {
            node: node.id,
            slot_type: node.slot_type.clone(),
            original_slot_type: node.original_slot_type.clone(),
            default_part: node.default_part.clone(),
            original_default_part: node.original_default_part.clone(),
            description: node.description.clone(),
            disposition: node.disposition,
            asset_role: node.asset_role,
            state: node.state,
            source_file: node.source_file.clone(),
            requires_generation: matches!(
                node.disposition,
                Disposition::Adapt | Disposition::Inject | Disposition::RemapDefault
            ) || node.is_modified(),
            children: node
                .children
                .iter()
                .copied()
                .filter(|c| graph.node(*c).is_some_and(|n| !n.is_pruned() && is_emitted(n)))
                .collect(),
            options: node.options.clone(),
        }
    }
}

/// Breadth-first walk over surviving slots
///
/// Pruned subtrees are not entered. SOURCE and INTERNAL nodes yield no
/// entry but their children are still visited.
#[derive(Debug)]
pub struct ManifestWalker<'g> {
    graph: &'g SlotGraph,
    queue: VecDeque<NodeId>,
    visited: HashSet<NodeId>,
}

impl<'g> ManifestWalker<'g> {
    /// Walker starting at the root
    #[must_use]
    pub fn new(graph: &'g SlotGraph) -> Self {
        Self {
            graph,
            queue: VecDeque::from([graph.root_id()]),
            visited: HashSet::new(),
        }
    }

    /// Collect every entry
    #[must_use]
    pub fn walk(graph: &'g SlotGraph) -> Vec<ManifestEntry> {
        Self::new(graph).collect()
    }
}

impl Iterator for ManifestWalker<'_> {
    type Item = ManifestEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.queue.pop_front() {
            if !self.visited.insert(id) {
                continue;
            }
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            if node.is_pruned() {
                continue;
            }
            self.queue.extend(node.children.iter().copied());
            if !is_emitted(node) {
                debug!(node = %id, role = %node.asset_role, "not exported, children still visited");
                continue;
            }
            return Some(ManifestEntry::from_node(self.graph, node));
        }
        None
    }
}

fn is_emitted(node: &SlotNode) -> bool {
    !matches!(node.asset_role, AssetRole::Source | AssetRole::Internal)
}

/// A donor document in the copy plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCopy {
    /// Donor document
    pub source: SourceId,
    /// Slot types it provides
    pub provides_slots: Vec<String>,
    /// Disposition of the first slot that listed it
    pub disposition: Disposition,
    /// Name of the regenerated document, when one is needed
    pub output_name: Option<String>,
}

/// A donor document none of whose slots survive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedDocument {
    /// Donor document
    pub source: SourceId,
    /// Why it is left out
    pub reason: String,
    /// Slot types it would have provided
    pub pruned_slots: Vec<String>,
}

/// Document handling for packaging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPlan {
    /// Copied unchanged
    pub original_documents: Vec<DocumentCopy>,
    /// Regenerated under the target namespace
    pub generated_documents: Vec<DocumentCopy>,
    /// Not packaged at all
    pub excluded_documents: Vec<ExcludedDocument>,
}

/// Manifest counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStatistics {
    /// Entries in the manifest
    pub total_slots: usize,
    /// Entries per disposition
    pub by_disposition: BTreeMap<Disposition, usize>,
    /// Entries per state
    pub by_state: BTreeMap<SlotState, usize>,
    /// Documents copied unchanged
    pub original_documents: usize,
    /// Documents regenerated
    pub generated_documents: usize,
    /// Documents excluded
    pub excluded_documents: usize,
    /// Applied transformations
    pub transformations_applied: usize,
    /// Applied transformations with a fallback derivation
    pub low_confidence: usize,
}

/// Everything an exporter needs from one adaptation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Target namespace
    pub namespace: String,
    /// Root node
    pub root: NodeId,
    /// Surviving slots, breadth-first
    pub slots: Vec<ManifestEntry>,
    /// Document handling
    pub copy_plan: CopyPlan,
    /// Original → current slot types
    pub slot_type_mappings: IndexMap<String, String>,
    /// Original → current default parts
    pub part_name_mappings: IndexMap<String, String>,
    /// Counts
    pub statistics: ManifestStatistics,
    /// Validation verdict the manifest was generated with
    pub validation: ValidationReport,
    /// Head of the provenance chain
    pub provenance_head: Option<String>,
}

impl Manifest {
    /// Generate the manifest for an executed graph
    #[must_use]
    pub fn generate(graph: &SlotGraph, report: &ValidationReport) -> Self {
        let slots = ManifestWalker::walk(graph);
        let copy_plan = copy_plan(graph, &slots);
        let summary = graph.transformation_summary();

        let mut statistics = ManifestStatistics {
            total_slots: slots.len(),
            original_documents: copy_plan.original_documents.len(),
            generated_documents: copy_plan.generated_documents.len(),
            excluded_documents: copy_plan.excluded_documents.len(),
            transformations_applied: summary.total,
            low_confidence: summary.low_confidence,
            ..ManifestStatistics::default()
        };
        for entry in &slots {
            *statistics.by_disposition.entry(entry.disposition).or_default() += 1;
            *statistics.by_state.entry(entry.state).or_default() += 1;
        }

        info!(
            graph = %graph.id(),
            slots = statistics.total_slots,
            original = statistics.original_documents,
            generated = statistics.generated_documents,
            excluded = statistics.excluded_documents,
            "manifest generated"
        );

        Self {
            namespace: graph.target_namespace().to_string(),
            root: graph.root_id(),
            slots,
            copy_plan,
            slot_type_mappings: graph.slot_type_mappings(),
            part_name_mappings: graph.part_name_mappings(),
            statistics,
            validation: report.clone(),
            provenance_head: graph.provenance().head_hex(),
        }
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    /// Propagates [`serde_json::Error`].
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `{namespace}_{stem}_adapted`, keeping the donor extension
fn adapted_name(namespace: &str, source: &SourceId) -> Option<String> {
    if namespace.is_empty() {
        return None;
    }
    let stem = source.stem();
    let extension = source
        .as_str()
        .rsplit(['/', '\\'])
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty());
    Some(match extension {
        Some(ext) => format!("{namespace}_{stem}_adapted.{ext}"),
        None => format!("{namespace}_{stem}_adapted"),
    })
}

#[derive(Clone, Copy)]
enum Bucket {
    Original(usize),
    Generated(usize),
    Neither,
}

fn copy_plan(graph: &SlotGraph, slots: &[ManifestEntry]) -> CopyPlan {
    let mut plan = CopyPlan::default();
    let mut seen: IndexMap<&SourceId, Bucket> = IndexMap::new();

    for entry in slots {
        let Some(source) = &entry.source_file else {
            continue;
        };
        if let Some(bucket) = seen.get(source) {
            let target = match *bucket {
                Bucket::Original(i) => plan.original_documents.get_mut(i),
                Bucket::Generated(i) => plan.generated_documents.get_mut(i),
                Bucket::Neither => None,
            };
            if let Some(doc) = target {
                doc.provides_slots.push(entry.slot_type.clone());
            }
            continue;
        }

        let copy = DocumentCopy {
            source: source.clone(),
            provides_slots: vec![entry.slot_type.clone()],
            disposition: entry.disposition,
            output_name: None,
        };
        let bucket = if entry.requires_generation {
            plan.generated_documents.push(DocumentCopy {
                output_name: adapted_name(graph.target_namespace(), source),
                ..copy
            });
            Bucket::Generated(plan.generated_documents.len() - 1)
        } else if entry.disposition == Disposition::Preserve {
            plan.original_documents.push(copy);
            Bucket::Original(plan.original_documents.len() - 1)
        } else {
            Bucket::Neither
        };
        seen.insert(source, bucket);
    }

    for source in graph.source_files() {
        let nodes = graph.nodes_from_source(source);
        if !nodes.is_empty() && nodes.iter().all(|n| graph.is_effectively_pruned(n.id)) {
            plan.excluded_documents.push(ExcludedDocument {
                source: SourceId::new(source),
                reason: "all_slots_pruned".to_string(),
                pruned_slots: nodes.iter().map(|n| n.slot_type.clone()).collect(),
            });
        }
    }
    plan
}
