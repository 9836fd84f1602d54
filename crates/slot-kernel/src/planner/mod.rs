//! Transformation planner
//!
//! Computes the complete, ordered list of [`Transformation`]s for a graph
//! without mutating it. Order:
//!
//! 1. `CLASSIFY` for every node, in id order
//! 2. effect operations per node, in id order, skipping nodes inside a
//!    subtree planned for removal and nodes already handled by absorption
//! 3. injections for required slots the donor lacks
//!
//! Target-namespace names are read from [`DiscoveryData`]. Namespace
//! substitution is used only when discovery has no answer, and every such
//! record carries [`Derivation::Fallback`].

mod absorption;

use crate::disposition::{AdaptRule, Classification, DispositionRules, MatchedRule};
use crate::graph::{SlotGraph, SlotNode};
use crate::suffix::strip_suffix;
use crate::transform::{
    Derivation, InjectedSlot, Placement, TransformOp, TransformValue, Transformation,
};
use crate::types::{AssetRole, Disposition, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use slot_document::Options;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Externally discovered names, keyed by logical role
///
/// e.g. `"engine_slot" → "vehicleX_engine"`, `"mount_slot" → "etk_enginemounts"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoveryData {
    entries: IndexMap<String, String>,
}

impl DiscoveryData {
    /// Empty discovery data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, role: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(role.into(), value.into());
        self
    }

    /// Value for a role
    #[must_use]
    pub fn get(&self, role: &str) -> Option<&str> {
        self.entries.get(role).map(String::as_str)
    }

    /// Number of roles known
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was discovered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DiscoveryData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Counts over a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Number of records
    pub total: usize,
    /// Records per operation
    pub by_operation: BTreeMap<TransformOp, usize>,
    /// Nodes per planned disposition (injections included)
    pub by_disposition: BTreeMap<Disposition, usize>,
    /// Records with a fallback derivation
    pub low_confidence: usize,
}

/// Ordered transformation plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    namespace: String,
    transformations: Vec<Transformation>,
}

impl Plan {
    /// Namespace the plan transforms toward
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Records in execution order
    #[must_use]
    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    /// Iterate records in execution order
    pub fn iter(&self) -> std::slice::Iter<'_, Transformation> {
        self.transformations.iter()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    /// Whether the plan is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    /// Records targeting one node
    pub fn for_node(&self, id: NodeId) -> impl Iterator<Item = &Transformation> {
        self.transformations.iter().filter(move |t| t.target == id)
    }

    /// Slot type a node will have after execution, if the plan renames it
    #[must_use]
    pub fn planned_slot_type(&self, id: NodeId) -> Option<&str> {
        self.for_node(id)
            .filter_map(|t| match (&t.operation, &t.after) {
                (TransformOp::RenameSlotType, Some(TransformValue::SlotType(s))) => Some(s.as_str()),
                (TransformOp::InjectSlot, Some(TransformValue::Slot(s))) => Some(s.slot_type.as_str()),
                _ => None,
            })
            .last()
    }

    /// Reserved ids of injected nodes
    #[must_use]
    pub fn injected(&self) -> Vec<NodeId> {
        self.transformations
            .iter()
            .filter(|t| t.operation == TransformOp::InjectSlot)
            .map(|t| t.target)
            .collect()
    }

    /// Counts per operation and planned disposition
    #[must_use]
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            total: self.transformations.len(),
            ..PlanSummary::default()
        };
        for t in &self.transformations {
            *summary.by_operation.entry(t.operation).or_default() += 1;
            if t.is_low_confidence() {
                summary.low_confidence += 1;
            }
            let disposition = match (&t.operation, &t.after) {
                (TransformOp::Classify, Some(TransformValue::Classification { disposition, .. })) => {
                    Some(*disposition)
                }
                (TransformOp::InjectSlot, Some(TransformValue::Slot(s))) => Some(s.disposition),
                _ => None,
            };
            if let Some(d) = disposition {
                *summary.by_disposition.entry(d).or_default() += 1;
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Transformation;
    type IntoIter = std::slice::Iter<'a, Transformation>;

    fn into_iter(self) -> Self::IntoIter {
        self.transformations.iter()
    }
}

/// Plan the transformation of `graph` toward `namespace`
///
/// Never fails: missing discovery data degrades to flagged fallbacks.
#[must_use]
pub fn plan(
    graph: &SlotGraph,
    rules: &DispositionRules,
    namespace: &str,
    discovery: &DiscoveryData,
) -> Plan {
    let mut planner = Planner {
        graph,
        rules,
        namespace,
        discovery,
        out: Vec::new(),
        next_id: graph.next_node_id(),
        decisions: HashMap::new(),
        removed: HashSet::new(),
        handled: HashSet::new(),
        moved: HashMap::new(),
        planned_types: HashSet::new(),
    };

    planner.classify_all();
    planner.plan_effects();
    planner.plan_required_slots();

    let plan = Plan {
        namespace: namespace.to_string(),
        transformations: planner.out,
    };
    let summary = plan.summary();
    info!(
        graph = %graph.id(),
        namespace,
        transformations = summary.total,
        low_confidence = summary.low_confidence,
        "plan computed"
    );
    plan
}

struct Planner<'a> {
    graph: &'a SlotGraph,
    rules: &'a DispositionRules,
    namespace: &'a str,
    discovery: &'a DiscoveryData,
    out: Vec<Transformation>,
    next_id: NodeId,
    decisions: HashMap<NodeId, (Classification, AssetRole)>,
    removed: HashSet<NodeId>,
    handled: HashSet<NodeId>,
    moved: HashMap<NodeId, NodeId>,
    planned_types: HashSet<String>,
}

/// A derived name and how it was obtained
struct Derived {
    value: String,
    derivation: Derivation,
    detail: String,
}

impl<'a> Planner<'a> {
    fn seq(&self) -> u64 {
        u64::try_from(self.out.len()).unwrap_or(u64::MAX)
    }

    fn push(&mut self, transformation: Transformation) {
        self.out.push(transformation);
    }

    fn reserve_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    fn fallback_name(&self, stem: &str) -> Option<String> {
        (!self.namespace.is_empty()).then(|| format!("{}_{stem}", self.namespace))
    }

    /// Discovery first, namespace substitution last
    fn derive(&self, role: Option<&str>, fallback: Option<String>) -> Option<Derived> {
        if let Some((role, value)) = role.and_then(|r| self.discovery.get(r).map(|v| (r, v))) {
            return Some(Derived {
                value: value.to_string(),
                derivation: Derivation::Discovered,
                detail: format!("{role} -> {value}"),
            });
        }
        let value = fallback?;
        warn!(role = role.unwrap_or("-"), value = %value, "discovery has no answer, using namespace fallback");
        Some(Derived {
            detail: format!(
                "{} not discovered, namespace substitution {value}",
                role.unwrap_or("role")
            ),
            value,
            derivation: Derivation::Fallback,
        })
    }

    fn planned_parent(&self, id: NodeId) -> Option<NodeId> {
        self.moved
            .get(&id)
            .copied()
            .or_else(|| self.graph.node(id).and_then(|n| n.parent))
    }

    fn inside_removed(&self, id: NodeId) -> bool {
        let mut current = self.planned_parent(id);
        let mut steps = 0;
        while let Some(p) = current {
            if self.removed.contains(&p) {
                return true;
            }
            steps += 1;
            if steps > self.graph.len() {
                break;
            }
            current = self.planned_parent(p);
        }
        false
    }

    // ------------------------------------------------------------------
    // Phase 1
    // ------------------------------------------------------------------

    fn classify_all(&mut self) {
        for node in self.graph.iter() {
            let classification = self.rules.classify(node);
            let role = self.rules.asset_role(node, classification.disposition);
            let derivation = if classification.matched.is_configured() {
                Derivation::Configured
            } else {
                Derivation::Policy
            };
            debug!(
                node = %node.id,
                slot_type = %node.slot_type,
                disposition = %classification.disposition,
                role = %role,
                rule = %classification.matched,
                "classified"
            );
            self.push(
                Transformation::new(
                    self.seq(),
                    TransformOp::Classify,
                    node.id,
                    derivation,
                    format!(
                        "{} -> {}/{role} ({})",
                        node.slot_type, classification.disposition, classification.matched
                    ),
                )
                .before(TransformValue::Classification {
                    disposition: node.disposition,
                    asset_role: node.asset_role,
                })
                .after(TransformValue::Classification {
                    disposition: classification.disposition,
                    asset_role: role,
                }),
            );
            self.decisions.insert(node.id, (classification, role));
        }
    }

    // ------------------------------------------------------------------
    // Phase 2
    // ------------------------------------------------------------------

    fn plan_effects(&mut self) {
        let graph = self.graph;
        let rules = self.rules;
        for node in graph.iter() {
            if self.handled.contains(&node.id) || self.inside_removed(node.id) {
                continue;
            }
            let Some((classification, role)) = self.decisions.get(&node.id).cloned() else {
                continue;
            };
            let planned_before = self.out.len();

            if classification.disposition == Disposition::Prune {
                self.push(
                    Transformation::new(
                        self.seq(),
                        TransformOp::PruneSubtree,
                        node.id,
                        Derivation::Configured,
                        format!("{} pruned with its subtree ({})", node.slot_type, classification.matched),
                    )
                    .before(TransformValue::SlotType(node.slot_type.clone())),
                );
                self.removed.insert(node.id);
                continue;
            }

            if rules.is_removed(&node.original_slot_type) {
                self.push(
                    Transformation::new(
                        self.seq(),
                        TransformOp::RemoveSlot,
                        node.id,
                        Derivation::Configured,
                        format!("{} on remove list", node.slot_type),
                    )
                    .before(TransformValue::SlotType(node.slot_type.clone())),
                );
                self.removed.insert(node.id);
                continue;
            }

            if role == AssetRole::Source {
                if let Some(spec) = &classification.replacement {
                    if self.absorb(node, spec) {
                        continue;
                    }
                }
            }

            match classification.disposition {
                Disposition::Adapt => {
                    let rule = match classification.matched {
                        MatchedRule::AdaptPattern(i) => rules.adapt_rule(i),
                        _ => None,
                    };
                    self.plan_adapt(node, rule);
                }
                Disposition::RemapDefault => {
                    self.plan_remap(node, Some(node.original_slot_type.as_str()));
                }
                Disposition::Preserve | Disposition::Inject | Disposition::Prune => {}
            }

            self.plan_configured(node);

            if self.out.len() == planned_before {
                self.push(Transformation::new(
                    self.seq(),
                    TransformOp::Retain,
                    node.id,
                    Derivation::Policy,
                    format!("{} kept as-is", node.slot_type),
                ));
            }
        }
    }

    fn plan_adapt(&mut self, node: &SlotNode, rule: Option<&AdaptRule>) {
        let stem = rule
            .and_then(|r| r.fallback_suffix.clone())
            .unwrap_or_else(|| fallback_stem(&node.original_slot_type));
        let slot_role = rule.and_then(|r| r.slot_role.as_deref());

        if let Some(derived) = self.derive(slot_role, self.fallback_name(&stem)) {
            if derived.value != node.slot_type {
                self.planned_types.insert(derived.value.clone());
                self.push(
                    Transformation::new(
                        self.seq(),
                        TransformOp::RenameSlotType,
                        node.id,
                        derived.derivation,
                        derived.detail,
                    )
                    .before(TransformValue::SlotType(node.slot_type.clone()))
                    .after(TransformValue::SlotType(derived.value)),
                );
            }
        }

        self.plan_remap(node, rule.and_then(|r| r.part_role.as_deref()));

        if self.rules.mark_core_slots() && !node.options.contains_key("coreSlot") {
            self.push(
                Transformation::new(
                    self.seq(),
                    TransformOp::AddOptions,
                    node.id,
                    Derivation::Configured,
                    format!("{} marked core slot", node.slot_type),
                )
                .before(TransformValue::Options(node.options.clone()))
                .after(TransformValue::Options(Options::from_iter([(
                    "coreSlot".to_string(),
                    json!(true),
                )]))),
            );
        }
    }

    fn plan_remap(&mut self, node: &SlotNode, part_role: Option<&str>) {
        if node.default_part.is_empty() {
            return;
        }
        let prefix = format!("{}_", self.namespace);
        let fallback = if self.namespace.is_empty() || node.default_part.starts_with(&prefix) {
            None
        } else {
            self.fallback_name(&node.default_part)
        };
        if let Some(derived) = self.derive(part_role, fallback) {
            if derived.value != node.default_part {
                self.push(
                    Transformation::new(
                        self.seq(),
                        TransformOp::RemapDefault,
                        node.id,
                        derived.derivation,
                        derived.detail,
                    )
                    .before(TransformValue::DefaultPart(node.default_part.clone()))
                    .after(TransformValue::DefaultPart(derived.value)),
                );
            }
        }
    }

    fn plan_configured(&mut self, node: &SlotNode) {
        if let Some(options) = self.rules.options_for(&node.original_slot_type) {
            if options.iter().any(|(k, v)| node.options.get(k) != Some(v)) {
                self.push(
                    Transformation::new(
                        self.seq(),
                        TransformOp::AddOptions,
                        node.id,
                        Derivation::Configured,
                        format!("slot options for {}", node.slot_type),
                    )
                    .before(TransformValue::Options(node.options.clone()))
                    .after(TransformValue::Options(options.clone())),
                );
            }
        }
        if let Some(description) = self.rules.description_for(&node.original_slot_type) {
            if description != node.description {
                self.push(
                    Transformation::new(
                        self.seq(),
                        TransformOp::UpdateDescription,
                        node.id,
                        Derivation::Configured,
                        format!("slot description for {}", node.slot_type),
                    )
                    .before(TransformValue::Description(node.description.clone()))
                    .after(TransformValue::Description(description.to_string())),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 3
    // ------------------------------------------------------------------

    fn slot_type_present(&self, slot_type: &str) -> bool {
        self.planned_types.contains(slot_type)
            || self
                .graph
                .nodes_with_slot_type(slot_type)
                .iter()
                .any(|n| !self.removed.contains(&n.id) && !self.inside_removed(n.id))
    }

    fn plan_required_slots(&mut self) {
        let rules = self.rules;
        for required in rules.required_slots() {
            let Some(slot) = self.derive(
                Some(required.role.as_str()),
                self.fallback_name(&required.fallback_suffix),
            ) else {
                warn!(role = %required.role, "required slot has no discovery answer and no namespace; skipped");
                continue;
            };
            if self.slot_type_present(&slot.value) {
                debug!(slot_type = %slot.value, "required slot already present");
                continue;
            }

            let default_part = required
                .default_role
                .as_deref()
                .and_then(|r| self.discovery.get(r))
                .unwrap_or(slot.value.as_str())
                .to_string();
            let reserved = self.reserve_id();
            let root = self.graph.root_id();
            self.planned_types.insert(slot.value.clone());
            debug!(node = %reserved, slot_type = %slot.value, "required slot injected");

            self.push(
                Transformation::new(
                    self.seq(),
                    TransformOp::InjectSlot,
                    reserved,
                    slot.derivation,
                    format!("required by target: {}", slot.detail),
                )
                .after(TransformValue::Slot(InjectedSlot {
                    slot_type: slot.value,
                    default_part,
                    description: required.description.clone(),
                    options: required.options.clone(),
                    placement: Placement {
                        parent: root,
                        after: None,
                    },
                    disposition: Disposition::Inject,
                    asset_role: AssetRole::Target,
                })),
            );
        }
    }
}

/// Lower-case stem of a slot type without its donor prefix
///
/// `Camso_Engine` → `engine`, `Camso_TransferCase_ab12` → `transfercase`.
fn fallback_stem(slot_type: &str) -> String {
    let base = strip_suffix(slot_type);
    base.split_once('_')
        .map_or(base, |(_, rest)| rest)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptationConfig;
    use crate::construction::SlotGraphBuilder;
    use pretty_assertions::assert_eq;
    use slot_document::{PartData, PartDocument, SlotEntry};

    fn engine_graph() -> SlotGraph {
        let doc = PartDocument::new()
            .with_part(
                "camso_engine_ec8ba",
                PartData::new("Camso_Engine")
                    .with_slot(SlotEntry::new("Camso_Intake", "camso_intake_na", "Intake"))
                    .with_slot(SlotEntry::new("Camso_Nitrous", "", "Nitrous")),
            )
            .with_part("camso_intake_na", PartData::new("Camso_Intake"));
        let mut b = SlotGraphBuilder::new();
        b.add_document(doc, "camso_engine.jbeam");
        b.build("camso_engine_ec8ba").unwrap()
    }

    fn rules(config: &AdaptationConfig) -> DispositionRules {
        DispositionRules::compile(config).unwrap()
    }

    #[test]
    fn classify_comes_first_for_every_node() {
        let g = engine_graph();
        let p = plan(&g, &DispositionRules::default(), "vx", &DiscoveryData::new());
        let classify: Vec<_> = p.iter().take(g.len()).map(|t| (t.operation, t.target)).collect();
        assert_eq!(
            classify,
            g.node_ids().map(|id| (TransformOp::Classify, id)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn identity_rules_only_retain() {
        let g = engine_graph();
        let p = plan(&g, &DispositionRules::default(), "vx", &DiscoveryData::new());
        let summary = p.summary();
        assert_eq!(summary.by_operation[&TransformOp::Classify], g.len());
        assert_eq!(summary.by_operation[&TransformOp::Retain], g.len());
        assert_eq!(summary.total, 2 * g.len());
    }

    #[test]
    fn seq_matches_position() {
        let g = engine_graph();
        let p = plan(&g, &rules(&AdaptationConfig::builtin()), "vx", &DiscoveryData::new());
        for (i, t) in p.iter().enumerate() {
            assert_eq!(t.seq, i as u64);
        }
    }

    #[test]
    fn discovery_wins_over_fallback() {
        let g = engine_graph();
        let discovery = DiscoveryData::new().with("engine_slot", "vehicleX_engine");
        let p = plan(&g, &rules(&AdaptationConfig::builtin()), "vx", &discovery);

        let rename = p
            .for_node(g.root_id())
            .find(|t| t.operation == TransformOp::RenameSlotType)
            .unwrap();
        assert_eq!(p.planned_slot_type(g.root_id()), Some("vehicleX_engine"));
        assert!(rename.reason.starts_with("discovered:"));
        assert!(!rename.is_low_confidence());
    }

    #[test]
    fn fallback_is_flagged() {
        let g = engine_graph();
        let p = plan(&g, &rules(&AdaptationConfig::builtin()), "vx", &DiscoveryData::new());

        assert_eq!(p.planned_slot_type(g.root_id()), Some("vx_engine"));
        let remap = p
            .for_node(g.root_id())
            .find(|t| t.operation == TransformOp::RemapDefault)
            .unwrap();
        assert_eq!(remap.after, Some(TransformValue::DefaultPart("vx_camso_engine_ec8ba".into())));
        assert!(remap.reason.starts_with("fallback:"));
        assert!(p.summary().low_confidence >= 2);
    }

    #[test]
    fn required_slot_injected_with_reserved_id() {
        let g = engine_graph();
        let discovery = DiscoveryData::new().with("mount_slot", "etk_enginemounts");
        let p = plan(&g, &rules(&AdaptationConfig::builtin()), "vx", &discovery);

        assert_eq!(p.injected(), vec![g.next_node_id()]);
        let inject = p.iter().last().unwrap();
        match &inject.after {
            Some(TransformValue::Slot(slot)) => {
                assert_eq!(slot.slot_type, "etk_enginemounts");
                assert_eq!(slot.default_part, "etk_enginemounts");
                assert_eq!(slot.placement.parent, g.root_id());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pruned_subtree_is_not_planned_further() {
        let g = engine_graph();
        let config = AdaptationConfig::default().prune("Camso_Engine");
        let p = plan(&g, &rules(&config), "", &DiscoveryData::new());

        let effects: Vec<_> = p
            .iter()
            .filter(|t| t.operation != TransformOp::Classify)
            .map(|t| t.operation)
            .collect();
        assert_eq!(effects, vec![TransformOp::PruneSubtree]);
    }

    #[test]
    fn empty_namespace_disables_fallbacks() {
        let g = engine_graph();
        let p = plan(&g, &rules(&AdaptationConfig::builtin()), "", &DiscoveryData::new());
        assert!(p.iter().all(|t| !t.is_low_confidence()));
        assert!(p.injected().is_empty());
    }

    #[test]
    fn stems() {
        assert_eq!(fallback_stem("Camso_Engine"), "engine");
        assert_eq!(fallback_stem("Engine"), "engine");
        assert_eq!(fallback_stem("Camso_TransferCase_ab12"), "transfercase");
    }
}
