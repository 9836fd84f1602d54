//! Post-execution validation
//!
//! Every check runs independently and reports findings as data. Only
//! [`validate`] with `raise_on_error` turns errors into a
//! [`ValidationFailure`].

use crate::error::ValidationFailure;
use crate::graph::{SlotGraph, SlotNode};
use crate::types::{Disposition, NodeId};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Graph must not be used for output
    Error,
    /// Worth a look; output is still possible
    Warning,
}

/// What a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Default part is not in the catalog, produced here, or external
    UnresolvedDefault,
    /// An adapted slot's part is referenced by no surviving slot
    UnreferencedAdaptedPart,
    /// Catalog part referenced by no surviving slot
    UnreferencedPart,
    /// Parent/child links form a cycle
    Cycle,
    /// Parent and child disagree about their link
    BrokenLink,
    /// A recorded transformation targets a node that does not exist
    MissingTransformTarget,
    /// An auxiliary index disagrees with the node map
    IndexInconsistency,
    /// The provenance hash chain does not verify
    ProvenanceIntegrity,
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    /// Severity
    pub severity: Severity,
    /// Kind
    pub kind: FindingKind,
    /// Node concerned, if any
    pub node: Option<NodeId>,
    /// Human-readable detail
    pub message: String,
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{node}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Validation verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// No errors were found
    pub valid: bool,
    /// Error findings
    pub errors: Vec<ValidationFinding>,
    /// Warning findings
    pub warnings: Vec<ValidationFinding>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationReport {
    /// Errors followed by warnings
    pub fn findings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.errors.iter().chain(self.warnings.iter())
    }

    /// Findings of one kind
    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &ValidationFinding> {
        self.findings().filter(move |f| f.kind == kind)
    }

    /// Whether any finding has this kind
    #[must_use]
    pub fn has(&self, kind: FindingKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    fn push(&mut self, severity: Severity, kind: FindingKind, node: Option<NodeId>, message: String) {
        let finding = ValidationFinding {
            severity,
            kind,
            node,
            message,
        };
        match severity {
            Severity::Error => {
                self.valid = false;
                self.errors.push(finding);
            }
            Severity::Warning => self.warnings.push(finding),
        }
    }
}

/// Validate a graph
///
/// # Errors
/// With `raise_on_error`, returns [`ValidationFailure`] carrying the full
/// report when any error finding exists. Otherwise never fails.
pub fn validate(graph: &SlotGraph, raise_on_error: bool) -> Result<ValidationReport, ValidationFailure> {
    let mut report = ValidationReport::default();

    check_defaults(graph, &mut report);
    check_adapted_parts(graph, &mut report);
    check_catalog_references(graph, &mut report);
    check_links(graph, &mut report);
    check_cycles(graph, &mut report);
    check_transform_targets(graph, &mut report);
    check_indices(graph, &mut report);
    check_provenance(graph, &mut report);

    info!(
        graph = %graph.id(),
        valid = report.valid,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validation finished"
    );
    for finding in &report.errors {
        warn!(kind = ?finding.kind, "{finding}");
    }

    if raise_on_error && !report.valid {
        return Err(ValidationFailure {
            report: Box::new(report),
        });
    }
    Ok(report)
}

fn is_resolved(graph: &SlotGraph, node: &SlotNode) -> bool {
    let part = node.default_part.as_str();
    let namespace = graph.target_namespace();
    part.is_empty()
        || graph.catalog_lookup(part).is_some()
        || (part == node.original_default_part && node.resolved_part.is_some())
        || node.produced_default(part)
        || (!namespace.is_empty() && part.starts_with(&format!("{namespace}_")))
}

fn check_defaults(graph: &SlotGraph, report: &mut ValidationReport) {
    for node in graph.active_nodes() {
        if is_resolved(graph, node) {
            continue;
        }
        let severity = if node.is_root() {
            Severity::Error
        } else {
            Severity::Warning
        };
        debug!(node = %node.id, default = %node.default_part, "unresolved default");
        report.push(
            severity,
            FindingKind::UnresolvedDefault,
            Some(node.id),
            format!(
                "slot '{}' default '{}' is not a known part (may be an external reference)",
                node.slot_type, node.default_part
            ),
        );
    }
}

fn check_adapted_parts(graph: &SlotGraph, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for node in graph.nodes_by_disposition(Disposition::Adapt) {
        let part = node.default_part.as_str();
        if part.is_empty() || !seen.insert(part) {
            continue;
        }
        let referenced = graph
            .nodes_with_part(part)
            .iter()
            .any(|n| !graph.is_effectively_pruned(n.id));
        if !referenced {
            report.push(
                Severity::Warning,
                FindingKind::UnreferencedAdaptedPart,
                Some(node.id),
                format!("adapted part '{part}' is not referenced by any active slot"),
            );
        }
    }
}

fn check_catalog_references(graph: &SlotGraph, report: &mut ValidationReport) {
    let active = graph.active_nodes();
    let referenced: HashSet<&str> = active
        .iter()
        .flat_map(|n| [n.resolved_part.as_deref(), Some(n.default_part.as_str())])
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();
    for name in graph.catalog().keys() {
        if !referenced.contains(name.as_str()) {
            report.push(
                Severity::Warning,
                FindingKind::UnreferencedPart,
                None,
                format!("part '{name}' is not referenced by any active slot"),
            );
        }
    }
}

fn check_links(graph: &SlotGraph, report: &mut ValidationReport) {
    for node in graph.iter() {
        for child in &node.children {
            match graph.node(*child) {
                None => report.push(
                    Severity::Error,
                    FindingKind::BrokenLink,
                    Some(node.id),
                    format!("child {child} does not exist"),
                ),
                Some(c) if c.parent != Some(node.id) => report.push(
                    Severity::Error,
                    FindingKind::BrokenLink,
                    Some(*child),
                    format!("listed under {} but its parent is {:?}", node.id, c.parent),
                ),
                Some(_) => {}
            }
        }
        match node.parent {
            None if node.id != graph.root_id() => report.push(
                Severity::Error,
                FindingKind::BrokenLink,
                Some(node.id),
                "detached from the tree".to_string(),
            ),
            Some(parent)
                if !graph
                    .node(parent)
                    .is_some_and(|p| p.children.contains(&node.id)) =>
            {
                report.push(
                    Severity::Error,
                    FindingKind::BrokenLink,
                    Some(node.id),
                    format!("parent {parent} does not list it as a child"),
                );
            }
            _ => {}
        }
    }
}

fn check_cycles(graph: &SlotGraph, report: &mut ValidationReport) {
    let mut links = DiGraphMap::<NodeId, ()>::new();
    for node in graph.iter() {
        links.add_node(node.id);
        for child in &node.children {
            links.add_edge(node.id, *child, ());
        }
    }
    if !is_cyclic_directed(&links) {
        return;
    }
    for component in tarjan_scc(&links) {
        let looped = component.len() > 1
            || component
                .first()
                .is_some_and(|n| links.contains_edge(*n, *n));
        if looped {
            let mut members = component;
            members.sort_unstable();
            report.push(
                Severity::Error,
                FindingKind::Cycle,
                members.first().copied(),
                format!("circular parent/child links among {members:?}"),
            );
        }
    }
}

fn check_transform_targets(graph: &SlotGraph, report: &mut ValidationReport) {
    for entry in graph.provenance().entries() {
        if !graph.contains(entry.node) {
            report.push(
                Severity::Error,
                FindingKind::MissingTransformTarget,
                Some(entry.node),
                format!("{} (seq {}) targets a missing node", entry.operation, entry.seq),
            );
        }
    }
    for node in graph.iter() {
        for t in node.transformation_history.iter().filter(|t| t.target != node.id) {
            report.push(
                Severity::Error,
                FindingKind::MissingTransformTarget,
                Some(node.id),
                format!("history holds seq {} aimed at {}", t.seq, t.target),
            );
        }
    }
}

fn check_indices(graph: &SlotGraph, report: &mut ValidationReport) {
    for mismatch in graph.index_mismatches() {
        report.push(Severity::Error, FindingKind::IndexInconsistency, None, mismatch);
    }
}

fn check_provenance(graph: &SlotGraph, report: &mut ValidationReport) {
    if let Err(e) = graph.provenance().verify_integrity() {
        report.push(Severity::Error, FindingKind::ProvenanceIntegrity, None, e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptationConfig;
    use crate::construction::SlotGraphBuilder;
    use crate::disposition::DispositionRules;
    use crate::executor::execute_all;
    use crate::planner::{plan, DiscoveryData};
    use pretty_assertions::assert_eq;
    use slot_document::{PartData, PartDocument, SlotEntry};

    fn build(doc: PartDocument) -> SlotGraph {
        let mut b = SlotGraphBuilder::new();
        b.add_document(doc, "car.json");
        b.build("car").unwrap()
    }

    fn run(g: &mut SlotGraph, config: &AdaptationConfig) {
        let rules = DispositionRules::compile(config).unwrap();
        let p = plan(g, &rules, "vx", &DiscoveryData::new());
        execute_all(g, &p).unwrap();
    }

    fn car() -> PartDocument {
        PartDocument::new()
            .with_part(
                "car",
                PartData::new("main")
                    .with_slot(SlotEntry::new("Camso_Body", "body", ""))
                    .with_slot(SlotEntry::new("Camso_Badge", "badge_chrome", "")),
            )
            .with_part(
                "body",
                PartData::new("Camso_Body").with_slot(SlotEntry::new("Camso_Engine", "camso_engine_ec8ba", "")),
            )
            .with_part("camso_engine_ec8ba", PartData::new("Camso_Engine"))
    }

    #[test]
    fn clean_run_is_valid() {
        let mut g = build(car());
        run(&mut g, &AdaptationConfig::default());
        let report = validate(&g, true).unwrap();
        assert!(report.valid);
        let unresolved: Vec<_> = report.of_kind(FindingKind::UnresolvedDefault).collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].severity, Severity::Warning);
        assert!(unresolved[0].message.contains("badge_chrome"));
    }

    #[test]
    fn remapped_defaults_count_as_resolved() {
        let mut g = build(car());
        run(&mut g, &AdaptationConfig::builtin());
        let report = validate(&g, false).unwrap();
        let engine = g.find("vx_engine").unwrap();
        assert_eq!(engine.default_part, "vx_camso_engine_ec8ba");
        assert!(report
            .of_kind(FindingKind::UnresolvedDefault)
            .all(|f| f.node != Some(engine.id)));
    }

    #[test]
    fn adapted_part_under_pruned_parent_is_unreferenced() {
        let mut g = build(car());
        run(&mut g, &AdaptationConfig::builtin().prune("Camso_Body"));
        let report = validate(&g, false).unwrap();
        assert!(report.valid);
        assert!(report.has(FindingKind::UnreferencedAdaptedPart));
        assert!(report
            .of_kind(FindingKind::UnreferencedPart)
            .any(|f| f.message.contains("'body'")));
    }

    #[test]
    fn cycles_and_broken_links_are_errors() {
        let mut g = build(car());
        let body = g.find("Camso_Body").unwrap().id;
        let engine = g.find("Camso_Engine").unwrap().id;
        g.node_mut(engine).unwrap().children.push(body);

        let report = validate(&g, false).unwrap();
        assert!(!report.valid);
        assert!(report.has(FindingKind::Cycle));
        assert!(report.has(FindingKind::BrokenLink));
    }

    #[test]
    fn index_and_provenance_corruption_are_errors() {
        let mut g = build(car());
        run(&mut g, &AdaptationConfig::default());
        g.index_mut_for_test().insert("ghost".into(), vec![NodeId(1)]);
        g.provenance_mut_for_test().entries_mut()[0].reason = "edited".into();

        let report = validate(&g, false).unwrap();
        assert!(report.has(FindingKind::IndexInconsistency));
        assert!(report.has(FindingKind::ProvenanceIntegrity));
    }

    #[test]
    fn raise_on_error_returns_the_report() {
        let mut g = build(car());
        g.node_mut(NodeId(1)).unwrap().parent = None;
        let failure = validate(&g, true).unwrap_err();
        assert!(failure.report.has(FindingKind::BrokenLink));
        assert!(failure.to_string().contains("error(s)"));
    }

    #[test]
    fn unresolved_root_default_is_an_error() {
        let mut g = build(car());
        g.set_default_part(g.root_id(), "nowhere");
        let report = validate(&g, false).unwrap();
        let finding = report.of_kind(FindingKind::UnresolvedDefault).next().unwrap();
        assert_eq!(finding.severity, Severity::Error);
        assert_eq!(finding.node, Some(g.root_id()));
    }
}
