//! Execution phase
//!
//! Applies a [`Plan`] to a [`SlotGraph`], one record at a time, in `seq`
//! order. Each record is checked, applied, appended to the target node's
//! history and to the provenance chain.
//!
//! # Critical Invariant
//!
//! The executor makes **no policy decisions**. Every decision was taken by
//! the planner. The executor only:
//! - rejects records already applied to their node (`seq` guard)
//! - enforces the lifecycle state machine
//! - keeps indices, links and provenance consistent
//! - carries the structural consequences of a move or removal to the
//!   subtree below it
//!
//! Any error aborts the run and leaves the graph partially transformed;
//! callers should discard it.

use crate::error::{ExecutionError, InvalidStateTransitionError, TransitionCause};
use crate::graph::{SlotGraph, SlotNode};
use crate::planner::Plan;
use crate::state_machine::validate_transition;
use crate::transform::{TransformOp, TransformValue, Transformation};
use crate::types::{AssetRole, Disposition, NodeId, SlotState};
use crate::validation::ValidationReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outcome of a successful execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Records applied
    pub applied: usize,
    /// Records applied per operation
    pub by_operation: BTreeMap<TransformOp, usize>,
    /// Nodes created by injection
    pub injected: Vec<NodeId>,
    /// Nodes in the PRUNED state afterwards
    pub pruned: usize,
    /// Applied records with a fallback derivation
    pub low_confidence: usize,
}

impl ExecutionSummary {
    fn record(&mut self, t: &Transformation) {
        self.applied += 1;
        *self.by_operation.entry(t.operation).or_default() += 1;
        if t.operation == TransformOp::InjectSlot {
            self.injected.push(t.target);
        }
        if t.is_low_confidence() {
            self.low_confidence += 1;
        }
    }
}

/// Apply every record of `plan` in order
///
/// Sets the graph's target namespace from the plan first.
///
/// # Errors
/// Returns the first [`ExecutionError`]; later records are not applied.
pub fn execute_all(graph: &mut SlotGraph, plan: &Plan) -> Result<ExecutionSummary, ExecutionError> {
    graph.set_target_namespace(plan.namespace());

    let mut summary = ExecutionSummary::default();
    for transformation in plan {
        apply(graph, transformation)?;
        summary.record(transformation);
    }
    summary.pruned = graph.iter().filter(|n| n.is_pruned()).count();

    info!(
        graph = %graph.id(),
        applied = summary.applied,
        injected = summary.injected.len(),
        pruned = summary.pruned,
        provenance_head = graph.provenance().head_hex().unwrap_or_default(),
        "plan executed"
    );
    Ok(summary)
}

/// Apply a single record
///
/// # Errors
/// - [`ExecutionError::InvalidStateTransition`] when the record was already
///   applied or the lifecycle forbids the transition
/// - [`ExecutionError::NodeNotFound`] for an unknown target or parent
/// - [`ExecutionError::InjectionDesync`] when an injection's reserved id is
///   not the id the graph would allocate
/// - [`ExecutionError::MalformedRecord`] when a required value is missing
pub fn apply(graph: &mut SlotGraph, t: &Transformation) -> Result<(), ExecutionError> {
    if t.operation == TransformOp::InjectSlot {
        return inject(graph, t);
    }

    let node = graph.node(t.target).ok_or(ExecutionError::NodeNotFound {
        node: t.target,
        seq: t.seq,
    })?;
    check_not_applied(node, t)?;
    let to = t.operation.resulting_state();
    validate_transition(node.state, to)
        .map_err(|e| transition_error(node, t, TransitionCause::Illegal(e)))?;

    let id = t.target;
    match t.operation {
        TransformOp::Classify => {
            let Some(TransformValue::Classification {
                disposition,
                asset_role,
            }) = &t.after
            else {
                return Err(malformed(t, "classification"));
            };
            set(graph, id, |n| {
                n.disposition = *disposition;
                n.asset_role = *asset_role;
            });
        }
        // injections are dispatched before the node lookup
        TransformOp::Retain | TransformOp::InjectSlot => {}
        // absorbed children were unlinked by their earlier ABSORB_SLOT
        TransformOp::RemoveSlot => prune_descendants(graph, t)?,
        TransformOp::RenameSlotType => {
            let Some(TransformValue::SlotType(slot_type)) = &t.after else {
                return Err(malformed(t, "slot type"));
            };
            graph.set_slot_type(id, slot_type);
        }
        TransformOp::RemapDefault => {
            let Some(TransformValue::DefaultPart(part)) = &t.after else {
                return Err(malformed(t, "default part"));
            };
            graph.set_default_part(id, part);
        }
        TransformOp::AbsorbSlot => {
            let Some(TransformValue::Placement(placement)) = &t.after else {
                return Err(malformed(t, "placement"));
            };
            if !graph.contains(placement.parent) {
                return Err(ExecutionError::NodeNotFound {
                    node: placement.parent,
                    seq: t.seq,
                });
            }
            graph.unlink(id);
            graph.link(id, placement.parent, placement.after);
            set(graph, id, |n| {
                n.disposition = Disposition::Inject;
                n.asset_role = AssetRole::Target;
            });
            release_absorbed_subtree(graph, id);
        }
        TransformOp::PruneSubtree => prune_descendants(graph, t)?,
        TransformOp::AddOptions => {
            let Some(TransformValue::Options(options)) = &t.after else {
                return Err(malformed(t, "options"));
            };
            set(graph, id, |n| {
                for (key, value) in options {
                    n.options.insert(key.clone(), value.clone());
                }
            });
        }
        TransformOp::UpdateDescription => {
            let Some(TransformValue::Description(description)) = &t.after else {
                return Err(malformed(t, "description"));
            };
            set(graph, id, |n| n.description.clone_from(description));
        }
    }

    set(graph, id, |n| n.state = to);
    graph.record(t.clone());
    debug!(transformation = %t, "applied");
    Ok(())
}

/// Move every TRANSFORMED node to VALIDATED when `report` is valid
///
/// Returns the number of nodes sealed; zero for an invalid report.
pub fn seal(graph: &mut SlotGraph, report: &ValidationReport) -> usize {
    if !report.valid {
        return 0;
    }
    let ids: Vec<NodeId> = graph
        .iter()
        .filter(|n| {
            n.state == SlotState::Transformed
                && validate_transition(n.state, SlotState::Validated).is_ok()
        })
        .map(|n| n.id)
        .collect();
    for id in &ids {
        set(graph, *id, |n| n.state = SlotState::Validated);
    }
    info!(graph = %graph.id(), sealed = ids.len(), "graph sealed");
    ids.len()
}

fn inject(graph: &mut SlotGraph, t: &Transformation) -> Result<(), ExecutionError> {
    if let Some(existing) = graph.node(t.target) {
        check_not_applied(existing, t)?;
    }
    let expected = graph.next_node_id();
    if t.target != expected {
        return Err(ExecutionError::InjectionDesync {
            expected,
            actual: t.target,
        });
    }
    let Some(TransformValue::Slot(slot)) = &t.after else {
        return Err(malformed(t, "slot"));
    };
    if !graph.contains(slot.placement.parent) {
        return Err(ExecutionError::NodeNotFound {
            node: slot.placement.parent,
            seq: t.seq,
        });
    }

    let mut node = SlotNode::new(
        expected,
        slot.slot_type.clone(),
        slot.default_part.clone(),
        slot.description.clone(),
        slot.options.clone(),
        None,
    );
    node.disposition = slot.disposition;
    node.asset_role = slot.asset_role;
    for to in [SlotState::Planned, SlotState::Transformed] {
        validate_transition(node.state, to)
            .map_err(|e| transition_error(&node, t, TransitionCause::Illegal(e)))?;
        node.state = to;
    }

    let id = graph.insert(node);
    graph.link(id, slot.placement.parent, slot.placement.after);
    graph.record(t.clone());
    debug!(transformation = %t, "applied");
    Ok(())
}

fn prune_descendants(graph: &mut SlotGraph, t: &Transformation) -> Result<(), ExecutionError> {
    let mut targets = Vec::new();
    for id in graph.descendants(t.target) {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if node.is_pruned() {
            continue;
        }
        validate_transition(node.state, SlotState::Pruned)
            .map_err(|e| transition_error(node, t, TransitionCause::Illegal(e)))?;
        targets.push(id);
    }
    for id in targets {
        set(graph, id, |n| n.state = SlotState::Pruned);
    }
    Ok(())
}

/// Descendants that came along with an absorbed node leave the
/// extraction-only document with it and are exported unchanged.
fn release_absorbed_subtree(graph: &mut SlotGraph, id: NodeId) {
    let carried: Vec<NodeId> = graph
        .descendants(id)
        .into_iter()
        .filter(|d| graph.node(*d).is_some_and(|n| n.asset_role == AssetRole::Source))
        .collect();
    for d in carried {
        set(graph, d, |n| n.asset_role = AssetRole::Preserve);
    }
}

fn check_not_applied(node: &SlotNode, t: &Transformation) -> Result<(), ExecutionError> {
    match node.last_seq() {
        Some(last_seq) if t.seq <= last_seq => Err(transition_error(
            node,
            t,
            TransitionCause::AlreadyApplied { last_seq },
        )),
        _ => Ok(()),
    }
}

fn transition_error(node: &SlotNode, t: &Transformation, cause: TransitionCause) -> ExecutionError {
    InvalidStateTransitionError {
        node: node.id,
        slot_type: node.slot_type.clone(),
        from: node.state,
        operation: t.operation,
        seq: t.seq,
        cause,
    }
    .into()
}

fn malformed(t: &Transformation, expected: &'static str) -> ExecutionError {
    ExecutionError::MalformedRecord {
        seq: t.seq,
        operation: t.operation,
        expected,
    }
}

fn set(graph: &mut SlotGraph, id: NodeId, f: impl FnOnce(&mut SlotNode)) {
    if let Some(node) = graph.node_mut(id) {
        f(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptationConfig;
    use crate::construction::SlotGraphBuilder;
    use crate::disposition::DispositionRules;
    use crate::planner::{plan, DiscoveryData};
    use crate::transform::Derivation;
    use pretty_assertions::assert_eq;
    use slot_document::{PartData, PartDocument, SlotEntry};

    fn graph() -> SlotGraph {
        let doc = PartDocument::new()
            .with_part(
                "camso_engine_ec8ba",
                PartData::new("Camso_Engine")
                    .with_slot(SlotEntry::new("Camso_Intake", "camso_intake_na", ""))
                    .with_slot(SlotEntry::new("Camso_Nitrous", "camso_nitrous_ec8ba", "")),
            )
            .with_part(
                "camso_nitrous_ec8ba",
                PartData::new("Camso_Nitrous").with_slot(SlotEntry::new("Camso_N2O_Tank", "", "")),
            );
        let mut b = SlotGraphBuilder::new();
        b.add_document(doc, "camso_engine.jbeam");
        b.build("camso_engine_ec8ba").unwrap()
    }

    fn planned(g: &SlotGraph, config: &AdaptationConfig) -> Plan {
        plan(g, &DispositionRules::compile(config).unwrap(), "vx", &DiscoveryData::new())
    }

    #[test]
    fn executes_builtin_plan() {
        let mut g = graph();
        let p = planned(&g, &AdaptationConfig::builtin());
        let summary = execute_all(&mut g, &p).unwrap();

        assert_eq!(summary.applied, p.len());
        assert_eq!(g.target_namespace(), "vx");
        assert_eq!(g.root().slot_type, "vx_engine");
        assert_eq!(g.root().state, SlotState::Transformed);
        assert_eq!(summary.injected.len(), 1);
        assert_eq!(g.provenance().len(), p.len());
        assert!(g.index_mismatches().is_empty());
    }

    #[test]
    fn second_execution_is_rejected() {
        let mut g = graph();
        let p = planned(&g, &AdaptationConfig::default());
        execute_all(&mut g, &p).unwrap();

        let err = apply(&mut g, &p.transformations()[0]).unwrap_err();
        match err {
            ExecutionError::InvalidStateTransition(e) => assert!(e.is_double_apply()),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn prune_marks_descendants_only() {
        let mut g = graph();
        let p = planned(&g, &AdaptationConfig::default().prune("Camso_Nitrous"));
        execute_all(&mut g, &p).unwrap();

        let nitrous = g.find("Camso_Nitrous").unwrap().id;
        let tank = g.find("Camso_N2O_Tank").unwrap().id;
        assert_eq!(g.node(nitrous).unwrap().state, SlotState::Pruned);
        assert_eq!(g.node(tank).unwrap().state, SlotState::Pruned);
        assert_eq!(g.root().state, SlotState::Transformed);
        assert_eq!(g.len(), 4);
    }

    #[test]
    fn remove_prunes_what_is_still_attached() {
        let mut g = graph();
        let p = planned(&g, &AdaptationConfig::default().remove("Camso_Nitrous"));
        execute_all(&mut g, &p).unwrap();

        let nitrous = g.find("Camso_Nitrous").unwrap();
        let tank = g.find("Camso_N2O_Tank").unwrap();
        assert_eq!(nitrous.state, SlotState::Pruned);
        assert_eq!(tank.state, SlotState::Pruned);
        assert_eq!(tank.parent, Some(nitrous.id));
        assert!(p.for_node(tank.id).all(|t| t.operation == TransformOp::Classify));
    }

    #[test]
    fn injection_requires_reserved_id() {
        let mut g = graph();
        let bogus = Transformation::new(0, TransformOp::InjectSlot, NodeId(99), Derivation::Configured, "x")
            .after(TransformValue::Slot(crate::transform::InjectedSlot {
                slot_type: "X".into(),
                default_part: String::new(),
                description: String::new(),
                options: slot_document::Options::new(),
                placement: crate::transform::Placement {
                    parent: g.root_id(),
                    after: None,
                },
                disposition: Disposition::Inject,
                asset_role: AssetRole::Target,
            }));
        assert!(matches!(
            apply(&mut g, &bogus),
            Err(ExecutionError::InjectionDesync { .. })
        ));
    }

    #[test]
    fn skipping_classification_is_illegal() {
        let mut g = graph();
        let t = Transformation::new(0, TransformOp::Retain, g.root_id(), Derivation::Policy, "x");
        let err = apply(&mut g, &t).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidStateTransition(ref e) if !e.is_double_apply()));
    }

    #[test]
    fn missing_value_is_malformed() {
        let mut g = graph();
        let t = Transformation::new(0, TransformOp::Classify, g.root_id(), Derivation::Policy, "x");
        assert!(matches!(
            apply(&mut g, &t),
            Err(ExecutionError::MalformedRecord { expected: "classification", .. })
        ));
    }

    #[test]
    fn seal_requires_valid_report() {
        let mut g = graph();
        let p = planned(&g, &AdaptationConfig::default());
        execute_all(&mut g, &p).unwrap();

        let invalid = ValidationReport {
            valid: false,
            ..ValidationReport::default()
        };
        assert_eq!(seal(&mut g, &invalid), 0);
        assert_eq!(seal(&mut g, &ValidationReport::default()), g.len());
        assert!(g.iter().all(|n| n.state == SlotState::Validated));
    }
}
