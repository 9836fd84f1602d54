//! Absorption of extraction-only slots
//!
//! A SOURCE node with a replacement rule never reaches output. Its child
//! whose base slot type matches the replacement is moved up to take its
//! place, carrying the donor suffix. Without such a child a replacement
//! slot is injected instead. Either way the SOURCE node is removed.

use super::{Derived, Planner};
use crate::disposition::ReplacementSpec;
use crate::graph::SlotNode;
use crate::suffix::{apply_suffix, has_suffix, matches_base};
use crate::transform::{
    Derivation, InjectedSlot, Placement, TransformOp, TransformValue, Transformation,
};
use crate::types::{AssetRole, Disposition, NodeId};
use tracing::{debug, warn};

impl Planner<'_> {
    /// Plan the replacement of `node`; `false` if it must stay in place
    pub(super) fn absorb(&mut self, node: &SlotNode, spec: &ReplacementSpec) -> bool {
        let Some(parent) = node.parent else {
            warn!(node = %node.id, slot_type = %node.slot_type, "root slot cannot be replaced, retained");
            return false;
        };
        let graph = self.graph;
        let suffix = node.suffix.as_deref();

        let matching = node.children.iter().copied().enumerate().find_map(|(i, c)| {
            graph
                .node(c)
                .filter(|child| matches_base(&child.slot_type, &spec.replacement_type))
                .map(|child| (child, i.checked_sub(1).map(|j| node.children[j])))
        });

        match matching {
            Some((child, previous)) => self.absorb_child(node, parent, child, previous, spec),
            None => self.inject_replacement(node, parent, spec),
        }

        self.push(
            Transformation::new(
                self.seq(),
                TransformOp::RemoveSlot,
                node.id,
                Derivation::Structural,
                format!("{} replaced by {}", node.slot_type, spec.replacement_type),
            )
            .before(TransformValue::SlotType(node.slot_type.clone())),
        );
        self.removed.insert(node.id);
        debug!(node = %node.id, suffix = suffix.unwrap_or("-"), "extraction-only slot replaced");
        true
    }

    fn absorb_child(
        &mut self,
        source: &SlotNode,
        parent: NodeId,
        child: &SlotNode,
        previous: Option<NodeId>,
        spec: &ReplacementSpec,
    ) {
        let suffix = source.suffix.as_deref();
        let parent_type = self
            .graph
            .node(parent)
            .map_or_else(String::new, |p| p.slot_type.clone());

        self.push(
            Transformation::new(
                self.seq(),
                TransformOp::AbsorbSlot,
                child.id,
                Derivation::Structural,
                format!(
                    "{} absorbed from {} into {parent_type}",
                    child.slot_type, source.slot_type
                ),
            )
            .before(TransformValue::Placement(Placement {
                parent: source.id,
                after: previous,
            }))
            .after(TransformValue::Placement(Placement {
                parent,
                after: Some(source.id),
            })),
        );

        let mut slot_type = child.slot_type.clone();
        if let Some(s) = suffix.filter(|s| !has_suffix(&child.slot_type, s)) {
            slot_type = apply_suffix(&child.slot_type, Some(s));
            self.push(
                Transformation::new(
                    self.seq(),
                    TransformOp::RenameSlotType,
                    child.id,
                    Derivation::Structural,
                    format!("suffix {s} carried over from {}", source.slot_type),
                )
                .before(TransformValue::SlotType(child.slot_type.clone()))
                .after(TransformValue::SlotType(slot_type.clone())),
            );
        }

        let (base_default, derivation) = match &spec.default {
            Some(d) => (d.as_str(), Derivation::Configured),
            None => (child.default_part.as_str(), Derivation::Structural),
        };
        if !base_default.is_empty() {
            let default = apply_suffix(base_default, suffix);
            if default != child.default_part {
                self.push(
                    Transformation::new(
                        self.seq(),
                        TransformOp::RemapDefault,
                        child.id,
                        derivation,
                        format!("absorbed default {default}"),
                    )
                    .before(TransformValue::DefaultPart(child.default_part.clone()))
                    .after(TransformValue::DefaultPart(default)),
                );
            }
        }

        if let Some(description) = spec.description.as_ref().filter(|d| **d != child.description) {
            self.push(
                Transformation::new(
                    self.seq(),
                    TransformOp::UpdateDescription,
                    child.id,
                    Derivation::Configured,
                    format!("replacement description for {}", spec.replacement_type),
                )
                .before(TransformValue::Description(child.description.clone()))
                .after(TransformValue::Description(description.clone())),
            );
        }

        if spec
            .options
            .iter()
            .any(|(k, v)| child.options.get(k) != Some(v))
        {
            self.push(
                Transformation::new(
                    self.seq(),
                    TransformOp::AddOptions,
                    child.id,
                    Derivation::Configured,
                    format!("replacement options for {}", spec.replacement_type),
                )
                .before(TransformValue::Options(child.options.clone()))
                .after(TransformValue::Options(spec.options.clone())),
            );
        }

        self.handled.insert(child.id);
        self.moved.insert(child.id, parent);
        self.planned_types.insert(slot_type);
    }

    fn inject_replacement(&mut self, source: &SlotNode, parent: NodeId, spec: &ReplacementSpec) {
        let suffix = source.suffix.as_deref();
        let default = if let Some(d) = &spec.default {
            Derived {
                value: d.clone(),
                derivation: Derivation::Configured,
                detail: format!("replacement default {d}"),
            }
        } else if let Some((role, value)) = spec
            .role
            .as_deref()
            .and_then(|r| self.discovery.get(r).map(|v| (r, v)))
        {
            Derived {
                value: value.to_string(),
                derivation: Derivation::Discovered,
                detail: format!("{role} -> {value}"),
            }
        } else {
            warn!(
                slot_type = %spec.replacement_type,
                "replacement default not configured or discovered, using the slot type"
            );
            Derived {
                value: spec.replacement_type.clone(),
                derivation: Derivation::Fallback,
                detail: format!("replacement default named after {}", spec.replacement_type),
            }
        };

        let slot_type = apply_suffix(&spec.replacement_type, suffix);
        let reserved = self.reserve_id();
        self.planned_types.insert(slot_type.clone());

        self.push(
            Transformation::new(
                self.seq(),
                TransformOp::InjectSlot,
                reserved,
                default.derivation,
                format!("replaces {}: {}", source.slot_type, default.detail),
            )
            .after(TransformValue::Slot(InjectedSlot {
                slot_type,
                default_part: apply_suffix(&default.value, suffix),
                description: spec.description.clone().unwrap_or_default(),
                options: spec.options.clone(),
                placement: Placement {
                    parent,
                    after: Some(source.id),
                },
                disposition: Disposition::Inject,
                asset_role: AssetRole::Target,
            })),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AdaptationConfig, ReplacementConfig};
    use crate::construction::SlotGraphBuilder;
    use crate::disposition::DispositionRules;
    use crate::graph::SlotGraph;
    use crate::planner::{plan, DiscoveryData};
    use crate::transform::{TransformOp, TransformValue};
    use pretty_assertions::assert_eq;
    use slot_document::{PartData, PartDocument, SlotEntry};

    fn rules() -> DispositionRules {
        let config = AdaptationConfig::default()
            .replace(
                "Struct",
                ReplacementConfig {
                    replacement_type: "Mesh".into(),
                    ..ReplacementConfig::default()
                },
            )
            .extraction_marker("structure");
        DispositionRules::compile(&config).unwrap()
    }

    fn graph(with_mesh: bool) -> SlotGraph {
        let mut structure = PartData::new("Struct");
        if with_mesh {
            structure = structure.with_slot(SlotEntry::new("Mesh", "mesh_part", ""));
        }
        let mut b = SlotGraphBuilder::new();
        b.add_document(
            PartDocument::new().with_part(
                "root",
                PartData::new("Root").with_slot(SlotEntry::new("Struct", "struct_ab12", "")),
            ),
            "root.json",
        );
        b.add_document(
            PartDocument::new()
                .with_part("struct_ab12", structure)
                .with_part("mesh_part", PartData::new("Mesh")),
            "structure.json",
        );
        b.build("root").unwrap()
    }

    fn effects(g: &SlotGraph) -> Vec<(TransformOp, u32)> {
        plan(g, &rules(), "", &DiscoveryData::new())
            .iter()
            .filter(|t| t.operation != TransformOp::Classify)
            .map(|t| (t.operation, t.target.0))
            .collect()
    }

    #[test]
    fn matching_child_is_absorbed() {
        let g = graph(true);
        assert_eq!(
            effects(&g),
            vec![
                (TransformOp::Retain, 0),
                (TransformOp::AbsorbSlot, 2),
                (TransformOp::RenameSlotType, 2),
                (TransformOp::RemapDefault, 2),
                (TransformOp::RemoveSlot, 1),
            ]
        );
        let p = plan(&g, &rules(), "", &DiscoveryData::new());
        assert_eq!(p.planned_slot_type(g.find("Mesh").unwrap().id), Some("Mesh_ab12"));
    }

    #[test]
    fn missing_child_is_injected_after_source() {
        let g = graph(false);
        let p = plan(&g, &rules(), "", &DiscoveryData::new());
        let inject = p
            .iter()
            .find(|t| t.operation == TransformOp::InjectSlot)
            .unwrap();
        assert_eq!(inject.target, g.next_node_id());
        assert!(inject.is_low_confidence());
        match &inject.after {
            Some(TransformValue::Slot(slot)) => {
                assert_eq!(slot.slot_type, "Mesh_ab12");
                assert_eq!(slot.default_part, "Mesh_ab12");
                assert_eq!(slot.placement.after, Some(g.find("Struct").unwrap().id));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
