//! Property tests over randomly shaped donor trees.

use proptest::prelude::*;
use proptest::sample::Index;
use slot_document::{PartData, PartDocument, SlotEntry};
use slot_kernel::prelude::*;

/// Parent of every non-root node; node `i` hangs below some node `< i`
fn arb_parents() -> impl Strategy<Value = Vec<usize>> {
    (1usize..14).prop_flat_map(|n| {
        proptest::collection::vec(any::<Index>(), n - 1).prop_map(|picks| {
            picks
                .iter()
                .enumerate()
                .map(|(i, pick)| pick.index(i + 1))
                .collect()
        })
    })
}

fn document(parents: &[usize]) -> PartDocument {
    let n = parents.len() + 1;
    (0..n).fold(PartDocument::new(), |doc, i| {
        let part = parents
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == i)
            .fold(PartData::new(format!("T{i}")), |part, (c, _)| {
                let child = c + 1;
                part.with_slot(SlotEntry::new(format!("T{child}"), format!("p{child}"), "slot"))
            });
        doc.with_part(format!("p{i}"), part)
    })
}

fn build(parents: &[usize]) -> SlotGraph {
    let mut builder = SlotGraphBuilder::new();
    builder.add_document(document(parents), "tree.json");
    builder.build("p0").expect("generated root resolves")
}

fn has_ancestor(parents: &[usize], mut node: usize, ancestor: usize) -> bool {
    loop {
        if node == ancestor {
            return true;
        }
        if node == 0 {
            return false;
        }
        node = parents[node - 1];
    }
}

proptest! {
    #[test]
    fn prop_identity_policy_preserves_every_node(parents in arb_parents()) {
        let mut graph = build(&parents);
        let plan = plan(&graph, &DispositionRules::default(), "vx", &DiscoveryData::new());
        execute_all(&mut graph, &plan).expect("identity plan applies");

        prop_assert_eq!(graph.len(), parents.len() + 1);
        for node in graph.iter() {
            prop_assert_eq!(&node.slot_type, &node.original_slot_type);
            prop_assert_eq!(&node.default_part, &node.original_default_part);
            prop_assert_eq!(node.state, SlotState::Transformed);
        }
    }

    #[test]
    fn prop_executed_graph_validates(parents in arb_parents()) {
        let mut graph = build(&parents);
        let plan = plan(&graph, &DispositionRules::default(), "", &DiscoveryData::new());
        execute_all(&mut graph, &plan).expect("identity plan applies");

        let report = validate(&graph, false).expect("not raised");
        prop_assert!(report.valid, "{:?}", report.errors);
        prop_assert!(!report.has(FindingKind::Cycle));
        prop_assert!(graph.index_mismatches().is_empty());
        prop_assert!(graph.provenance().verify_integrity().is_ok());
        prop_assert_eq!(graph.provenance().len(), plan.len());
    }

    #[test]
    fn prop_prune_covers_exactly_the_subtree(parents in arb_parents(), pick in any::<Index>()) {
        let n = parents.len() + 1;
        let target = pick.index(n);
        prop_assume!(target != 0);

        let mut graph = build(&parents);
        let config = AdaptationConfig::default().prune(format!("T{target}"));
        let rules = DispositionRules::compile(&config).expect("no patterns");
        let plan = plan(&graph, &rules, "", &DiscoveryData::new());
        execute_all(&mut graph, &plan).expect("prune plan applies");

        prop_assert_eq!(graph.len(), n);
        for i in 0..n {
            let node = graph.find(&format!("T{i}")).expect("node kept");
            prop_assert_eq!(node.is_pruned(), has_ancestor(&parents, i, target));
        }
    }
}
