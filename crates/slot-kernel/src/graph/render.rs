//! Text rendering of a slot graph for debugging

use super::SlotGraph;
use crate::types::NodeId;
use std::fmt::Write as _;

const LEGEND: &str = "state: o=original p=planned T=transformed V=validated X=pruned | \
disposition: P=preserve A=adapt I=inject X=prune R=remap | \
role: s=source t=target p=preserve i=internal";

impl SlotGraph {
    /// Indented tree with `[state disposition role]` markers per node
    #[must_use]
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{LEGEND}");
        self.render_node(self.root_id(), 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        let _ = write!(
            out,
            "{:indent$}[{}{}{}] {} = {}",
            "",
            node.state.marker(),
            node.disposition.marker(),
            node.asset_role.marker(),
            node.slot_type,
            if node.default_part.is_empty() {
                "<empty>"
            } else {
                node.default_part.as_str()
            },
            indent = depth * 2,
        );
        if node.slot_type != node.original_slot_type {
            let _ = write!(out, "  (was {})", node.original_slot_type);
        }
        out.push('\n');
        for child in &node.children {
            if *child != id {
                self.render_node(*child, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{SlotGraph, SlotNode};
    use crate::types::NodeId;
    use slot_document::Options;

    #[test]
    fn renders_nested_markers() {
        let mut g = SlotGraph::with_root(SlotNode::new(
            NodeId(0),
            "main",
            "car",
            "",
            Options::new(),
            None,
        ));
        let child = g.insert(SlotNode::new(NodeId(0), "nitrous", "", "", Options::new(), None));
        g.link(child, g.root_id(), None);

        let text = g.render_tree();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[1], "[oPp] main = car");
        assert_eq!(lines[2], "  [oPp] nitrous = <empty>");
    }
}
