//! Graphviz export of a root's sub-DAG.
use crate::analysis::topology;
use crate::graph::ExprGraph;
use crate::store::{NodeId, NodeKind};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Copies the sub-DAG of `root` into a petgraph graph.
///
/// Edges run from operand to consumer and carry the operand position.
pub fn to_petgraph(graph: &ExprGraph, root: NodeId) -> DiGraph<String, u32> {
    let mut out = DiGraph::new();
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();

    for node in topology::post_order(graph.registry(), root) {
        let idx = out.add_node(label(graph, node));
        index.insert(node, idx);
        for (position, operand) in graph.operands(node).iter().enumerate() {
            if let Some(&from) = index.get(operand) {
                out.add_edge(from, idx, position as u32);
            }
        }
    }
    out
}

fn label(graph: &ExprGraph, node: NodeId) -> String {
    match graph.kind(node) {
        NodeKind::Literal(v) => format!("{}", v),
        NodeKind::Variable(name) => name.clone(),
        NodeKind::Unary(op) => op.name().to_string(),
        NodeKind::Binary(op) => op.symbol().to_string(),
        NodeKind::Gradient { .. } => "gradient".to_string(),
    }
}

/// DOT text for the sub-DAG of `root`.
pub fn to_dot(graph: &ExprGraph, root: NodeId) -> String {
    format!("{}", Dot::new(&to_petgraph(graph, root)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_node_appears_once() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let y = g.var("y");
        let s = g.sin(x);
        let m = g.mul(s, y);
        let f = g.sub(m, s);

        let pg = to_petgraph(&g, f);
        assert_eq!(pg.node_count(), 5);
        assert_eq!(pg.edge_count(), 5);

        let dot = to_dot(&g, f);
        assert!(dot.starts_with("digraph {"));
        assert_eq!(dot.matches("label = \"sin\"").count(), 1);
        assert_eq!(dot.matches(" -> ").count(), 5);
    }
}
