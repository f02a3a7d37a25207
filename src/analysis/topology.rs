use crate::store::{NodeId, NodeKind, OutputEdge, Registry};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Output edges restricted to one traversal: for each visited node, the
/// visited consumers that read it and at which operand position.
pub type RelativeOutputs = HashMap<NodeId, SmallVec<[OutputEdge; 2]>>;

/// Everything a single DFS from a root learns about its sub-DAG.
#[derive(Debug, Clone, Default)]
pub struct Reachability {
    /// Post-order: every operand appears before its consumer.
    pub order: Vec<NodeId>,
    /// Variables reached, sorted by name.
    pub free_vars: Vec<NodeId>,
    pub outputs: RelativeOutputs,
}

/// Walks the sub-DAG of `root` once, in post-order.
///
/// Because every operand is created before its consumer, the walk needs no
/// cycle detection. The walk keeps its own stack, so depth is bounded only
/// by memory.
pub fn reach(registry: &Registry, root: NodeId) -> Reachability {
    let mut state = Reachability::default();
    let mut visited = vec![false; registry.count()];
    // (node, next operand position to visit)
    let mut stack: Vec<(NodeId, usize)> = Vec::new();
    enter(root, registry, &mut visited, &mut state, &mut stack);

    while let Some(frame) = stack.last_mut() {
        let (node, position) = *frame;
        let operands = registry.get_parents(node);
        if position == operands.len() {
            state.order.push(node);
            stack.pop();
            continue;
        }
        frame.1 += 1;

        let operand = operands[position];
        state
            .outputs
            .entry(operand)
            .or_default()
            .push(OutputEdge { consumer: node, position: position as u32 });
        enter(operand, registry, &mut visited, &mut state, &mut stack);
    }

    state.free_vars.sort_by(|a, b| var_name(registry, *a).cmp(var_name(registry, *b)));
    state
}

fn enter(
    node: NodeId,
    registry: &Registry,
    visited: &mut [bool],
    state: &mut Reachability,
    stack: &mut Vec<(NodeId, usize)>,
) {
    let idx = node.index();
    if visited[idx] {
        return;
    }
    visited[idx] = true;

    if let NodeKind::Variable(_) = registry.kind(node) {
        state.free_vars.push(node);
    }
    stack.push((node, 0));
}

fn var_name(registry: &Registry, id: NodeId) -> &str {
    match registry.kind(id) {
        NodeKind::Variable(name) => name,
        _ => "",
    }
}

/// Returns the nodes of `root`'s sub-DAG with every dependency before its consumer.
pub fn post_order(registry: &Registry, root: NodeId) -> Vec<NodeId> {
    reach(registry, root).order
}

/// Free variables reachable from `root`, sorted by name.
pub fn free_variables(registry: &Registry, root: NodeId) -> Vec<NodeId> {
    reach(registry, root).free_vars
}
