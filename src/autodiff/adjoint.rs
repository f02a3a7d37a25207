//! Reverse-mode accumulation of adjoints over traversal-relative output edges.

use crate::analysis::topology::RelativeOutputs;
use crate::autodiff::local;
use crate::error::{DagError, Result};
use crate::graph::ExprGraph;
use crate::store::NodeId;
use std::collections::HashMap;

/// Memoized ∂root/∂node for the nodes of one sub-DAG.
pub struct AdjointTable<'a> {
    root: NodeId,
    outputs: &'a RelativeOutputs,
    memo: HashMap<NodeId, NodeId>,
}

/// One pending accumulation: `acc` holds the terms for edges before `edge`.
struct Frame {
    node: NodeId,
    edge: usize,
    acc: NodeId,
}

impl<'a> AdjointTable<'a> {
    pub fn new(root: NodeId, outputs: &'a RelativeOutputs) -> Self {
        Self { root, outputs, memo: HashMap::new() }
    }

    /// Sums `adjoint(consumer) * ∂consumer/∂node` over every edge out of
    /// `node` that stays inside the sub-DAG.
    ///
    /// A node with no such edges contributes nothing and gets literal zero.
    /// Consumers are resolved on an explicit stack, so long chains do not
    /// grow the call stack.
    pub fn adjoint(&mut self, graph: &mut ExprGraph, node: NodeId) -> Result<NodeId> {
        if let Some(acc) = self.seed(graph, node) {
            return Ok(acc);
        }

        let outputs = self.outputs;
        let mut stack = vec![Frame { node, edge: 0, acc: graph.zero() }];
        while let Some(frame) = stack.last_mut() {
            let edges = outputs.get(&frame.node).map_or(&[][..], |e| e.as_slice());
            let Some(edge) = edges.get(frame.edge) else {
                self.memo.insert(frame.node, frame.acc);
                stack.pop();
                continue;
            };

            let Some(upstream) = self.seed(graph, edge.consumer) else {
                let acc = graph.zero();
                stack.push(Frame { node: edge.consumer, edge: 0, acc });
                continue;
            };
            let local = local::derivative(graph, edge.consumer, edge.position as usize)?;
            let term = graph.mul(upstream, local);
            frame.acc = graph.add(frame.acc, term);
            frame.edge += 1;
        }

        self.memo
            .get(&node)
            .copied()
            .ok_or_else(|| DagError::Misuse("adjoint accumulation ended without a value".into()))
    }

    /// The adjoint of `node` if it needs no accumulation: memoized, or the root.
    fn seed(&mut self, graph: &mut ExprGraph, node: NodeId) -> Option<NodeId> {
        if let Some(&known) = self.memo.get(&node) {
            return Some(known);
        }
        if node == self.root {
            let one = graph.one();
            self.memo.insert(node, one);
            return Some(one);
        }
        None
    }

    pub fn len(&self) -> usize { self.memo.len() }

    pub fn is_empty(&self) -> bool { self.memo.is_empty() }
}
