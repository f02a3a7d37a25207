use super::types::*;
use log::trace;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Structural key of a node: its tag plus the identities of its operands.
pub(crate) type NodeKey = (NodeKind, SmallVec<[NodeId; 2]>);

/// Dense columnar storage for every node of one expression DAG.
///
/// Nodes are never removed individually. The only way to forget them is
/// [`Registry::reset`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Columnar Arrays
    pub kinds: Vec<NodeKind>,

    // Topology (CSR operands)
    pub parents_flat: Vec<NodeId>,
    pub parents_ranges: Vec<(u32, u32)>, // (start, count)

    // Output edges, one linked list per node
    pub first_child: Vec<u32>,
    pub child_targets: Vec<NodeId>,
    pub child_positions: Vec<u32>,
    pub next_child: Vec<u32>,

    // Canonicalization table
    interned: HashMap<NodeKey, NodeId>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    pub fn contains(&self, id: NodeId) -> bool { id.index() < self.kinds.len() }

    /// Forgets every node and restarts id assignment from zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the canonical node for `(kind, operands)`, registering it
    /// if no structurally equal node exists yet.
    ///
    /// Ids are assigned only on a miss, so a lookup that collapses into an
    /// existing node leaves the id sequence contiguous.
    pub fn intern(&mut self, kind: NodeKind, operands: &[NodeId]) -> NodeId {
        let key: NodeKey = (kind, SmallVec::from_slice(operands));
        if let Some(&existing) = self.interned.get(&key) {
            trace!("intern hit {:?} -> {:?}", key.0, existing);
            return existing;
        }

        let id = self.add_node(key.0.clone(), operands);
        trace!("intern miss {:?} -> {:?}", key.0, id);
        self.interned.insert(key, id);
        id
    }

    fn add_node(&mut self, kind: NodeKind, parents: &[NodeId]) -> NodeId {
        let id = NodeId(self.kinds.len() as u32);

        // 1. Register Parents
        let start = self.parents_flat.len() as u32;
        let count = parents.len() as u32;
        self.parents_flat.extend_from_slice(parents);
        self.parents_ranges.push((start, count));

        // 2. Register Output Edges (one per operand slot)
        for (position, &parent) in parents.iter().enumerate() {
            let p_idx = parent.index();
            let head = self.first_child[p_idx];
            let new_edge = self.child_targets.len() as u32;
            self.child_targets.push(id);
            self.child_positions.push(position as u32);
            self.next_child.push(head);
            self.first_child[p_idx] = new_edge;
        }

        // 3. Metadata
        self.kinds.push(kind);
        self.first_child.push(u32::MAX);

        id
    }

    #[inline(always)]
    pub fn get_parents(&self, id: NodeId) -> &[NodeId] {
        let (start, count) = self.parents_ranges[id.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    #[inline(always)]
    pub fn kind(&self, id: NodeId) -> &NodeKind { &self.kinds[id.index()] }

    /// Iterates the store-level output edges of `id`, most recent first.
    pub fn outputs(&self, id: NodeId) -> OutputIter<'_> {
        OutputIter { registry: self, edge: self.first_child[id.index()] }
    }
}

pub struct OutputIter<'a> {
    registry: &'a Registry,
    edge: u32,
}

impl Iterator for OutputIter<'_> {
    type Item = OutputEdge;

    fn next(&mut self) -> Option<Self::Item> {
        if self.edge == u32::MAX {
            return None;
        }
        let idx = self.edge as usize;
        self.edge = self.registry.next_child[idx];
        Some(OutputEdge {
            consumer: self.registry.child_targets[idx],
            position: self.registry.child_positions[idx],
        })
    }
}
