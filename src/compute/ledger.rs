//! ledger.rs
//! Per-call memo of evaluated node values.

use crate::store::NodeId;
use std::collections::HashMap;

/// Dense storage of evaluated values, indexed by node id.
///
/// A ledger belongs to exactly one evaluation environment. Reusing it with
/// different bindings requires [`Ledger::clear`] first.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    values: Vec<Option<f64>>,
    // Result tuples of Gradient nodes: primal followed by each partial.
    bundles: HashMap<NodeId, Vec<f64>>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn ensure_capacity(&mut self, size: usize) {
        if self.values.len() < size {
            self.values.resize(size, None);
        }
    }

    #[inline(always)]
    pub fn get(&self, node_id: NodeId) -> Option<f64> {
        self.values.get(node_id.index()).copied().flatten()
    }

    #[inline(always)]
    pub fn insert(&mut self, node_id: NodeId, value: f64) {
        let idx = node_id.index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
    }

    pub fn insert_bundle(&mut self, node_id: NodeId, values: Vec<f64>) {
        self.bundles.insert(node_id, values);
    }

    pub fn bundle(&self, node_id: NodeId) -> Option<&[f64]> {
        self.bundles.get(&node_id).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|slot| *slot = None);
        self.bundles.clear();
    }
}
