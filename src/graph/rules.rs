//! Per-operator construction rules.
//!
//! Each constructor is the only sanctioned way to build a node of its
//! operator. Rules are tried in priority order and the first one that fires
//! returns an already canonical node; only a candidate that survives every
//! rule reaches the intern table.
//!
//! 1. Constant folding when every operand is a literal.
//! 2. Commutative canonicalization (`Add`, `Mul`): a literal goes left,
//!    otherwise the smaller id goes left.
//! 3. Identity / annihilator elimination.
//! 4. Self-reference collapse (`x + x`, `x * x`).
//! 5. Reassociation (`Add`, `Mul`) rotating literals towards the root.
//!
//! # Panics
//!
//! The constructors index the store directly and panic on an operand id this
//! graph never handed out. [`ExprGraph::try_unary`] and
//! [`ExprGraph::try_binary`] report such ids as
//! [`DagError::Misuse`](crate::error::DagError::Misuse) instead.

use super::dag::ExprGraph;
use crate::error::Result;
use crate::store::{BinaryOp, NodeId, NodeKind, UnaryOp};

impl ExprGraph {
    pub fn unary(&mut self, op: UnaryOp, x: NodeId) -> NodeId {
        match op {
            UnaryOp::Neg => self.neg(x),
            UnaryOp::Exp => self.exp(x),
            UnaryOp::Log => self.log(x),
            UnaryOp::Sin => self.sin(x),
            UnaryOp::Cos => self.cos(x),
        }
    }

    pub fn binary(&mut self, op: BinaryOp, x: NodeId, y: NodeId) -> NodeId {
        match op {
            BinaryOp::Add => self.add(x, y),
            BinaryOp::Sub => self.sub(x, y),
            BinaryOp::Mul => self.mul(x, y),
            BinaryOp::Div => self.div(x, y),
            BinaryOp::Pow => self.pow(x, y),
        }
    }

    /// [`ExprGraph::unary`] for operands that may not belong to this graph.
    pub fn try_unary(&mut self, op: UnaryOp, x: NodeId) -> Result<NodeId> {
        self.check(x)?;
        Ok(self.unary(op, x))
    }

    /// [`ExprGraph::binary`] for operands that may not belong to this graph.
    pub fn try_binary(&mut self, op: BinaryOp, x: NodeId, y: NodeId) -> Result<NodeId> {
        self.check(x)?;
        self.check(y)?;
        Ok(self.binary(op, x, y))
    }

    pub fn add(&mut self, x: NodeId, y: NodeId) -> NodeId {
        if let Some(folded) = self.fold(x, y, |a, b| a + b) {
            return folded;
        }
        let (x, y) = self.commute(x, y);

        if self.is_literal(x, 0.0) {
            return y; // 0 + y = y
        }
        if x == y {
            let two = self.two();
            return self.mul(two, x); // x + x = 2 * x
        }
        if let Some(a) = self.negated(x) {
            if a == y {
                return self.zero(); // -y + y = 0
            }
            return self.sub(y, a); // -a + y = y - a
        }
        if let Some(b) = self.negated(y) {
            if b == x {
                return self.zero(); // x + -x = 0
            }
            return self.sub(x, b); // x + -b = x - b
        }
        if let Some(reassociated) = self.reassociate(BinaryOp::Add, x, y) {
            return reassociated;
        }

        self.store.intern(NodeKind::Binary(BinaryOp::Add), &[x, y])
    }

    pub fn sub(&mut self, x: NodeId, y: NodeId) -> NodeId {
        if let Some(folded) = self.fold(x, y, |a, b| a - b) {
            return folded;
        }

        if x == y {
            return self.zero(); // x - x = 0
        }
        if self.is_literal(x, 0.0) {
            return self.neg(y); // 0 - y = -y
        }
        if let Some(m) = self.literal_value(y) {
            let negated = self.lit(-m);
            return self.add(x, negated); // x - m = x + -m
        }
        if let Some(b) = self.negated(y) {
            return self.add(x, b); // x - -b = x + b
        }

        self.store.intern(NodeKind::Binary(BinaryOp::Sub), &[x, y])
    }

    pub fn mul(&mut self, x: NodeId, y: NodeId) -> NodeId {
        if let Some(folded) = self.fold(x, y, |a, b| a * b) {
            return folded;
        }
        let (x, y) = self.commute(x, y);

        if let Some(l) = self.literal_value(x) {
            if l == 0.0 {
                return x; // 0 * y = 0
            }
            if l == 1.0 {
                return y; // 1 * y = y
            }
            if l == -1.0 {
                return self.neg(y); // -1 * y = -y
            }
        }
        if x == y {
            let two = self.two();
            return self.pow(x, two); // x * x = x^2
        }
        if let Some(reassociated) = self.reassociate(BinaryOp::Mul, x, y) {
            return reassociated;
        }

        self.store.intern(NodeKind::Binary(BinaryOp::Mul), &[x, y])
    }

    pub fn div(&mut self, x: NodeId, y: NodeId) -> NodeId {
        if let Some(folded) = self.fold(x, y, |a, b| a / b) {
            return folded;
        }

        if self.is_literal(x, 0.0) {
            return x; // 0 / y = 0
        }
        if x == y {
            return self.one(); // x / x = 1
        }

        self.store.intern(NodeKind::Binary(BinaryOp::Div), &[x, y])
    }

    pub fn pow(&mut self, x: NodeId, y: NodeId) -> NodeId {
        if let Some(folded) = self.fold(x, y, f64::powf) {
            return folded;
        }

        if self.is_literal(y, 0.0) {
            return self.one(); // x^0 = 1
        }
        if self.is_literal(y, 1.0) {
            return x; // x^1 = x
        }

        self.store.intern(NodeKind::Binary(BinaryOp::Pow), &[x, y])
    }

    pub fn neg(&mut self, x: NodeId) -> NodeId {
        if let Some(v) = self.literal_value(x) {
            return self.lit(-v);
        }
        if let Some(inner) = self.negated(x) {
            return inner; // --x = x
        }
        self.store.intern(NodeKind::Unary(UnaryOp::Neg), &[x])
    }

    pub fn exp(&mut self, x: NodeId) -> NodeId { self.transcendental(UnaryOp::Exp, x, f64::exp) }
    pub fn log(&mut self, x: NodeId) -> NodeId { self.transcendental(UnaryOp::Log, x, f64::ln) }
    pub fn sin(&mut self, x: NodeId) -> NodeId { self.transcendental(UnaryOp::Sin, x, f64::sin) }
    pub fn cos(&mut self, x: NodeId) -> NodeId { self.transcendental(UnaryOp::Cos, x, f64::cos) }

    // --- Helpers ---

    fn transcendental(&mut self, op: UnaryOp, x: NodeId, f: fn(f64) -> f64) -> NodeId {
        if let Some(v) = self.literal_value(x) {
            return self.lit(f(v));
        }
        self.store.intern(NodeKind::Unary(op), &[x])
    }

    fn fold(&mut self, x: NodeId, y: NodeId, op: impl Fn(f64, f64) -> f64) -> Option<NodeId> {
        let a = self.literal_value(x)?;
        let b = self.literal_value(y)?;
        Some(self.lit(op(a, b)))
    }

    /// Orders the operands of a commutative operator.
    fn commute(&self, x: NodeId, y: NodeId) -> (NodeId, NodeId) {
        let swap = if self.kind(x).is_literal() {
            false // keep literal on lhs
        } else if self.kind(y).is_literal() {
            true
        } else {
            x > y // no literals: smaller id to lhs
        };
        if swap { (y, x) } else { (x, y) }
    }

    /// Returns `a` if `id` is `Neg(a)`.
    fn negated(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Unary(UnaryOp::Neg) => Some(self.operands(id)[0]),
            _ => None,
        }
    }

    /// Returns `(literal, rest)` if `id` is the node `literal op rest`.
    fn literal_prefixed(&self, op: BinaryOp, id: NodeId) -> Option<(NodeId, NodeId)> {
        match self.kind(id) {
            NodeKind::Binary(kind) if *kind == op => {
                let operands = self.operands(id);
                let (lhs, rhs) = (operands[0], operands[1]);
                self.kind(lhs).is_literal().then_some((lhs, rhs))
            }
            _ => None,
        }
    }

    /// Rotates literals of a commutative, associative operator towards the
    /// root. Operands must already be commuted.
    fn reassociate(&mut self, op: BinaryOp, x: NodeId, y: NodeId) -> Option<NodeId> {
        let x_is_literal = self.kind(x).is_literal();
        let lhs = self.literal_prefixed(op, x);
        let rhs = self.literal_prefixed(op, y);

        match (lhs, rhs) {
            // lx op (lc op d) -> (lx op lc) op d
            (_, Some((lc, d))) if x_is_literal => {
                let folded = self.binary(op, x, lc);
                Some(self.binary(op, folded, d))
            }
            // (la op b) op (lc op d) -> (la op lc) op (b op d)
            (Some((la, b)), Some((lc, d))) => {
                let literals = self.binary(op, la, lc);
                let rest = self.binary(op, b, d);
                Some(self.binary(op, literals, rest))
            }
            // x op (lc op d) -> lc op (x op d)
            (None, Some((lc, d))) => {
                let rest = self.binary(op, x, d);
                Some(self.binary(op, lc, rest))
            }
            // (la op b) op y -> la op (b op y)
            (Some((la, b)), None) => {
                let rest = self.binary(op, b, y);
                Some(self.binary(op, la, rest))
            }
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DagError;
    use rstest::rstest;

    fn graph_xy() -> (ExprGraph, NodeId, NodeId) {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let y = g.var("y");
        (g, x, y)
    }

    #[rstest]
    #[case(BinaryOp::Add, 3.0, 4.0, 7.0)]
    #[case(BinaryOp::Sub, 3.0, 4.0, -1.0)]
    #[case(BinaryOp::Mul, 3.0, 4.0, 12.0)]
    #[case(BinaryOp::Div, 3.0, 4.0, 0.75)]
    #[case(BinaryOp::Pow, 2.0, 10.0, 1024.0)]
    fn test_constant_folding(#[case] op: BinaryOp, #[case] a: f64, #[case] b: f64, #[case] expected: f64) {
        let mut g = ExprGraph::new();
        let la = g.lit(a);
        let lb = g.lit(b);
        let res = g.binary(op, la, lb);
        assert_eq!(g.literal_value(res), Some(expected));
    }

    #[test]
    fn test_division_by_zero_folds_to_infinity() {
        let mut g = ExprGraph::new();
        let one = g.one();
        let zero = g.zero();
        let res = g.div(one, zero);
        assert_eq!(g.literal_value(res), Some(f64::INFINITY));
    }

    #[test]
    fn test_unary_folding_is_eager() {
        let mut g = ExprGraph::new();
        let zero = g.zero();
        let one = g.one();
        let e = g.exp(zero);
        let c = g.cos(zero);
        let s = g.sin(zero);
        let l = g.log(one);
        let n = g.neg(one);
        assert_eq!(e, one);
        assert_eq!(c, one);
        assert_eq!(s, zero);
        assert_eq!(l, zero);
        assert_eq!(g.literal_value(n), Some(-1.0));
    }

    #[test]
    fn test_identity_rules_return_existing_nodes() {
        let (mut g, x, _) = graph_xy();
        let zero = g.zero();
        let one = g.one();

        assert_eq!(g.add(x, zero), x);
        assert_eq!(g.add(zero, x), x);
        assert_eq!(g.mul(x, one), x);
        assert_eq!(g.mul(x, zero), zero);
        assert_eq!(g.sub(x, x), zero);
        assert_eq!(g.div(x, x), one);
        assert_eq!(g.div(zero, x), zero);
        assert_eq!(g.pow(x, zero), one);
        assert_eq!(g.pow(x, one), x);
    }

    #[test]
    fn test_mul_by_minus_one_negates() {
        let (mut g, x, _) = graph_xy();
        let m1 = g.lit(-1.0);
        let res = g.mul(x, m1);
        assert_eq!(g.kind(res), &NodeKind::Unary(UnaryOp::Neg));
        assert_eq!(g.operands(res), &[x]);
    }

    #[test]
    fn test_commutative_canonical_form() {
        let (mut g, x, y) = graph_xy();
        assert_eq!(g.add(x, y), g.add(y, x));
        assert_eq!(g.mul(x, y), g.mul(y, x));
        let ab = g.add(x, y);
        assert_eq!(g.operands(ab), &[x, y]);

        let three = g.lit(3.0);
        let sum = g.add(x, three);
        assert_eq!(g.operands(sum), &[three, x]);
    }

    #[test]
    fn test_self_reference_collapse() {
        let (mut g, x, _) = graph_xy();
        let two = g.two();
        let doubled = g.add(x, x);
        assert_eq!(g.kind(doubled), &NodeKind::Binary(BinaryOp::Mul));
        assert_eq!(g.operands(doubled), &[two, x]);

        let squared = g.mul(x, x);
        assert_eq!(g.kind(squared), &NodeKind::Binary(BinaryOp::Pow));
        assert_eq!(g.operands(squared), &[x, two]);
    }

    #[test]
    fn test_negation_rules() {
        let (mut g, x, y) = graph_xy();
        let zero = g.zero();
        let nx = g.neg(x);
        let ny = g.neg(y);

        assert_eq!(g.neg(nx), x);
        assert_eq!(g.add(x, nx), zero);
        assert_eq!(g.add(nx, x), zero);
        assert_eq!(g.sub(zero, x), nx);
        assert_eq!(g.sub(x, ny), g.add(x, y));

        let x_minus_y = g.sub(x, y);
        assert_eq!(g.add(x, ny), x_minus_y);
        assert_eq!(g.add(ny, x), x_minus_y);
    }

    #[test]
    fn test_sub_literal_becomes_add() {
        let (mut g, x, _) = graph_xy();
        let three = g.lit(3.0);
        let minus_three = g.lit(-3.0);
        let res = g.sub(x, three);
        assert_eq!(g.kind(res), &NodeKind::Binary(BinaryOp::Add));
        assert_eq!(g.operands(res), &[minus_three, x]);
    }

    #[test]
    fn test_reassociation_folds_literal_chains() {
        let (mut g, x, _) = graph_xy();
        let two = g.lit(2.0);
        let three = g.lit(3.0);
        let five = g.lit(5.0);

        // (2 + x) + 3 -> 5 + x
        let inner = g.add(two, x);
        let outer = g.add(inner, three);
        assert_eq!(outer, g.add(five, x));

        // 2 * (3 * x) -> 6 * x
        let inner = g.mul(three, x);
        let outer = g.mul(two, inner);
        let six = g.lit(6.0);
        assert_eq!(g.operands(outer), &[six, x]);
    }

    #[test]
    fn test_reassociation_merges_two_prefixed_terms() {
        let (mut g, x, y) = graph_xy();
        let one = g.lit(1.0);
        let two = g.lit(2.0);
        let three = g.lit(3.0);

        // (1 + x) + (2 + y) -> 3 + (x + y)
        let a = g.add(one, x);
        let b = g.add(two, y);
        let res = g.add(a, b);
        let xy = g.add(x, y);
        assert_eq!(g.operands(res), &[three, xy]);
    }

    #[test]
    fn test_reassociation_pulls_literal_out_of_rhs() {
        let (mut g, x, y) = graph_xy();
        let four = g.lit(4.0);
        let prefixed = g.mul(four, y);
        // x * (4 * y) -> 4 * (x * y)
        let res = g.mul(x, prefixed);
        let xy = g.mul(x, y);
        assert_eq!(g.operands(res), &[four, xy]);
        // Structurally equivalent re-associations share one node.
        let other = g.mul(prefixed, x);
        assert_eq!(res, other);
    }

    #[test]
    fn test_rewritten_candidates_leave_no_edges() {
        let (mut g, x, _) = graph_xy();
        let zero = g.zero();
        let before = g.node_count();
        assert_eq!(g.add(x, zero), x);
        assert_eq!(g.node_count(), before);
        assert_eq!(g.outputs(x).count(), 0);
    }

    #[test]
    fn test_hash_consing_idempotence() {
        let (mut g, x, y) = graph_xy();
        let build = |g: &mut ExprGraph| {
            let s = g.sin(x);
            let p = g.mul(s, y);
            let e = g.exp(p);
            g.div(e, x)
        };
        let first = build(&mut g);
        let count = g.node_count();
        let second = build(&mut g);
        assert_eq!(first, second);
        assert_eq!(g.node_count(), count);
    }

    #[test]
    fn test_checked_constructors_reject_foreign_ids() {
        let (mut g, x, y) = graph_xy();
        let count = g.node_count();
        let foreign = NodeId(count as u32 + 5);

        assert!(matches!(g.try_binary(BinaryOp::Add, x, foreign), Err(DagError::Misuse(_))));
        assert!(matches!(g.try_unary(UnaryOp::Sin, foreign), Err(DagError::Misuse(_))));
        assert_eq!(g.node_count(), count);

        let sum = g.add(x, y);
        assert_eq!(g.try_binary(BinaryOp::Add, y, x), Ok(sum));
        let s = g.sin(x);
        assert_eq!(g.try_unary(UnaryOp::Sin, x), Ok(s));
    }

    #[test]
    #[should_panic]
    fn test_unchecked_constructor_panics_on_foreign_id() {
        let (mut g, x, _) = graph_xy();
        g.mul(x, NodeId(1_000));
    }
}
