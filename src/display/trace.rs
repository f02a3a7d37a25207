use crate::compute::ledger::Ledger;
use crate::graph::ExprGraph;
use crate::store::{NodeId, NodeKind, UnaryOp};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the sub-DAG of `target` as an indented tree, each node annotated
/// with its value from `ledger`.
///
/// A node reached a second time is printed as a reference to the level
/// where it first appeared.
pub fn format_trace(graph: &ExprGraph, ledger: &Ledger, target: NodeId) -> String {
    let mut tracer = Tracer { graph, ledger, visited_at_level: HashMap::new(), output: String::new() };

    if graph.registry().contains(target) {
        let _ = writeln!(tracer.output, "AUDIT TRACE for node {}:", tracer.name(target));
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_node(target, 1, "");
    } else {
        let _ = writeln!(tracer.output, "Error: Invalid Node ID {:?}", target);
    }
    tracer.output
}

struct Tracer<'a> {
    graph: &'a ExprGraph,
    ledger: &'a Ledger,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node_id: NodeId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&node_id) {
            let _ = writeln!(self.output, "{}-> {} (Ref to L{})", prefix, self.name(node_id), first_seen);
            return;
        }
        self.visited_at_level.insert(node_id, level);

        let line_header = format!("[L{}] {}{}", level, self.name(node_id), self.format_value(node_id));
        let operands = self.graph.operands(node_id);

        match self.graph.kind(node_id) {
            NodeKind::Literal(_) => {
                let _ = writeln!(self.output, "{}{} -> Const", prefix, line_header);
            }
            NodeKind::Variable(name) => {
                let _ = writeln!(self.output, "{}{} -> Var({})", prefix, line_header, name);
            }
            NodeKind::Unary(op) => {
                let arg = self.format_operand_ref(operands[0]);
                let formula = match op {
                    UnaryOp::Neg => format!("-{}", arg),
                    _ => format!("{}({})", op.name(), arg),
                };
                let _ = writeln!(self.output, "{}{} = {}", prefix, line_header, formula);
                self.recurse_children(prefix, operands, level);
            }
            NodeKind::Binary(op) => {
                let lhs = self.format_operand_ref(operands[0]);
                let rhs = self.format_operand_ref(operands[1]);
                let _ = writeln!(self.output, "{}{} = {} {} {}", prefix, line_header, lhs, op.symbol(), rhs);
                self.recurse_children(prefix, operands, level);
            }
            NodeKind::Gradient { vars } => {
                let _ = writeln!(self.output, "{}{} [GRADIENT]", prefix, line_header);
                let stem = Self::build_child_stem(prefix);
                let _ = writeln!(self.output, "{}|-- primal", stem);
                self.trace_node(operands[0], level + 1, &format!("{}|  `-- ", stem));
                for (i, (&partial, &var)) in operands[1..].iter().zip(vars.iter()).enumerate() {
                    let is_last = i == vars.len() - 1;
                    let (connector, inner) = if is_last { ("`--", "   ") } else { ("|--", "|  ") };
                    let _ = writeln!(self.output, "{}{} d/d{}", stem, connector, self.name(var));
                    self.trace_node(partial, level + 1, &format!("{}{}`-- ", stem, inner));
                }
            }
        }
    }

    fn recurse_children(&mut self, prefix: &str, children: &[NodeId], level: usize) {
        let stem = Self::build_child_stem(prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_node(child, level + 1, &full_prefix);
        }
    }

    fn name(&self, id: NodeId) -> String {
        match self.graph.kind(id) {
            NodeKind::Variable(name) => name.clone(),
            NodeKind::Literal(v) => format!("{}", v),
            _ => format!("%{}", id.0),
        }
    }

    fn format_operand_ref(&self, id: NodeId) -> String {
        format!("{}{}", self.name(id), self.format_value(id))
    }

    fn format_value(&self, id: NodeId) -> String {
        match self.ledger.get(id) {
            Some(v) => format!("[{:.3}]", v),
            None => "[?]".to_string(),
        }
    }

    fn build_child_stem(current_prefix: &str) -> String {
        current_prefix.replace("`--", "   ").replace("|--", "|  ")
    }
}
