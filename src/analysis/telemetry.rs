use crate::ir::Program;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalityStats {
    /// Reads of a register defined 1-2 instructions earlier.
    pub hot: usize,
    /// Reads within a 32-instruction window.
    pub warm: usize,
    /// Reads of registers defined further back.
    pub cold: usize,
    /// Reads of parameters and literal constants.
    pub inputs: usize,
}

#[derive(Debug, Clone)]
pub struct TelemetryReport {
    /// Instructions in the function body.
    pub total_ops: usize,
    pub op_counts: HashMap<String, usize>,
    pub locality: LocalityStats,
    /// Mean distance between a register's definition and its reads. Lower is better.
    pub avg_jump_distance: f64,
}

impl TelemetryReport {
    pub fn analyze(program: &Program) -> Self {
        let mut op_counts = HashMap::new();
        let mut locality = LocalityStats::default();
        let mut defined_at: HashMap<&str, usize> = HashMap::new();
        let mut total_distance: u64 = 0;
        let mut read_count: u64 = 0;

        for (i, inst) in program.body.iter().enumerate() {
            *op_counts.entry(inst.mnemonic().to_string()).or_insert(0) += 1;

            for source in inst.reads() {
                match defined_at.get(source) {
                    Some(&def) => {
                        let dist = i - def;
                        total_distance += dist as u64;
                        read_count += 1;
                        match dist {
                            0..=2 => locality.hot += 1,
                            3..=32 => locality.warm += 1,
                            _ => locality.cold += 1,
                        }
                    }
                    None => locality.inputs += 1,
                }
            }

            if let Some(dest) = inst.dest() {
                defined_at.insert(dest, i);
            }
        }

        Self {
            total_ops: program.body.len(),
            op_counts,
            locality,
            avg_jump_distance: if read_count > 0 { total_distance as f64 / read_count as f64 } else { 0.0 },
        }
    }

    pub fn count(&self, mnemonic: &str) -> usize {
        self.op_counts.get(mnemonic).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ExprGraph;
    use crate::ir::{emit_program, EmitOptions};

    #[test]
    fn test_counts_by_mnemonic() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let y = g.var("y");
        let s = g.sin(x);
        let c = g.cos(y);
        let p = g.mul(s, c);
        let f = g.add(p, x);

        let program = emit_program(&g, f, &EmitOptions::default()).unwrap();
        let report = TelemetryReport::analyze(&program);
        assert_eq!(report.total_ops, 4);
        assert_eq!(report.count("call"), 2);
        assert_eq!(report.count("fmul"), 1);
        assert_eq!(report.count("fadd"), 1);
        assert_eq!(report.count("fdiv"), 0);
    }

    #[test]
    fn test_locality_of_a_chain() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let e = g.exp(x);
        let f = g.sin(e);

        let program = emit_program(&g, f, &EmitOptions::default()).unwrap();
        let report = TelemetryReport::analyze(&program);
        // exp reads the parameter; sin reads exp's result one slot back.
        assert_eq!(report.locality, LocalityStats { hot: 1, warm: 0, cold: 0, inputs: 1 });
        assert_eq!(report.avg_jump_distance, 1.0);
    }
}
