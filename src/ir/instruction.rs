//! Single-assignment instructions of the textual IR.
use std::fmt;

/// One line of a function body. Operand fields hold already formatted
/// values: a register (`%_4`, `%v.x`) or a literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `fadd`, `fsub`, `fmul`, `fdiv`.
    Arith { dest: String, mnemonic: &'static str, lhs: String, rhs: String },
    Neg { dest: String, operand: String },
    /// Call to one of the declared `@llvm.*.f64` intrinsics.
    Call { dest: String, intrinsic: &'static str, args: Vec<String> },
    ElementPtr { dest: String, base: String, index: usize },
    Load { dest: String, ptr: String },
    Store { value: String, ptr: String },
    InsertValue { dest: String, width: usize, aggregate: Option<String>, value: String, index: usize },
    Ret { ty: ReturnType, value: Option<String> },
}

/// What a lowered function hands back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Double,
    /// `{ double, ... }` with the given number of members, even when that
    /// number is one.
    Aggregate(usize),
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => write!(f, "void"),
            ReturnType::Double => write!(f, "double"),
            ReturnType::Aggregate(width) => write!(f, "{}", aggregate_type(*width)),
        }
    }
}

impl Instruction {
    /// The opcode as it appears in the text.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Arith { mnemonic, .. } => *mnemonic,
            Instruction::Neg { .. } => "fneg",
            Instruction::Call { .. } => "call",
            Instruction::ElementPtr { .. } => "getelementptr",
            Instruction::Load { .. } => "load",
            Instruction::Store { .. } => "store",
            Instruction::InsertValue { .. } => "insertvalue",
            Instruction::Ret { .. } => "ret",
        }
    }

    /// The register this instruction defines, if any.
    pub fn dest(&self) -> Option<&str> {
        match self {
            Instruction::Arith { dest, .. }
            | Instruction::Neg { dest, .. }
            | Instruction::Call { dest, .. }
            | Instruction::ElementPtr { dest, .. }
            | Instruction::Load { dest, .. }
            | Instruction::InsertValue { dest, .. } => Some(dest.as_str()),
            Instruction::Store { .. } | Instruction::Ret { .. } => None,
        }
    }

    /// Values read by this instruction, in operand order.
    pub fn reads(&self) -> Vec<&str> {
        match self {
            Instruction::Arith { lhs, rhs, .. } => vec![lhs.as_str(), rhs.as_str()],
            Instruction::Neg { operand, .. } => vec![operand.as_str()],
            Instruction::Call { args, .. } => args.iter().map(String::as_str).collect(),
            Instruction::ElementPtr { base, .. } => vec![base.as_str()],
            Instruction::Load { ptr, .. } => vec![ptr.as_str()],
            Instruction::Store { value, ptr } => vec![value.as_str(), ptr.as_str()],
            Instruction::InsertValue { aggregate, value, .. } => {
                aggregate.iter().map(String::as_str).chain(std::iter::once(value.as_str())).collect()
            }
            Instruction::Ret { value, .. } => value.iter().map(String::as_str).collect(),
        }
    }
}

/// `{ double, double, ... }` with `width` members.
pub fn aggregate_type(width: usize) -> String {
    format!("{{ {} }}", vec!["double"; width].join(", "))
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Arith { dest, mnemonic, lhs, rhs } => {
                write!(f, "{} = {} double {}, {}", dest, mnemonic, lhs, rhs)
            }
            Instruction::Neg { dest, operand } => write!(f, "{} = fneg double {}", dest, operand),
            Instruction::Call { dest, intrinsic, args } => {
                let args: Vec<String> = args.iter().map(|a| format!("double {}", a)).collect();
                write!(f, "{} = call double @llvm.{}.f64({})", dest, intrinsic, args.join(", "))
            }
            Instruction::ElementPtr { dest, base, index } => {
                write!(f, "{} = getelementptr double, ptr {}, i64 {}", dest, base, index)
            }
            Instruction::Load { dest, ptr } => write!(f, "{} = load double, ptr {}", dest, ptr),
            Instruction::Store { value, ptr } => write!(f, "store double {}, ptr {}", value, ptr),
            Instruction::InsertValue { dest, width, aggregate, value, index } => write!(
                f,
                "{} = insertvalue {} {}, double {}, {}",
                dest,
                aggregate_type(*width),
                aggregate.as_deref().unwrap_or("undef"),
                value,
                index
            ),
            Instruction::Ret { ty, value } => match value {
                Some(v) => write!(f, "ret {} {}", ty, v),
                None => write!(f, "ret void"),
            },
        }
    }
}

/// Formats a constant so the IR parser reads back the same bits.
///
/// Decimal text needs a `.` to be accepted, so anything Rust prints in
/// another shape (`1e-7`, `inf`, `NaN`) falls back to the hex bit pattern.
pub fn format_literal(value: f64) -> String {
    let text = format!("{:?}", value);
    let decimal = value.is_finite()
        && text.contains('.')
        && text.parse::<f64>().map(f64::to_bits) == Ok(value.to_bits());
    if decimal {
        text
    } else {
        format!("0x{:016X}", value.to_bits())
    }
}

/// Register holding the value of variable `name`: `%v.<name>`.
///
/// Registers the emitter invents all start with `%_` or `%p.`, so no
/// variable name can collide with them.
pub fn variable_register(name: &str) -> String {
    prefixed_register("v", name)
}

/// Register holding the input-buffer address of variable `name`: `%p.<name>`.
pub fn pointer_register(name: &str) -> String {
    prefixed_register("p", name)
}

// Quoted when the name is not a bare identifier.
fn prefixed_register(prefix: &str, name: &str) -> String {
    let full = format!("{}.{}", prefix, name);
    let bare = full.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'));
    if bare {
        format!("%{}", full)
    } else {
        format!("%\"{}\"", full.replace('\\', "\\5C").replace('"', "\\22"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2.0, "2.0")]
    #[case(-0.5, "-0.5")]
    #[case(0.1, "0.1")]
    #[case(1.5e-7, "1.5e-7")]
    #[case(1e-7, "0x3E7AD7F29ABCAF48")]
    #[case(f64::INFINITY, "0x7FF0000000000000")]
    fn test_format_literal(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_literal(value), expected);
    }

    #[test]
    fn test_nan_prints_as_hex() {
        assert!(format_literal(f64::NAN).starts_with("0x"));
    }

    #[rstest]
    #[case("x", "%v.x")]
    #[case("rate_2", "%v.rate_2")]
    #[case("_2", "%v._2")]
    #[case("2x", "%v.2x")]
    #[case("a b", "%\"v.a b\"")]
    #[case("q\"", "%\"v.q\\22\"")]
    fn test_variable_registers(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(variable_register(name), expected);
    }

    #[test]
    fn test_pointer_and_value_namespaces_differ() {
        // `x.addr` as a variable must not alias the address of `x`.
        assert_ne!(variable_register("x.addr"), pointer_register("x"));
        assert_eq!(pointer_register("x"), "%p.x");
        assert!(!variable_register("_input").starts_with("%_"));
    }

    #[test]
    fn test_instruction_text() {
        let add = Instruction::Arith { dest: "%_2".into(), mnemonic: "fadd", lhs: "%x".into(), rhs: "1.0".into() };
        assert_eq!(add.to_string(), "%_2 = fadd double %x, 1.0");
        assert_eq!(add.reads(), vec!["%x", "1.0"]);

        let call = Instruction::Call { dest: "%_3".into(), intrinsic: "pow", args: vec!["%x".into(), "%y".into()] };
        assert_eq!(call.to_string(), "%_3 = call double @llvm.pow.f64(double %x, double %y)");

        let ins = Instruction::InsertValue {
            dest: "%_agg0".into(),
            width: 2,
            aggregate: None,
            value: "%_3".into(),
            index: 0,
        };
        assert_eq!(ins.to_string(), "%_agg0 = insertvalue { double, double } undef, double %_3, 0");
        assert_eq!(Instruction::Ret { ty: ReturnType::Void, value: None }.to_string(), "ret void");
        assert_eq!(
            Instruction::Ret { ty: ReturnType::Aggregate(2), value: Some("%_agg1".into()) }.to_string(),
            "ret { double, double } %_agg1"
        );
        assert_eq!(
            Instruction::Ret { ty: ReturnType::Aggregate(1), value: Some("%_agg0".into()) }.to_string(),
            "ret { double } %_agg0"
        );
    }
}
