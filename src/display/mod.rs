pub mod dot;
pub mod expr;
pub mod trace;

pub use dot::to_dot;
pub use expr::Expr;
pub use trace::format_trace;
