//! Guard expressions: the boolean conditions attached to patterns and
//! rewrite alternatives.
//!
//! Module structure:
//! - `expr`: the guard AST and its textual rendering
//! - `parser`: guard text to AST
//! - `functions`: the name to predicate registry and the evaluator
//! - `builtins`: predicates every registry starts with

mod builtins;
pub mod expr;
pub mod functions;
pub mod parser;

pub use builtins::strip_quotes;
pub use expr::GuardExpression;
pub use functions::{GuardError, GuardFunction, GuardRegistry};
pub use parser::{parse_guard, SyntaxError};
