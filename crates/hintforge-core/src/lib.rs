//! hintforge-core: Java syntax trees for the hint engine
//!
//! This crate provides:
//! - `SourceTree` / `SyntaxNode`: parsed Java source and a capability view of its nodes
//! - `Pattern` / `compile()`: turn pattern text into a matchable tree fragment
//! - `TypeConstraint`: `$name:Kind` restrictions on what a placeholder binds
//! - `SemanticModel`: the seam guards use for types, modifiers and bindings
//! - `SourceModel`: a syntax-only `SemanticModel`
//! - `Visitor`: Trait for traversing Java syntax trees

pub mod constraint;
pub mod pattern;
pub mod resolve;
pub mod semantic;
pub mod tree;
pub mod visitor;

pub use constraint::{extract_constraints, Constraints, TypeConstraint};
pub use pattern::{compile, CompiledPattern, Pattern, PatternError, PatternKind};
pub use resolve::{SourceModel, TypeHierarchy};
pub use semantic::{Element, Modifiers, SemanticModel, TypeInfo};
pub use tree::{structurally_equal, SourceTree, SyntaxNode, TreeError};
pub use visitor::{visit, NodeCategory, Visitor};
