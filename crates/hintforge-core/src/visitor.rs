//! Tree visitor for walking Java syntax trees
//!
//! Provides a trait-based visitor pattern. Default implementations handle
//! traversal; implementors override the hooks they care about.

use crate::tree::SyntaxNode;

/// Coarse grouping of node kinds used to pick a visitor hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Expression,
    Statement,
    Declaration,
    Other,
}

impl NodeCategory {
    pub fn of(node: SyntaxNode<'_>) -> Self {
        let kind = node.kind();
        if !node.is_named() {
            return NodeCategory::Other;
        }
        match kind {
            "local_variable_declaration" | "block" | "expression_statement" => {
                NodeCategory::Statement
            }
            "method_invocation" | "field_access" | "array_access" | "object_creation_expression"
            | "parenthesized_expression" | "string_literal" | "character_literal"
            | "decimal_integer_literal" | "decimal_floating_point_literal" | "true" | "false"
            | "null_literal" | "this" => NodeCategory::Expression,
            k if k.ends_with("_expression") => NodeCategory::Expression,
            k if k.ends_with("_statement") => NodeCategory::Statement,
            k if k.ends_with("_declaration") => NodeCategory::Declaration,
            _ => NodeCategory::Other,
        }
    }
}

/// Trait for visiting Java syntax nodes
///
/// Every hook returns `true` to continue traversal into the node's children.
pub trait Visitor<'t> {
    /// Called for every node before the category hook
    fn visit_node(&mut self, _node: SyntaxNode<'t>) -> bool {
        true
    }

    fn visit_expression(&mut self, _node: SyntaxNode<'t>) -> bool {
        true
    }

    fn visit_statement(&mut self, _node: SyntaxNode<'t>) -> bool {
        true
    }

    /// Classes, interfaces, methods, fields, imports...
    fn visit_declaration(&mut self, _node: SyntaxNode<'t>) -> bool {
        true
    }

    /// Called after a node's children have been traversed
    fn leave_node(&mut self, _node: SyntaxNode<'t>) {}

    /// Traverse a node and its children
    fn traverse(&mut self, node: SyntaxNode<'t>) {
        if !self.visit_node(node) {
            return;
        }
        let descend = match NodeCategory::of(node) {
            NodeCategory::Expression => self.visit_expression(node),
            NodeCategory::Statement => self.visit_statement(node),
            NodeCategory::Declaration => self.visit_declaration(node),
            NodeCategory::Other => true,
        };
        if descend {
            for child in node.children() {
                self.traverse(child);
            }
        }
        self.leave_node(node);
    }
}

/// Helper function to run a visitor over a subtree
pub fn visit<'t, V: Visitor<'t>>(visitor: &mut V, root: SyntaxNode<'t>) {
    visitor.traverse(root);
}
