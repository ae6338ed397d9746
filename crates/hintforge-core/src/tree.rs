//! Parsed Java source and the node handle the matcher and guards work with.
//!
//! `SourceTree` owns both the text and the tree-sitter tree. `SyntaxNode` is
//! a cheap copyable view that only exposes capability queries (kind, text,
//! children, parent, ...), so nothing outside this module touches
//! tree-sitter directly.

use std::fmt;
use std::ops::Range;

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

/// Errors raised while turning text into a tree
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("failed to load Java grammar: {0}")]
    Language(String),

    #[error("parser produced no tree")]
    Aborted,
}

/// A Java compilation unit (or a wrapped pattern fragment) with its tree
pub struct SourceTree {
    source: String,
    tree: Tree,
}

impl SourceTree {
    /// Parse Java source. A fresh parser is created per call so parsing is
    /// reentrant and can run on any thread.
    pub fn parse(source: impl Into<String>) -> Result<Self, TreeError> {
        let source = source.into();
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| TreeError::Language(e.to_string()))?;
        let tree = parser.parse(&source, None).ok_or(TreeError::Aborted)?;
        Ok(Self { source, tree })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode::new(self.tree.root_node(), &self.source)
    }

    /// True if tree-sitter had to recover from a syntax error anywhere
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Smallest node covering exactly `range`, or the smallest enclosing one
    pub fn node_at(&self, range: Range<usize>) -> Option<SyntaxNode<'_>> {
        self.tree
            .root_node()
            .descendant_for_byte_range(range.start, range.end)
            .map(|node| SyntaxNode::new(node, &self.source))
    }
}

impl fmt::Debug for SourceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTree")
            .field("len", &self.source.len())
            .field("has_errors", &self.has_errors())
            .finish()
    }
}

/// A node in a [`SourceTree`]
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    node: Node<'t>,
    source: &'t str,
}

impl<'t> SyntaxNode<'t> {
    fn new(node: Node<'t>, source: &'t str) -> Self {
        Self { node, source }
    }

    /// Grammar kind, e.g. `method_invocation` or `+`
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn is_named(&self) -> bool {
        self.node.is_named()
    }

    pub fn text(&self) -> &'t str {
        self.source.get(self.node.byte_range()).unwrap_or("")
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.node.byte_range()
    }

    /// 1-based line of the first byte
    pub fn start_line(&self) -> usize {
        self.node.start_position().row + 1
    }

    /// All children, anonymous tokens included, comments skipped
    pub fn children(&self) -> Vec<SyntaxNode<'t>> {
        let mut out = Vec::with_capacity(self.node.child_count());
        for i in 0..self.node.child_count() {
            if let Some(child) = self.node.child(i) {
                if !child.is_extra() {
                    out.push(SyntaxNode::new(child, self.source));
                }
            }
        }
        out
    }

    pub fn named_children(&self) -> Vec<SyntaxNode<'t>> {
        self.children().into_iter().filter(|c| c.is_named()).collect()
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    pub fn child_by_field(&self, field: &str) -> Option<SyntaxNode<'t>> {
        self.node
            .child_by_field_name(field)
            .map(|n| SyntaxNode::new(n, self.source))
    }

    /// First named child of the given kind
    pub fn child_of_kind(&self, kind: &str) -> Option<SyntaxNode<'t>> {
        self.named_children().into_iter().find(|c| c.kind() == kind)
    }

    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.node.parent().map(|n| SyntaxNode::new(n, self.source))
    }

    /// Parents from the closest outward
    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode<'t>> {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// Pre-order walk of this node and everything below it
    pub fn descendants(&self) -> Vec<SyntaxNode<'t>> {
        let mut out = Vec::new();
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            out.push(node);
            let children = node.children();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Identifier-like leaf whose text starts with `$`
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind(), "identifier" | "type_identifier") && self.text().starts_with('$')
    }

    /// `$name$` placeholder that binds a whole list of siblings
    pub fn is_multi_placeholder(&self) -> bool {
        let text = self.text();
        self.is_placeholder() && text.len() > 2 && text.ends_with('$')
    }

    pub fn is_missing(&self) -> bool {
        self.node.is_missing()
    }

    pub fn has_error(&self) -> bool {
        self.node.has_error()
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node.id() == other.node.id()
    }
}

impl Eq for SyntaxNode<'_> {}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?} {:?}", self.kind(), self.byte_range(), self.text())
    }
}

/// Plain structural equality: same kinds all the way down, same leaf text.
/// Placeholders get no special treatment here.
pub fn structurally_equal(a: SyntaxNode<'_>, b: SyntaxNode<'_>) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    let (left, right) = (a.children(), b.children());
    if left.is_empty() && right.is_empty() {
        return a.text() == b.text();
    }
    left.len() == right.len()
        && left
            .into_iter()
            .zip(right)
            .all(|(l, r)| structurally_equal(l, r))
}
