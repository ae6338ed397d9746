//! Placeholder bindings produced by a match and consumed by guards

use std::collections::HashMap;

use hintforge_core::{SemanticModel, SyntaxNode};

/// Default ambient source version when the host does not set one
pub const DEFAULT_SOURCE_VERSION: &str = "1.8";

/// What a placeholder is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound<'t> {
    Node(SyntaxNode<'t>),
    /// Multi-placeholder (`$args$`) bound to a run of siblings
    List(Vec<SyntaxNode<'t>>),
}

impl<'t> Bound<'t> {
    /// A list binding only counts as bound when non-empty
    pub fn is_present(&self) -> bool {
        match self {
            Bound::Node(_) => true,
            Bound::List(nodes) => !nodes.is_empty(),
        }
    }

    pub fn as_node(&self) -> Option<SyntaxNode<'t>> {
        match self {
            Bound::Node(node) => Some(*node),
            Bound::List(_) => None,
        }
    }
}

/// Bindings plus ambient facts for one match attempt
#[derive(Clone)]
pub struct BindingContext<'t> {
    bindings: HashMap<String, Bound<'t>>,
    source_version: String,
    matched_node: Option<SyntaxNode<'t>>,
    semantic: Option<&'t dyn SemanticModel>,
}

impl<'t> Default for BindingContext<'t> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
            source_version: DEFAULT_SOURCE_VERSION.to_string(),
            matched_node: None,
            semantic: None,
        }
    }
}

impl<'t> BindingContext<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_version(mut self, version: impl Into<String>) -> Self {
        self.source_version = version.into();
        self
    }

    pub fn with_semantic_model(mut self, model: &'t dyn SemanticModel) -> Self {
        self.semantic = Some(model);
        self
    }

    pub fn with_matched_node(mut self, node: SyntaxNode<'t>) -> Self {
        self.matched_node = Some(node);
        self
    }

    pub fn set_source_version(&mut self, version: impl Into<String>) {
        self.source_version = version.into();
    }

    pub fn set_semantic_model(&mut self, model: Option<&'t dyn SemanticModel>) {
        self.semantic = model;
    }

    pub fn set_matched_node(&mut self, node: SyntaxNode<'t>) {
        self.matched_node = Some(node);
    }

    /// Bind a placeholder. Names are stored with their `$` prefix.
    pub fn bind(&mut self, name: &str, value: Bound<'t>) {
        let key = if name.starts_with('$') {
            name.to_string()
        } else {
            format!("${name}")
        };
        self.bindings.insert(key, value);
    }

    /// Look up a binding, with or without the `$` prefix
    pub fn get(&self, name: &str) -> Option<&Bound<'t>> {
        self.bindings
            .get(name)
            .or_else(|| self.bindings.get(&format!("${name}")))
    }

    pub fn node(&self, name: &str) -> Option<SyntaxNode<'t>> {
        self.get(name).and_then(Bound::as_node)
    }

    pub fn list(&self, name: &str) -> Option<&[SyntaxNode<'t>]> {
        match self.get(name)? {
            Bound::List(nodes) => Some(nodes),
            Bound::Node(_) => None,
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.get(name).is_some_and(Bound::is_present)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn source_version(&self) -> &str {
        &self.source_version
    }

    pub fn matched_node(&self) -> Option<SyntaxNode<'t>> {
        self.matched_node
    }

    pub fn semantic(&self) -> Option<&'t dyn SemanticModel> {
        self.semantic
    }

    pub(crate) fn snapshot(&self) -> HashMap<String, Bound<'t>> {
        self.bindings.clone()
    }

    pub(crate) fn restore(&mut self, snapshot: HashMap<String, Bound<'t>>) {
        self.bindings = snapshot;
    }
}

impl std::fmt::Debug for BindingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingContext")
            .field("bindings", &self.bindings)
            .field("source_version", &self.source_version)
            .field("matched_node", &self.matched_node)
            .field("semantic", &self.semantic.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hintforge_core::SourceTree;

    #[test]
    fn test_lookup_with_or_without_prefix() {
        let tree = SourceTree::parse("class A { int x = y; }").unwrap();
        let y = tree
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.text() == "y")
            .unwrap();

        let mut ctx = BindingContext::new();
        ctx.bind("$v", Bound::Node(y));
        ctx.bind("w", Bound::List(vec![]));

        assert_eq!(ctx.node("$v"), Some(y));
        assert_eq!(ctx.node("v"), Some(y));
        assert!(ctx.is_bound("v"));
        // Empty lists are present in the map but do not count as bound
        assert!(ctx.get("$w").is_some());
        assert!(!ctx.is_bound("$w"));
        assert!(!ctx.is_bound("$z"));
        assert_eq!(ctx.source_version(), "1.8");
    }
}
