//! Pattern text and its compilation into a tree fragment.
//!
//! Pattern text is rarely a complete compilation unit, so it is wrapped in
//! the smallest Java context that makes it parse for its kind, then the
//! fragment node is located again by byte range.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use thiserror::Error;

use crate::constraint::{extract_constraints, Constraints, TypeConstraint};
use crate::tree::{SourceTree, SyntaxNode, TreeError};

/// What syntactic shape a pattern has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Expression,
    Statement,
    Annotation,
    MethodCall,
    Import,
    Field,
    Constructor,
    MethodDeclaration,
    Block,
}

impl PatternKind {
    /// Guess the kind from trimmed pattern text. The checks run in order and
    /// the first hit wins.
    pub fn infer(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('@') {
            PatternKind::Annotation
        } else if trimmed.starts_with("import ") {
            PatternKind::Import
        } else if trimmed.starts_with("new ") {
            PatternKind::Constructor
        } else if trimmed.starts_with('{') {
            PatternKind::Block
        } else if trimmed.contains('(') && trimmed.contains(')') && !trimmed.ends_with(';') {
            PatternKind::MethodCall
        } else if trimmed.ends_with(';') {
            PatternKind::Statement
        } else {
            PatternKind::Expression
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Expression => "EXPRESSION",
            PatternKind::Statement => "STATEMENT",
            PatternKind::Annotation => "ANNOTATION",
            PatternKind::MethodCall => "METHOD_CALL",
            PatternKind::Import => "IMPORT",
            PatternKind::Field => "FIELD",
            PatternKind::Constructor => "CONSTRUCTOR",
            PatternKind::MethodDeclaration => "METHOD_DECLARATION",
            PatternKind::Block => "BLOCK",
        }
    }

    /// Node kinds the located fragment may have. Empty means "whatever node
    /// spans the pattern text exactly".
    fn fragment_kinds(&self) -> &'static [&'static str] {
        match self {
            PatternKind::Annotation => &["annotation", "marker_annotation"],
            PatternKind::Import => &["import_declaration"],
            PatternKind::Field => &["field_declaration"],
            PatternKind::Constructor => &["object_creation_expression"],
            PatternKind::MethodDeclaration => &["method_declaration", "constructor_declaration"],
            PatternKind::Block => &["block"],
            PatternKind::Expression | PatternKind::MethodCall | PatternKind::Statement => &[],
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pattern as written in a rule file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub text: String,
    pub kind: PatternKind,
}

impl Pattern {
    pub fn new(text: impl Into<String>, kind: PatternKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Pattern whose kind is inferred from its text
    pub fn inferred(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = PatternKind::infer(&text);
        Self { text, kind }
    }
}

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("{kind} pattern `{text}` does not parse")]
    Syntax { text: String, kind: PatternKind },

    #[error("could not locate {kind} fragment for `{text}`")]
    FragmentNotFound { text: String, kind: PatternKind },
}

/// A pattern parsed into a tree, ready for matching
#[derive(Debug)]
pub struct CompiledPattern {
    pattern: Pattern,
    tree: SourceTree,
    range: Range<usize>,
    fragment_kind: &'static str,
    constraints: Arc<Constraints>,
}

impl CompiledPattern {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn kind(&self) -> PatternKind {
        self.pattern.kind
    }

    pub fn text(&self) -> &str {
        &self.pattern.text
    }

    /// Root of the pattern fragment
    pub fn fragment(&self) -> SyntaxNode<'_> {
        let mut node = self.tree.root();
        if let Some(found) = self.tree.node_at(self.range.clone()) {
            node = found;
            while node.kind() != self.fragment_kind || node.byte_range() != self.range {
                match node.parent() {
                    Some(parent) => node = parent,
                    None => break,
                }
            }
        }
        node
    }

    /// Type constraints declared with `$name:Kind`, keyed by placeholder
    pub fn constraints(&self) -> &Arc<Constraints> {
        &self.constraints
    }

    pub fn constraint(&self, placeholder: &str) -> Option<&TypeConstraint> {
        self.constraints.get(placeholder)
    }

    /// Cheap prefilter hosts use before attempting a full match. Anonymous
    /// tokens (`;`, `{`, keywords) never match.
    pub fn could_match(&self, candidate: SyntaxNode<'_>) -> bool {
        if !candidate.is_named() {
            return false;
        }
        let fragment = self.fragment();
        fragment.is_placeholder() || fragment.kind() == candidate.kind()
    }
}

/// Wrap pattern text in Java context, returning the wrapped source and the
/// byte offset where the pattern text starts.
fn wrap(text: &str, kind: PatternKind) -> (String, usize) {
    let (prefix, suffix): (&str, String) = match kind {
        PatternKind::Expression | PatternKind::MethodCall | PatternKind::Constructor => (
            "class __Pattern { void __method() { Object __result = ",
            "; } }".to_string(),
        ),
        PatternKind::Statement | PatternKind::Block => {
            ("class __Pattern { void __method() { ", " } }".to_string())
        }
        PatternKind::Annotation => ("", " class __Pattern {}".to_string()),
        PatternKind::Import => {
            let terminator = if text.ends_with(';') { "" } else { ";" };
            ("", format!("{terminator} class __Pattern {{}}"))
        }
        PatternKind::Field => {
            let terminator = if text.ends_with(';') { "" } else { ";" };
            ("class __Pattern { ", format!("{terminator} }}"))
        }
        PatternKind::MethodDeclaration => {
            let body = if text.ends_with('}') || text.ends_with(';') {
                ""
            } else {
                " {}"
            };
            ("class __Pattern { ", format!("{body} }}"))
        }
    };
    (format!("{prefix}{text}{suffix}"), prefix.len())
}

/// Compile pattern text into a tree fragment
pub fn compile(pattern: &Pattern) -> Result<CompiledPattern, PatternError> {
    let original = pattern.text.trim();
    if original.is_empty() {
        return Err(PatternError::Empty);
    }
    let (parseable, constraints) = extract_constraints(original);
    let text = parseable.as_str();
    let (wrapped, offset) = wrap(text, pattern.kind);
    let tree = SourceTree::parse(wrapped)?;
    if tree.has_errors() {
        return Err(PatternError::Syntax {
            text: original.to_string(),
            kind: pattern.kind,
        });
    }

    let not_found = || PatternError::FragmentNotFound {
        text: original.to_string(),
        kind: pattern.kind,
    };
    let span = offset..offset + text.len();
    let start = tree.node_at(span.clone()).ok_or_else(not_found)?;

    let wanted = pattern.kind.fragment_kinds();
    let fragment = if wanted.is_empty() {
        let mut node = start;
        // Climb through wrappers that share the same span, stopping at the
        // outermost node whose text is exactly the pattern.
        while let Some(parent) = node.parent() {
            if parent.byte_range() != span {
                break;
            }
            node = parent;
        }
        if node.byte_range() != span {
            return Err(not_found());
        }
        node
    } else {
        std::iter::once(start)
            .chain(start.ancestors())
            .find(|n| wanted.contains(&n.kind()))
            .ok_or_else(not_found)?
    };

    let range = fragment.byte_range();
    let fragment_kind = fragment.kind();
    Ok(CompiledPattern {
        pattern: Pattern::new(original, pattern.kind),
        tree,
        range,
        fragment_kind,
        constraints: Arc::new(constraints),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_inference_order() {
        assert_eq!(PatternKind::infer("@Deprecated"), PatternKind::Annotation);
        assert_eq!(PatternKind::infer("import java.util.List;"), PatternKind::Import);
        assert_eq!(PatternKind::infer("new Foo($x)"), PatternKind::Constructor);
        assert_eq!(PatternKind::infer("{ $s; }"), PatternKind::Block);
        assert_eq!(PatternKind::infer("$x.foo()"), PatternKind::MethodCall);
        assert_eq!(PatternKind::infer("$x.foo();"), PatternKind::Statement);
        assert_eq!(PatternKind::infer("int $x;"), PatternKind::Statement);
        assert_eq!(PatternKind::infer("$a + $b"), PatternKind::Expression);
        assert_eq!(PatternKind::infer("  $x instanceof String  "), PatternKind::Expression);
    }

    #[test]
    fn test_compile_expression() {
        let compiled = compile(&Pattern::inferred("$x + $x")).unwrap();
        let fragment = compiled.fragment();
        assert_eq!(fragment.kind(), "binary_expression");
        assert_eq!(fragment.text(), "$x + $x");
    }

    #[test]
    fn test_compile_method_call() {
        let compiled = compile(&Pattern::inferred("$c.size() == 0")).unwrap();
        assert_eq!(compiled.kind(), PatternKind::MethodCall);
        assert_eq!(compiled.fragment().kind(), "binary_expression");
    }

    #[test]
    fn test_compile_statement() {
        let compiled = compile(&Pattern::inferred("$x.close();")).unwrap();
        assert_eq!(compiled.fragment().kind(), "expression_statement");
    }

    #[test]
    fn test_compile_annotation() {
        let compiled = compile(&Pattern::inferred("@Test(timeout=1000)")).unwrap();
        assert_eq!(compiled.fragment().kind(), "annotation");
        let marker = compile(&Pattern::inferred("@Deprecated")).unwrap();
        assert_eq!(marker.fragment().kind(), "marker_annotation");
    }

    #[test]
    fn test_compile_constructor_and_import() {
        let ctor = compile(&Pattern::inferred("new StringBuffer()")).unwrap();
        assert_eq!(ctor.fragment().kind(), "object_creation_expression");
        let import = compile(&Pattern::inferred("import java.util.Vector")).unwrap();
        assert_eq!(import.fragment().kind(), "import_declaration");
    }

    #[test]
    fn test_compile_field_and_method() {
        let field = compile(&Pattern::new("private static final $T $name = $v", PatternKind::Field))
            .unwrap();
        assert_eq!(field.fragment().kind(), "field_declaration");
        let method = compile(&Pattern::new("public void $m()", PatternKind::MethodDeclaration))
            .unwrap();
        assert_eq!(method.fragment().kind(), "method_declaration");
    }

    #[test]
    fn test_placeholder_fragment_matches_anything() {
        let compiled = compile(&Pattern::inferred("$x")).unwrap();
        assert!(compiled.fragment().is_placeholder());
        let tree = SourceTree::parse("class A { int f() { return 1 + 2; } }").unwrap();
        let nodes = tree.root().descendants();
        let sum = nodes.iter().find(|n| n.kind() == "binary_expression").unwrap();
        assert!(compiled.could_match(*sum));
        for token in nodes.iter().filter(|n| !n.is_named()) {
            assert!(!compiled.could_match(*token), "matched token {:?}", token.kind());
        }
    }

    #[test]
    fn test_constrained_placeholders_compile() {
        let compiled = compile(&Pattern::inferred("foo($msg:StringLiteral)")).unwrap();
        assert_eq!(compiled.text(), "foo($msg:StringLiteral)");
        assert_eq!(compiled.fragment().kind(), "method_invocation");
        assert_eq!(compiled.fragment().text(), "foo($msg)");
        assert_eq!(compiled.constraint("$msg"), Some(&TypeConstraint::StringLiteral));
        assert!(compiled.constraint("$other").is_none());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = compile(&Pattern::inferred("$x +* )")).unwrap_err();
        assert!(matches!(err, PatternError::Syntax { .. }));
        assert!(matches!(compile(&Pattern::inferred("   ")), Err(PatternError::Empty)));
    }
}
