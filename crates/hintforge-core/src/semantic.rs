//! Semantic queries guards can ask about a bound node.
//!
//! Hosts with a real compiler behind them implement [`SemanticModel`]; the
//! crate ships [`crate::resolve::SourceModel`], which answers from syntax
//! alone. The free functions here are the syntactic fallbacks shared by
//! both.

use bitflags::bitflags;

use crate::tree::SyntaxNode;

bitflags! {
    /// Java declaration modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        const SYNCHRONIZED = 1 << 6;
        const VOLATILE = 1 << 7;
        const TRANSIENT = 1 << 8;
        const NATIVE = 1 << 9;
        const DEFAULT = 1 << 10;
    }
}

impl Modifiers {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "public" => Modifiers::PUBLIC,
            "protected" => Modifiers::PROTECTED,
            "private" => Modifiers::PRIVATE,
            "static" => Modifiers::STATIC,
            "final" => Modifiers::FINAL,
            "abstract" => Modifiers::ABSTRACT,
            "synchronized" => Modifiers::SYNCHRONIZED,
            "volatile" => Modifiers::VOLATILE,
            "transient" => Modifiers::TRANSIENT,
            "native" => Modifiers::NATIVE,
            "default" => Modifiers::DEFAULT,
            _ => return None,
        })
    }
}

/// A resolved type, with enough of its hierarchy to answer assignability
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeInfo {
    /// Simple name, e.g. `String`
    pub name: String,
    /// Fully qualified name when known, e.g. `java.lang.String`
    pub qualified_name: Option<String>,
    pub superclass: Option<Box<TypeInfo>>,
    pub interfaces: Vec<TypeInfo>,
    /// Component type for arrays
    pub element_type: Option<Box<TypeInfo>>,
}

impl TypeInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn array_of(element: TypeInfo) -> Self {
        Self {
            name: format!("{}[]", element.name),
            element_type: Some(Box::new(element)),
            ..Default::default()
        }
    }

    pub fn is_array(&self) -> bool {
        self.element_type.is_some()
    }

    fn has_name(&self, name: &str) -> bool {
        self.name == name || self.qualified_name.as_deref() == Some(name)
    }

    /// True if this type is `name`, or extends or implements it somewhere up
    /// the hierarchy
    pub fn is_assignable_to(&self, name: &str) -> bool {
        if self.has_name(name) {
            return true;
        }
        if let Some(superclass) = &self.superclass {
            if superclass.is_assignable_to(name) {
                return true;
            }
        }
        self.interfaces.iter().any(|i| i.is_assignable_to(name))
    }
}

/// What a name refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Variable {
        is_field: bool,
        is_parameter: bool,
        modifiers: Modifiers,
        deprecated: bool,
    },
    Method {
        modifiers: Modifiers,
        deprecated: bool,
    },
    Type {
        modifiers: Modifiers,
        deprecated: bool,
    },
}

impl Element {
    pub fn modifiers(&self) -> Modifiers {
        match self {
            Element::Variable { modifiers, .. }
            | Element::Method { modifiers, .. }
            | Element::Type { modifiers, .. } => *modifiers,
        }
    }

    pub fn is_deprecated(&self) -> bool {
        match self {
            Element::Variable { deprecated, .. }
            | Element::Method { deprecated, .. }
            | Element::Type { deprecated, .. } => *deprecated,
        }
    }
}

/// Binding information for nodes of one tree
pub trait SemanticModel: Send + Sync {
    /// Static type of an expression node
    fn resolve_type(&self, node: SyntaxNode<'_>) -> Option<TypeInfo>;

    /// Declaration a name node refers to
    fn resolve_element(&self, node: SyntaxNode<'_>) -> Option<Element>;
}

const DECLARATION_KINDS: &[&str] = &[
    "field_declaration",
    "local_variable_declaration",
    "method_declaration",
    "constructor_declaration",
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "formal_parameter",
];

/// Nearest declaration at or above `node`
pub fn enclosing_declaration<'t>(node: SyntaxNode<'t>) -> Option<SyntaxNode<'t>> {
    std::iter::once(node)
        .chain(node.ancestors())
        .find(|n| DECLARATION_KINDS.contains(&n.kind()))
}

/// Modifier keywords written on a declaration
pub fn declared_modifiers(declaration: SyntaxNode<'_>) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    if let Some(list) = declaration.child_of_kind("modifiers") {
        for child in list.children() {
            if let Some(m) = Modifiers::from_keyword(child.kind()) {
                modifiers |= m;
            }
        }
    }
    modifiers
}

/// Annotation names as written (`Override`, `org.junit.Test`, ...)
pub fn annotation_names(declaration: SyntaxNode<'_>) -> Vec<String> {
    let Some(list) = declaration.child_of_kind("modifiers") else {
        return Vec::new();
    };
    list.named_children()
        .into_iter()
        .filter(|c| matches!(c.kind(), "annotation" | "marker_annotation"))
        .filter_map(|c| c.child_by_field("name"))
        .map(|name| name.text().to_string())
        .collect()
}

/// Last segment of a possibly qualified name
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Body block of the method or constructor enclosing `node`. Lambdas are
/// looked through: a node inside one resolves to the surrounding method.
pub fn enclosing_method_body<'t>(node: SyntaxNode<'t>) -> Option<SyntaxNode<'t>> {
    std::iter::once(node)
        .chain(node.ancestors())
        .find(|n| matches!(n.kind(), "method_declaration" | "constructor_declaration"))
        .and_then(|m| m.child_by_field("body"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SourceTree;

    fn find<'t>(tree: &'t SourceTree, kind: &str, text: &str) -> SyntaxNode<'t> {
        tree.root()
            .descendants()
            .into_iter()
            .find(|n| n.kind() == kind && n.text() == text)
            .unwrap()
    }

    #[test]
    fn test_assignability_walks_hierarchy() {
        let char_seq = TypeInfo::named("CharSequence");
        let string = TypeInfo {
            name: "String".into(),
            qualified_name: Some("java.lang.String".into()),
            superclass: Some(Box::new(TypeInfo::named("Object"))),
            interfaces: vec![char_seq],
            element_type: None,
        };
        assert!(string.is_assignable_to("String"));
        assert!(string.is_assignable_to("java.lang.String"));
        assert!(string.is_assignable_to("CharSequence"));
        assert!(string.is_assignable_to("Object"));
        assert!(!string.is_assignable_to("Number"));
        assert!(TypeInfo::array_of(string).is_array());
    }

    #[test]
    fn test_syntactic_modifiers_and_annotations() {
        let tree = SourceTree::parse(
            "class A { @Deprecated @org.junit.Test private static final int X = 1; }",
        )
        .unwrap();
        let ident = find(&tree, "identifier", "X");
        let decl = enclosing_declaration(ident).unwrap();
        assert_eq!(decl.kind(), "field_declaration");
        let m = declared_modifiers(decl);
        assert!(m.contains(Modifiers::PRIVATE | Modifiers::STATIC | Modifiers::FINAL));
        assert!(!m.contains(Modifiers::PUBLIC));
        assert_eq!(annotation_names(decl), vec!["Deprecated", "org.junit.Test"]);
        assert_eq!(simple_name("org.junit.Test"), "Test");
    }

    #[test]
    fn test_enclosing_method_body() {
        let tree = SourceTree::parse("class A { void f() { g(1); } int y = 2; }").unwrap();
        let call = find(&tree, "method_invocation", "g(1)");
        assert_eq!(enclosing_method_body(call).unwrap().text(), "{ g(1); }");
        let lit = find(&tree, "decimal_integer_literal", "2");
        assert!(enclosing_method_body(lit).is_none());
    }

    #[test]
    fn test_enclosing_method_body_looks_through_lambdas() {
        let tree =
            SourceTree::parse("class A { void f() { run(() -> { g(1); }); } }").unwrap();
        let call = find(&tree, "method_invocation", "g(1)");
        assert_eq!(
            enclosing_method_body(call).unwrap().text(),
            "{ run(() -> { g(1); }); }"
        );
    }
}
