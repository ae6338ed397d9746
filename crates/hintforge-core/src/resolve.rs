//! A syntax-only semantic model.
//!
//! Resolves names by walking lexical scopes and types by reading declared
//! type nodes, with a small built-in picture of the JDK hierarchy. It is
//! not a compiler, but it is enough for guards like `instanceof` and
//! `isStatic` on ordinary code.

use std::collections::{HashMap, HashSet};

use crate::semantic::{annotation_names, declared_modifiers, Element, SemanticModel, TypeInfo};
use crate::tree::{SourceTree, SyntaxNode};
use crate::visitor::{visit, Visitor};

#[derive(Debug, Clone, Default)]
struct TypeDecl {
    qualified_name: Option<String>,
    superclass: Option<String>,
    interfaces: Vec<String>,
}

/// Known class and interface declarations keyed by simple name
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    types: HashMap<String, TypeDecl>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// `java.lang` and `java.util` types commonly tested by guards
    pub fn java_defaults() -> Self {
        let mut h = Self::new();
        h.declare("java.lang.Object", None, &[]);
        h.declare("java.lang.CharSequence", None, &[]);
        h.declare("java.lang.Comparable", None, &[]);
        h.declare("java.io.Serializable", None, &[]);
        h.declare("java.lang.AutoCloseable", None, &[]);
        h.declare("java.io.Closeable", None, &["AutoCloseable"]);
        h.declare(
            "java.lang.String",
            Some("Object"),
            &["CharSequence", "Comparable", "Serializable"],
        );
        h.declare("java.lang.StringBuilder", Some("Object"), &["CharSequence"]);
        h.declare("java.lang.StringBuffer", Some("Object"), &["CharSequence"]);
        h.declare("java.lang.Number", Some("Object"), &["Serializable"]);
        for boxed in ["Integer", "Long", "Short", "Byte", "Double", "Float"] {
            h.declare(&format!("java.lang.{boxed}"), Some("Number"), &["Comparable"]);
        }
        h.declare("java.lang.Boolean", Some("Object"), &["Serializable", "Comparable"]);
        h.declare("java.lang.Character", Some("Object"), &["Serializable", "Comparable"]);
        h.declare("java.lang.Iterable", None, &[]);
        h.declare("java.util.Collection", None, &["Iterable"]);
        h.declare("java.util.List", None, &["Collection"]);
        h.declare("java.util.Set", None, &["Collection"]);
        h.declare("java.util.Queue", None, &["Collection"]);
        h.declare("java.util.Deque", None, &["Queue"]);
        h.declare("java.util.Map", None, &[]);
        h.declare("java.util.AbstractList", Some("Object"), &["List"]);
        h.declare("java.util.ArrayList", Some("AbstractList"), &["List", "Serializable"]);
        h.declare("java.util.LinkedList", Some("AbstractList"), &["List", "Deque"]);
        h.declare("java.util.Vector", Some("AbstractList"), &["List"]);
        h.declare("java.util.HashSet", Some("Object"), &["Set"]);
        h.declare("java.util.TreeSet", Some("Object"), &["Set"]);
        h.declare("java.util.HashMap", Some("Object"), &["Map"]);
        h.declare("java.util.TreeMap", Some("Object"), &["Map"]);
        h.declare("java.util.Optional", Some("Object"), &[]);
        h
    }

    /// Register a type by (qualified) name
    pub fn declare(&mut self, name: &str, superclass: Option<&str>, interfaces: &[&str]) {
        let simple = base_name(name).to_string();
        let qualified_name = name.contains('.').then(|| name.to_string());
        self.types.insert(
            simple,
            TypeDecl {
                qualified_name,
                superclass: superclass.map(|s| base_name(s).to_string()),
                interfaces: interfaces.iter().map(|i| base_name(i).to_string()).collect(),
            },
        );
    }

    /// Add every class and interface declared in `tree`
    pub fn index_source(&mut self, tree: &SourceTree) {
        let mut indexer = TypeIndexer { found: Vec::new() };
        visit(&mut indexer, tree.root());
        for (name, superclass, interfaces) in indexer.found {
            let ifaces: Vec<&str> = interfaces.iter().map(String::as_str).collect();
            self.declare(&name, superclass.as_deref(), &ifaces);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(base_name(name))
    }

    /// Full `TypeInfo` for a written type name (`List<String>`, `int[]`, ...)
    pub fn info(&self, written: &str) -> TypeInfo {
        let written = written.trim();
        if let Some(element) = written.strip_suffix("[]") {
            return TypeInfo::array_of(self.info(element));
        }
        let mut seen = HashSet::new();
        self.info_inner(base_name(written), &mut seen)
    }

    fn info_inner(&self, name: &str, seen: &mut HashSet<String>) -> TypeInfo {
        let mut info = TypeInfo::named(name);
        // Guard against self-referential declarations in broken sources
        if !seen.insert(name.to_string()) {
            return info;
        }
        if let Some(decl) = self.types.get(name) {
            info.qualified_name = decl.qualified_name.clone();
            info.superclass = decl
                .superclass
                .as_deref()
                .map(|s| Box::new(self.info_inner(s, seen)));
            info.interfaces = decl
                .interfaces
                .iter()
                .map(|i| self.info_inner(i, seen))
                .collect();
        }
        info
    }
}

/// Strip type arguments and package qualification
fn base_name(written: &str) -> &str {
    let no_generics = written.split('<').next().unwrap_or(written).trim();
    no_generics.rsplit('.').next().unwrap_or(no_generics)
}

struct TypeIndexer {
    found: Vec<(String, Option<String>, Vec<String>)>,
}

impl<'t> Visitor<'t> for TypeIndexer {
    fn visit_declaration(&mut self, node: SyntaxNode<'t>) -> bool {
        if !matches!(
            node.kind(),
            "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration"
        ) {
            return true;
        }
        let Some(name) = node.child_by_field("name") else {
            return true;
        };
        let superclass = node
            .child_by_field("superclass")
            .and_then(|s| s.named_children().into_iter().next())
            .map(|t| t.text().to_string());
        let mut interfaces = Vec::new();
        let lists = node
            .child_by_field("interfaces")
            .into_iter()
            .chain(node.child_of_kind("extends_interfaces"));
        for list in lists {
            for type_list in list.named_children() {
                for t in type_list.named_children() {
                    interfaces.push(t.text().to_string());
                }
            }
        }
        self.found
            .push((name.text().to_string(), superclass, interfaces));
        true
    }
}

/// Where a name was declared
#[derive(Debug, Clone, Copy)]
enum Declaration<'t> {
    Local(SyntaxNode<'t>),
    /// Enhanced-for variable; the statement carries type and modifiers
    LoopVariable(SyntaxNode<'t>),
    Parameter(SyntaxNode<'t>),
    Field(SyntaxNode<'t>),
    Method(SyntaxNode<'t>),
    Type(SyntaxNode<'t>),
}

/// Syntax-only [`SemanticModel`] for a single source file
#[derive(Debug, Clone)]
pub struct SourceModel {
    hierarchy: TypeHierarchy,
}

impl SourceModel {
    /// Model for `tree`, seeded with the JDK defaults
    pub fn new(tree: &SourceTree) -> Self {
        let mut hierarchy = TypeHierarchy::java_defaults();
        hierarchy.index_source(tree);
        Self { hierarchy }
    }

    pub fn with_hierarchy(hierarchy: TypeHierarchy) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    fn type_of_type_node(&self, type_node: SyntaxNode<'_>) -> Option<TypeInfo> {
        match type_node.kind() {
            "array_type" => {
                let element = type_node.child_by_field("element")?;
                let dims = type_node
                    .child_by_field("dimensions")
                    .map(|d| d.text().matches('[').count())
                    .unwrap_or(1);
                let mut info = self.type_of_type_node(element)?;
                for _ in 0..dims {
                    info = TypeInfo::array_of(info);
                }
                Some(info)
            }
            "generic_type" => {
                let base = type_node.named_children().into_iter().next()?;
                self.type_of_type_node(base)
            }
            "void_type" => None,
            // `var` carries no type of its own
            "type_identifier" if type_node.text() == "var" => None,
            _ => Some(self.hierarchy.info(type_node.text())),
        }
    }

    fn declared_type(&self, decl: Declaration<'_>) -> Option<TypeInfo> {
        let (owner, declarator) = match decl {
            Declaration::Parameter(node) | Declaration::LoopVariable(node) => (node, None),
            Declaration::Local(d) | Declaration::Field(d) => (declaration_owner(d), Some(d)),
            Declaration::Method(m) => (m, None),
            Declaration::Type(t) => {
                return t
                    .child_by_field("name")
                    .map(|n| self.hierarchy.info(n.text()))
            }
        };
        let type_node = owner.child_by_field("type");
        let from_type = type_node.and_then(|t| self.type_of_type_node(t));
        // C-style `int x[]` puts dimensions on the declarator
        let extra_dims = declarator
            .and_then(|d| d.child_by_field("dimensions"))
            .map(|d| d.text().matches('[').count())
            .unwrap_or(0);
        let declared = from_type.map(|mut info| {
            for _ in 0..extra_dims {
                info = TypeInfo::array_of(info);
            }
            info
        });
        declared.or_else(|| {
            let value = declarator?.child_by_field("value")?;
            self.resolve_type(value)
        })
    }

    fn element_of(&self, decl: Declaration<'_>) -> Element {
        match decl {
            Declaration::Local(d)
            | Declaration::Field(d)
            | Declaration::Parameter(d)
            | Declaration::LoopVariable(d) => {
                let owner = match decl {
                    Declaration::Local(_) | Declaration::Field(_) => declaration_owner(d),
                    _ => d,
                };
                Element::Variable {
                    is_field: matches!(decl, Declaration::Field(_)),
                    is_parameter: matches!(decl, Declaration::Parameter(_)),
                    modifiers: declared_modifiers(owner),
                    deprecated: is_deprecated(owner),
                }
            }
            Declaration::Method(m) => Element::Method {
                modifiers: declared_modifiers(m),
                deprecated: is_deprecated(m),
            },
            Declaration::Type(t) => Element::Type {
                modifiers: declared_modifiers(t),
                deprecated: is_deprecated(t),
            },
        }
    }
}

impl SemanticModel for SourceModel {
    fn resolve_type(&self, node: SyntaxNode<'_>) -> Option<TypeInfo> {
        let text = node.text();
        match node.kind() {
            "string_literal" | "text_block" => Some(self.hierarchy.info("String")),
            "character_literal" => Some(TypeInfo::named("char")),
            "true" | "false" => Some(TypeInfo::named("boolean")),
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => Some(TypeInfo::named(
                if text.ends_with(['l', 'L']) { "long" } else { "int" },
            )),
            "decimal_floating_point_literal" | "hex_floating_point_literal" => Some(
                TypeInfo::named(if text.ends_with(['f', 'F']) { "float" } else { "double" }),
            ),
            "null_literal" => None,
            "parenthesized_expression" => node
                .named_children()
                .into_iter()
                .next()
                .and_then(|inner| self.resolve_type(inner)),
            "object_creation_expression" | "cast_expression" => node
                .child_by_field("type")
                .and_then(|t| self.type_of_type_node(t)),
            "array_creation_expression" => {
                let element = self.type_of_type_node(node.child_by_field("type")?)?;
                let dims = node
                    .children()
                    .into_iter()
                    .filter(|c| matches!(c.kind(), "dimensions_expr" | "dimensions"))
                    .map(|c| c.text().matches('[').count())
                    .sum::<usize>()
                    .max(1);
                let mut info = element;
                for _ in 0..dims {
                    info = TypeInfo::array_of(info);
                }
                Some(info)
            }
            "binary_expression" => {
                let op = node.child_by_field("operator")?.text();
                match op {
                    "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => {
                        Some(TypeInfo::named("boolean"))
                    }
                    "+" => {
                        let left = self.resolve_type(node.child_by_field("left")?);
                        let right = self.resolve_type(node.child_by_field("right")?);
                        let is_string =
                            |t: &Option<TypeInfo>| t.as_ref().is_some_and(|t| t.name == "String");
                        if is_string(&left) || is_string(&right) {
                            Some(self.hierarchy.info("String"))
                        } else {
                            left.or(right)
                        }
                    }
                    _ => self.resolve_type(node.child_by_field("left")?),
                }
            }
            "instanceof_expression" => Some(TypeInfo::named("boolean")),
            "this" => enclosing_type(node)
                .and_then(|t| t.child_by_field("name"))
                .map(|n| self.hierarchy.info(n.text())),
            "method_invocation" => {
                let decl = find_declaration(node.child_by_field("name")?)?;
                self.declared_type(decl)
            }
            "identifier" | "field_access" => {
                let decl = find_declaration(node)?;
                self.declared_type(decl)
            }
            "type_identifier" | "scoped_type_identifier" | "generic_type" | "array_type"
            | "integral_type" | "floating_point_type" | "boolean_type" => {
                self.type_of_type_node(node)
            }
            _ => None,
        }
    }

    fn resolve_element(&self, node: SyntaxNode<'_>) -> Option<Element> {
        let target = match node.kind() {
            "method_invocation" => node.child_by_field("name")?,
            _ => node,
        };
        find_declaration(target).map(|decl| self.element_of(decl))
    }
}

fn is_deprecated(declaration: SyntaxNode<'_>) -> bool {
    annotation_names(declaration)
        .iter()
        .any(|n| n == "Deprecated" || n == "java.lang.Deprecated")
}

/// The declaration statement owning a `variable_declarator`
fn declaration_owner(declarator: SyntaxNode<'_>) -> SyntaxNode<'_> {
    declarator.parent().unwrap_or(declarator)
}

fn enclosing_type(node: SyntaxNode<'_>) -> Option<SyntaxNode<'_>> {
    node.ancestors().find(|n| {
        matches!(
            n.kind(),
            "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration"
        )
    })
}

fn name_is(node: SyntaxNode<'_>, name: &str) -> bool {
    node.child_by_field("name").is_some_and(|n| n.text() == name)
}

/// `variable_declarator` children of a local or field declaration
fn declarators(decl: SyntaxNode<'_>) -> impl Iterator<Item = SyntaxNode<'_>> {
    decl.named_children()
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
}

/// Resolve what a name node refers to by walking outward through scopes
fn find_declaration(node: SyntaxNode<'_>) -> Option<Declaration<'_>> {
    let parent = node.parent();

    // The node may itself be the name of a declaration
    if let Some(p) = parent {
        if p.child_by_field("name") == Some(node) {
            match p.kind() {
                "variable_declarator" => {
                    let owner = declaration_owner(p);
                    return Some(if owner.kind() == "field_declaration" {
                        Declaration::Field(p)
                    } else {
                        Declaration::Local(p)
                    });
                }
                "formal_parameter" | "catch_formal_parameter" | "spread_parameter" => {
                    return Some(Declaration::Parameter(p))
                }
                "method_declaration" | "constructor_declaration" => {
                    return Some(Declaration::Method(p))
                }
                "class_declaration" | "interface_declaration" | "enum_declaration"
                | "record_declaration" => return Some(Declaration::Type(p)),
                "method_invocation" => {
                    if p.child_by_field("object").is_some_and(|o| o.kind() != "this") {
                        return None;
                    }
                    let called = node.text();
                    return enclosing_type(node)?
                        .child_by_field("body")?
                        .named_children()
                        .into_iter()
                        .find(|m| m.kind() == "method_declaration" && name_is(*m, called))
                        .map(Declaration::Method);
                }
                _ => {}
            }
        }
    }

    match node.kind() {
        "field_access" => {
            let object = node.child_by_field("object")?;
            let field = node.child_by_field("field")?;
            if object.kind() != "this" {
                return None;
            }
            find_field(enclosing_type(node)?, field.text())
        }
        "type_identifier" => {
            let name = node.text();
            let root = node.ancestors().last()?;
            root.descendants()
                .into_iter()
                .find(|n| {
                    matches!(n.kind(), "class_declaration" | "interface_declaration" | "enum_declaration")
                        && name_is(*n, name)
                })
                .map(Declaration::Type)
        }
        "identifier" => find_in_scopes(node),
        _ => None,
    }
}

fn find_field<'t>(type_decl: SyntaxNode<'t>, name: &str) -> Option<Declaration<'t>> {
    let body = type_decl.child_by_field("body")?;
    body.named_children()
        .into_iter()
        .filter(|m| m.kind() == "field_declaration")
        .flat_map(|f| declarators(f).collect::<Vec<_>>())
        .find(|d| name_is(*d, name))
        .map(Declaration::Field)
}

fn find_in_scopes(node: SyntaxNode<'_>) -> Option<Declaration<'_>> {
    let name = node.text();
    let position = node.byte_range().start;

    for scope in node.ancestors() {
        match scope.kind() {
            "block" | "switch_block_statement_group" | "constructor_body" => {
                let local = scope
                    .named_children()
                    .into_iter()
                    .filter(|s| s.kind() == "local_variable_declaration")
                    .filter(|s| s.byte_range().start < position)
                    .flat_map(|s| declarators(s).collect::<Vec<_>>())
                    .filter(|d| name_is(*d, name))
                    .last();
                if let Some(d) = local {
                    return Some(Declaration::Local(d));
                }
            }
            "for_statement" => {
                if let Some(init) = scope.child_by_field("init") {
                    if init.kind() == "local_variable_declaration" {
                        if let Some(d) = declarators(init).find(|d| name_is(*d, name)) {
                            return Some(Declaration::Local(d));
                        }
                    }
                }
            }
            "enhanced_for_statement" => {
                if name_is(scope, name) {
                    return Some(Declaration::LoopVariable(scope));
                }
            }
            "catch_clause" => {
                if let Some(param) = scope.child_of_kind("catch_formal_parameter") {
                    if name_is(param, name) {
                        return Some(Declaration::Parameter(param));
                    }
                }
            }
            "lambda_expression" => {
                if let Some(params) = scope.child_by_field("parameters") {
                    if params.kind() == "identifier" && params.text() == name {
                        return Some(Declaration::Parameter(params));
                    }
                    for p in params.named_children() {
                        if (p.kind() == "identifier" && p.text() == name) || name_is(p, name) {
                            return Some(Declaration::Parameter(p));
                        }
                    }
                }
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(params) = scope.child_by_field("parameters") {
                    if let Some(p) = params.named_children().into_iter().find(|p| name_is(*p, name)) {
                        return Some(Declaration::Parameter(p));
                    }
                }
            }
            "class_declaration" | "interface_declaration" | "enum_declaration"
            | "record_declaration" => {
                if let Some(field) = find_field(scope, name) {
                    return Some(field);
                }
            }
            _ => {}
        }
    }
    None
}
