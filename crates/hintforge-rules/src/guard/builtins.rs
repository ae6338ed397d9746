//! Built-in guard functions
//!
//! Each function receives the binding context and the raw argument strings
//! exactly as written in the guard (string literals keep their quotes).

use std::borrow::Cow;

use hintforge_core::semantic::{
    annotation_names, declared_modifiers, enclosing_declaration, enclosing_method_body,
};
use hintforge_core::{Element, Modifiers, SyntaxNode, TypeInfo};

use super::functions::GuardRegistry;
use crate::binding::BindingContext;

pub(super) fn register_all(registry: &mut GuardRegistry) {
    registry.register("instanceof", instance_of);
    registry.register("matchesAny", matches_any);
    registry.register("matchesNone", matches_none);
    registry.register("hasNoSideEffect", has_no_side_effect);
    registry.register("sourceVersionGE", source_version_ge);
    registry.register("sourceVersionLE", source_version_le);
    registry.register("sourceVersionBetween", source_version_between);
    registry.register("isStatic", is_static);
    registry.register("isFinal", is_final);
    registry.register("elementKindMatches", element_kind_matches);
    registry.register("hasAnnotation", has_annotation);
    registry.register("isDeprecated", is_deprecated);
    registry.register("referencedIn", referenced_in);
    registry.register("contains", contains);
    registry.register("notContains", not_contains);
}

/// Remove one layer of surrounding `"` or `'`
pub fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Resolve `\"`, `\'` and `\\`. Other escapes are kept as written.
fn unescape(value: &str) -> Cow<'_, str> {
    if !value.contains('\\') {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('"' | '\'' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}

/// Comparable value of a literal node, or its trimmed text otherwise
fn literal_value<'t>(node: SyntaxNode<'t>) -> Cow<'t, str> {
    match node.kind() {
        "string_literal" | "character_literal" => unescape(strip_quotes(node.text())),
        _ => Cow::Borrowed(node.text().trim()),
    }
}

fn parse_version(version: &str) -> f64 {
    strip_quotes(version.trim()).parse().unwrap_or(0.0)
}

fn instance_of(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    let [placeholder, type_name, ..] = args else {
        return false;
    };
    let Some(node) = ctx.node(placeholder) else {
        return false;
    };
    let Some(ty) = ctx.semantic().and_then(|m| m.resolve_type(node)) else {
        return false;
    };
    type_matches(&ty, type_name)
}

fn type_matches(ty: &TypeInfo, type_name: &str) -> bool {
    match type_name.strip_suffix("[]") {
        Some(element) if !element.is_empty() => ty
            .element_type
            .as_deref()
            .is_some_and(|e| type_matches(e, element)),
        _ => ty.is_assignable_to(type_name),
    }
}

fn matches_any(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    match args {
        [] => false,
        [placeholder] => ctx.is_bound(placeholder),
        [placeholder, literals @ ..] => {
            let Some(node) = ctx.node(placeholder) else {
                return false;
            };
            let value = literal_value(node);
            literals
                .iter()
                .any(|lit| unescape(strip_quotes(lit)) == value)
        }
    }
}

fn matches_none(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    !matches_any(ctx, args)
}

/// Conservative: only a method call is assumed to have effects
fn has_no_side_effect(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    args.first()
        .and_then(|ph| ctx.node(ph))
        .map_or(true, |node| node.kind() != "method_invocation")
}

fn source_version_ge(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    args.first()
        .is_some_and(|v| parse_version(ctx.source_version()) >= parse_version(v))
}

fn source_version_le(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    args.first()
        .is_some_and(|v| parse_version(ctx.source_version()) <= parse_version(v))
}

fn source_version_between(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    let [min, max, ..] = args else {
        return false;
    };
    let current = parse_version(ctx.source_version());
    current >= parse_version(min) && current <= parse_version(max)
}

fn modifiers_of(ctx: &BindingContext<'_>, node: SyntaxNode<'_>) -> Modifiers {
    if let Some(element) = ctx.semantic().and_then(|m| m.resolve_element(node)) {
        return element.modifiers();
    }
    enclosing_declaration(node)
        .map(declared_modifiers)
        .unwrap_or_default()
}

fn is_static(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    args.first()
        .and_then(|ph| ctx.node(ph))
        .is_some_and(|node| modifiers_of(ctx, node).contains(Modifiers::STATIC))
}

fn is_final(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    args.first()
        .and_then(|ph| ctx.node(ph))
        .is_some_and(|node| modifiers_of(ctx, node).contains(Modifiers::FINAL))
}

fn element_kind_matches(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    let [placeholder, kind, ..] = args else {
        return false;
    };
    let Some(node) = ctx.node(placeholder) else {
        return false;
    };
    let kind = strip_quotes(kind).to_ascii_uppercase();
    match ctx.semantic().and_then(|m| m.resolve_element(node)) {
        Some(element) => element_is_kind(&element, &kind),
        None => node_is_kind(node, &kind),
    }
}

fn element_is_kind(element: &Element, kind: &str) -> bool {
    match (kind, element) {
        ("FIELD", Element::Variable { is_field, .. }) => *is_field,
        ("PARAMETER", Element::Variable { is_parameter, .. }) => *is_parameter,
        (
            "LOCAL_VARIABLE",
            Element::Variable {
                is_field,
                is_parameter,
                ..
            },
        ) => !is_field && !is_parameter,
        ("METHOD", Element::Method { .. }) => true,
        ("TYPE", Element::Type { .. }) => true,
        _ => false,
    }
}

/// Shape-based classification when nothing resolves
fn node_is_kind(node: SyntaxNode<'_>, kind: &str) -> bool {
    let parent_kind = node.parent().map(|p| p.kind()).unwrap_or_default();
    match kind {
        "FIELD" => {
            node.kind() == "field_declaration"
                || (node.kind() == "variable_declarator" && parent_kind == "field_declaration")
        }
        "METHOD" => matches!(node.kind(), "method_declaration" | "constructor_declaration"),
        "LOCAL_VARIABLE" => {
            node.kind() == "local_variable_declaration"
                || (node.kind() == "variable_declarator"
                    && parent_kind == "local_variable_declaration")
        }
        "PARAMETER" => matches!(node.kind(), "formal_parameter" | "spread_parameter"),
        "TYPE" => matches!(
            node.kind(),
            "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration"
        ),
        _ => false,
    }
}

const BODY_DECLARATIONS: &[&str] = &[
    "field_declaration",
    "method_declaration",
    "constructor_declaration",
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "enum_constant",
];

fn has_annotation(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    let [placeholder, annotation, ..] = args else {
        return false;
    };
    let Some(node) = ctx.node(placeholder) else {
        return false;
    };
    let wanted = strip_quotes(annotation);
    std::iter::once(node)
        .chain(node.ancestors())
        .find(|n| BODY_DECLARATIONS.contains(&n.kind()))
        .is_some_and(|decl| annotation_names(decl).iter().any(|name| name == wanted))
}

fn is_deprecated(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    let Some(node) = args.first().and_then(|ph| ctx.node(ph)) else {
        return false;
    };
    ctx.semantic()
        .and_then(|m| m.resolve_element(node))
        .is_some_and(|e| e.is_deprecated())
}

fn referenced_in(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    let [var, expr, ..] = args else {
        return false;
    };
    let (Some(var_node), Some(expr_node)) = (ctx.node(var), ctx.node(expr)) else {
        return false;
    };
    let name = var_node.text().trim();
    // Walk lazily so the first hit stops the search
    let mut stack = vec![expr_node];
    while let Some(node) = stack.pop() {
        if node.kind() == "identifier" && node.text() == name {
            return true;
        }
        stack.extend(node.children());
    }
    false
}

fn contains(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    let (context_node, needle) = match args {
        [] => return false,
        [text] => (ctx.matched_node(), text),
        [placeholder, text, ..] => (ctx.node(placeholder), text),
    };
    let needle = strip_quotes(needle);
    context_node
        .and_then(enclosing_method_body)
        .is_some_and(|body| body.text().contains(needle))
}

fn not_contains(ctx: &BindingContext<'_>, args: &[String]) -> bool {
    !contains(ctx, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Bound;
    use crate::guard::parse_guard;
    use hintforge_core::{SourceModel, SourceTree};

    fn eval(ctx: &BindingContext<'_>, guard: &str) -> bool {
        GuardRegistry::with_builtins()
            .evaluate(&parse_guard(guard).unwrap(), ctx)
            .unwrap()
    }

    fn find<'t>(tree: &'t SourceTree, kind: &str, text: &str, nth: usize) -> SyntaxNode<'t> {
        tree.root()
            .descendants()
            .into_iter()
            .filter(|n| n.kind() == kind && n.text() == text)
            .nth(nth)
            .unwrap()
    }

    const SOURCE: &str = r#"
class Shop {
    private static final int LIMIT = 3;
    @Deprecated private String legacy;
    @Override public String toString() { return legacy; }

    @Inject
    int total(String name, int[] prices) {
        int sum = 0;
        for (int p : prices) { sum += p; }
        System.out.println("audit");
        return sum + name.length() + LIMIT + compute();
    }
    int compute() { return 1; }
}
"#;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"a\""), "a");
        assert_eq!(strip_quotes("'a'"), "a");
        assert_eq!(strip_quotes("\"a'"), "\"a'");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("plain"), "plain");
    }

    #[test]
    fn test_source_version_guards() {
        let ctx = BindingContext::new().with_source_version("17");
        assert!(eval(&ctx, "sourceVersionGE(11)"));
        assert!(!eval(&ctx, "sourceVersionLE(11)"));
        assert!(eval(&ctx, "sourceVersionBetween(11, 21)"));

        let legacy = BindingContext::new();
        assert_eq!(legacy.source_version(), "1.8");
        assert!(!eval(&legacy, "sourceVersionGE(11)"));
        assert!(eval(&legacy, "sourceVersionGE(1.8)"));

        // Unparsable versions read as zero
        let broken = BindingContext::new().with_source_version("banana");
        assert!(!eval(&broken, "sourceVersionGE(1)"));
        assert!(eval(&broken, "sourceVersionLE(0)"));
    }

    #[test]
    fn test_matches_any_compares_unescaped_values() {
        let tree = SourceTree::parse(
            r#"class A { String s = "a\"b"; String p = "c:\\tmp"; char q = '\''; }"#,
        )
        .unwrap();
        let mut ctx = BindingContext::new();
        ctx.bind("$s", Bound::Node(find(&tree, "string_literal", r#""a\"b""#, 0)));
        ctx.bind("$p", Bound::Node(find(&tree, "string_literal", r#""c:\\tmp""#, 0)));
        ctx.bind("$q", Bound::Node(find(&tree, "character_literal", r"'\''", 0)));

        assert!(eval(&ctx, r#"matchesAny($s, "a\"b")"#));
        assert!(!eval(&ctx, r#"matchesAny($s, "a\\\"b")"#));
        assert!(eval(&ctx, r#"matchesAny($p, "c:\\tmp")"#));
        assert!(eval(&ctx, r#"matchesNone($p, "c:tmp")"#));
        assert!(eval(&ctx, r#"matchesAny($q, "'")"#));
    }

    #[test]
    fn test_matches_none_is_exact_negation() {
        let tree = SourceTree::parse(r#"class A { String s = "x"; }"#).unwrap();
        let literal = find(&tree, "string_literal", "\"x\"", 0);

        let mut bound = BindingContext::new();
        bound.bind("$v", Bound::Node(literal));
        let unbound = BindingContext::new();

        let arg_lists: Vec<Vec<String>> = vec![
            vec![],
            vec!["$v".into()],
            vec!["$v".into(), "\"x\"".into()],
            vec!["$v".into(), "\"y\"".into()],
            vec!["$v".into(), "\"y\"".into(), "'x'".into()],
            vec!["$v".into(), "\"y\"".into(), "\"z\"".into()],
        ];
        for ctx in [&bound, &unbound] {
            for args in &arg_lists {
                assert_eq!(
                    matches_none(ctx, args),
                    !matches_any(ctx, args),
                    "args {args:?} bound={}",
                    ctx.is_bound("$v")
                );
            }
        }
        assert!(matches_any(&bound, &arg_lists[1]));
        assert!(matches_any(&bound, &arg_lists[2]));
        assert!(!matches_any(&bound, &arg_lists[3]));
        assert!(matches_any(&bound, &arg_lists[4]));
        assert!(!matches_any(&unbound, &arg_lists[1]));
    }

    #[test]
    fn test_instanceof_through_model() {
        let tree = SourceTree::parse(SOURCE).unwrap();
        let model = SourceModel::new(&tree);
        let name = find(&tree, "identifier", "name", 1);
        let prices = find(&tree, "identifier", "prices", 1);

        let mut ctx = BindingContext::new().with_semantic_model(&model);
        ctx.bind("$s", Bound::Node(name));
        ctx.bind("$arr", Bound::Node(prices));

        assert!(eval(&ctx, "$s instanceof String"));
        assert!(eval(&ctx, "$s instanceof CharSequence"));
        assert!(eval(&ctx, "$s instanceof java.lang.Object"));
        assert!(!eval(&ctx, "$s instanceof Number"));
        assert!(eval(&ctx, "$arr instanceof int[]"));
        assert!(!eval(&ctx, "$s instanceof String[]"));

        // Without a model nothing resolves
        let mut bare = BindingContext::new();
        bare.bind("$s", Bound::Node(name));
        assert!(!eval(&bare, "$s instanceof String"));
    }

    #[test]
    fn test_modifier_guards() {
        let tree = SourceTree::parse(SOURCE).unwrap();
        let model = SourceModel::new(&tree);
        let limit_use = find(&tree, "identifier", "LIMIT", 1);
        let sum_use = find(&tree, "identifier", "sum", 1);

        let mut ctx = BindingContext::new().with_semantic_model(&model);
        ctx.bind("$c", Bound::Node(limit_use));
        ctx.bind("$v", Bound::Node(sum_use));
        assert!(eval(&ctx, "isStatic($c) && isFinal($c)"));
        assert!(!eval(&ctx, "isStatic($v)"));

        // Syntactic fallback reads the enclosing declaration
        let decl_name = find(&tree, "identifier", "LIMIT", 0);
        let mut bare = BindingContext::new();
        bare.bind("$c", Bound::Node(decl_name));
        assert!(eval(&bare, "isStatic($c)"));
    }

    #[test]
    fn test_element_kind_matches() {
        let tree = SourceTree::parse(SOURCE).unwrap();
        let model = SourceModel::new(&tree);
        let mut ctx = BindingContext::new().with_semantic_model(&model);
        ctx.bind("$field", Bound::Node(find(&tree, "identifier", "LIMIT", 1)));
        ctx.bind("$param", Bound::Node(find(&tree, "identifier", "name", 1)));
        ctx.bind("$local", Bound::Node(find(&tree, "identifier", "sum", 1)));
        ctx.bind("$call", Bound::Node(find(&tree, "method_invocation", "compute()", 0)));

        assert!(eval(&ctx, "elementKindMatches($field, FIELD)"));
        assert!(eval(&ctx, "elementKindMatches($param, PARAMETER)"));
        assert!(eval(&ctx, "elementKindMatches($local, local_variable)"));
        assert!(eval(&ctx, "elementKindMatches($call, METHOD)"));
        assert!(!eval(&ctx, "elementKindMatches($local, FIELD)"));

        // No model: classify by node shape
        let method = tree
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.kind() == "method_declaration")
            .unwrap();
        let mut bare = BindingContext::new();
        bare.bind("$m", Bound::Node(method));
        assert!(eval(&bare, "elementKindMatches($m, \"METHOD\")"));
        assert!(!eval(&bare, "elementKindMatches($m, TYPE)"));
    }

    #[test]
    fn test_annotation_and_deprecation() {
        let tree = SourceTree::parse(SOURCE).unwrap();
        let model = SourceModel::new(&tree);
        let mut ctx = BindingContext::new().with_semantic_model(&model);
        ctx.bind("$x", Bound::Node(find(&tree, "identifier", "sum", 1)));
        ctx.bind("$legacy", Bound::Node(find(&tree, "identifier", "legacy", 1)));

        assert!(eval(&ctx, "hasAnnotation($x, Inject)"));
        assert!(!eval(&ctx, "hasAnnotation($x, Override)"));
        assert!(eval(&ctx, "hasAnnotation($legacy, Override)"));
        assert!(eval(&ctx, "isDeprecated($legacy)"));
        assert!(!eval(&ctx, "isDeprecated($x)"));
    }

    #[test]
    fn test_referenced_in_and_side_effects() {
        let tree = SourceTree::parse(SOURCE).unwrap();
        let ret = tree
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.kind() == "binary_expression" && n.text().starts_with("sum + name"))
            .unwrap();
        let mut ctx = BindingContext::new();
        ctx.bind("$v", Bound::Node(find(&tree, "identifier", "name", 0)));
        ctx.bind("$other", Bound::Node(find(&tree, "identifier", "prices", 0)));
        ctx.bind("$e", Bound::Node(ret));
        ctx.bind("$call", Bound::Node(find(&tree, "method_invocation", "compute()", 0)));
        ctx.bind("$lit", Bound::Node(find(&tree, "decimal_integer_literal", "0", 0)));

        assert!(eval(&ctx, "referencedIn($v, $e)"));
        assert!(!eval(&ctx, "referencedIn($other, $e)"));
        assert!(!eval(&ctx, "hasNoSideEffect($call)"));
        assert!(eval(&ctx, "hasNoSideEffect($lit)"));
        assert!(eval(&ctx, "hasNoSideEffect($unbound)"));
    }

    #[test]
    fn test_contains_searches_enclosing_method_body() {
        let tree = SourceTree::parse(SOURCE).unwrap();
        let call = find(&tree, "method_invocation", "compute()", 0);
        let ctx = BindingContext::new().with_matched_node(call);
        assert!(eval(&ctx, "contains(\"audit\")"));
        assert!(eval(&ctx, "notContains(\"unrelated\")"));

        let mut ctx = BindingContext::new();
        ctx.bind("$x", Bound::Node(find(&tree, "identifier", "legacy", 1)));
        assert!(!eval(&ctx, "contains($x, \"audit\")"));
        assert!(eval(&ctx, "contains($x, \"return legacy\")"));
    }
}
