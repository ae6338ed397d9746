//! Placeholder type constraints, `$name:Kind` and `$name$:Kind`.
//!
//! The constraint suffix is not valid Java, so it is stripped from the
//! pattern text before parsing and kept in a side table keyed by the bare
//! placeholder name.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::tree::SyntaxNode;

const NUMBER_KINDS: &[&str] = &[
    "decimal_integer_literal",
    "hex_integer_literal",
    "octal_integer_literal",
    "binary_integer_literal",
    "decimal_floating_point_literal",
    "hex_floating_point_literal",
];

const EXPRESSION_KINDS: &[&str] = &[
    "assignment_expression",
    "binary_expression",
    "instanceof_expression",
    "lambda_expression",
    "ternary_expression",
    "update_expression",
    "unary_expression",
    "cast_expression",
    "switch_expression",
    "identifier",
    "field_access",
    "array_access",
    "method_invocation",
    "method_reference",
    "object_creation_expression",
    "array_creation_expression",
    "parenthesized_expression",
    "this",
    "super",
    "class_literal",
    "string_literal",
    "character_literal",
    "null_literal",
    "true",
    "false",
];

/// What a constrained placeholder may bind to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeConstraint {
    StringLiteral,
    NumberLiteral,
    /// `Foo.class`
    TypeLiteral,
    SimpleName,
    MethodInvocation,
    Expression,
    Statement,
    /// Any other name, compared against the node kind in snake case
    /// (`LambdaExpression` accepts `lambda_expression`)
    Kind(String),
}

impl TypeConstraint {
    pub fn parse(name: &str) -> Self {
        match name {
            "StringLiteral" => TypeConstraint::StringLiteral,
            "NumberLiteral" => TypeConstraint::NumberLiteral,
            "TypeLiteral" => TypeConstraint::TypeLiteral,
            "SimpleName" => TypeConstraint::SimpleName,
            "MethodInvocation" => TypeConstraint::MethodInvocation,
            "Expression" => TypeConstraint::Expression,
            "Statement" => TypeConstraint::Statement,
            other => TypeConstraint::Kind(snake_case(other)),
        }
    }

    pub fn accepts(&self, node: SyntaxNode<'_>) -> bool {
        let kind = node.kind();
        match self {
            TypeConstraint::StringLiteral => kind == "string_literal",
            TypeConstraint::NumberLiteral => NUMBER_KINDS.contains(&kind),
            TypeConstraint::TypeLiteral => kind == "class_literal",
            TypeConstraint::SimpleName => matches!(kind, "identifier" | "type_identifier"),
            TypeConstraint::MethodInvocation => kind == "method_invocation",
            TypeConstraint::Expression => {
                EXPRESSION_KINDS.contains(&kind) || NUMBER_KINDS.contains(&kind)
            }
            TypeConstraint::Statement => {
                kind.ends_with("_statement")
                    || matches!(kind, "block" | "local_variable_declaration")
            }
            TypeConstraint::Kind(expected) => kind == expected,
        }
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeConstraint::StringLiteral => f.write_str("StringLiteral"),
            TypeConstraint::NumberLiteral => f.write_str("NumberLiteral"),
            TypeConstraint::TypeLiteral => f.write_str("TypeLiteral"),
            TypeConstraint::SimpleName => f.write_str("SimpleName"),
            TypeConstraint::MethodInvocation => f.write_str("MethodInvocation"),
            TypeConstraint::Expression => f.write_str("Expression"),
            TypeConstraint::Statement => f.write_str("Statement"),
            TypeConstraint::Kind(kind) => f.write_str(kind),
        }
    }
}

/// Constraints of one pattern, keyed by placeholder (`$msg`, `$args$`)
pub type Constraints = HashMap<String, TypeConstraint>;

const NAMED_CONSTRAINTS: &[&str] = &[
    "StringLiteral",
    "NumberLiteral",
    "TypeLiteral",
    "SimpleName",
    "MethodInvocation",
    "Expression",
    "Statement",
];

/// Strip `:Kind` suffixes from placeholders, returning parseable text and
/// the constraints found. An unrecognised kind followed by `.`, `(`, `[`
/// or `<` is left alone, so `$c ? $a:Foo.BAR` stays a conditional.
pub fn extract_constraints(text: &str) -> (String, Constraints) {
    static CONSTRAINED: OnceLock<Regex> = OnceLock::new();
    let regex = CONSTRAINED.get_or_init(|| {
        Regex::new(r"(\$[A-Za-z_][A-Za-z0-9_]*\$?):([A-Z][A-Za-z0-9_]*)\b([.(\[<])?").unwrap()
    });

    let mut constraints = Constraints::new();
    let stripped = regex.replace_all(text, |caps: &Captures| {
        let follower = caps.get(3).map_or("", |m| m.as_str());
        if !follower.is_empty() && !NAMED_CONSTRAINTS.contains(&&caps[2]) {
            return caps[0].to_string();
        }
        constraints
            .entry(caps[1].to_string())
            .or_insert_with(|| TypeConstraint::parse(&caps[2]));
        format!("{}{}", &caps[1], follower)
    });
    (stripped.into_owned(), constraints)
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SourceTree;

    #[test]
    fn test_extract_constraints() {
        let (text, constraints) = extract_constraints("foo($msg:StringLiteral, $n:NumberLiteral)");
        assert_eq!(text, "foo($msg, $n)");
        assert_eq!(constraints["$msg"], TypeConstraint::StringLiteral);
        assert_eq!(constraints["$n"], TypeConstraint::NumberLiteral);

        let (text, constraints) = extract_constraints("log($args$:Expression)");
        assert_eq!(text, "log($args$)");
        assert_eq!(constraints["$args$"], TypeConstraint::Expression);

        let (text, constraints) = extract_constraints("$x:SimpleName.equals($x)");
        assert_eq!(text, "$x.equals($x)");
        assert_eq!(constraints["$x"], TypeConstraint::SimpleName);
    }

    #[test]
    fn test_conditional_expressions_are_untouched() {
        for text in ["$c ? $a:Foo.BAR", "$c ? $a:b", "$c ? $a : $b"] {
            let (stripped, constraints) = extract_constraints(text);
            assert_eq!(stripped, text);
            assert!(constraints.is_empty());
        }
    }

    #[test]
    fn test_other_names_compare_as_kinds() {
        assert_eq!(
            TypeConstraint::parse("LambdaExpression"),
            TypeConstraint::Kind("lambda_expression".to_string())
        );
        assert_eq!(TypeConstraint::parse("Statement"), TypeConstraint::Statement);
    }

    #[test]
    fn test_accepts_by_node_kind() {
        let tree = SourceTree::parse(
            "class A { void f() { g(\"s\", 42, A.class, name, h(), x -> x); return; } }",
        )
        .unwrap();
        let args = tree
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.kind() == "argument_list")
            .unwrap()
            .named_children();
        let [string, number, class, name, call, lambda] = args.as_slice() else {
            panic!("unexpected arguments: {args:?}");
        };

        assert!(TypeConstraint::StringLiteral.accepts(*string));
        assert!(!TypeConstraint::StringLiteral.accepts(*number));
        assert!(TypeConstraint::NumberLiteral.accepts(*number));
        assert!(TypeConstraint::TypeLiteral.accepts(*class));
        assert!(TypeConstraint::SimpleName.accepts(*name));
        assert!(!TypeConstraint::SimpleName.accepts(*call));
        assert!(TypeConstraint::MethodInvocation.accepts(*call));
        assert!(TypeConstraint::Expression.accepts(*lambda));
        assert!(TypeConstraint::parse("LambdaExpression").accepts(*lambda));
        assert!(!TypeConstraint::Statement.accepts(*call));

        let ret = tree
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.kind() == "return_statement")
            .unwrap();
        assert!(TypeConstraint::Statement.accepts(ret));
        assert!(!TypeConstraint::Expression.accepts(ret));
    }
}
