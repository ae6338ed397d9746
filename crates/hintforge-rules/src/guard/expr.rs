//! Guard expression AST

use std::fmt;

use serde::Serialize;

/// A parsed guard. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GuardExpression {
    And {
        left: Box<GuardExpression>,
        right: Box<GuardExpression>,
    },
    Or {
        left: Box<GuardExpression>,
        right: Box<GuardExpression>,
    },
    Not {
        operand: Box<GuardExpression>,
    },
    FunctionCall {
        name: String,
        args: Vec<String>,
    },
}

impl GuardExpression {
    pub fn and(left: GuardExpression, right: GuardExpression) -> Self {
        GuardExpression::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: GuardExpression, right: GuardExpression) -> Self {
        GuardExpression::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: GuardExpression) -> Self {
        GuardExpression::Not {
            operand: Box::new(operand),
        }
    }

    pub fn call<S: Into<String>>(name: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        GuardExpression::FunctionCall {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Every function name referenced, in source order
    pub fn function_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            GuardExpression::And { left, right } | GuardExpression::Or { left, right } => {
                left.collect_names(out);
                right.collect_names(out);
            }
            GuardExpression::Not { operand } => operand.collect_names(out),
            GuardExpression::FunctionCall { name, .. } => out.push(name),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            GuardExpression::Or { .. } => 1,
            GuardExpression::And { .. } => 2,
            GuardExpression::Not { .. } | GuardExpression::FunctionCall { .. } => 3,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn escape_arg(arg: &str) -> String {
    // Inner quotes of a string literal were unescaped during parsing
    match arg.strip_prefix('"').and_then(|a| a.strip_suffix('"')) {
        Some(inner) => format!("\"{}\"", inner.replace('"', "\\\"")),
        None => arg.to_string(),
    }
}

/// Renders text that parses back to an equal expression. Binary operators
/// are left-associative, so a right operand of equal precedence is wrapped.
impl fmt::Display for GuardExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardExpression::Or { left, right } => {
                left.fmt_operand(f, 1)?;
                f.write_str(" || ")?;
                right.fmt_operand(f, 2)
            }
            GuardExpression::And { left, right } => {
                left.fmt_operand(f, 2)?;
                f.write_str(" && ")?;
                right.fmt_operand(f, 3)
            }
            GuardExpression::Not { operand } => {
                f.write_str("!")?;
                operand.fmt_operand(f, 3)
            }
            GuardExpression::FunctionCall { name, args } => {
                let args: Vec<String> = args.iter().map(|a| escape_arg(a)).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parenthesizes_by_precedence() {
        let a = GuardExpression::call("a", Vec::<String>::new());
        let b = GuardExpression::call("b", ["$x"]);
        let c = GuardExpression::call("c", ["\"q\""]);

        let expr = GuardExpression::and(GuardExpression::or(a.clone(), b.clone()), c.clone());
        assert_eq!(expr.to_string(), "(a() || b($x)) && c(\"q\")");

        let expr = GuardExpression::or(a.clone(), GuardExpression::and(b.clone(), c.clone()));
        assert_eq!(expr.to_string(), "a() || b($x) && c(\"q\")");

        let expr = GuardExpression::and(a.clone(), GuardExpression::and(b.clone(), c));
        assert_eq!(expr.to_string(), "a() && (b($x) && c(\"q\"))");

        let expr = GuardExpression::not(GuardExpression::or(a, b));
        assert_eq!(expr.to_string(), "!(a() || b($x))");
    }

    #[test]
    fn test_display_reescapes_quotes() {
        let expr = GuardExpression::call("contains", ["\"say \"hi\"\""]);
        assert_eq!(expr.to_string(), r#"contains("say \"hi\"")"#);
    }

    #[test]
    fn test_function_names() {
        let expr = GuardExpression::and(
            GuardExpression::call("instanceof", ["$x", "String"]),
            GuardExpression::not(GuardExpression::call("isStatic", ["$x"])),
        );
        assert_eq!(expr.function_names(), vec!["instanceof", "isStatic"]);
    }
}
