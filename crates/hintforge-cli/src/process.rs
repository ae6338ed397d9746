//! File processing logic for hintforge

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use hintforge_core::{SourceModel, SourceTree};
use hintforge_rules::{BindingContext, Bound, MatchOptions, RuleMatch, RuleSet};

use crate::output::Finding;

/// Result of scanning a single Java file
pub struct ProcessResult {
    pub findings: Vec<Finding>,
    /// The tree had syntax errors; findings are still reported for the
    /// parts that parsed
    pub had_syntax_errors: bool,
}

/// Parse a Java file and run every rule over every node
pub fn process_file(path: &Path, rules: &RuleSet, source_version: &str) -> Result<ProcessResult> {
    let source_code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    process_source(&source_code, rules, source_version)
        .with_context(|| format!("Failed to scan {}", path.display()))
}

pub fn process_source(source: &str, rules: &RuleSet, source_version: &str) -> Result<ProcessResult> {
    let tree = SourceTree::parse(source)?;
    let model = SourceModel::new(&tree);
    let options = MatchOptions::new(source_version).with_semantic_model(&model);

    let matches = rules.find_all(tree.root(), &options)?;
    let findings = matches.iter().filter_map(|m| to_finding(source, m)).collect();

    Ok(ProcessResult {
        findings,
        had_syntax_errors: tree.has_errors(),
    })
}

fn to_finding(source: &str, found: &RuleMatch<'_, '_>) -> Option<Finding> {
    let node = found.node()?;
    let start = node.byte_range().start;
    let (line, column) = offset_to_line_column(source, start);

    Some(Finding {
        hint_file: found.rule.origin().to_string(),
        rule: found.rule.label().to_string(),
        line,
        column,
        matched: node.text().to_string(),
        replacement: found
            .alternative
            .map(|alt| expand_placeholders(&alt.replacement, &found.bindings)),
    })
}

/// Fill `$name` and `$name$` in a replacement with the bound source text.
/// Unbound placeholders are left as written.
pub fn expand_placeholders(template: &str, bindings: &BindingContext<'_>) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let regex = PLACEHOLDER.get_or_init(|| Regex::new(r"\$[A-Za-z_][A-Za-z0-9_]*\$?").unwrap());

    let result = regex.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[0];
        if let Some(text) = bound_text(bindings, name) {
            return text;
        }
        // `$a$b`-style adjacency: retry without the trailing `$`
        match name.strip_suffix('$').and_then(|short| bound_text(bindings, short)) {
            Some(text) => format!("{text}$"),
            None => name.to_string(),
        }
    });
    result.into_owned()
}

fn bound_text(bindings: &BindingContext<'_>, name: &str) -> Option<String> {
    match bindings.get(name)? {
        Bound::Node(node) => Some(node.text().to_string()),
        Bound::List(nodes) => Some(
            nodes
                .iter()
                .map(|n| n.text())
                .collect::<Vec<_>>()
                .join(", "),
        ),
    }
}

/// Convert a byte offset to 1-based line and column
fn offset_to_line_column(source: &str, offset: usize) -> (usize, usize) {
    let prefix = &source[..offset.min(source.len())];
    let line = prefix.matches('\n').count() + 1;
    let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
    let column = prefix[line_start..].chars().count() + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hintforge_rules::parse_hint_file;

    const HINTS: &str = r#"
"Use isEmpty()":
$c.size() == 0
=> $c.isEmpty()
;;

"Use List.of":
java.util.Collections.unmodifiableList(java.util.Arrays.asList($args$))
=> java.util.List.of($args$)
;;

"Use isBlank()":
$s.trim().isEmpty()
=> $s.isBlank() :: sourceVersionGE(11)
;;

System.gc()
;;
"#;

    const SOURCE: &str = "class A {\n    void f(java.util.List<String> items, String name) {\n        boolean a = items.size() == 0;\n        Object l = java.util.Collections.unmodifiableList(java.util.Arrays.asList(1, 2));\n        boolean b = name.trim().isEmpty();\n        System.gc();\n    }\n}\n";

    fn rules() -> RuleSet {
        RuleSet::compile("demo", parse_hint_file(HINTS).unwrap().rules)
    }

    #[test]
    fn test_findings_with_positions_and_replacements() {
        let result = process_source(SOURCE, &rules(), "17").unwrap();
        assert!(!result.had_syntax_errors);

        let by_rule: Vec<(&str, usize, Option<&str>)> = result
            .findings
            .iter()
            .map(|f| (f.rule.as_str(), f.line, f.replacement.as_deref()))
            .collect();

        assert!(by_rule.contains(&("Use isEmpty()", 3, Some("items.isEmpty()"))));
        assert!(by_rule.contains(&("Use List.of", 4, Some("java.util.List.of(1, 2)"))));
        assert!(by_rule.contains(&("Use isBlank()", 5, Some("name.isBlank()"))));
        assert!(by_rule.contains(&("System.gc()", 6, None)));

        let empty = result
            .findings
            .iter()
            .find(|f| f.rule == "Use isEmpty()")
            .unwrap();
        assert_eq!(empty.column, 21);
        assert_eq!(empty.matched, "items.size() == 0");
        assert_eq!(empty.hint_file, "demo");
    }

    #[test]
    fn test_source_version_gates_alternatives() {
        let result = process_source(SOURCE, &rules(), "1.8").unwrap();
        assert!(result.findings.iter().all(|f| f.rule != "Use isBlank()"));
    }

    #[test]
    fn test_process_file_reports_missing_file() {
        let err = process_file(Path::new("/nonexistent/A.java"), &rules(), "17");
        assert!(err.is_err());
    }

    #[test]
    fn test_offset_to_line_column() {
        let source = "ab\ncd\n";
        assert_eq!(offset_to_line_column(source, 0), (1, 1));
        assert_eq!(offset_to_line_column(source, 4), (2, 2));
        assert_eq!(offset_to_line_column(source, 100), (3, 1));
    }
}
