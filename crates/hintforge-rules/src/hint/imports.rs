//! Import changes a rewrite needs

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Qualified type references: lowercase package segments then a capitalized
/// class name, e.g. `java.util.Objects`
fn qualified_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*(\.[A-Z][A-Za-z0-9_]*))\b").unwrap()
    })
}

/// Imports to add or remove when a rewrite is applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportDirective {
    pub add_imports: BTreeSet<String>,
    pub remove_imports: BTreeSet<String>,
    pub add_static_imports: BTreeSet<String>,
    pub remove_static_imports: BTreeSet<String>,
}

impl ImportDirective {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_import(&mut self, name: impl Into<String>) {
        self.add_imports.insert(name.into());
    }

    pub fn remove_import(&mut self, name: impl Into<String>) {
        self.remove_imports.insert(name.into());
    }

    pub fn add_static_import(&mut self, name: impl Into<String>) {
        self.add_static_imports.insert(name.into());
    }

    pub fn remove_static_import(&mut self, name: impl Into<String>) {
        self.remove_static_imports.insert(name.into());
    }

    pub fn is_empty(&self) -> bool {
        self.add_imports.is_empty()
            && self.remove_imports.is_empty()
            && self.add_static_imports.is_empty()
            && self.remove_static_imports.is_empty()
    }

    /// Union `other` into `self`
    pub fn merge(&mut self, other: &ImportDirective) {
        self.add_imports.extend(other.add_imports.iter().cloned());
        self.remove_imports.extend(other.remove_imports.iter().cloned());
        self.add_static_imports
            .extend(other.add_static_imports.iter().cloned());
        self.remove_static_imports
            .extend(other.remove_static_imports.iter().cloned());
    }

    /// Imports implied by qualified names in a replacement pattern
    pub fn detect_from_pattern(replacement: &str) -> Self {
        let mut directive = Self::new();
        for captures in qualified_name_regex().captures_iter(replacement) {
            let Some(m) = captures.get(1) else {
                continue;
            };
            // `$x.foo.Bar` is a member chain on a placeholder, not a package
            if replacement[..m.start()].ends_with('$') {
                continue;
            }
            directive.add_import(m.as_str());
        }
        directive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_qualified_names() {
        let d = ImportDirective::detect_from_pattern(
            "java.util.Objects.requireNonNull($x, java.util.function.Supplier.class)",
        );
        let names: Vec<&str> = d.add_imports.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["java.util.Objects", "java.util.function.Supplier"]);
    }

    #[test]
    fn test_ignores_placeholders_and_plain_calls() {
        assert!(ImportDirective::detect_from_pattern("$s.isBlank()").is_empty());
        assert!(ImportDirective::detect_from_pattern("$x.util.List").is_empty());
        assert!(ImportDirective::detect_from_pattern("String.valueOf($v)").is_empty());
    }

    #[test]
    fn test_merge_is_union() {
        let mut a = ImportDirective::new();
        a.add_import("java.util.List");
        a.remove_static_import("org.junit.Assert.assertEquals");
        let mut b = ImportDirective::new();
        b.add_import("java.util.List");
        b.add_import("java.util.Set");
        a.merge(&b);
        assert_eq!(a.add_imports.len(), 2);
        assert_eq!(a.remove_static_imports.len(), 1);
        assert!(!a.is_empty());
        assert!(ImportDirective::new().is_empty());
    }
}
