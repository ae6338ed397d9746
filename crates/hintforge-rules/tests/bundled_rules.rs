//! The bundled rule libraries compile and fire on realistic code

use hintforge_core::{SourceModel, SourceTree};
use hintforge_rules::{HintRegistry, MatchOptions, RuleSet};

const SOURCE: &str = r#"
import java.io.FileReader;
import java.util.*;

class Inventory {
    private final List<String> items = new ArrayList<>();

    String describe(String name, Map<String, Integer> counts) throws Exception {
        if (items.size() == 0) {
            return name.toString();
        }
        for (String key : counts.keySet()) {
            Integer count = counts.get(key);
        }
        Integer boxed = new Integer(42);
        FileReader reader = new FileReader(name);
        StringBuffer buffer = new StringBuffer();
        System.gc();
        return name.trim().isEmpty() ? "" : name;
    }
}
"#;

fn bundled_rule_set() -> RuleSet {
    let registry = HintRegistry::new();
    registry.load_bundled();
    let mut set = RuleSet::new();
    for (_, file) in registry.all() {
        set.extend(file.id.as_deref().unwrap_or_default(), file.rules.iter().cloned());
    }
    set
}

#[test]
fn test_every_bundled_rule_compiles() {
    let set = bundled_rule_set();
    for skipped in set.skipped() {
        eprintln!("{} / {}: {}", skipped.origin, skipped.pattern, skipped.reason);
    }
    assert!(set.skipped().is_empty());
    assert!(set.len() >= 20);
}

#[test]
fn test_bundled_rules_on_java17() {
    let set = bundled_rule_set();
    let tree = SourceTree::parse(SOURCE).unwrap();
    assert!(!tree.has_errors());
    let model = SourceModel::new(&tree);
    let options = MatchOptions::new("17").with_semantic_model(&model);

    let found = set.find_all(tree.root(), &options).unwrap();
    let labels: Vec<&str> = found.iter().map(|m| m.rule.label()).collect();

    assert!(labels.contains(&"Use isEmpty() instead of comparing size() with zero"));
    assert!(labels.contains(&"Redundant toString() on a String"));
    assert!(labels.contains(&"Use Integer.valueOf instead of new Integer"));
    assert!(labels.contains(&"Pass an explicit charset to FileReader"));
    assert!(labels.contains(&"StringBuffer is synchronized; prefer StringBuilder"));
    assert!(labels.contains(&"Explicit garbage collection is rarely useful"));
    assert!(labels.contains(&"Use isBlank()"));
    assert!(labels.contains(&"Map lookup inside a keySet() loop; iterate entrySet() instead"));
}

#[test]
fn test_version_gated_rules_stay_quiet_on_java8() {
    let set = bundled_rule_set();
    let tree = SourceTree::parse(SOURCE).unwrap();
    let model = SourceModel::new(&tree);
    let options = MatchOptions::new("1.8").with_semantic_model(&model);

    let found = set.find_all(tree.root(), &options).unwrap();
    let labels: Vec<&str> = found.iter().map(|m| m.rule.label()).collect();

    assert!(labels.contains(&"Use isEmpty() instead of comparing size() with zero"));
    assert!(!labels.contains(&"Use isBlank()"));
    assert!(!labels.contains(&"Pass an explicit charset to FileReader"));
    assert!(!labels.contains(&"Use Integer.valueOf instead of new Integer"));
}
