//! Rule evaluation: pattern match, then source guard, then the first
//! alternative whose guard holds.

use hintforge_core::{compile, visit, CompiledPattern, PatternError, SemanticModel, SyntaxNode, Visitor};
use thiserror::Error;
use tracing::{debug, warn};

use crate::binding::{BindingContext, DEFAULT_SOURCE_VERSION};
use crate::guard::{GuardError, GuardRegistry};
use crate::hint::{HintFile, RewriteAlternative, TransformationRule};
use crate::matcher::match_compiled;
use crate::registry::HintRegistry;

/// Why a rule was left out of a [`RuleSet`]
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("unknown guard functions: {}", .0.join(", "))]
    UnknownGuards(Vec<String>),
}

#[derive(Debug)]
pub struct SkippedRule {
    /// Hint file id the rule came from
    pub origin: String,
    pub pattern: String,
    pub reason: SkipReason,
}

/// A rule with its source pattern compiled
#[derive(Debug)]
pub struct CompiledRule {
    rule: TransformationRule,
    pattern: CompiledPattern,
    origin: String,
}

impl CompiledRule {
    pub fn rule(&self) -> &TransformationRule {
        &self.rule
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Description, falling back to the pattern text
    pub fn label(&self) -> &str {
        self.rule
            .description
            .as_deref()
            .unwrap_or(&self.rule.source_pattern.text)
    }
}

/// Ambient facts for one evaluation
#[derive(Clone, Copy)]
pub struct MatchOptions<'a> {
    pub source_version: &'a str,
    pub semantic: Option<&'a dyn SemanticModel>,
}

impl Default for MatchOptions<'_> {
    fn default() -> Self {
        Self {
            source_version: DEFAULT_SOURCE_VERSION,
            semantic: None,
        }
    }
}

impl<'a> MatchOptions<'a> {
    pub fn new(source_version: &'a str) -> Self {
        Self {
            source_version,
            semantic: None,
        }
    }

    pub fn with_semantic_model(mut self, model: &'a dyn SemanticModel) -> Self {
        self.semantic = Some(model);
        self
    }

    fn context(&self) -> BindingContext<'a> {
        let ctx = BindingContext::new().with_source_version(self.source_version);
        match self.semantic {
            Some(model) => ctx.with_semantic_model(model),
            None => ctx,
        }
    }
}

/// A successful rule evaluation
#[derive(Debug)]
pub struct RuleMatch<'r, 'a> {
    pub rule: &'r CompiledRule,
    /// `None` for hint-only rules
    pub alternative: Option<&'r RewriteAlternative>,
    pub bindings: BindingContext<'a>,
}

impl<'a> RuleMatch<'_, 'a> {
    pub fn node(&self) -> Option<SyntaxNode<'a>> {
        self.bindings.matched_node()
    }
}

/// Ordered, compiled rules ready to run against candidate nodes
#[derive(Debug)]
pub struct RuleSet {
    guards: GuardRegistry,
    rules: Vec<CompiledRule>,
    skipped: Vec<SkippedRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_guards(GuardRegistry::with_builtins())
    }
}

impl RuleSet {
    /// Empty set using the built-in guard functions
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guards(guards: GuardRegistry) -> Self {
        Self {
            guards,
            rules: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Compile `rules` with the built-in guards
    pub fn compile(origin: &str, rules: impl IntoIterator<Item = TransformationRule>) -> Self {
        let mut set = Self::new();
        set.extend(origin, rules);
        set
    }

    /// Compile and append rules. A rule whose pattern does not compile, or
    /// whose guards name unknown functions, is skipped with a warning and
    /// the rest still load.
    pub fn extend(&mut self, origin: &str, rules: impl IntoIterator<Item = TransformationRule>) {
        for rule in rules {
            match self.compile_rule(&rule) {
                Ok(pattern) => self.rules.push(CompiledRule {
                    rule,
                    pattern,
                    origin: origin.to_string(),
                }),
                Err(reason) => {
                    warn!(
                        "Skipping rule '{}' from '{}': {}",
                        rule.source_pattern.text, origin, reason
                    );
                    self.skipped.push(SkippedRule {
                        origin: origin.to_string(),
                        pattern: rule.source_pattern.text.clone(),
                        reason,
                    });
                }
            }
        }
    }

    /// Add a registered file with its includes resolved
    pub fn add_hint_file(&mut self, registry: &HintRegistry, file: &HintFile) {
        let origin = file.id.clone().unwrap_or_default();
        let rules = registry.resolve_includes(file);
        debug!("Compiling {} rules from '{}'", rules.len(), origin);
        self.extend(&origin, rules);
    }

    fn compile_rule(&self, rule: &TransformationRule) -> Result<CompiledPattern, SkipReason> {
        let mut unknown: Vec<String> = Vec::new();
        let guards = rule
            .source_guard
            .iter()
            .chain(rule.alternatives.iter().filter_map(|alt| alt.guard.as_ref()));
        for guard in guards {
            for name in self.guards.unknown_functions(guard) {
                if !unknown.iter().any(|u| u == name) {
                    unknown.push(name.to_string());
                }
            }
        }
        if !unknown.is_empty() {
            return Err(SkipReason::UnknownGuards(unknown));
        }
        Ok(compile(&rule.source_pattern)?)
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn skipped(&self) -> &[SkippedRule] {
        &self.skipped
    }

    pub fn guards(&self) -> &GuardRegistry {
        &self.guards
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate one rule against one candidate. A rule with alternatives of
    /// which none holds does not match; a hint-only rule matches with no
    /// alternative.
    pub fn evaluate<'r, 'a>(
        &'r self,
        rule: &'r CompiledRule,
        candidate: SyntaxNode<'a>,
        options: &MatchOptions<'a>,
    ) -> Result<Option<RuleMatch<'r, 'a>>, GuardError> {
        if !rule.pattern.could_match(candidate) {
            return Ok(None);
        }
        let Some(bindings) = match_compiled(&rule.pattern, candidate, options.context())
        else {
            return Ok(None);
        };
        if !rule.rule.source_guard_holds(&self.guards, &bindings)? {
            return Ok(None);
        }

        if rule.rule.is_hint_only() {
            return Ok(Some(RuleMatch {
                rule,
                alternative: None,
                bindings,
            }));
        }
        let alternative = rule.rule.find_matching_alternative(&self.guards, &bindings)?;
        Ok(alternative.map(|alternative| RuleMatch {
            rule,
            alternative: Some(alternative),
            bindings,
        }))
    }

    /// First rule, in order, that matches the candidate
    pub fn first_match<'r, 'a>(
        &'r self,
        candidate: SyntaxNode<'a>,
        options: &MatchOptions<'a>,
    ) -> Result<Option<RuleMatch<'r, 'a>>, GuardError> {
        for rule in &self.rules {
            if let Some(found) = self.evaluate(rule, candidate, options)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// First match at every node under `root`, in pre-order
    pub fn find_all<'r, 'a>(
        &'r self,
        root: SyntaxNode<'a>,
        options: &MatchOptions<'a>,
    ) -> Result<Vec<RuleMatch<'r, 'a>>, GuardError> {
        let mut collector = MatchCollector {
            rules: self,
            options,
            matches: Vec::new(),
            error: None,
        };
        visit(&mut collector, root);
        match collector.error {
            Some(e) => Err(e),
            None => Ok(collector.matches),
        }
    }
}

struct MatchCollector<'r, 'a, 'o> {
    rules: &'r RuleSet,
    options: &'o MatchOptions<'a>,
    matches: Vec<RuleMatch<'r, 'a>>,
    error: Option<GuardError>,
}

impl<'a> Visitor<'a> for MatchCollector<'_, 'a, '_> {
    fn visit_node(&mut self, node: SyntaxNode<'a>) -> bool {
        if self.error.is_some() {
            return false;
        }
        if !node.is_named() {
            return true;
        }
        match self.rules.first_match(node, self.options) {
            Ok(Some(found)) => self.matches.push(found),
            Ok(None) => {}
            Err(e) => {
                self.error = Some(e);
                return false;
            }
        }
        true
    }
}
