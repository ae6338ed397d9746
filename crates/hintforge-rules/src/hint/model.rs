//! Hint file data model

use hintforge_core::Pattern;

use super::imports::ImportDirective;
use crate::binding::BindingContext;
use crate::guard::{GuardError, GuardExpression, GuardRegistry};

/// One candidate replacement of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteAlternative {
    pub replacement: String,
    /// `None` is the `otherwise` case: always applies
    pub guard: Option<GuardExpression>,
}

impl RewriteAlternative {
    pub fn new(replacement: impl Into<String>, guard: Option<GuardExpression>) -> Self {
        Self {
            replacement: replacement.into(),
            guard,
        }
    }

    pub fn otherwise(replacement: impl Into<String>) -> Self {
        Self::new(replacement, None)
    }

    pub fn is_otherwise(&self) -> bool {
        self.guard.is_none()
    }
}

/// A source pattern with its guard and rewrite alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationRule {
    pub description: Option<String>,
    pub source_pattern: Pattern,
    pub source_guard: Option<GuardExpression>,
    /// Evaluated in declaration order
    pub alternatives: Vec<RewriteAlternative>,
    pub imports: Option<ImportDirective>,
}

impl TransformationRule {
    pub fn new(source_pattern: Pattern) -> Self {
        Self {
            description: None,
            source_pattern,
            source_guard: None,
            alternatives: Vec::new(),
            imports: None,
        }
    }

    /// A rule without alternatives only reports, it never rewrites
    pub fn is_hint_only(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub fn has_imports(&self) -> bool {
        self.imports.as_ref().is_some_and(|i| !i.is_empty())
    }

    /// Whether the rule-level guard accepts the bindings. No guard accepts.
    pub fn source_guard_holds(
        &self,
        registry: &GuardRegistry,
        ctx: &BindingContext<'_>,
    ) -> Result<bool, GuardError> {
        match &self.source_guard {
            Some(guard) => registry.evaluate(guard, ctx),
            None => Ok(true),
        }
    }

    /// First alternative whose guard holds, an `otherwise` alternative
    /// always holding
    pub fn find_matching_alternative(
        &self,
        registry: &GuardRegistry,
        ctx: &BindingContext<'_>,
    ) -> Result<Option<&RewriteAlternative>, GuardError> {
        for alternative in &self.alternatives {
            match &alternative.guard {
                None => return Ok(Some(alternative)),
                Some(guard) => {
                    if registry.evaluate(guard, ctx)? {
                        return Ok(Some(alternative));
                    }
                }
            }
        }
        Ok(None)
    }
}

/// A parsed `.hint` document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintFile {
    pub id: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    /// `0` when the file does not declare one
    pub min_java_version: i32,
    pub tags: Vec<String>,
    /// File order is significant: first match wins
    pub rules: Vec<TransformationRule>,
    /// Ids of other hint files whose rules are pulled in
    pub includes: Vec<String>,
}

impl HintFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: TransformationRule) {
        self.rules.push(rule);
    }
}
