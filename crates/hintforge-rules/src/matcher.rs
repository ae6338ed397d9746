//! Unification matcher between a compiled pattern fragment and a candidate
//! subtree.
//!
//! Walks both trees in lock-step. A `$name` leaf in the pattern binds the
//! candidate subtree on first sight; later occurrences of the same name must
//! meet a structurally identical subtree. Annotations, field declarations
//! and `$args$` argument lists get dedicated rules. A placeholder written
//! as `$name:Kind` only binds nodes of that kind.

use std::sync::Arc;

use hintforge_core::{structurally_equal, CompiledPattern, Constraints, SyntaxNode};

use crate::binding::{BindingContext, Bound};

/// Match `pattern` against `candidate` with a fresh context
pub fn match_fragment<'t>(
    pattern: SyntaxNode<'_>,
    candidate: SyntaxNode<'t>,
) -> Option<BindingContext<'t>> {
    match_with(pattern, candidate, BindingContext::new())
}

/// Match using a caller-prepared context (source version, semantic model).
/// Bindings from a failed attempt are never returned.
pub fn match_with<'t>(
    pattern: SyntaxNode<'_>,
    candidate: SyntaxNode<'t>,
    ctx: BindingContext<'t>,
) -> Option<BindingContext<'t>> {
    let mut matcher = PlaceholderMatcher::with_context(ctx);
    if matcher.match_node(pattern, candidate) {
        let mut ctx = matcher.into_context();
        ctx.set_matched_node(candidate);
        Some(ctx)
    } else {
        None
    }
}

/// Match a compiled pattern, honouring its placeholder type constraints
pub fn match_compiled<'t>(
    pattern: &CompiledPattern,
    candidate: SyntaxNode<'t>,
    ctx: BindingContext<'t>,
) -> Option<BindingContext<'t>> {
    let mut matcher = PlaceholderMatcher::with_context(ctx)
        .with_constraints(Arc::clone(pattern.constraints()));
    if matcher.match_node(pattern.fragment(), candidate) {
        let mut ctx = matcher.into_context();
        ctx.set_matched_node(candidate);
        Some(ctx)
    } else {
        None
    }
}

/// Accumulates bindings over one top-level match attempt
#[derive(Debug, Default)]
pub struct PlaceholderMatcher<'t> {
    ctx: BindingContext<'t>,
    constraints: Arc<Constraints>,
}

impl<'t> PlaceholderMatcher<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(ctx: BindingContext<'t>) -> Self {
        Self {
            ctx,
            constraints: Arc::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: Arc<Constraints>) -> Self {
        self.constraints = constraints;
        self
    }

    fn satisfies_constraint(&self, name: &str, candidate: SyntaxNode<'_>) -> bool {
        self.constraints
            .get(name)
            .map_or(true, |constraint| constraint.accepts(candidate))
    }

    pub fn context(&self) -> &BindingContext<'t> {
        &self.ctx
    }

    pub fn into_context(self) -> BindingContext<'t> {
        self.ctx
    }

    pub fn match_node(&mut self, pattern: SyntaxNode<'_>, candidate: SyntaxNode<'t>) -> bool {
        if pattern.is_placeholder() {
            return self.bind_placeholder(pattern.text(), candidate);
        }
        if pattern.kind() != candidate.kind() {
            return false;
        }
        match pattern.kind() {
            "marker_annotation" | "annotation" => self.match_annotation(pattern, candidate),
            "field_declaration" => self.match_field(pattern, candidate),
            "argument_list" if sole_multi_placeholder(pattern).is_some() => {
                self.match_argument_list(pattern, candidate)
            }
            _ => self.match_children(pattern, candidate),
        }
    }

    fn bind_placeholder(&mut self, name: &str, candidate: SyntaxNode<'t>) -> bool {
        if !self.satisfies_constraint(name, candidate) {
            return false;
        }
        match self.ctx.get(name) {
            Some(Bound::Node(previous)) => structurally_equal(*previous, candidate),
            Some(Bound::List(_)) => false,
            None => {
                self.ctx.bind(name, Bound::Node(candidate));
                true
            }
        }
    }

    fn match_children(&mut self, pattern: SyntaxNode<'_>, candidate: SyntaxNode<'t>) -> bool {
        let pattern_children = pattern.children();
        let candidate_children = candidate.children();
        if pattern_children.is_empty() && candidate_children.is_empty() {
            return pattern.text() == candidate.text();
        }
        pattern_children.len() == candidate_children.len()
            && pattern_children
                .into_iter()
                .zip(candidate_children)
                .all(|(p, c)| self.match_node(p, c))
    }

    /// Try a sub-match, undoing its bindings if it fails
    fn attempt(&mut self, pattern: SyntaxNode<'_>, candidate: SyntaxNode<'t>) -> bool {
        let snapshot = self.ctx.snapshot();
        if self.match_node(pattern, candidate) {
            true
        } else {
            self.ctx.restore(snapshot);
            false
        }
    }

    fn match_annotation(&mut self, pattern: SyntaxNode<'_>, candidate: SyntaxNode<'t>) -> bool {
        let (Some(pattern_name), Some(candidate_name)) =
            (pattern.child_by_field("name"), candidate.child_by_field("name"))
        else {
            return false;
        };
        if !self.match_node(pattern_name, candidate_name) {
            return false;
        }
        if pattern.kind() == "marker_annotation" {
            return true;
        }

        let pattern_args = annotation_arguments(pattern);
        let candidate_args = annotation_arguments(candidate);
        if pattern_args.len() != candidate_args.len() {
            return false;
        }

        let is_pair = |n: &SyntaxNode<'_>| n.kind() == "element_value_pair";
        if !pattern_args.iter().any(is_pair) {
            // Single-value form, `@SuppressWarnings("x")`
            return pattern_args
                .into_iter()
                .zip(candidate_args)
                .all(|(p, c)| self.match_node(p, c));
        }
        if !candidate_args.iter().all(is_pair) {
            return false;
        }

        // Name-value pairs: order is irrelevant, keys must line up
        for pair in pattern_args {
            let (Some(key), Some(value)) = (pair.child_by_field("key"), pair.child_by_field("value"))
            else {
                return false;
            };
            let counterpart = candidate_args.iter().find(|c| {
                c.child_by_field("key")
                    .is_some_and(|k| k.text() == key.text())
            });
            let Some(candidate_value) = counterpart.and_then(|c| c.child_by_field("value")) else {
                return false;
            };
            if !self.match_node(value, candidate_value) {
                return false;
            }
        }
        true
    }

    fn match_field(&mut self, pattern: SyntaxNode<'_>, candidate: SyntaxNode<'t>) -> bool {
        // Every pattern modifier must appear somewhere among the candidate's
        let candidate_modifiers = modifiers_of(candidate);
        for modifier in modifiers_of(pattern) {
            let found = candidate_modifiers
                .iter()
                .any(|c| self.attempt(modifier, *c));
            if !found {
                return false;
            }
        }

        match (pattern.child_by_field("type"), candidate.child_by_field("type")) {
            (Some(p), Some(c)) => {
                if !self.match_node(p, c) {
                    return false;
                }
            }
            _ => return false,
        }

        let pattern_declarators = declarators_of(pattern);
        let candidate_declarators = declarators_of(candidate);
        if pattern_declarators.len() != candidate_declarators.len() {
            return false;
        }
        for (p, c) in pattern_declarators.into_iter().zip(candidate_declarators) {
            let names_match = match (p.child_by_field("name"), c.child_by_field("name")) {
                (Some(pn), Some(cn)) => self.match_node(pn, cn),
                _ => false,
            };
            if !names_match {
                return false;
            }
            // Initializer only constrains when the pattern spells one out
            if let Some(pattern_value) = p.child_by_field("value") {
                match c.child_by_field("value") {
                    Some(candidate_value) if self.match_node(pattern_value, candidate_value) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    fn match_argument_list(&mut self, pattern: SyntaxNode<'_>, candidate: SyntaxNode<'t>) -> bool {
        let Some(placeholder) = sole_multi_placeholder(pattern) else {
            return false;
        };
        let args = candidate.named_children();
        let name = placeholder.text();
        if !args.iter().all(|arg| self.satisfies_constraint(name, *arg)) {
            return false;
        }
        match self.ctx.get(name) {
            Some(Bound::List(previous)) => {
                previous.len() == args.len()
                    && previous
                        .iter()
                        .zip(&args)
                        .all(|(p, c)| structurally_equal(*p, *c))
            }
            Some(Bound::Node(_)) => false,
            None => {
                self.ctx.bind(name, Bound::List(args));
                true
            }
        }
    }
}

fn sole_multi_placeholder<'p>(argument_list: SyntaxNode<'p>) -> Option<SyntaxNode<'p>> {
    match argument_list.named_children().as_slice() {
        [only] if only.is_multi_placeholder() => Some(*only),
        _ => None,
    }
}

fn annotation_arguments<'a>(annotation: SyntaxNode<'a>) -> Vec<SyntaxNode<'a>> {
    annotation
        .child_by_field("arguments")
        .map(|args| args.named_children())
        .unwrap_or_default()
}

fn modifiers_of<'a>(declaration: SyntaxNode<'a>) -> Vec<SyntaxNode<'a>> {
    declaration
        .child_of_kind("modifiers")
        .map(|m| m.children())
        .unwrap_or_default()
}

fn declarators_of<'a>(declaration: SyntaxNode<'a>) -> Vec<SyntaxNode<'a>> {
    declaration
        .named_children()
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .collect()
}
