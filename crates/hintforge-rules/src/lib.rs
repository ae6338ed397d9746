//! hintforge-rules: guard-conditioned rewrite rules over Java syntax trees
//!
//! Modules:
//! - guard: guard expression parser, evaluator and built-in functions
//! - binding: placeholder bindings handed from the matcher to guards
//! - matcher: unification of pattern fragments with candidate subtrees
//! - hint: the `.hint` rule file format (parser, model, writer)
//! - loader: finding and reading hint files on disk
//! - registry: concurrent store of hint files with include resolution
//! - engine: compiled rule sets and first-match evaluation

pub mod binding;
pub mod engine;
pub mod guard;
pub mod hint;
pub mod loader;
pub mod matcher;
pub mod registry;

pub use binding::{BindingContext, Bound, DEFAULT_SOURCE_VERSION};
pub use engine::{CompiledRule, MatchOptions, RuleMatch, RuleSet, SkipReason, SkippedRule};
pub use guard::{parse_guard, GuardError, GuardExpression, GuardFunction, GuardRegistry, SyntaxError};
pub use hint::{
    parse_hint_file, parse_hint_reader, HintFile, HintParseError, ImportDirective,
    RewriteAlternative, TransformationRule,
};
pub use loader::LoadError;
pub use matcher::{match_compiled, match_fragment, match_with, PlaceholderMatcher};
pub use registry::{HintRegistry, IncludeDiagnostic, IncludeResolution};
