//! Hint files: the rule text format, its data model and its writer

pub mod imports;
pub mod model;
pub mod parser;
mod writer;

pub use imports::ImportDirective;
pub use model::{HintFile, RewriteAlternative, TransformationRule};
pub use parser::{parse_hint_file, parse_hint_reader, HintParseError};
