//! `.hint` text format parser
//!
//! ```text
//! <!id: modernize.strings>
//! <!tags: strings, java11>
//!
//! "Use isBlank()":
//! $s.trim().isEmpty() :: sourceVersionGE(11)
//! => $s.isBlank()
//! ;;
//! ```
//!
//! Comments (`//` and `/* */`) are stripped first, keeping line numbers
//! intact. The first error aborts the whole file.

use std::io::Read;

use hintforge_core::Pattern;
use thiserror::Error;
use tracing::debug;

use super::imports::ImportDirective;
use super::model::{HintFile, RewriteAlternative, TransformationRule};
use crate::guard::{parse_guard, GuardExpression, SyntaxError};

const RULE_TERMINATOR: &str = ";;";
const ALTERNATIVE_PREFIX: &str = "=>";
const OTHERWISE: &str = "otherwise";

#[derive(Error, Debug)]
pub enum HintParseError {
    #[error("hint file content is empty")]
    Empty,

    #[error("rule starting at line {line} is missing the ';;' terminator")]
    MissingTerminator { line: usize },

    #[error("invalid metadata directive at line {line}: {reason}")]
    InvalidMetadata { line: usize, reason: String },

    #[error("invalid minJavaVersion '{value}' at line {line}")]
    InvalidVersion { line: usize, value: String },

    #[error("expected '=>', an import directive or ';;' at line {line}, found: {text}")]
    UnexpectedLine { line: usize, text: String },

    #[error("rule at line {line} has a description but no pattern")]
    MissingPattern { line: usize },

    #[error("invalid guard at line {line}: {source}")]
    Guard { line: usize, source: SyntaxError },

    #[error("I/O error reading hint file: {0}")]
    Io(#[from] std::io::Error),
}

impl HintParseError {
    /// 1-based line the error refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            HintParseError::MissingTerminator { line }
            | HintParseError::InvalidMetadata { line, .. }
            | HintParseError::InvalidVersion { line, .. }
            | HintParseError::UnexpectedLine { line, .. }
            | HintParseError::MissingPattern { line }
            | HintParseError::Guard { line, .. } => Some(*line),
            HintParseError::Empty | HintParseError::Io(_) => None,
        }
    }
}

/// Parse hint file text
pub fn parse_hint_file(content: &str) -> Result<HintFile, HintParseError> {
    if content.trim().is_empty() {
        return Err(HintParseError::Empty);
    }

    let lines = strip_comments(content);
    let mut file = HintFile::new();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index].trim();
        if line.is_empty() {
            index += 1;
            continue;
        }
        if line.starts_with("<!") {
            parse_metadata(&mut file, line, index + 1)?;
            index += 1;
            continue;
        }
        index = parse_rule(&mut file, &lines, index)?;
    }

    Ok(file)
}

/// Parse hint file text from any reader
pub fn parse_hint_reader(mut reader: impl Read) -> Result<HintFile, HintParseError> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    parse_hint_file(&content)
}

/// Remove `//` and `/* */` comments. Every input line yields exactly one
/// output line so that indexes stay aligned with source line numbers.
fn strip_comments(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_block = false;

    for raw in content.lines() {
        let mut rest = raw;
        if in_block {
            match rest.find("*/") {
                Some(end) => {
                    in_block = false;
                    rest = &rest[end + 2..];
                }
                None => {
                    out.push(String::new());
                    continue;
                }
            }
        }

        let mut line = String::with_capacity(rest.len());
        loop {
            let line_comment = rest.find("//");
            let block_comment = rest.find("/*");
            match (line_comment, block_comment) {
                (Some(l), Some(b)) if l < b => {
                    line.push_str(&rest[..l]);
                    break;
                }
                (Some(l), None) => {
                    line.push_str(&rest[..l]);
                    break;
                }
                (_, Some(b)) => {
                    line.push_str(&rest[..b]);
                    match rest[b + 2..].find("*/") {
                        Some(end) => rest = &rest[b + 2 + end + 2..],
                        None => {
                            in_block = true;
                            break;
                        }
                    }
                }
                (None, None) => {
                    line.push_str(rest);
                    break;
                }
            }
        }
        out.push(line);
    }

    out
}

fn parse_metadata(file: &mut HintFile, line: &str, line_number: usize) -> Result<(), HintParseError> {
    let Some(inner) = line.strip_prefix("<!").and_then(|l| l.strip_suffix('>')) else {
        return Err(HintParseError::InvalidMetadata {
            line: line_number,
            reason: format!("missing '>' in {line}"),
        });
    };
    let Some((key, value)) = inner.split_once(':') else {
        return Err(HintParseError::InvalidMetadata {
            line: line_number,
            reason: format!("missing ':' in {line}"),
        });
    };
    let key = key.trim();
    let value = value.trim();

    match key {
        "id" => file.id = Some(value.to_string()),
        "description" => file.description = Some(value.to_string()),
        "severity" => file.severity = Some(value.to_string()),
        "minJavaVersion" => {
            file.min_java_version = value.parse().map_err(|_| HintParseError::InvalidVersion {
                line: line_number,
                value: value.to_string(),
            })?;
        }
        "tags" => file.tags = split_list(value),
        "include" => file.includes.extend(split_list(value)),
        other => debug!("Ignoring unknown metadata key '{}' at line {}", other, line_number),
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Consume one rule block starting at `start`, returning the index after
/// its terminator
fn parse_rule(file: &mut HintFile, lines: &[String], start: usize) -> Result<usize, HintParseError> {
    let start_line = start + 1;
    let mut block: Vec<(usize, &str)> = Vec::new();
    let mut index = start;
    let mut terminated = false;

    while index < lines.len() {
        let line = lines[index].trim();
        index += 1;
        if line.is_empty() {
            continue;
        }
        if line == RULE_TERMINATOR {
            terminated = true;
            break;
        }
        block.push((index, line));
    }

    if block.is_empty() {
        return Ok(index);
    }
    if !terminated {
        return Err(HintParseError::MissingTerminator { line: start_line });
    }

    let mut entries = block.into_iter();
    let mut description = None;
    let (mut pattern_line, mut first) = entries.next().unwrap_or((start_line, ""));

    if let Some(text) = description_text(first) {
        description = Some(text.to_string());
        match entries.next() {
            Some((line, text)) => {
                pattern_line = line;
                first = text;
            }
            None => return Err(HintParseError::MissingPattern { line: start_line }),
        }
    }

    let (pattern_text, guard_text) = split_guard(first);
    let source_guard = guard_text
        .map(|text| parse_guard_at(text.trim(), pattern_line))
        .transpose()?;

    let mut imports = ImportDirective::new();
    let mut alternatives = Vec::new();

    for (line_number, line) in entries {
        if let Some(name) = line.strip_prefix("addImport ") {
            imports.add_import(name.trim());
        } else if let Some(name) = line.strip_prefix("removeImport ") {
            imports.remove_import(name.trim());
        } else if let Some(name) = line.strip_prefix("addStaticImport ") {
            imports.add_static_import(name.trim());
        } else if let Some(name) = line.strip_prefix("removeStaticImport ") {
            imports.remove_static_import(name.trim());
        } else if let Some(content) = line.strip_prefix(ALTERNATIVE_PREFIX) {
            let (replacement, guard_text) = split_guard(content.trim());
            let guard = match guard_text.map(str::trim) {
                None | Some(OTHERWISE) => None,
                Some(text) => Some(parse_guard_at(text, line_number)?),
            };
            alternatives.push(RewriteAlternative::new(replacement.trim(), guard));
        } else {
            return Err(HintParseError::UnexpectedLine {
                line: line_number,
                text: line.to_string(),
            });
        }
    }

    if imports.is_empty() {
        for alternative in &alternatives {
            imports.merge(&ImportDirective::detect_from_pattern(&alternative.replacement));
        }
    }

    file.add_rule(TransformationRule {
        description,
        source_pattern: Pattern::inferred(pattern_text.trim()),
        source_guard,
        alternatives,
        imports: (!imports.is_empty()).then_some(imports),
    });

    Ok(index)
}

/// `"text":` on its own line
fn description_text(line: &str) -> Option<&str> {
    line.strip_prefix('"')?.strip_suffix("\":")
}

fn parse_guard_at(text: &str, line: usize) -> Result<GuardExpression, HintParseError> {
    parse_guard(text).map_err(|source| HintParseError::Guard { line, source })
}

/// Split `pattern :: guard` on the first `::` outside parentheses and
/// double quotes
fn split_guard(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;

    for i in 0..bytes.len().saturating_sub(1) {
        match bytes[i] {
            b'"' => in_quote = !in_quote,
            _ if in_quote => {}
            b'(' => depth += 1,
            b')' => depth -= 1,
            b':' if depth == 0 && bytes[i + 1] == b':' => {
                return (&line[..i], Some(&line[i + 2..]));
            }
            _ => {}
        }
    }
    (line, None)
}
