//! Output formatting for hintforge
//!
//! Supports text (colored terminal) and JSON output formats.

use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::path::Path;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// One rule match in a source file
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Hint file id the rule came from
    pub hint_file: String,
    pub rule: String,
    pub line: usize,
    pub column: usize,
    pub matched: String,
    /// Rewritten text with placeholders expanded; absent for hint-only rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// Result of scanning a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn success(path: &Path, findings: Vec<Finding>) -> Self {
        Self {
            path: path.display().to_string(),
            findings,
            error: None,
        }
    }

    pub fn error(path: &Path, error: String) -> Self {
        Self {
            path: path.display().to_string(),
            findings: Vec::new(),
            error: Some(error),
        }
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_scanned: usize,
    pub files_with_findings: usize,
    pub total_findings: usize,
    pub errors: usize,
}

/// Full JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub summary: Summary,
    pub files: Vec<FileResult>,
}

/// Reporter for accumulating and outputting scan results
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
    results: Vec<FileResult>,
    summary: Summary,
}

impl Reporter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            results: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn report(&mut self, result: FileResult) {
        self.summary.files_scanned += 1;

        if let Some(error) = &result.error {
            self.summary.errors += 1;
            if self.format == OutputFormat::Text {
                eprintln!("{}: {} - {}", "Warning".yellow(), result.path, error);
            }
        } else if result.findings.is_empty() {
            if self.verbose && self.format == OutputFormat::Text {
                println!("{}: No findings", result.path);
            }
        } else {
            self.summary.files_with_findings += 1;
            self.summary.total_findings += result.findings.len();
            if self.format == OutputFormat::Text {
                print_findings(&result);
            }
        }

        self.results.push(result);
    }

    /// Print final summary/output
    pub fn finish(self) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                println!("{}", "Summary".bold().underline());
                println!("  Files scanned: {}", self.summary.files_scanned);
                println!("  Files with findings: {}", self.summary.files_with_findings);
                println!("  Total findings: {}", self.summary.total_findings);
                if self.summary.errors > 0 {
                    println!("  Errors: {}", self.summary.errors);
                }
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    summary: self.summary,
                    files: self.results,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

fn print_findings(result: &FileResult) {
    println!("{}", result.path.bold());
    for finding in &result.findings {
        println!(
            "  {}:{} {} {}",
            finding.line,
            finding.column,
            finding.rule,
            format!("[{}]", finding.hint_file).dimmed()
        );
        println!("    {} {}", "-".red(), finding.matched);
        if let Some(replacement) = &finding.replacement {
            println!("    {} {}", "+".green(), replacement);
        }
    }
    println!();
}

/// A registered hint file as shown by `hintforge list`
#[derive(Debug, Clone, Serialize)]
pub struct HintFileEntry {
    pub key: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rules: usize,
    pub includes: Vec<String>,
}

pub fn print_hint_files(entries: &[HintFileEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", "Registered hint files:".bold());
            for entry in entries {
                let description = entry.description.as_deref().unwrap_or("");
                println!(
                    "  {} - {} ({} rules)",
                    entry.id.green(),
                    description,
                    entry.rules
                );
                if !entry.includes.is_empty() {
                    println!("      includes: {}", entry.includes.join(", "));
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
    }
    Ok(())
}
