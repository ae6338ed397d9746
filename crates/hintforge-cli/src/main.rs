//! hintforge CLI - guard-conditioned rewrite hints for Java sources
//!
//! Subcommands:
//! - check: parse hint files and compile every rule in them
//! - list: show the registered hint libraries
//! - scan: run the hints over Java files and report what would change

mod config;
mod output;
mod process;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hintforge_rules::loader::read_hint_file;
use hintforge_rules::{HintRegistry, RuleSet, DEFAULT_SOURCE_VERSION};

use config::Config;
use output::{print_hint_files, FileResult, HintFileEntry, OutputFormat, Reporter};
use process::process_file;

#[derive(Parser)]
#[command(name = "hintforge")]
#[command(version)]
#[command(about = "Guard-conditioned rewrite hints for Java")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Path to config file (default: auto-detect .hintforge.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long, global = true)]
    no_config: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Parse hint files and compile their rules
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List registered hint files
    List {
        #[command(flatten)]
        hints: HintSources,

        /// Output format: text, json
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,
    },

    /// Scan Java sources and report matches
    Scan {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        hints: HintSources,

        /// Java source level guards compare against (e.g. 11, 1.8)
        #[arg(long, value_name = "VERSION")]
        source_version: Option<String>,

        /// Output format: text, json
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,
    },
}

#[derive(clap::Args)]
struct HintSources {
    /// Extra directories with .hint files (can be given multiple times)
    #[arg(long = "hints", value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Do not load the bundled hint libraries
    #[arg(long)]
    no_bundled: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;

    match cli.command {
        Command::Check { files } => check(&files),
        Command::List { hints, format } => {
            let format = output_format(format.as_deref(), &config)?;
            let registry = build_registry(&hints, &config)?;
            list(&registry, &config, format)
        }
        Command::Scan {
            paths,
            hints,
            source_version,
            format,
        } => {
            let format = output_format(format.as_deref(), &config)?;
            let source_version = source_version
                .or_else(|| config.java.source_version.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_VERSION.to_string());
            let registry = build_registry(&hints, &config)?;
            scan(&paths, &registry, &config, &source_version, format, cli.verbose)
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flag
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    if cli.no_config {
        return Ok(Config::default());
    }
    if let Some(config_path) = &cli.config {
        info!("Using config {}", config_path.display());
        return Config::load_path(config_path);
    }
    Ok(match Config::load()? {
        Some((config, path)) => {
            info!("Using config {}", path.display());
            config
        }
        None => Config::default(),
    })
}

fn output_format(flag: Option<&str>, config: &Config) -> Result<OutputFormat> {
    let Some(name) = flag.or(config.output.format.as_deref()) else {
        return Ok(OutputFormat::Text);
    };
    OutputFormat::from_str(name).ok_or_else(|| {
        anyhow::anyhow!("Invalid output format '{}'. Valid options: text, json", name)
    })
}

/// Bundled libraries (unless switched off) plus config and flag directories
fn build_registry(sources: &HintSources, config: &Config) -> Result<HintRegistry> {
    let registry = HintRegistry::new();
    if config.hints.bundled && !sources.no_bundled {
        let loaded = registry.load_bundled();
        debug!("Loaded bundled libraries: {}", loaded.join(", "));
    }
    for dir in config.hints.paths.iter().chain(&sources.dirs) {
        let loaded = registry.load_dir_once(dir)?;
        info!("Loaded {} hint files from {}", loaded.len(), dir.display());
    }
    Ok(registry)
}

fn check(files: &[PathBuf]) -> Result<ExitCode> {
    let mut failed = 0;

    for path in files {
        let file = match read_hint_file(path) {
            Ok(file) => file,
            Err(e) => {
                println!("{} {}: {}", "FAIL".red().bold(), path.display(), e);
                failed += 1;
                continue;
            }
        };

        let origin = file.id.clone().unwrap_or_else(|| path.display().to_string());
        let total = file.rules.len();
        let set = RuleSet::compile(&origin, file.rules);

        if set.skipped().is_empty() {
            println!("{} {} ({} rules)", "ok".green().bold(), path.display(), total);
        } else {
            println!(
                "{} {} ({} of {} rules compiled)",
                "FAIL".red().bold(),
                path.display(),
                set.len(),
                total
            );
            for skipped in set.skipped() {
                println!("    {}: {}", skipped.pattern, skipped.reason);
            }
            failed += 1;
        }
    }

    Ok(if failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn list(registry: &HintRegistry, config: &Config, format: OutputFormat) -> Result<ExitCode> {
    let entries: Vec<HintFileEntry> = registry
        .all()
        .into_iter()
        .filter(|(key, file)| !config.is_disabled(key, file.id.as_deref()))
        .map(|(key, file)| HintFileEntry {
            id: file.id.clone().unwrap_or_else(|| key.clone()),
            description: file.description.clone(),
            rules: registry.resolve_includes(&file).len(),
            includes: file.includes.clone(),
            key,
        })
        .collect();

    print_hint_files(&entries, format)?;
    Ok(ExitCode::SUCCESS)
}

fn scan(
    paths: &[PathBuf],
    registry: &HintRegistry,
    config: &Config,
    source_version: &str,
    format: OutputFormat,
    verbose: bool,
) -> Result<ExitCode> {
    let rules = compile_rules(registry, config, source_version);
    if rules.is_empty() {
        bail!("No hint rules loaded");
    }
    info!("Scanning with {} rules at source level {}", rules.len(), source_version);

    let mut file_paths: Vec<PathBuf> = Vec::new();
    for path in paths {
        if path.is_file() {
            file_paths.push(path.clone());
        } else if path.is_dir() {
            file_paths.extend(
                walkdir::WalkDir::new(path)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_java_file(e.path()))
                    .map(|e| e.into_path()),
            );
        } else if format == OutputFormat::Text {
            eprintln!("{}: Path does not exist: {}", "Warning".yellow(), path.display());
        }
    }
    file_paths.sort();

    let results: Vec<FileResult> = file_paths
        .par_iter()
        .map(|path| match process_file(path, &rules, source_version) {
            Ok(result) => {
                if result.had_syntax_errors {
                    debug!("{} has syntax errors", path.display());
                }
                FileResult::success(path, result.findings)
            }
            Err(e) => FileResult::error(path, format!("{:#}", e)),
        })
        .collect();

    let mut reporter = Reporter::new(format, verbose);
    for result in results {
        reporter.report(result);
    }

    let summary = reporter.summary();
    let exit_code = if summary.errors > 0 {
        ExitCode::from(1)
    } else if summary.total_findings > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };
    reporter.finish()?;
    Ok(exit_code)
}

/// Enabled files whose minimum Java version the source level meets
fn compile_rules(registry: &HintRegistry, config: &Config, source_version: &str) -> RuleSet {
    let level = feature_release(source_version);
    let mut rules = RuleSet::new();

    for (key, file) in registry.all() {
        if config.is_disabled(&key, file.id.as_deref()) {
            info!("Skipping disabled hint file '{}'", key);
            continue;
        }
        if file.min_java_version > level {
            info!(
                "Skipping '{}': needs Java {}, source level is {}",
                key, file.min_java_version, source_version
            );
            continue;
        }
        rules.add_hint_file(registry, &file);
    }
    rules
}

/// `1.8` -> 8, `11` -> 11, `17.0.2` -> 17
fn feature_release(version: &str) -> i32 {
    let mut parts = version.trim().split('.');
    let first = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    if first == 1 {
        parts.next().and_then(|p| p.parse().ok()).unwrap_or(first)
    } else {
        first
    }
}

fn is_java_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "java")
}
