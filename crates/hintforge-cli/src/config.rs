//! Configuration file support for hintforge
//!
//! Loads `.hintforge.toml` from current directory or parent directories.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".hintforge.toml";

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hints: HintsConfig,
    pub java: JavaConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HintsConfig {
    /// Extra directories scanned for `.hint` files, relative to the config file
    pub paths: Vec<PathBuf>,
    /// Whether the bundled libraries are loaded
    pub bundled: bool,
    /// Hint file ids (or registration keys) never evaluated
    pub disabled: Vec<String>,
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            bundled: true,
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    /// Source level guards compare against, e.g. "11" or "1.8"
    pub source_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "text" or "json"
    pub format: Option<String>,
}

impl Config {
    /// Load config from `.hintforge.toml` searching from current directory upward
    pub fn load() -> Result<Option<(Config, PathBuf)>> {
        Self::load_from(std::env::current_dir()?)
    }

    /// Load config searching from the given directory upward
    pub fn load_from(start_dir: PathBuf) -> Result<Option<(Config, PathBuf)>> {
        let mut current = Some(start_dir.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                let config = Self::load_path(&config_path)?;
                return Ok(Some((config, config_path)));
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Load config from a specific path. Relative hint paths are resolved
    /// against the directory holding the file.
    pub fn load_path(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            for hint_path in &mut config.hints.paths {
                if hint_path.is_relative() {
                    *hint_path = base.join(&*hint_path);
                }
            }
        }
        Ok(config)
    }

    /// Whether a hint file is switched off, by declared id or key
    pub fn is_disabled(&self, key: &str, id: Option<&str>) -> bool {
        self.hints
            .disabled
            .iter()
            .any(|d| d == key || Some(d.as_str()) == id)
    }
}
