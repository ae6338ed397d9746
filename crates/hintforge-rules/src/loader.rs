//! Hint file discovery on disk
//!
//! Load `.hint` files from single paths or whole directory trees.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::hint::{parse_hint_file, HintFile, HintParseError};

/// File extension of rule files
pub const HINT_EXTENSION: &str = "hint";

/// Directory names never descended into
const SKIPPED_DIRS: &[&str] = &["target", "bin"];

/// Errors that can occur when loading hint files
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: HintParseError,
    },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::NotADirectory(path) => path,
        }
    }
}

/// Read and parse one hint file
pub fn read_hint_file(path: &Path) -> Result<HintFile, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_hint_file(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// All `*.hint` files below `dir`, sorted, skipping hidden and build output
/// directories. Unreadable entries are skipped.
pub fn discover_hint_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_hint_file(entry.path()))
        .map(DirEntry::into_path)
        .collect();

    files.sort();
    Ok(files)
}

pub fn is_hint_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == HINT_EXTENSION)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Registration key of a file found under `root`: its relative path without
/// the extension, `/`-separated
pub fn registration_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RULE: &str = "$x.size() == 0\n=> $x.isEmpty()\n;;\n";

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_skips_hidden_and_build_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "a.hint", RULE);
        write(root, "nested/b.hint", RULE);
        write(root, "notes.txt", "not a hint");
        write(root, ".git/c.hint", RULE);
        write(root, "target/d.hint", RULE);
        write(root, "bin/e.hint", RULE);

        let found = discover_hint_files(root).unwrap();
        let keys: Vec<String> = found.iter().map(|p| registration_key(root, p)).collect();
        assert_eq!(keys, vec!["a", "nested/b"]);
    }

    #[test]
    fn test_read_errors_carry_the_path() {
        let temp = TempDir::new().unwrap();
        let bad = temp.path().join("bad.hint");
        fs::write(&bad, "$x\n=> $y\n").unwrap();

        let err = read_hint_file(&bad).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert_eq!(err.path(), bad.as_path());

        let missing = temp.path().join("missing.hint");
        assert!(matches!(read_hint_file(&missing), Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("x.hint");
        fs::write(&file, RULE).unwrap();
        assert!(matches!(
            discover_hint_files(&file),
            Err(LoadError::NotADirectory(_))
        ));
    }
}
