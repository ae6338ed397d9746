//! Registry of loaded hint files
//!
//! Files are stored under a registration key (how they were loaded) and
//! indexed a second time under the id they declare with `<!id: ...>`. Both
//! maps are concurrent, so one registry can be shared behind an `Arc` by
//! loaders and readers without extra locking.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};

use crate::hint::{parse_hint_file, parse_hint_reader, HintFile, HintParseError, TransformationRule};
use crate::loader::{self, LoadError};

const INFERRED_PREFIX: &str = "inferred:";
const MANUAL_PREFIX: &str = "manual:";

/// Rule libraries compiled into the binary, as (registration key, text)
const BUNDLED_LIBRARIES: &[(&str, &str)] = &[
    ("collections", include_str!("../hints/collections.hint")),
    ("modernize-java9", include_str!("../hints/modernize-java9.hint")),
    ("modernize-java11", include_str!("../hints/modernize-java11.hint")),
    ("performance", include_str!("../hints/performance.hint")),
];

/// Something include resolution noticed but tolerated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeDiagnostic {
    /// `from` includes `to`, which is already on the current include chain
    Cycle { from: String, to: String },
    /// `from` includes an id nothing is registered under
    Unresolved { from: String, include: String },
}

impl std::fmt::Display for IncludeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncludeDiagnostic::Cycle { from, to } => {
                write!(f, "include cycle: '{from}' includes '{to}', which is already on the include chain")
            }
            IncludeDiagnostic::Unresolved { from, include } => {
                write!(f, "'{from}' includes unknown hint file '{include}'")
            }
        }
    }
}

/// Flattened rules of a hint file and everything it includes
#[derive(Debug, Clone, Default)]
pub struct IncludeResolution {
    pub rules: Vec<TransformationRule>,
    pub diagnostics: Vec<IncludeDiagnostic>,
}

#[derive(Debug, Default)]
pub struct HintRegistry {
    files: DashMap<String, Arc<HintFile>>,
    by_declared_id: DashMap<String, Arc<HintFile>>,
    scanned_dirs: DashSet<PathBuf>,
    bundled_loaded: AtomicBool,
}

impl HintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `file` under `key`. A file without a declared id takes the key
    /// as its id.
    pub fn register(&self, key: impl Into<String>, mut file: HintFile) -> Arc<HintFile> {
        let key = key.into();
        if file.id.is_none() {
            file.id = Some(key.clone());
        }
        let file = Arc::new(file);
        if let Some(id) = &file.id {
            self.by_declared_id.insert(id.clone(), Arc::clone(&file));
        }
        self.files.insert(key, Arc::clone(&file));
        file
    }

    pub fn load_from_str(&self, key: &str, content: &str) -> Result<Arc<HintFile>, HintParseError> {
        let file = parse_hint_file(content)?;
        Ok(self.register(key, file))
    }

    pub fn load_from_reader(
        &self,
        key: &str,
        reader: impl Read,
    ) -> Result<Arc<HintFile>, HintParseError> {
        let file = parse_hint_reader(reader)?;
        Ok(self.register(key, file))
    }

    pub fn load_from_path(&self, key: &str, path: &Path) -> Result<Arc<HintFile>, LoadError> {
        let file = loader::read_hint_file(path)?;
        Ok(self.register(key, file))
    }

    /// Load every hint file under `dir`. Files that fail to read or parse
    /// are logged and skipped; the keys that did load are returned.
    pub fn load_from_dir(&self, dir: &Path) -> Result<Vec<String>, LoadError> {
        let mut loaded = Vec::new();
        for path in loader::discover_hint_files(dir)? {
            let key = loader::registration_key(dir, &path);
            match self.load_from_path(&key, &path) {
                Ok(_) => {
                    debug!("Loaded hint file {} as '{}'", path.display(), key);
                    loaded.push(key);
                }
                Err(e) => warn!("Failed to load hint file: {}", e),
            }
        }
        Ok(loaded)
    }

    /// Like [`load_from_dir`](Self::load_from_dir), but a directory already
    /// scanned is skipped until [`invalidate_dir`](Self::invalidate_dir)
    pub fn load_dir_once(&self, dir: &Path) -> Result<Vec<String>, LoadError> {
        if !self.scanned_dirs.insert(dir.to_path_buf()) {
            return Ok(Vec::new());
        }
        self.load_from_dir(dir).inspect_err(|_| {
            self.scanned_dirs.remove(dir);
        })
    }

    /// Forget that `dir` was scanned so the next `load_dir_once` rescans it
    pub fn invalidate_dir(&self, dir: &Path) {
        self.scanned_dirs.remove(dir);
    }

    /// Registration keys of the bundled libraries
    pub fn bundled_library_names() -> Vec<&'static str> {
        BUNDLED_LIBRARIES.iter().map(|(name, _)| *name).collect()
    }

    /// Load the bundled libraries. Only the first caller loads; later calls
    /// return the currently registered keys.
    pub fn load_bundled(&self) -> Vec<String> {
        if self
            .bundled_loaded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.registered_ids();
        }

        let mut loaded = Vec::new();
        for (name, content) in BUNDLED_LIBRARIES {
            match self.load_from_str(name, content) {
                Ok(_) => loaded.push(name.to_string()),
                Err(e) => warn!("Bundled hint library '{}' failed to parse: {}", name, e),
            }
        }
        loaded
    }

    /// File registered under exactly this key
    pub fn get(&self, key: &str) -> Option<Arc<HintFile>> {
        self.files.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up by registration key, falling back to the declared id
    pub fn find(&self, id: &str) -> Option<Arc<HintFile>> {
        self.get(id).or_else(|| {
            self.by_declared_id
                .get(id)
                .map(|entry| Arc::clone(entry.value()))
        })
    }

    /// Registration keys, sorted
    pub fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.files.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Every (key, file) pair, sorted by key
    pub fn all(&self) -> Vec<(String, Arc<HintFile>)> {
        let mut all: Vec<(String, Arc<HintFile>)> = self
            .files
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Remove a file from both indexes
    pub fn unregister(&self, key: &str) -> Option<Arc<HintFile>> {
        let (_, removed) = self.files.remove(key)?;
        if let Some(id) = &removed.id {
            self.by_declared_id
                .remove_if(id, |_, indexed| Arc::ptr_eq(indexed, &removed));
        }
        Some(removed)
    }

    /// Drop every file and all load-tracking state
    pub fn clear(&self) {
        self.files.clear();
        self.by_declared_id.clear();
        self.scanned_dirs.clear();
        self.bundled_loaded.store(false, Ordering::Release);
    }

    /// Register rules mined from a commit under `inferred:<commit>`. Files
    /// without tags are tagged `inferred`, `mining` and the commit id.
    pub fn register_inferred(&self, mut file: HintFile, commit: &str) -> String {
        let key = format!("{INFERRED_PREFIX}{commit}");
        file.id = Some(key.clone());
        if file.tags.is_empty() {
            file.tags = vec!["inferred".into(), "mining".into(), commit.to_string()];
        }
        self.register(key.clone(), file);
        key
    }

    pub fn inferred_files(&self) -> Vec<Arc<HintFile>> {
        self.all()
            .into_iter()
            .filter(|(key, _)| key.starts_with(INFERRED_PREFIX))
            .map(|(_, file)| file)
            .collect()
    }

    /// Re-key an inferred file as `manual:<commit>`, returning the new key
    pub fn promote_to_manual(&self, key: &str) -> Option<String> {
        let commit = key.strip_prefix(INFERRED_PREFIX)?;
        let removed = self.unregister(key)?;
        let new_key = format!("{MANUAL_PREFIX}{commit}");
        let mut file = Arc::unwrap_or_clone(removed);
        file.id = Some(new_key.clone());
        self.register(new_key.clone(), file);
        Some(new_key)
    }

    /// The file's own rules followed by those of every file it includes,
    /// transitively. Cycles and unknown ids are skipped.
    pub fn resolve_includes(&self, file: &HintFile) -> Vec<TransformationRule> {
        self.resolve_includes_with_diagnostics(file).rules
    }

    /// Same as [`resolve_includes`](Self::resolve_includes), also reporting
    /// what was skipped. Files are tracked by identity, so a file reached
    /// through its registration key and through its declared id counts
    /// once. Only an include leading back onto the current path is a cycle;
    /// a file reached twice along separate branches is silently skipped.
    pub fn resolve_includes_with_diagnostics(&self, file: &HintFile) -> IncludeResolution {
        let mut resolution = IncludeResolution {
            rules: file.rules.clone(),
            diagnostics: Vec::new(),
        };

        let mut root: Vec<*const HintFile> = vec![file as *const HintFile];
        if let Some(registered) = file
            .id
            .as_deref()
            .and_then(|id| self.by_declared_id.get(id).map(|r| Arc::as_ptr(r.value())))
        {
            root.push(registered);
        }
        let mut walk = IncludeWalk {
            included: root.iter().copied().collect(),
            path: root,
        };
        self.resolve_into(file, &mut walk, &mut resolution);

        for diagnostic in &resolution.diagnostics {
            warn!("{}", diagnostic);
        }
        resolution
    }

    fn resolve_into(
        &self,
        file: &HintFile,
        walk: &mut IncludeWalk,
        resolution: &mut IncludeResolution,
    ) {
        let from = file.id.clone().unwrap_or_default();
        for include in &file.includes {
            let Some(included) = self.find(include) else {
                resolution.diagnostics.push(IncludeDiagnostic::Unresolved {
                    from: from.clone(),
                    include: include.clone(),
                });
                continue;
            };
            let identity = Arc::as_ptr(&included);
            if walk.path.contains(&identity) {
                resolution.diagnostics.push(IncludeDiagnostic::Cycle {
                    from: from.clone(),
                    to: include.clone(),
                });
                continue;
            }
            if !walk.included.insert(identity) {
                debug!("'{}' already included, skipping it from '{}'", include, from);
                continue;
            }
            resolution.rules.extend(included.rules.iter().cloned());
            walk.path.push(identity);
            self.resolve_into(&included, walk, resolution);
            walk.path.pop();
        }
    }
}

/// Files on the current include chain and every file already flattened
struct IncludeWalk {
    path: Vec<*const HintFile>,
    included: HashSet<*const HintFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, patterns: &[&str], includes: &[&str]) -> String {
        let mut text = format!("<!id: {id}>\n");
        if !includes.is_empty() {
            text.push_str(&format!("<!include: {}>\n", includes.join(", ")));
        }
        for pattern in patterns {
            text.push_str(&format!("{pattern}\n;;\n"));
        }
        text
    }

    #[test]
    fn test_key_and_declared_id_lookup() {
        let registry = HintRegistry::new();
        registry
            .load_from_str("file:strings", &file("strings.rules", &["$s.trim()"], &[]))
            .unwrap();

        assert!(registry.get("file:strings").is_some());
        assert!(registry.get("strings.rules").is_none());
        assert!(registry.find("strings.rules").is_some());
        assert_eq!(registry.registered_ids(), vec!["file:strings"]);
    }

    #[test]
    fn test_missing_id_defaults_to_key() {
        let registry = HintRegistry::new();
        let loaded = registry.load_from_str("anon", "$x.foo()\n;;\n").unwrap();
        assert_eq!(loaded.id.as_deref(), Some("anon"));
    }

    #[test]
    fn test_unregister_and_clear() {
        let registry = HintRegistry::new();
        registry.load_from_str("k1", &file("one", &["$a"], &[])).unwrap();
        registry.load_from_str("k2", &file("two", &["$b"], &[])).unwrap();

        assert!(registry.unregister("k1").is_some());
        assert!(registry.find("one").is_none());
        assert!(registry.unregister("k1").is_none());
        assert_eq!(registry.len(), 1);

        registry.load_bundled();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.find("two").is_none());
        // Bundled loading is allowed again after a clear
        assert_eq!(registry.load_bundled().len(), BUNDLED_LIBRARIES.len());
    }

    #[test]
    fn test_include_cycle_terminates() {
        let registry = HintRegistry::new();
        let a = registry.load_from_str("a", &file("a", &["$a1", "$a2"], &["b"])).unwrap();
        registry.load_from_str("b", &file("b", &["$b1"], &["a"])).unwrap();

        let resolution = registry.resolve_includes_with_diagnostics(&a);
        let texts: Vec<&str> = resolution
            .rules
            .iter()
            .map(|r| r.source_pattern.text.as_str())
            .collect();
        assert_eq!(texts, vec!["$a1", "$a2", "$b1"]);
        assert_eq!(
            resolution.diagnostics,
            vec![IncludeDiagnostic::Cycle {
                from: "b".into(),
                to: "a".into()
            }]
        );
    }

    #[test]
    fn test_cycle_through_registration_key_keeps_rules_once() {
        let registry = HintRegistry::new();
        let a = registry
            .load_from_str("a", &file("alpha", &["$a1"], &["b"]))
            .unwrap();
        registry.load_from_str("b", &file("b", &["$b1"], &["a"])).unwrap();

        let resolution = registry.resolve_includes_with_diagnostics(&a);
        let texts: Vec<&str> = resolution
            .rules
            .iter()
            .map(|r| r.source_pattern.text.as_str())
            .collect();
        assert_eq!(texts, vec!["$a1", "$b1"]);
        assert_eq!(
            resolution.diagnostics,
            vec![IncludeDiagnostic::Cycle {
                from: "b".into(),
                to: "a".into()
            }]
        );

        // Resolving an unregistered copy still recognises the root by id
        registry.load_from_str("c", &file("c", &["$c1"], &["alpha"])).unwrap();
        let mut rooted = HintFile::clone(&a);
        rooted.includes = vec!["c".into()];
        let texts: Vec<String> = registry
            .resolve_includes(&rooted)
            .into_iter()
            .map(|r| r.source_pattern.text)
            .collect();
        assert_eq!(texts, vec!["$a1", "$c1"]);
    }

    #[test]
    fn test_diamond_include_is_not_a_cycle() {
        let registry = HintRegistry::new();
        let top = registry
            .load_from_str("top", &file("top", &["$t"], &["left", "right"]))
            .unwrap();
        registry.load_from_str("left", &file("left", &["$l"], &["base"])).unwrap();
        registry.load_from_str("right", &file("right", &["$r"], &["base"])).unwrap();
        registry.load_from_str("base", &file("base", &["$b"], &[])).unwrap();

        let resolution = registry.resolve_includes_with_diagnostics(&top);
        let texts: Vec<&str> = resolution
            .rules
            .iter()
            .map(|r| r.source_pattern.text.as_str())
            .collect();
        assert_eq!(texts, vec!["$t", "$l", "$b", "$r"]);
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_include_is_skipped() {
        let registry = HintRegistry::new();
        let root = registry
            .load_from_str("root", &file("root", &["$r"], &["missing", "leaf"]))
            .unwrap();
        registry.load_from_str("leaf", &file("leaf", &["$l"], &[])).unwrap();

        let resolution = registry.resolve_includes_with_diagnostics(&root);
        assert_eq!(resolution.rules.len(), 2);
        assert_eq!(
            resolution.diagnostics,
            vec![IncludeDiagnostic::Unresolved {
                from: "root".into(),
                include: "missing".into()
            }]
        );
        assert_eq!(registry.resolve_includes(&root).len(), 2);
    }

    #[test]
    fn test_include_by_declared_id() {
        let registry = HintRegistry::new();
        registry.load_from_str("lib/base", &file("base", &["$b"], &[])).unwrap();
        let top = registry.load_from_str("top", &file("top", &["$t"], &["base"])).unwrap();
        assert_eq!(registry.resolve_includes(&top).len(), 2);
    }

    #[test]
    fn test_inferred_promotion() {
        let registry = HintRegistry::new();
        let key = registry.register_inferred(HintFile::new(), "abc123");
        assert_eq!(key, "inferred:abc123");

        let inferred = registry.inferred_files();
        assert_eq!(inferred.len(), 1);
        assert_eq!(inferred[0].tags, vec!["inferred", "mining", "abc123"]);

        let promoted = registry.promote_to_manual(&key).unwrap();
        assert_eq!(promoted, "manual:abc123");
        assert!(registry.inferred_files().is_empty());
        assert!(registry.find("inferred:abc123").is_none());
        assert_eq!(
            registry.get("manual:abc123").unwrap().id.as_deref(),
            Some("manual:abc123")
        );
        assert!(registry.promote_to_manual("manual:abc123").is_none());
    }

    #[test]
    fn test_bundled_loads_once() {
        let registry = HintRegistry::new();
        let first = registry.load_bundled();
        assert_eq!(first, HintRegistry::bundled_library_names());

        registry.unregister("collections");
        // Second call does not reload, it reports what is registered
        let second = registry.load_bundled();
        assert_eq!(second.len(), BUNDLED_LIBRARIES.len() - 1);
    }

    #[test]
    fn test_bundled_performance_includes_collections() {
        let registry = HintRegistry::new();
        registry.load_bundled();
        let performance = registry.get("performance").unwrap();
        let collections = registry.get("collections").unwrap();
        let resolved = registry.resolve_includes(&performance);
        assert_eq!(resolved.len(), performance.rules.len() + collections.rules.len());
    }
}
