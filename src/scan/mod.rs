//! Source-scan extraction.
//!
//! Recovers metric-definition call sites from source code. Each supported language has a scanner implementing
//! [`SourceScanner`]; they all share the string-aware delimiter walker in [`brackets`] and the same
//! per-file contract:
//!
//! 1. build a file-local constants map from string-literal declarations,
//! 2. find every call site matching the language's recognized shapes,
//! 3. recover the metric name from a literal, else a resolved constant, else a language-specific fallback,
//!    skipping the call when nothing resolves,
//! 4. find the end of the call or builder chain and read the unit and description options inside it.
//!
//! # Implementation Model
//!
//! Scanners are pattern-driven tokenizers, not parsers. A file that yields nothing is simply skipped, so
//! malformed input never aborts a run. Constants resolve within a single file (or an explicitly supplied
//! constants table); names defined in other translation units are not recovered.

pub mod brackets;
pub mod clickhouse;
pub mod csharp;
pub mod go;
pub mod infer;
pub mod java;
pub mod js;
pub mod python;
pub mod rust;

use crate::adapter::RawMetric;
use crate::model::{Attribute, ComponentType, InstrumentType};
use crate::{Error, ErrorKind};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

pub(crate) const LOG_TARGET: &str = "      scan";

/// A metric definition recovered from one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDef {
    pub name: String,
    pub instrument_type: InstrumentType,
    pub unit: String,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl MetricDef {
    #[must_use]
    pub fn new(name: impl Into<String>, instrument_type: InstrumentType) -> Self {
        Self {
            name: name.into(),
            instrument_type,
            unit: String::new(),
            description: String::new(),
            attributes: Vec::new(),
        }
    }

    /// Attach the component and location, producing a raw record.
    #[must_use]
    pub fn into_raw(self, component_type: ComponentType, component_name: impl Into<String>, file: &SourceFile) -> RawMetric {
        RawMetric {
            name: self.name,
            description: self.description,
            unit: self.unit,
            instrument_type: self.instrument_type,
            attributes: self.attributes,
            enabled_by_default: true,
            component_type,
            component_name: component_name.into(),
            source_location: file.path.display().to_string(),
            path: file.relative.clone(),
        }
    }
}

/// Recovers metric definitions from the text of one source file.
pub trait SourceScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef>;
}

/// A file selected for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,

    /// Path relative to the repository root, with `/` separators
    pub relative: String,
}

/// Which files under a directory are in scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkSpec {
    /// Accepted file-name suffixes, such as `.go`
    pub extensions: &'static [&'static str],

    /// Directory names that are never entered
    pub skip_dirs: &'static [&'static str],

    /// File-name suffixes to ignore, such as `_test.go`
    pub skip_file_suffixes: &'static [&'static str],

    /// Substrings of the `/`-separated relative path that exclude a file, such as `/test/`
    pub skip_path_fragments: &'static [&'static str],

    /// How deep below the walked directory to descend; `Some(1)` keeps only its own files
    pub max_depth: Option<usize>,
}

impl WalkSpec {
    fn accepts_file(&self, name: &str, relative: &str) -> bool {
        self.extensions.iter().any(|e| name.ends_with(e))
            && !self.skip_file_suffixes.iter().any(|s| name.ends_with(s))
            && !self.skip_path_fragments.iter().any(|f| relative.contains(f))
    }
}

/// Collect the in-scope files under `dir`, sorted by path.
///
/// `repo_root` anchors the relative paths. A missing `dir` is an extraction error; entries that cannot be
/// read below it are skipped.
pub fn collect_files(repo_root: &Path, dir: &Path, spec: &WalkSpec, cancel: &CancellationToken) -> Result<Vec<SourceFile>, Error> {
    if !dir.is_dir() {
        return Err(Error::extract(ohno::app_err!("required directory '{}' does not exist", dir.display())));
    }

    let mut walker = WalkDir::new(dir).follow_links(false).sort_by_file_name();
    if let Some(depth) = spec.max_depth {
        walker = walker.max_depth(depth);
    }

    let walker = walker.into_iter().filter_entry(|e| {
        e.depth() == 0 || !e.file_type().is_dir() || !spec.skip_dirs.iter().any(|d| e.file_name() == *d)
    });

    let mut files = Vec::new();
    for entry in walker {
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 {
                    return Err(Error::new(
                        ErrorKind::Parse,
                        ohno::app_err!("could not read source tree '{}': {e}", dir.display()),
                    ));
                }
                log::debug!(target: LOG_TARGET, "Skipping unreadable entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_path(repo_root, entry.path());
        let name = entry.file_name().to_string_lossy();
        if spec.accepts_file(&name, &format!("/{relative}")) {
            files.push(SourceFile {
                path: entry.path().to_path_buf(),
                relative,
            });
        }
    }

    Ok(files)
}

/// Read a source file, logging and returning `None` when it cannot be read.
#[must_use]
pub fn read_source(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Skipping '{}': {e}", path.display());
            None
        }
    }
}

/// `path` relative to `root` with `/` separators, or the full path when it is not under `root`.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> String {
    let Ok(rel) = path.strip_prefix(root) else {
        return path.display().to_string();
    };

    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan every in-scope file under `dir` with one scanner.
///
/// `component_of` names the component from the file's path relative to `dir`.
pub fn scan_tree<S, F>(
    repo_root: &Path,
    dir: &Path,
    spec: &WalkSpec,
    scanner: &S,
    component_type: ComponentType,
    component_of: F,
    cancel: &CancellationToken,
) -> Result<Vec<RawMetric>, Error>
where
    S: SourceScanner,
    F: Fn(&str) -> String,
{
    let files = collect_files(repo_root, dir, spec, cancel)?;
    scan_files(dir, &files, scanner, component_type, component_of, cancel)
}

/// Scan already-collected files with one scanner, naming components from paths relative to `dir`.
pub fn scan_files<S, F>(
    dir: &Path,
    files: &[SourceFile],
    scanner: &S,
    component_type: ComponentType,
    component_of: F,
    cancel: &CancellationToken,
) -> Result<Vec<RawMetric>, Error>
where
    S: SourceScanner,
    F: Fn(&str) -> String,
{
    let mut metrics = Vec::new();

    for file in files {
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        let Some(source) = read_source(&file.path) else {
            continue;
        };

        let defs = scanner.scan(&source);
        if defs.is_empty() {
            continue;
        }

        let component = component_of(&relative_path(dir, &file.path));
        log::debug!(target: LOG_TARGET, "Found {} metric(s) in '{}'", defs.len(), file.relative);
        metrics.extend(defs.into_iter().map(|d| d.into_raw(component_type, component.clone(), file)));
    }

    Ok(metrics)
}

/// Collapse records sharing a key, preferring one with a description.
///
/// The first occurrence of each key keeps its position; a later duplicate replaces it only when the kept
/// record has no description and the duplicate has one.
#[must_use]
pub fn dedup_by<K, F>(metrics: Vec<RawMetric>, key: F) -> Vec<RawMetric>
where
    K: Eq + core::hash::Hash,
    F: Fn(&RawMetric) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut result: Vec<RawMetric> = Vec::with_capacity(metrics.len());

    for m in metrics {
        match positions.get(&key(&m)) {
            Some(&i) => {
                if result[i].description.is_empty() && !m.description.is_empty() {
                    result[i] = m;
                }
            }
            None => {
                let _ = positions.insert(key(&m), result.len());
                result.push(m);
            }
        }
    }

    result
}

/// Deduplicate on `(name, component_name)`.
#[must_use]
pub fn dedup_by_name_and_component(metrics: Vec<RawMetric>) -> Vec<RawMetric> {
    dedup_by(metrics, |m| (m.name.clone(), m.component_name.clone()))
}

/// Deduplicate on the metric name alone.
#[must_use]
pub fn dedup_by_name(metrics: Vec<RawMetric>) -> Vec<RawMetric> {
    dedup_by(metrics, |m| m.name.clone())
}

/// `start + len` clamped to the input and moved back to a `char` boundary.
pub(crate) fn window_end(content: &str, start: usize, len: usize) -> usize {
    let mut end = start.saturating_add(len).min(content.len());
    while !content.is_char_boundary(end) {
        end -= 1;
    }

    end
}

/// The first capture group of `re` in `text`, if any.
pub(crate) fn capture<'t>(re: &regex::Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}
