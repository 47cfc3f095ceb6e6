//! The scanning and rewriting engine behind the wizard.
//!
//! The orchestrator only sees the [`Engine`] trait. [`LocalEngine`] is the
//! filesystem implementation: a dry-run scan and a copy, replace and rename
//! pass, both reporting progress through a [`ProgressSink`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use chrono::Local;
use rayon::prelude::*;
use regex::{NoExpand, Regex};
use walkdir::{DirEntry, WalkDir};

use crate::config::ProcessConfig;
use crate::diagnostic::{DiagnosticEntry, MatchInfo};
use crate::error::EngineError;
use crate::progress::{span_percent, ProgressSink};
use crate::word_pair::{expand_variants, WordPair};

/// Blocking operations; the orchestrator runs them off its own task.
pub trait Engine: Send + Sync + 'static {
    fn diagnose(
        &self,
        config: &ProcessConfig,
        progress: &ProgressSink,
    ) -> Result<Vec<DiagnosticEntry>, EngineError>;

    /// Returns a one-line summary of what was done.
    fn execute(&self, config: &ProcessConfig, progress: &ProgressSink) -> Result<String, EngineError>;
}

const IGNORED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "woff2", "exe", "dll", "dmg", "zip", "tar", "gz", "bz2",
    "xz", "7z", "rar", "node",
];

/// Share of the run spent copying; the rest goes to rewriting.
const COPY_SHARE: u8 = 30;

/// Pairs as the engine applies them, with case variants when enabled.
pub fn effective_pairs(config: &ProcessConfig) -> Vec<WordPair> {
    if config.variants {
        expand_variants(&config.pairs)
    } else {
        config.pairs.clone()
    }
}

/// Emits only when the integer percentage moves.
struct Throttle<'a> {
    sink: &'a ProgressSink,
    last: AtomicU8,
}

impl<'a> Throttle<'a> {
    fn new(sink: &'a ProgressSink, start: u8) -> Self {
        Self {
            sink,
            last: AtomicU8::new(start),
        }
    }

    fn report(&self, value: u8) {
        if self.last.swap(value, Ordering::Relaxed) != value {
            self.sink.emit(value);
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalEngine {
    ignored_extensions: Vec<String>,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(IGNORED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect())
    }
}

impl LocalEngine {
    pub fn new(ignored_extensions: Vec<String>) -> Self {
        Self {
            ignored_extensions: ignored_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.ignored_extensions.contains(&ext.to_lowercase()))
    }

    fn inspect(&self, entry: &DirEntry, root: &Path, pairs: &[WordPair]) -> DiagnosticEntry {
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();
        let mut matches = Vec::new();

        if is_dir {
            let name = entry.file_name().to_string_lossy();
            for pair in pairs {
                if name.contains(pair.old.as_str()) {
                    matches.push(MatchInfo::in_name(pair.old.clone()));
                }
            }
        } else if entry.file_type().is_file() && !self.is_ignored(path) {
            let content = fs::read_to_string(path).unwrap_or_else(|err| {
                log::debug!("Treating {} as empty: {err}", path.display());
                String::new()
            });
            for pair in pairs {
                let count = content.matches(pair.old.as_str()).count();
                if count > 0 {
                    matches.push(MatchInfo::in_content(pair.old.clone(), count));
                }
            }
        }

        DiagnosticEntry {
            path: relative_path(path, root),
            is_dir,
            matches,
        }
    }

    /// Where the copy goes, creating the sub-folder when one is requested.
    pub fn resolve_destination(&self, config: &ProcessConfig) -> Result<PathBuf, EngineError> {
        if !config.create_subfolder {
            return Ok(config.destination.clone());
        }

        let name = if config.use_timestamp {
            Local::now().format("%Y%m%d_%H%M%S").to_string()
        } else if let Some(name) = config.custom_folder_name() {
            name.to_string()
        } else {
            config
                .source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    EngineError::Message(format!(
                        "Cannot derive a folder name from {}",
                        config.source.display()
                    ))
                })?
        };

        let folder = config.destination.join(name);
        fs::create_dir_all(&folder).map_err(|err| EngineError::io(&folder, err))?;
        Ok(folder)
    }

    fn copy_tree(&self, source: &Path, dest: &Path, progress: &ProgressSink) -> Result<(), EngineError> {
        let entries = walk(source);
        let total = entries.len();
        let throttle = Throttle::new(progress, 0);

        for (done, entry) in entries.iter().enumerate() {
            let target = dest.join(entry.path().strip_prefix(source).unwrap_or(entry.path()));
            if entry.file_type().is_symlink() {
                // Links stay out of the copy.
                log::warn!("Skipping symbolic link {}", entry.path().display());
            } else if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|err| EngineError::io(&target, err))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|err| EngineError::io(parent, err))?;
                }
                fs::copy(entry.path(), &target).map_err(|err| EngineError::io(entry.path(), err))?;
            }
            throttle.report(span_percent(0, COPY_SHARE, done + 1, total));
        }
        Ok(())
    }

    fn replacement_candidates(&self, dest: &Path, filter_paths: Option<&[String]>) -> Vec<PathBuf> {
        match filter_paths {
            Some(paths) => paths
                .iter()
                .map(|rel| dest.join(rel))
                .filter(|path| path.is_file() && !self.is_ignored(path))
                .collect(),
            None => walk(dest)
                .into_iter()
                .filter(|entry| entry.file_type().is_file() && !self.is_ignored(entry.path()))
                .map(DirEntry::into_path)
                .collect(),
        }
    }
}

impl Engine for LocalEngine {
    fn diagnose(
        &self,
        config: &ProcessConfig,
        progress: &ProgressSink,
    ) -> Result<Vec<DiagnosticEntry>, EngineError> {
        ensure_source(&config.source)?;
        let pairs = effective_pairs(config);
        let entries = walk(&config.source);
        let total = entries.len();
        log::info!(
            "Diagnosing {} entries under {} with {} pairs",
            total,
            config.source.display(),
            pairs.len()
        );

        let processed = AtomicUsize::new(0);
        let throttle = Throttle::new(progress, 0);
        let report: Vec<DiagnosticEntry> = entries
            .par_iter()
            .map(|entry| {
                let result = self.inspect(entry, &config.source, &pairs);
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                throttle.report(span_percent(0, 100, done, total));
                result
            })
            .collect();

        progress.emit(100);
        Ok(report)
    }

    fn execute(&self, config: &ProcessConfig, progress: &ProgressSink) -> Result<String, EngineError> {
        progress.emit(0);
        ensure_source(&config.source)?;
        let source = fs::canonicalize(&config.source).map_err(|err| EngineError::io(&config.source, err))?;
        if resolve_existing_prefix(&config.destination).starts_with(&source) {
            return Err(EngineError::Message(format!(
                "Destination {} is inside the source folder",
                config.destination.display()
            )));
        }

        let dest = self.resolve_destination(config)?;
        log::info!("Copying {} to {}", config.source.display(), dest.display());
        self.copy_tree(&config.source, &dest, progress)?;

        let pairs = effective_pairs(config);
        let rewriter = Rewriter::new(&pairs)?;
        let candidates = self.replacement_candidates(&dest, config.filter_paths.as_deref());
        let total = candidates.len();
        log::info!("Rewriting up to {total} files");

        let processed = AtomicUsize::new(0);
        let throttle = Throttle::new(progress, COPY_SHARE);
        let outcomes: Vec<bool> = candidates
            .par_iter()
            .map(|path| {
                let outcome = rewriter.rewrite_file(path);
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                throttle.report(span_percent(COPY_SHARE, 100, done, total));
                outcome
            })
            .collect::<Result<_, _>>()?;
        let modified = outcomes.into_iter().filter(|changed| *changed).count();

        if config.rename {
            rename_all(&dest, &pairs)?;
        }

        progress.emit(100);
        Ok(format!("{modified} files modified"))
    }
}

/// Literal, in-order replacement of every pair.
struct Rewriter<'a> {
    rules: Vec<(Regex, &'a str)>,
    pairs: &'a [WordPair],
}

impl<'a> Rewriter<'a> {
    fn new(pairs: &'a [WordPair]) -> Result<Self, EngineError> {
        let rules = pairs
            .iter()
            .filter(|pair| !pair.old.is_empty())
            .map(|pair| {
                Regex::new(&regex::escape(&pair.old))
                    .map(|re| (re, pair.new.as_str()))
                    .map_err(|err| EngineError::Message(format!("Bad pattern {:?}: {err}", pair.old)))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { rules, pairs })
    }

    fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (re, new) in &self.rules {
            out = re.replace_all(&out, NoExpand(new)).into_owned();
        }
        out
    }

    /// Rewrites `path` when it contains any `old` term; returns whether it did.
    fn rewrite_file(&self, path: &Path) -> Result<bool, EngineError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                log::debug!("Skipping {}: {err}", path.display());
                return Ok(false);
            }
        };
        if !self
            .pairs
            .iter()
            .any(|pair| !pair.old.is_empty() && content.contains(pair.old.as_str()))
        {
            return Ok(false);
        }
        fs::write(path, self.apply(&content)).map_err(|err| EngineError::io(path, err))?;
        Ok(true)
    }
}

/// Applies every pair to a single file or folder name.
pub fn rename_component(name: &str, pairs: &[WordPair]) -> String {
    pairs
        .iter()
        .filter(|pair| !pair.old.is_empty())
        .fold(name.to_string(), |acc, pair| acc.replace(&pair.old, &pair.new))
}

/// Renames everything under `root`, deepest entries first so parent paths
/// stay valid while their children are renamed.
pub fn rename_all(root: &Path, pairs: &[WordPair]) -> Result<usize, EngineError> {
    let entries: Vec<DirEntry> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .collect();

    let mut renamed = 0;
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let new_name = rename_component(&name, pairs);
        if new_name == name || new_name.is_empty() {
            continue;
        }
        let new_path = entry.path().with_file_name(&new_name);
        if new_path.exists() {
            log::warn!(
                "Not renaming {} over existing {}",
                entry.path().display(),
                new_path.display()
            );
            continue;
        }
        fs::rename(entry.path(), &new_path).map_err(|err| EngineError::io(entry.path(), err))?;
        renamed += 1;
    }
    log::info!("Renamed {renamed} entries under {}", root.display());
    Ok(renamed)
}

fn ensure_source(source: &Path) -> Result<(), EngineError> {
    if source.is_dir() {
        Ok(())
    } else {
        Err(EngineError::Message(format!(
            "Source folder does not exist: {}",
            source.display()
        )))
    }
}

/// Canonical form of `path` even when its tail does not exist yet: the
/// nearest existing ancestor is canonicalized and the rest re-appended.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute.clone(),
        }
    }
}

fn walk(root: &Path) -> Vec<DirEntry> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!("Skipping unreadable entry: {err}");
                None
            }
        })
        .collect()
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_extensions_are_ignored_case_insensitively() {
        let engine = LocalEngine::default();
        assert!(engine.is_ignored(Path::new("logo.PNG")));
        assert!(engine.is_ignored(Path::new("bundle.tar.gz")));
        assert!(!engine.is_ignored(Path::new("main.rs")));
        assert!(!engine.is_ignored(Path::new("Makefile")));
    }

    #[test]
    fn custom_extension_list_accepts_leading_dots() {
        let engine = LocalEngine::new(vec![".BIN".into()]);
        assert!(engine.is_ignored(Path::new("a.bin")));
        assert!(!engine.is_ignored(Path::new("a.png")));
    }

    #[test]
    fn replacement_is_literal() {
        let pairs = vec![WordPair::new("a.b", "$1"), WordPair::new("x", "y")];
        let rewriter = Rewriter::new(&pairs).unwrap();
        assert_eq!(rewriter.apply("a.b axb x"), "$1 ayb y");
    }

    #[test]
    fn name_renaming_applies_pairs_in_order() {
        let pairs = vec![WordPair::new("Fuse", "Robber"), WordPair::new("Robber", "Thief")];
        assert_eq!(rename_component("FuseBox", &pairs), "ThiefBox");
        assert_eq!(rename_component("plain", &pairs), "plain");
    }

    #[test]
    fn variants_expand_only_when_enabled() {
        let mut config = ProcessConfig {
            pairs: vec![WordPair::new("Fuse", "Robber")],
            ..ProcessConfig::default()
        };
        assert_eq!(effective_pairs(&config).len(), 1);
        config.variants = true;
        assert_eq!(effective_pairs(&config).len(), 3);
    }
}
