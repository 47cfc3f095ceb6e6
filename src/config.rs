use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::word_pair::WordPair;

/// Everything the engine needs for a dry run or a real run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Write into a new folder under `destination` instead of into it directly.
    pub create_subfolder: bool,
    pub folder_name: Option<String>,
    /// Name the new folder after the current time; wins over `folder_name`.
    pub use_timestamp: bool,
    /// Also apply lowercase and uppercase forms of every pair.
    pub variants: bool,
    /// Rename files and folders after rewriting their contents.
    pub rename: bool,
    pub pairs: Vec<WordPair>,
    /// Relative paths to rewrite; `None` means every eligible file.
    pub filter_paths: Option<Vec<String>>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            create_subfolder: true,
            folder_name: None,
            use_timestamp: true,
            variants: false,
            rename: false,
            pairs: Vec::new(),
            filter_paths: None,
        }
    }
}

impl ProcessConfig {
    /// Checks done before anything is sent to the engine.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.as_os_str().is_empty() {
            return Err(ValidationError::MissingSource);
        }
        if self.destination.as_os_str().is_empty() {
            return Err(ValidationError::MissingDestination);
        }
        if self.pairs.is_empty() {
            return Err(ValidationError::NoPairs);
        }
        if let Some(index) = self.pairs.iter().position(WordPair::is_blank) {
            return Err(ValidationError::BlankPair { index });
        }
        Ok(())
    }

    pub fn can_proceed(&self) -> bool {
        self.validate().is_ok()
    }

    /// The folder name used when no timestamp is requested; blank counts as unset.
    pub fn custom_folder_name(&self) -> Option<&str> {
        self.folder_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Shallow merge: every field set in `patch` replaces the current value.
    pub fn apply(&mut self, patch: ConfigPatch) {
        let ConfigPatch {
            source,
            destination,
            create_subfolder,
            folder_name,
            use_timestamp,
            variants,
            rename,
            pairs,
            filter_paths,
        } = patch;

        if let Some(source) = source {
            self.source = source;
        }
        if let Some(destination) = destination {
            self.destination = destination;
        }
        if let Some(create_subfolder) = create_subfolder {
            self.create_subfolder = create_subfolder;
        }
        if let Some(folder_name) = folder_name {
            self.folder_name = folder_name;
        }
        if let Some(use_timestamp) = use_timestamp {
            self.use_timestamp = use_timestamp;
        }
        if let Some(variants) = variants {
            self.variants = variants;
        }
        if let Some(rename) = rename {
            self.rename = rename;
        }
        if let Some(pairs) = pairs {
            self.pairs = pairs;
        }
        if let Some(filter_paths) = filter_paths {
            self.filter_paths = filter_paths;
        }
    }
}

/// Partial [`ProcessConfig`]; `None` leaves a field untouched.
///
/// Optional fields nest a second `Option` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub create_subfolder: Option<bool>,
    pub folder_name: Option<Option<String>>,
    pub use_timestamp: Option<bool>,
    pub variants: Option<bool>,
    pub rename: Option<bool>,
    pub pairs: Option<Vec<WordPair>>,
    pub filter_paths: Option<Option<Vec<String>>>,
}

impl ConfigPatch {
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn create_subfolder(mut self, create_subfolder: bool) -> Self {
        self.create_subfolder = Some(create_subfolder);
        self
    }

    pub fn folder_name(mut self, folder_name: Option<String>) -> Self {
        self.folder_name = Some(folder_name);
        self
    }

    pub fn use_timestamp(mut self, use_timestamp: bool) -> Self {
        self.use_timestamp = Some(use_timestamp);
        self
    }

    pub fn variants(mut self, variants: bool) -> Self {
        self.variants = Some(variants);
        self
    }

    pub fn rename(mut self, rename: bool) -> Self {
        self.rename = Some(rename);
        self
    }

    pub fn pairs(mut self, pairs: Vec<WordPair>) -> Self {
        self.pairs = Some(pairs);
        self
    }

    pub fn filter_paths(mut self, filter_paths: Option<Vec<String>>) -> Self {
        self.filter_paths = Some(filter_paths);
        self
    }

    /// Later patch wins field by field.
    pub fn merge(self, later: ConfigPatch) -> Self {
        Self {
            source: later.source.or(self.source),
            destination: later.destination.or(self.destination),
            create_subfolder: later.create_subfolder.or(self.create_subfolder),
            folder_name: later.folder_name.or(self.folder_name),
            use_timestamp: later.use_timestamp.or(self.use_timestamp),
            variants: later.variants.or(self.variants),
            rename: later.rename.or(self.rename),
            pairs: later.pairs.or(self.pairs),
            filter_paths: later.filter_paths.or(self.filter_paths),
        }
    }

    /// Reads a JSON preset using the same field names as [`ProcessConfig`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let patch = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Loaded config preset from {}", path.display());
        Ok(patch)
    }
}

/// Parses `OLD=NEW`, splitting on the first `=`.
pub fn parse_pair(text: &str) -> Result<WordPair, String> {
    match text.split_once('=') {
        Some((old, new)) => Ok(WordPair::new(old, new)),
        None => Err(format!("expected OLD=NEW, got {text:?}")),
    }
}
