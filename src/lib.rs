//! Bulk, case-aware find/replace and rename across a directory tree.
//!
//! A dry run reports where each old word occurs; the real run copies the
//! tree, rewrites only the files the dry run matched and optionally renames
//! entries.

pub mod config;
pub mod config_store;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod folder_browser;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod tree;
pub mod word_pair;

pub use config::{ConfigPatch, ProcessConfig};
pub use config_store::ConfigStore;
pub use diagnostic::{DiagnosticEntry, MatchInfo};
pub use engine::{Engine, LocalEngine};
pub use error::{DialogError, EngineError, ValidationError, WizardError};
pub use orchestrator::{WizardEvent, WizardOrchestrator, WizardState};
pub use progress::{Phase, ProgressHub, ProgressSink, ProgressSubscription};
pub use tree::{build_tree, TreeNode};
pub use word_pair::{expand_variants, WordPair};
