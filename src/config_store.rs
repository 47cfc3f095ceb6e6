//! Shared wizard state: the current config plus the latest diagnostic and
//! run results.
//!
//! One long-lived store is created at startup and handed (cloned as a
//! handle) to every stage. Each value sits in a `watch` channel so stages
//! can observe it; the config changes only through [`ConfigStore::update_config`].
//! Writes come from one stage at a time, in user order; concurrent writers
//! are not supported.

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::{ConfigPatch, ProcessConfig};
use crate::diagnostic::DiagnosticEntry;
use crate::progress::Phase;

struct StoreInner {
    config: watch::Sender<ProcessConfig>,
    diagnostic: watch::Sender<Option<Vec<DiagnosticEntry>>>,
    diagnostic_progress: watch::Sender<u8>,
    result: watch::Sender<Option<String>>,
    run_progress: watch::Sender<u8>,
}

#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(ProcessConfig::default())
    }
}

impl ConfigStore {
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config: watch::Sender::new(config),
                diagnostic: watch::Sender::new(None),
                diagnostic_progress: watch::Sender::new(0),
                result: watch::Sender::new(None),
                run_progress: watch::Sender::new(0),
            }),
        }
    }

    /// A stable copy of the current config.
    pub fn config(&self) -> ProcessConfig {
        self.inner.config.borrow().clone()
    }

    /// Merges `patch` into the config and publishes the whole new value.
    pub fn update_config(&self, patch: ConfigPatch) {
        self.inner.config.send_modify(|config| config.apply(patch));
    }

    pub fn watch_config(&self) -> watch::Receiver<ProcessConfig> {
        self.inner.config.subscribe()
    }

    pub fn diagnostic(&self) -> Option<Vec<DiagnosticEntry>> {
        self.inner.diagnostic.borrow().clone()
    }

    pub fn set_diagnostic(&self, entries: Option<Vec<DiagnosticEntry>>) {
        self.inner.diagnostic.send_replace(entries);
    }

    pub fn result(&self) -> Option<String> {
        self.inner.result.borrow().clone()
    }

    pub fn set_result(&self, summary: Option<String>) {
        self.inner.result.send_replace(summary);
    }

    pub fn progress(&self, phase: Phase) -> u8 {
        *self.progress_sender(phase).borrow()
    }

    /// Latest value wins; out-of-order values are stored as they come.
    pub fn set_progress(&self, phase: Phase, value: u8) {
        self.progress_sender(phase).send_replace(value.min(100));
    }

    pub fn watch_progress(&self, phase: Phase) -> watch::Receiver<u8> {
        self.progress_sender(phase).subscribe()
    }

    fn progress_sender(&self, phase: Phase) -> &watch::Sender<u8> {
        match phase {
            Phase::Diagnose => &self.inner.diagnostic_progress,
            Phase::Execute => &self.inner.run_progress,
        }
    }
}
