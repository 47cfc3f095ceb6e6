//! Drives the wizard from a dry run, through review, to the real run.
//!
//! ```text
//! Idle -> Diagnosing -> Reviewing -> Executing -> Done
//!   ^          |                       |   ^
//!   +-- error -+                       v   | retry()
//!                                     Failed
//! ```
//!
//! Engine calls run on the blocking pool. Their progress arrives through a
//! [`ProgressSubscription`] and is written to the [`ConfigStore`] only from
//! [`WizardOrchestrator::pump`] or [`WizardOrchestrator::wait`], i.e. from
//! the caller's own task. A retry re-runs the execute phase from scratch;
//! there is no checkpoint to resume from and no way to cancel a running
//! phase.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::config::ConfigPatch;
use crate::config_store::ConfigStore;
use crate::diagnostic::{matched_paths, DiagnosticEntry};
use crate::engine::Engine;
use crate::error::{EngineError, WizardError};
use crate::progress::{Phase, ProgressHub, ProgressSubscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Idle,
    Diagnosing,
    Reviewing,
    Executing,
    Done,
    Failed,
}

/// What a finished phase produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    DiagnosisCompleted { entries: usize, matched: usize },
    DiagnosisFailed(String),
    ExecutionCompleted(String),
    ExecutionFailed(String),
}

enum Outcome {
    Diagnosed(Result<Vec<DiagnosticEntry>, EngineError>),
    Executed(Result<String, EngineError>),
}

impl Outcome {
    /// The engine task went away without answering.
    fn lost(phase: Phase) -> Self {
        match phase {
            Phase::Diagnose => Outcome::Diagnosed(Err(EngineError::Opaque)),
            Phase::Execute => Outcome::Executed(Err(EngineError::Opaque)),
        }
    }
}

struct ActivePhase {
    phase: Phase,
    subscription: ProgressSubscription,
    outcome: oneshot::Receiver<Outcome>,
}

pub struct WizardOrchestrator<E: Engine> {
    engine: Arc<E>,
    store: ConfigStore,
    hub: ProgressHub,
    state: WizardState,
    error: String,
    loading: bool,
    // Dropping this unsubscribes, so a superseded or torn-down run never
    // feeds stale progress into the store.
    active: Option<ActivePhase>,
}

impl<E: Engine> WizardOrchestrator<E> {
    pub fn new(engine: Arc<E>, store: ConfigStore, hub: ProgressHub) -> Self {
        Self {
            engine,
            store,
            hub,
            state: WizardState::Idle,
            error: String::new(),
            loading: false,
            active: None,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Last engine failure as display text; empty when there is none.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn hub(&self) -> &ProgressHub {
        &self.hub
    }

    /// `Idle -> Diagnosing`. Must be called inside a Tokio runtime.
    pub fn start_diagnose(&mut self) -> Result<(), WizardError> {
        self.expect_state(&[WizardState::Idle], "start the dry run")?;
        self.store.config().validate()?;

        self.error.clear();
        self.loading = true;
        self.store.set_progress(Phase::Diagnose, 0);
        self.transition(WizardState::Diagnosing);
        self.start_phase(Phase::Diagnose);
        Ok(())
    }

    /// `Reviewing -> Executing`, with the scope narrowed by the dry run.
    pub fn advance(&mut self) -> Result<(), WizardError> {
        self.expect_state(&[WizardState::Reviewing], "start the run")?;
        self.store.config().validate()?;
        self.begin_execute();
        Ok(())
    }

    /// `Failed -> Executing`: the whole execute phase runs again.
    pub fn retry(&mut self) -> Result<(), WizardError> {
        self.expect_state(&[WizardState::Failed], "retry")?;
        log::info!("Retrying execute after: {}", self.error);
        self.begin_execute();
        Ok(())
    }

    /// Back to `Idle`, dropping diagnostic and run results and the scope
    /// filter. The rest of the config is kept.
    pub fn reset(&mut self) -> Result<(), WizardError> {
        self.expect_state(
            &[
                WizardState::Idle,
                WizardState::Reviewing,
                WizardState::Done,
                WizardState::Failed,
            ],
            "reset",
        )?;
        self.active = None;
        self.error.clear();
        self.loading = false;
        self.store.set_diagnostic(None);
        self.store.set_result(None);
        self.store.set_progress(Phase::Diagnose, 0);
        self.store.set_progress(Phase::Execute, 0);
        self.store.update_config(ConfigPatch::default().filter_paths(None));
        self.transition(WizardState::Idle);
        Ok(())
    }

    /// Applies queued progress and, if the engine call has returned, its
    /// outcome. Never blocks.
    pub fn pump(&mut self) -> Option<WizardEvent> {
        let active = self.active.as_mut()?;
        let phase = active.phase;
        for value in active.subscription.drain() {
            self.store.set_progress(phase, value);
        }

        let outcome = match active.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Outcome::lost(phase),
        };
        Some(self.complete(outcome))
    }

    /// Runs the active phase to completion, applying progress as it comes.
    pub async fn wait(&mut self) -> Option<WizardEvent> {
        let active = self.active.as_mut()?;
        let phase = active.phase;

        let outcome = loop {
            tokio::select! {
                biased;
                Some(value) = active.subscription.recv() => {
                    self.store.set_progress(phase, value);
                }
                received = &mut active.outcome => {
                    break received.unwrap_or_else(|_| Outcome::lost(phase));
                }
            }
        };
        Some(self.complete(outcome))
    }

    fn begin_execute(&mut self) {
        self.error.clear();
        self.loading = true;
        self.store.set_progress(Phase::Execute, 0);
        self.transition(WizardState::Executing);
        self.start_phase(Phase::Execute);
    }

    fn start_phase(&mut self, phase: Phase) {
        // Replace, never stack, the previous subscription.
        self.active = None;

        let config = self.store.config();
        let subscription = self.hub.subscribe(phase);
        let sink = self.hub.sink(phase);
        let engine = Arc::clone(&self.engine);
        let (tx, rx) = oneshot::channel();

        log::info!("Starting {phase} phase, listening on {}", phase.event_name());
        tokio::task::spawn_blocking(move || {
            let outcome = match phase {
                Phase::Diagnose => Outcome::Diagnosed(guarded(|| engine.diagnose(&config, &sink))),
                Phase::Execute => Outcome::Executed(guarded(|| engine.execute(&config, &sink))),
            };
            if tx.send(outcome).is_err() {
                log::debug!("{phase} finished after its orchestrator was torn down");
            }
        });

        self.active = Some(ActivePhase {
            phase,
            subscription,
            outcome: rx,
        });
    }

    fn complete(&mut self, outcome: Outcome) -> WizardEvent {
        if let Some(mut active) = self.active.take() {
            for value in active.subscription.drain() {
                self.store.set_progress(active.phase, value);
            }
        }
        self.loading = false;

        match outcome {
            Outcome::Diagnosed(Ok(entries)) => {
                let scope = matched_paths(&entries);
                log::info!(
                    "Dry run found matches in {} of {} entries",
                    scope.len(),
                    entries.len()
                );
                let event = WizardEvent::DiagnosisCompleted {
                    entries: entries.len(),
                    matched: scope.len(),
                };
                self.store.set_diagnostic(Some(entries));
                self.store
                    .update_config(ConfigPatch::default().filter_paths(Some(scope)));
                self.transition(WizardState::Reviewing);
                event
            }
            Outcome::Diagnosed(Err(err)) => {
                let message = err.display_message();
                log::error!("Dry run failed: {message}");
                self.error = message.clone();
                self.transition(WizardState::Idle);
                WizardEvent::DiagnosisFailed(message)
            }
            Outcome::Executed(Ok(summary)) => {
                log::info!("Run finished: {summary}");
                self.store.set_result(Some(summary.clone()));
                self.transition(WizardState::Done);
                WizardEvent::ExecutionCompleted(summary)
            }
            Outcome::Executed(Err(err)) => {
                let message = err.display_message();
                log::error!("Run failed: {message}");
                self.error = message.clone();
                self.transition(WizardState::Failed);
                WizardEvent::ExecutionFailed(message)
            }
        }
    }

    fn expect_state(&self, allowed: &[WizardState], action: &'static str) -> Result<(), WizardError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, next: WizardState) {
        log::debug!("Wizard {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn guarded<T>(call: impl FnOnce() -> Result<T, EngineError>) -> Result<T, EngineError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| Err(EngineError::from_panic(payload)))
}
