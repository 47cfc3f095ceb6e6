// End-to-end wizard runs: orchestrator, store and local engine together

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use robber_rename::config::ConfigPatch;
use robber_rename::orchestrator::{WizardEvent, WizardOrchestrator, WizardState};
use robber_rename::progress::{Phase, ProgressHub};
use robber_rename::tree::{build_tree, render_text};
use robber_rename::word_pair::WordPair;
use robber_rename::{ConfigStore, LocalEngine};
use tempfile::TempDir;

fn project() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("fuse-app");
    let out = dir.path().join("out");
    fs::create_dir_all(source.join("FuseLib")).unwrap();
    fs::write(source.join("fuse.py"), "import fuse\n").unwrap();
    fs::write(source.join("FuseLib/core.rs"), "// Fuse core\n").unwrap();
    fs::write(source.join("README.md"), "plain\n").unwrap();
    (dir, source, out)
}

fn wizard(source: PathBuf, out: PathBuf) -> WizardOrchestrator<LocalEngine> {
    let store = ConfigStore::default();
    store.update_config(
        ConfigPatch::default()
            .source(source)
            .destination(out)
            .create_subfolder(false)
            .variants(true)
            .pairs(vec![WordPair::new("Fuse", "Robber")]),
    );
    WizardOrchestrator::new(Arc::new(LocalEngine::default()), store, ProgressHub::new())
}

#[tokio::test]
async fn test_dry_run_then_run() {
    let (_dir, source, out) = project();
    let mut wizard = wizard(source, out.clone());

    wizard.start_diagnose().unwrap();
    let event = wizard.wait().await;
    assert_eq!(
        event,
        Some(WizardEvent::DiagnosisCompleted {
            entries: 4,
            matched: 3
        })
    );
    assert_eq!(wizard.store().progress(Phase::Diagnose), 100);

    let scope = wizard.store().config().filter_paths.unwrap();
    assert_eq!(scope, vec!["FuseLib", "FuseLib/core.rs", "fuse.py"]);

    let tree = build_tree(&wizard.store().diagnostic().unwrap());
    assert_eq!(
        render_text(&tree),
        "FuseLib/  [Fuse]\n  core.rs  [Fuse x1]\nfuse.py  [fuse x1]\nREADME.md\n"
    );

    wizard.advance().unwrap();
    let event = wizard.wait().await;
    assert_eq!(event, Some(WizardEvent::ExecutionCompleted("2 files modified".into())));
    assert_eq!(wizard.state(), WizardState::Done);
    assert_eq!(wizard.store().progress(Phase::Execute), 100);
    assert_eq!(fs::read_to_string(out.join("fuse.py")).unwrap(), "import robber\n");
    assert_eq!(
        fs::read_to_string(out.join("FuseLib/core.rs")).unwrap(),
        "// Robber core\n"
    );
}

#[tokio::test]
async fn test_failed_run_recovers_on_retry() {
    let (_dir, source, out) = project();
    // A file where the output folder should be makes the copy fail.
    fs::write(&out, "in the way").unwrap();
    let mut wizard = wizard(source, out.clone());

    wizard.start_diagnose().unwrap();
    wizard.wait().await;
    wizard.advance().unwrap();

    let event = wizard.wait().await;
    assert!(matches!(event, Some(WizardEvent::ExecutionFailed(_))));
    assert_eq!(wizard.state(), WizardState::Failed);
    assert!(!wizard.error().is_empty());
    assert!(!wizard.loading());

    fs::remove_file(&out).unwrap();
    wizard.retry().unwrap();
    assert_eq!(wizard.error(), "");
    let event = wizard.wait().await;
    assert_eq!(event, Some(WizardEvent::ExecutionCompleted("2 files modified".into())));
    assert_eq!(wizard.hub().subscriber_count(Phase::Execute), 0);
}

#[tokio::test]
async fn test_missing_source_fails_the_dry_run() {
    let (_dir, source, out) = project();
    let mut wizard = wizard(source.join("gone"), out);

    wizard.start_diagnose().unwrap();
    let event = wizard.wait().await;
    assert!(matches!(event, Some(WizardEvent::DiagnosisFailed(message)) if message.contains("does not exist")));
    assert_eq!(wizard.state(), WizardState::Idle);
    assert!(wizard.store().diagnostic().is_none());
}

#[tokio::test]
async fn test_reset_allows_a_second_pass() {
    let (_dir, source, out) = project();
    let mut wizard = wizard(source, out);

    wizard.start_diagnose().unwrap();
    wizard.wait().await;
    wizard.reset().unwrap();
    assert!(wizard.store().config().filter_paths.is_none());

    wizard.store().update_config(ConfigPatch::default().variants(false));
    wizard.start_diagnose().unwrap();
    let event = wizard.wait().await;
    // Without variants only the exact-case pair matches.
    assert_eq!(
        event,
        Some(WizardEvent::DiagnosisCompleted {
            entries: 4,
            matched: 2
        })
    );
}
