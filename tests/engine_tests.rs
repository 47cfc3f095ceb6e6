// Integration tests for the local engine against real folders

use std::fs;
use std::path::{Path, PathBuf};

use robber_rename::config::ProcessConfig;
use robber_rename::diagnostic::{DiagnosticEntry, MatchInfo};
use robber_rename::engine::{Engine, LocalEngine};
use robber_rename::progress::{Phase, ProgressHub};
use robber_rename::word_pair::WordPair;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    out: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    let out = dir.path().join("out");
    fs::create_dir_all(source.join("FuseLib")).unwrap();
    fs::create_dir_all(&out).unwrap();
    fs::write(source.join("fuse.py"), "import fuse\nFuse.run(fuse)\n").unwrap();
    fs::write(source.join("README.md"), "Nothing here\n").unwrap();
    fs::write(source.join("FuseLib/fuse_core.rs"), "pub fn fuse() {}\n").unwrap();
    fs::write(source.join("logo.png"), "fuse").unwrap();
    Fixture {
        _dir: dir,
        source,
        out,
    }
}

fn config(fx: &Fixture) -> ProcessConfig {
    ProcessConfig {
        source: fx.source.clone(),
        destination: fx.out.clone(),
        create_subfolder: false,
        use_timestamp: false,
        variants: true,
        pairs: vec![WordPair::new("Fuse", "Robber")],
        ..ProcessConfig::default()
    }
}

fn find<'a>(report: &'a [DiagnosticEntry], path: &str) -> &'a DiagnosticEntry {
    report
        .iter()
        .find(|entry| entry.path == path)
        .unwrap_or_else(|| panic!("{path} missing from report"))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_diagnose_reports_name_and_content_matches() {
    let fx = fixture();
    let hub = ProgressHub::new();
    let report = LocalEngine::default()
        .diagnose(&config(&fx), &hub.sink(Phase::Diagnose))
        .unwrap();

    assert_eq!(report.len(), 5);
    assert!(report.iter().all(|entry| !entry.path.is_empty()));

    let lib = find(&report, "FuseLib");
    assert!(lib.is_dir);
    assert_eq!(lib.matches, vec![MatchInfo::in_name("Fuse")]);

    assert_eq!(
        find(&report, "fuse.py").matches,
        vec![MatchInfo::in_content("Fuse", 1), MatchInfo::in_content("fuse", 2)]
    );
    assert_eq!(
        find(&report, "FuseLib/fuse_core.rs").matches,
        vec![MatchInfo::in_content("fuse", 1)]
    );
    assert!(find(&report, "README.md").matches.is_empty());
    assert!(find(&report, "logo.png").matches.is_empty());
}

#[test]
fn test_diagnose_progress_ends_at_100() {
    let fx = fixture();
    let hub = ProgressHub::new();
    let mut sub = hub.subscribe(Phase::Diagnose);
    LocalEngine::default()
        .diagnose(&config(&fx), &hub.sink(Phase::Diagnose))
        .unwrap();

    let values = sub.drain();
    assert_eq!(values.last(), Some(&100));
    assert!(values.iter().all(|value| *value <= 100));
}

#[test]
fn test_execute_rewrites_only_scoped_files() {
    let fx = fixture();
    let mut config = config(&fx);
    config.filter_paths = Some(vec!["fuse.py".into(), "missing.txt".into()]);

    let summary = LocalEngine::default()
        .execute(&config, &ProgressHub::new().sink(Phase::Execute))
        .unwrap();

    assert_eq!(summary, "1 files modified");
    assert_eq!(read(&fx.out.join("fuse.py")), "import robber\nRobber.run(robber)\n");
    assert_eq!(read(&fx.out.join("FuseLib/fuse_core.rs")), "pub fn fuse() {}\n");
    // The source is only ever read.
    assert_eq!(read(&fx.source.join("fuse.py")), "import fuse\nFuse.run(fuse)\n");
}

#[test]
fn test_execute_without_scope_skips_ignored_files() {
    let fx = fixture();
    let summary = LocalEngine::default()
        .execute(&config(&fx), &ProgressHub::new().sink(Phase::Execute))
        .unwrap();

    assert_eq!(summary, "2 files modified");
    assert_eq!(read(&fx.out.join("FuseLib/fuse_core.rs")), "pub fn robber() {}\n");
    assert_eq!(read(&fx.out.join("logo.png")), "fuse");
    assert_eq!(read(&fx.out.join("README.md")), "Nothing here\n");
}

#[test]
fn test_execute_renames_entries_bottom_up() {
    let fx = fixture();
    let mut config = config(&fx);
    config.rename = true;

    LocalEngine::default()
        .execute(&config, &ProgressHub::new().sink(Phase::Execute))
        .unwrap();

    assert!(fx.out.join("RobberLib/robber_core.rs").is_file());
    assert!(fx.out.join("robber.py").is_file());
    assert!(fx.out.join("logo.png").is_file());
    assert!(!fx.out.join("FuseLib").exists());
    assert!(fx.source.join("FuseLib/fuse_core.rs").is_file());
}

#[test]
fn test_subfolder_naming() {
    let fx = fixture();
    let engine = LocalEngine::default();
    let sink = ProgressHub::new().sink(Phase::Execute);

    let mut config = config(&fx);
    config.create_subfolder = true;
    config.folder_name = Some("copy".into());
    engine.execute(&config, &sink).unwrap();
    assert!(fx.out.join("copy/fuse.py").is_file());

    config.folder_name = Some("   ".into());
    engine.execute(&config, &sink).unwrap();
    assert!(fx.out.join("src/fuse.py").is_file());
}

#[test]
fn test_timestamp_subfolder() {
    let fx = fixture();
    let mut config = config(&fx);
    config.create_subfolder = true;
    config.use_timestamp = true;
    config.folder_name = Some("ignored".into());

    let folder = LocalEngine::default().resolve_destination(&config).unwrap();
    let name = folder.file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(name.len(), 15, "{name}");
    assert_eq!(name.as_bytes()[8], b'_');
    assert!(name.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    assert!(folder.is_dir());
}

#[test]
fn test_execute_progress_spans_zero_to_100() {
    let fx = fixture();
    let hub = ProgressHub::new();
    let mut sub = hub.subscribe(Phase::Execute);
    LocalEngine::default()
        .execute(&config(&fx), &hub.sink(Phase::Execute))
        .unwrap();

    let values = sub.drain();
    assert_eq!(values.first(), Some(&0));
    assert_eq!(values.last(), Some(&100));
}

#[test]
fn test_missing_source_is_reported() {
    let fx = fixture();
    let mut config = config(&fx);
    config.source = fx.source.join("nope");
    let sink = ProgressHub::new().sink(Phase::Diagnose);

    let err = LocalEngine::default().diagnose(&config, &sink).unwrap_err();
    assert!(err.display_message().contains("does not exist"));
}

#[test]
fn test_destination_inside_source_is_rejected() {
    let fx = fixture();
    let mut config = config(&fx);
    config.destination = fx.source.join("FuseLib");

    let err = LocalEngine::default()
        .execute(&config, &ProgressHub::new().sink(Phase::Execute))
        .unwrap_err();
    assert!(err.display_message().contains("inside the source"));
}

#[cfg(unix)]
#[test]
fn test_symbolic_links_are_left_out_of_the_copy() {
    use std::os::unix::fs::symlink;

    let fx = fixture();
    fs::create_dir(fx.source.join("real")).unwrap();
    fs::write(fx.source.join("real/fuse.txt"), "fuse\n").unwrap();
    symlink(fx.source.join("real"), fx.source.join("link")).unwrap();
    symlink(fx.source.join("nowhere"), fx.source.join("dangling")).unwrap();

    let engine = LocalEngine::default();
    let report = engine
        .diagnose(&config(&fx), &ProgressHub::new().sink(Phase::Diagnose))
        .unwrap();
    assert!(find(&report, "dangling").matches.is_empty());

    let summary = engine
        .execute(&config(&fx), &ProgressHub::new().sink(Phase::Execute))
        .unwrap();

    assert_eq!(summary, "3 files modified");
    assert_eq!(read(&fx.out.join("fuse.py")), "import robber\nRobber.run(robber)\n");
    assert_eq!(read(&fx.out.join("real/fuse.txt")), "robber\n");
    assert!(fs::symlink_metadata(fx.out.join("link")).is_err());
    assert!(fs::symlink_metadata(fx.out.join("dangling")).is_err());
    assert_eq!(read(&fx.source.join("real/fuse.txt")), "fuse\n");
}

#[test]
fn test_destination_reaching_the_source_through_dot_dot_is_rejected() {
    let fx = fixture();
    let mut config = config(&fx);
    config.destination = fx.out.join("..").join("src").join("copy");

    let err = LocalEngine::default()
        .execute(&config, &ProgressHub::new().sink(Phase::Execute))
        .unwrap_err();
    assert!(err.display_message().contains("inside the source"));
    assert!(!fx.source.join("copy").exists());
}

#[cfg(unix)]
#[test]
fn test_destination_reaching_the_source_through_a_link_is_rejected() {
    let fx = fixture();
    let alias = fx.out.join("alias");
    std::os::unix::fs::symlink(&fx.source, &alias).unwrap();
    let mut config = config(&fx);
    config.destination = alias.join("nested/copy");

    let err = LocalEngine::default()
        .execute(&config, &ProgressHub::new().sink(Phase::Execute))
        .unwrap_err();
    assert!(err.display_message().contains("inside the source"));
}
