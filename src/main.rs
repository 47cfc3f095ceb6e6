use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use robber_rename::config::{parse_pair, ConfigPatch, ProcessConfig};
use robber_rename::logging::{self, LogTarget};
use robber_rename::orchestrator::{WizardEvent, WizardOrchestrator};
use robber_rename::progress::Phase;
use robber_rename::tree::{build_tree, render_text};
use robber_rename::word_pair::WordPair;
use robber_rename::{ConfigStore, LocalEngine, ProgressHub};

mod tui;

#[derive(Parser, Debug)]
#[command(name = "robber-rename", version)]
#[command(about = "Copy a folder while replacing words in file contents and names", long_about = None)]
struct Cli {
    /// Folder to read from; never modified
    #[arg(long)]
    source: Option<PathBuf>,

    /// Folder the copy is written under
    #[arg(long = "dest")]
    destination: Option<PathBuf>,

    /// Word pair to replace, may be repeated
    #[arg(long = "pair", value_name = "OLD=NEW", value_parser = parse_pair)]
    pairs: Vec<WordPair>,

    /// Also replace lowercase and uppercase forms of every pair
    #[arg(long)]
    variants: bool,

    /// Rename files and folders as well as rewriting contents
    #[arg(long)]
    rename: bool,

    /// Write straight into the destination folder
    #[arg(long)]
    no_subfolder: bool,

    /// Name of the folder created under the destination
    #[arg(long)]
    folder_name: Option<String>,

    /// Do not name the created folder after the current time
    #[arg(long)]
    no_timestamp: bool,

    /// JSON preset, applied before the flags above
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run without the interactive wizard
    #[arg(long)]
    headless: bool,

    /// Stop after printing the dry run
    #[arg(long, requires = "headless")]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// How many times to re-run a failed execution
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,

    /// Log file; the wizard logs to a temp file by default
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Only flags the user actually gave, so they don't mask the preset.
    fn patch(&self) -> ConfigPatch {
        let mut patch = ConfigPatch::default();
        if let Some(source) = &self.source {
            patch = patch.source(source.clone());
        }
        if let Some(destination) = &self.destination {
            patch = patch.destination(destination.clone());
        }
        if !self.pairs.is_empty() {
            patch = patch.pairs(self.pairs.clone());
        }
        if self.variants {
            patch = patch.variants(true);
        }
        if self.rename {
            patch = patch.rename(true);
        }
        if self.no_subfolder {
            patch = patch.create_subfolder(false);
        }
        if let Some(name) = &self.folder_name {
            patch = patch.folder_name(Some(name.clone()));
        }
        if self.no_timestamp {
            patch = patch.use_timestamp(false);
        }
        patch
    }

    fn log_target(&self) -> LogTarget {
        match (&self.log_file, self.headless) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, true) => LogTarget::Stderr,
            (None, false) => LogTarget::File(logging::default_log_file()),
        }
    }

    fn initial_config(&self) -> Result<ProcessConfig> {
        let preset = match &self.config {
            Some(path) => ConfigPatch::load(path)?,
            None => ConfigPatch::default(),
        };
        let mut config = ProcessConfig::default();
        config.apply(preset.merge(self.patch()));
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level, &cli.log_target())?;

    let store = ConfigStore::new(cli.initial_config()?);
    let orchestrator = WizardOrchestrator::new(Arc::new(LocalEngine::default()), store, ProgressHub::new());

    if cli.headless {
        run_headless(orchestrator, &cli).await
    } else {
        tui::run_tui(orchestrator).await
    }
}

async fn run_headless(mut orchestrator: WizardOrchestrator<LocalEngine>, cli: &Cli) -> Result<()> {
    orchestrator.start_diagnose()?;
    let (entries, matched) = match drive(&mut orchestrator, Phase::Diagnose, "Scanning").await? {
        Some(WizardEvent::DiagnosisCompleted { entries, matched }) => (entries, matched),
        Some(WizardEvent::DiagnosisFailed(message)) => bail!("Dry run failed: {message}"),
        other => bail!("Dry run ended unexpectedly: {other:?}"),
    };

    let report = orchestrator.store().diagnostic().unwrap_or_default();
    print!("{}", render_text(&build_tree(&report)));
    println!("{matched} of {entries} entries contain a match");

    if cli.dry_run {
        return Ok(());
    }
    if !cli.yes && !confirm("Copy and rewrite now?")? {
        println!("Nothing was written.");
        return Ok(());
    }

    orchestrator.advance()?;
    let mut attempts = 0;
    loop {
        match drive(&mut orchestrator, Phase::Execute, "Processing").await? {
            Some(WizardEvent::ExecutionCompleted(summary)) => {
                println!("{summary}");
                return Ok(());
            }
            Some(WizardEvent::ExecutionFailed(message)) if attempts < cli.retries => {
                attempts += 1;
                eprintln!("Run failed: {message}. Retrying ({attempts}/{})", cli.retries);
                orchestrator.retry()?;
            }
            Some(WizardEvent::ExecutionFailed(message)) => bail!("Run failed: {message}"),
            other => bail!("Run ended unexpectedly: {other:?}"),
        }
    }
}

/// Waits for the active phase while a bar follows the store's progress.
async fn drive(
    orchestrator: &mut WizardOrchestrator<LocalEngine>,
    phase: Phase,
    label: &'static str,
) -> Result<Option<WizardEvent>> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg:>12} [{bar:40.cyan/blue}] {pos:>3}%")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );
    bar.set_message(label);

    let mut progress = orchestrator.store().watch_progress(phase);
    let follower = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let value = *progress.borrow_and_update();
                bar.set_position(u64::from(value));
            }
        })
    };

    let event = orchestrator.wait().await;
    follower.abort();
    bar.set_position(u64::from(orchestrator.store().progress(phase)));
    bar.finish();
    Ok(event)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
