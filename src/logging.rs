use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};

/// Where log records go. The wizard owns the terminal, so it logs to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("robber-rename.log")
}

/// Accepts `off`, `error`, `warn`, `info`, `debug` or `trace`, any case.
pub fn parse_level(text: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(text.trim()).map_err(|_| {
        format!("unknown log level {text:?}, expected off, error, warn, info, debug or trace")
    })
}

pub fn init(level: LevelFilter, target: &LogTarget) -> Result<()> {
    match target {
        LogTarget::Stderr => {
            TermLogger::init(level, config(), TerminalMode::Stderr, ColorChoice::Auto)
                .context("Failed to install terminal logger")?;
        }
        LogTarget::File(path) => {
            let file = create_log_file(path)?;
            WriteLogger::init(level, config(), file).context("Failed to install file logger")?;
        }
    }
    log::debug!("Logging at {level} to {target:?}");
    Ok(())
}

fn config() -> Config {
    ConfigBuilder::new()
        .add_filter_allow_str("robber_rename")
        .build()
}

fn create_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create log file {}", path.display()))
}
