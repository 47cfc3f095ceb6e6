use std::path::PathBuf;

use thiserror::Error;

use crate::orchestrator::WizardState;

/// Shown when an engine failure carries no usable text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Local check failures that block advancing past the settings step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Source folder is required")]
    MissingSource,

    #[error("Destination folder is required")]
    MissingDestination,

    #[error("At least one Old/New pair is required")]
    NoPairs,

    #[error("Pair {} has an empty Old or New value", .index + 1)]
    BlankPair { index: usize },
}

/// Failure reported by the scanning/rewriting engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Message(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine failed with a payload that is not text.
    #[error("{UNKNOWN_ERROR}")]
    Opaque,
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Text suitable for showing to the user; never empty.
    pub fn display_message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            text
        }
    }

    /// Converts a panic payload caught around an engine call.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        if let Some(text) = payload.downcast_ref::<&str>() {
            EngineError::Message((*text).to_string())
        } else if let Some(text) = payload.downcast_ref::<String>() {
            EngineError::Message(text.clone())
        } else {
            EngineError::Opaque
        }
    }
}

impl From<String> for EngineError {
    fn from(message: String) -> Self {
        EngineError::Message(message)
    }
}

impl From<&str> for EngineError {
    fn from(message: &str) -> Self {
        EngineError::Message(message.to_string())
    }
}

/// Folder picker failure. Cancelling the picker is not an error.
#[derive(Error, Debug)]
#[error("Unable to open folder {}: {source}", .path.display())]
pub struct DialogError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Error, Debug)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        state: WizardState,
        action: &'static str,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}
