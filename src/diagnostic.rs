use serde::{Deserialize, Serialize};

/// One term found during a dry run.
///
/// `count` is `None` for a directory-name match and `Some(n)` for the number
/// of occurrences inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl MatchInfo {
    pub fn in_name(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            count: None,
        }
    }

    pub fn in_content(term: impl Into<String>, count: usize) -> Self {
        Self {
            term: term.into(),
            count: Some(count),
        }
    }

    /// Short label such as `Fuse` or `Fuse x3`.
    pub fn label(&self) -> String {
        match self.count {
            Some(count) => format!("{} x{}", self.term, count),
            None => self.term.clone(),
        }
    }
}

/// A scanned path relative to the source folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub path: String,
    pub is_dir: bool,
    #[serde(default)]
    pub matches: Vec<MatchInfo>,
}

impl DiagnosticEntry {
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Paths of the entries that matched at least one term, in report order.
pub fn matched_paths(entries: &[DiagnosticEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.has_matches())
        .map(|entry| entry.path.clone())
        .collect()
}
