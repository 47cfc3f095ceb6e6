use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One find/replace rule: every occurrence of `old` becomes `new`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WordPair {
    pub old: String,
    pub new: String,
}

impl WordPair {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// True when either side is empty once surrounding whitespace is ignored.
    pub fn is_blank(&self) -> bool {
        self.old.trim().is_empty() || self.new.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseMode {
    Identity,
    Lower,
    Upper,
}

impl CaseMode {
    const ORDER: [CaseMode; 3] = [CaseMode::Identity, CaseMode::Lower, CaseMode::Upper];

    fn apply(self, text: &str) -> String {
        match self {
            CaseMode::Identity => text.to_string(),
            CaseMode::Lower => text.to_lowercase(),
            CaseMode::Upper => text.to_uppercase(),
        }
    }
}

/// Expands each pair into its original, lowercase and uppercase forms.
///
/// Candidates whose `old` side is empty are skipped; a `(old, new)` key is
/// emitted only the first time it is seen, so output order follows input
/// order and then identity, lower, upper.
pub fn expand_variants(pairs: &[WordPair]) -> Vec<WordPair> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut expanded = Vec::with_capacity(pairs.len() * CaseMode::ORDER.len());

    for pair in pairs {
        for mode in CaseMode::ORDER {
            let old = mode.apply(&pair.old);
            let new = mode.apply(&pair.new);
            if old.is_empty() {
                continue;
            }
            if seen.insert((old.clone(), new.clone())) {
                expanded.push(WordPair { old, new });
            }
        }
    }

    expanded
}
