/// Per-path results of a cleanup pass
use crate::config::types::PathKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happened to one registered path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Deleted; `kind` is what was there
    Removed { kind: PathKind },
    /// Nothing to delete
    Absent,
    /// Exists but is not something the registry deletes (socket, fifo, device)
    Skipped { kind: PathKind },
    /// Deletion or inspection failed; the message already went to the error stream
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupEntry {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: CleanupOutcome,
}

/// Ordered outcomes of one cleanup pass, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub entries: Vec<CleanupEntry>,
}

impl CleanupReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, path: &Path, outcome: CleanupOutcome) {
        self.entries.push(CleanupEntry {
            path: path.to_path_buf(),
            outcome,
        });
    }

    /// Paths that were deleted by this pass
    pub fn removed(&self) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, CleanupOutcome::Removed { .. }))
            .map(|e| e.path.as_path())
            .collect()
    }

    /// Paths whose deletion failed, with the failure message
    pub fn failures(&self) -> Vec<(&Path, &str)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.outcome {
                CleanupOutcome::Failed { error } => Some((e.path.as_path(), error.as_str())),
                _ => None,
            })
            .collect()
    }

    /// True when no entry failed
    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn outcome_for(&self, path: &Path) -> Option<&CleanupOutcome> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| &e.outcome)
    }
}
