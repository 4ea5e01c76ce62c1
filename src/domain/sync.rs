//! Sync pass state and results.

use serde::Serialize;

/// What started a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// User asked for a sync (CLI command)
    Manual,

    /// Scheduler tick
    Auto,
}

impl SyncTrigger {
    pub fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::Auto => write!(f, "auto"),
        }
    }
}

/// Phase of the sync pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Validating,
    Fetching,
    EnsuringFolder,
    ProcessingItems,
    Reporting,
    Failed,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Validating => "validating",
            SyncPhase::Fetching => "fetching",
            SyncPhase::EnsuringFolder => "ensuring_folder",
            SyncPhase::ProcessingItems => "processing_items",
            SyncPhase::Reporting => "reporting",
            SyncPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Tally of a completed sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Notes returned by the remote
    pub fetched: usize,

    /// Files created in this pass
    pub written: usize,

    /// Notes whose file already existed locally
    pub already_present: usize,

    /// Notes whose file could not be created
    pub write_failed: usize,

    /// Successful processed-acknowledgments
    pub acknowledged: usize,

    /// Failed processed-acknowledgments
    pub ack_failed: usize,
}

impl SyncReport {
    /// Notes that are now present in the vault
    pub fn synced(&self) -> usize {
        self.written + self.already_present
    }
}

/// How a sync pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// URL or API key missing; nothing was attempted
    NotConfigured,

    /// Another pass was still running
    AlreadyRunning,

    /// The remote had no pending notes
    NothingToSync,

    /// Pass ran to the end (possibly with per-item failures)
    Completed(SyncReport),

    /// Pass aborted on an error
    Failed(String),
}

impl SyncOutcome {
    /// Number of notes synced, zero unless the pass completed
    pub fn synced(&self) -> usize {
        match self {
            SyncOutcome::Completed(report) => report.synced(),
            _ => 0,
        }
    }
}
