//! The sync pipeline.
//!
//! One pass: validate settings → fetch pending notes → ensure the destination
//! folder → for each note, write the file if absent and acknowledge it.
//!
//! Notes whose file already exists are counted as synced and acknowledged
//! again. Notes whose file could not be written are never acknowledged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{RemoteClient, VoiceNoteSource};
use crate::config::Settings;
use crate::domain::{SyncOutcome, SyncPhase, SyncReport, SyncTrigger, VoiceNote};
use crate::error::{SyncError, VaultError};
use crate::notify::Notifier;
use crate::vault::{ensure_folder, join_path, Vault};

use super::render::{render_content, render_filename};

pub const NOTICE_NOT_CONFIGURED: &str = "Please configure Jarvis Bot URL and API key in settings";
pub const NOTICE_SYNCING: &str = "Syncing voice notes...";
pub const NOTICE_NOTHING_TO_SYNC: &str = "No new voice notes to sync";
pub const NOTICE_FAILED: &str = "Error syncing voice notes. Check logs for details.";
pub const NOTICE_ALREADY_RUNNING: &str = "A sync is already in progress";

/// Notice for a completed pass
pub fn synced_notice(count: usize) -> String {
    format!("Synced {} voice note(s)", count)
}

/// Builds the note source for a pass from the current settings
pub trait SourceConnector: Send + Sync {
    fn connect(&self, settings: &Settings) -> Result<Arc<dyn VoiceNoteSource>, SyncError>;
}

/// Connects to the Jarvis Bot over HTTP
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl SourceConnector for HttpConnector {
    fn connect(&self, settings: &Settings) -> Result<Arc<dyn VoiceNoteSource>, SyncError> {
        Ok(Arc::new(RemoteClient::from_settings(settings)?))
    }
}

/// Always hands out the same source, whatever the settings say
pub struct FixedSource(Arc<dyn VoiceNoteSource>);

impl FixedSource {
    pub fn new(source: Arc<dyn VoiceNoteSource>) -> Self {
        Self(source)
    }
}

impl SourceConnector for FixedSource {
    fn connect(&self, _settings: &Settings) -> Result<Arc<dyn VoiceNoteSource>, SyncError> {
        Ok(self.0.clone())
    }
}

/// Sync pipeline with an in-flight guard.
///
/// Only one pass runs at a time; a trigger that arrives while a pass is in
/// flight returns [`SyncOutcome::AlreadyRunning`] without doing any I/O.
/// Settings and the vault can be swapped between passes, so one pipeline
/// (and one guard) lives as long as its owner.
pub struct SyncPipeline {
    settings: RwLock<Settings>,
    connector: Arc<dyn SourceConnector>,
    vault: RwLock<Arc<dyn Vault>>,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<()>,
    running: AtomicBool,
    phase: watch::Sender<SyncPhase>,
}

/// Clears the running flag when a pass ends or is dropped
struct RunningFlag<'a>(&'a AtomicBool);

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncPipeline {
    /// Create a pipeline
    pub fn new(
        settings: Settings,
        connector: Arc<dyn SourceConnector>,
        vault: Arc<dyn Vault>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            settings: RwLock::new(settings),
            connector,
            vault: RwLock::new(vault),
            notifier,
            in_flight: Mutex::new(()),
            running: AtomicBool::new(false),
            phase,
        }
    }

    /// Replace the settings used by future passes
    pub async fn reconfigure(&self, settings: Settings) {
        *self.settings.write().await = settings;
    }

    /// Write future passes into `vault`; a pass in flight keeps its vault
    pub async fn set_vault(&self, vault: Arc<dyn Vault>) {
        *self.vault.write().await = vault;
    }

    /// Snapshot of the current settings
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Current phase
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Whether a pass is running right now
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }

    /// Run one sync pass.
    ///
    /// Never returns an error: failures are logged, surfaced to the user on
    /// manual triggers, and reported as [`SyncOutcome::Failed`].
    #[instrument(skip_all, fields(trigger = %trigger))]
    pub async fn run(&self, trigger: SyncTrigger) -> SyncOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Sync already in progress, skipping");
            if trigger.is_manual() {
                self.notifier.notify(NOTICE_ALREADY_RUNNING);
            }
            return SyncOutcome::AlreadyRunning;
        };
        self.running.store(true, Ordering::Release);
        let _running = RunningFlag(&self.running);

        let settings = self.settings().await;
        let vault = self.vault.read().await.clone();

        self.set_phase(SyncPhase::Validating);
        if !settings.can_sync() {
            if trigger.is_manual() {
                self.notifier.notify(NOTICE_NOT_CONFIGURED);
            } else {
                debug!("Jarvis Bot URL or API key not configured, skipping auto-sync");
            }
            self.set_phase(SyncPhase::Idle);
            return SyncOutcome::NotConfigured;
        }

        if trigger.is_manual() {
            self.notifier.notify(NOTICE_SYNCING);
        }

        let outcome = match self.sync_pass(&settings, vault.as_ref()).await {
            Ok(None) => {
                info!("No voice notes returned");
                if trigger.is_manual() {
                    self.notifier.notify(NOTICE_NOTHING_TO_SYNC);
                }
                SyncOutcome::NothingToSync
            }
            Ok(Some(report)) => {
                self.set_phase(SyncPhase::Reporting);
                info!(
                    fetched = report.fetched,
                    written = report.written,
                    already_present = report.already_present,
                    write_failed = report.write_failed,
                    ack_failed = report.ack_failed,
                    "Sync pass complete"
                );
                let synced = report.synced();
                if trigger.is_manual() || synced > 0 {
                    self.notifier.notify(&synced_notice(synced));
                }
                SyncOutcome::Completed(report)
            }
            Err(e) => {
                self.set_phase(SyncPhase::Failed);
                error!("Error syncing voice notes: {}", e);
                if trigger.is_manual() {
                    self.notifier.notify(NOTICE_FAILED);
                }
                SyncOutcome::Failed(e.to_string())
            }
        };

        self.set_phase(SyncPhase::Idle);
        outcome
    }

    /// Fetch and process; `None` when the remote had nothing pending
    async fn sync_pass(
        &self,
        settings: &Settings,
        vault: &dyn Vault,
    ) -> Result<Option<SyncReport>, SyncError> {
        self.set_phase(SyncPhase::Fetching);
        let source = self.connector.connect(settings)?;
        let notes = source.fetch_pending().await?;
        info!("Fetched {} voice note(s) from {}", notes.len(), source.name());

        if notes.is_empty() {
            return Ok(None);
        }

        self.set_phase(SyncPhase::EnsuringFolder);
        ensure_folder(vault, &settings.sync_folder).await?;

        self.set_phase(SyncPhase::ProcessingItems);
        let mut report = SyncReport {
            fetched: notes.len(),
            ..Default::default()
        };

        for note in &notes {
            process_note(note, settings, vault, source.as_ref(), &mut report).await;
        }

        Ok(Some(report))
    }
}

/// Write one note (if absent) and acknowledge it
async fn process_note(
    note: &VoiceNote,
    settings: &Settings,
    vault: &dyn Vault,
    source: &dyn VoiceNoteSource,
    report: &mut SyncReport,
) {
    let file_name = render_filename(note, &settings.date_format, &Local);
    let path = join_path(&settings.sync_folder, &file_name);
    debug!(note = %note.id, %path, "Processing voice note");

    match vault.file_exists(&path).await {
        Ok(true) => {
            debug!("Voice note already exists: {}", path);
            report.already_present += 1;
        }
        Ok(false) => {
            let content = render_content(
                note,
                settings.include_timestamp,
                &settings.date_format,
                &Local,
            );
            match vault.create_file(&path, &content).await {
                Ok(()) => {
                    info!("Created {}", path);
                    report.written += 1;
                }
                Err(VaultError::AlreadyExists(_)) => {
                    debug!("Voice note appeared while writing: {}", path);
                    report.already_present += 1;
                }
                Err(e) => {
                    warn!("Failed to save voice note {}: {}", note.id, e);
                    report.write_failed += 1;
                    return;
                }
            }
        }
        Err(e) => {
            warn!("Failed to check {}: {}", path, e);
            report.write_failed += 1;
            return;
        }
    }

    match source.acknowledge(&note.id).await {
        Ok(()) => {
            debug!("Marked as processed: {}", note.id);
            report.acknowledged += 1;
        }
        Err(e) => {
            warn!("Failed to mark note {} as processed: {}", note.id, e);
            report.ack_failed += 1;
        }
    }
}
