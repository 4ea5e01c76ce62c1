//! Application state: settings, pipeline and scheduler in one owner.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::{ConnectionCheck, RemoteClient};
use crate::config::{Settings, SettingsStore};
use crate::domain::{SyncOutcome, SyncTrigger};
use crate::error::SyncError;
use crate::notify::Notifier;
use crate::vault::{FsVault, Vault};

use super::pipeline::{HttpConnector, SourceConnector, SyncPipeline};
use super::scheduler::Scheduler;

/// Owns the settings, the sync pipeline and the auto-sync timer.
///
/// Every settings change goes through [`VoiceSync::save_settings`], which
/// persists the record and restarts the timer. The pipeline is built once,
/// so its in-flight guard covers every pass for the service's lifetime.
pub struct VoiceSync {
    store: SettingsStore,
    settings: Settings,
    vault_override: Option<PathBuf>,
    vault_root: PathBuf,
    vault: Arc<FsVault>,
    pipeline: Arc<SyncPipeline>,
    scheduler: Scheduler,
}

impl VoiceSync {
    /// Load settings and wire up the HTTP-backed pipeline
    pub fn open(
        store: SettingsStore,
        vault_override: Option<PathBuf>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Self::with_connector(store, vault_override, notifier, Arc::new(HttpConnector))
    }

    /// Load settings and wire up a pipeline using `connector`
    pub fn with_connector(
        store: SettingsStore,
        vault_override: Option<PathBuf>,
        notifier: Arc<dyn Notifier>,
        connector: Arc<dyn SourceConnector>,
    ) -> Result<Self> {
        let settings = store.load()?;
        let vault_root = resolve_vault_root(&store, &settings, vault_override.as_deref())?;
        let vault = Arc::new(FsVault::new(&vault_root));
        let pipeline = Arc::new(SyncPipeline::new(
            settings.clone(),
            connector,
            vault.clone(),
            notifier,
        ));

        Ok(Self {
            store,
            settings,
            vault_override,
            vault_root,
            vault,
            pipeline,
            scheduler: Scheduler::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn vault_root(&self) -> &Path {
        &self.vault_root
    }

    pub fn pipeline(&self) -> Arc<SyncPipeline> {
        self.pipeline.clone()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start the auto-sync timer if the settings ask for it
    pub async fn start(&mut self) {
        self.scheduler
            .reconfigure(self.pipeline.clone(), &self.settings)
            .await;
    }

    /// Run a manual sync pass
    pub async fn sync_now(&self) -> SyncOutcome {
        self.pipeline.run(SyncTrigger::Manual).await
    }

    /// Persist new settings and apply them
    pub async fn save_settings(&mut self, settings: Settings) -> Result<()> {
        self.store.save(&settings)?;
        self.apply(settings).await
    }

    /// Re-read the settings file and apply it
    pub async fn reload(&mut self) -> Result<()> {
        let settings = self.store.load()?;
        info!("Reloaded settings from {}", self.store.path().display());
        self.apply(settings).await
    }

    async fn apply(&mut self, settings: Settings) -> Result<()> {
        let vault_root =
            resolve_vault_root(&self.store, &settings, self.vault_override.as_deref())?;

        if vault_root != self.vault_root {
            info!("Vault root changed to {}", vault_root.display());
            self.vault_root = vault_root;
            self.vault = Arc::new(FsVault::new(&self.vault_root));
            self.pipeline.set_vault(self.vault.clone()).await;
        }
        self.pipeline.reconfigure(settings.clone()).await;

        self.settings = settings;
        self.scheduler
            .reconfigure(self.pipeline.clone(), &self.settings)
            .await;
        Ok(())
    }

    /// Folders available as sync destinations, root first (as "")
    pub async fn list_folders(&self) -> Result<Vec<String>> {
        self.vault
            .list_folders()
            .await
            .with_context(|| format!("Failed to list folders in {}", self.vault_root.display()))
    }

    /// Choose the destination folder and save it
    pub async fn select_folder(&mut self, folder: &str) -> Result<()> {
        let mut settings = self.settings.clone();
        settings.set("syncFolder", folder)?;
        self.save_settings(settings).await
    }

    /// Probe the Jarvis Bot with the current settings
    pub async fn test_connection(&self) -> Result<ConnectionCheck, SyncError> {
        if self.settings.jarvis_bot_url.trim().is_empty() {
            return Err(SyncError::ConfigurationIncomplete);
        }
        RemoteClient::from_settings(&self.settings)?
            .test_connectivity()
            .await
    }

    /// Stop the auto-sync timer
    pub async fn shutdown(&mut self) {
        self.scheduler.stop().await;
    }
}

fn resolve_vault_root(
    store: &SettingsStore,
    settings: &Settings,
    vault_override: Option<&Path>,
) -> Result<PathBuf> {
    match vault_override {
        Some(path) => Ok(path.to_path_buf()),
        None => store.vault_root(settings),
    }
}
