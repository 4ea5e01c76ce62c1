//! Command-line interface for voicesync.
//!
//! Provides commands for syncing voice notes, running the auto-sync
//! timer, choosing the destination folder and managing settings.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::SettingsStore;
use crate::core::VoiceSync;
use crate::domain::SyncOutcome;
use crate::notify::ConsoleNotifier;

pub mod config;

/// voicesync - WhatsApp voice notes into your Markdown vault
#[derive(Parser, Debug)]
#[command(name = "voicesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: .voicesync/config.yaml in this or a parent
    /// directory, then ~/.voicesync/config.yaml)
    #[arg(long, global = true, env = "VOICESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vault root directory (overrides the vaultPath setting)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync voice notes now
    Sync,

    /// Run auto-sync until interrupted (requires autoSync)
    Watch {
        /// Run one sync pass before waiting for the first interval
        #[arg(long)]
        now: bool,
    },

    /// List vault folders, or select the sync folder
    Folders {
        /// Folder to use as the sync destination ("" or "/" for the vault root)
        #[arg(long)]
        select: Option<String>,
    },

    /// Check that the Jarvis Bot is reachable and accepts the API key
    TestConnection,

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let store = SettingsStore::discover(self.config)?;

        match self.command {
            Commands::Sync => sync_now(store, self.vault).await,
            Commands::Watch { now } => watch(store, self.vault, now).await,
            Commands::Folders { select } => folders(store, self.vault, select).await,
            Commands::TestConnection => test_connection(store, self.vault).await,
            Commands::Config { command } => config::execute(command, store, self.vault).await,
        }
    }
}

fn open(store: SettingsStore, vault: Option<PathBuf>) -> Result<VoiceSync> {
    VoiceSync::open(store, vault, Arc::new(ConsoleNotifier))
}

/// Run one manual sync pass
async fn sync_now(store: SettingsStore, vault: Option<PathBuf>) -> Result<()> {
    let service = open(store, vault)?;

    match service.sync_now().await {
        SyncOutcome::Completed(report) => {
            if report.write_failed > 0 {
                eprintln!("  {} note(s) could not be written", report.write_failed);
            }
            if report.ack_failed > 0 {
                eprintln!(
                    "  {} note(s) could not be marked as processed and will be offered again",
                    report.ack_failed
                );
            }
            Ok(())
        }
        SyncOutcome::Failed(_) => std::process::exit(1),
        _ => Ok(()),
    }
}

/// Run the auto-sync timer until Ctrl+C
async fn watch(store: SettingsStore, vault: Option<PathBuf>, now: bool) -> Result<()> {
    let mut service = open(store, vault)?;

    if !service.settings().auto_sync {
        anyhow::bail!(
            "Auto-sync is disabled. Enable it with: voicesync config set autoSync true"
        );
    }

    println!("👁️  Auto-sync every {} minute(s)", service.settings().sync_interval);
    println!("    Vault:  {}", service.vault_root().display());
    println!("    Folder: {}", display_folder(&service.settings().sync_folder));
    println!("    Press Ctrl+C to stop");
    println!();

    if now {
        service.sync_now().await;
    }

    service.start().await;

    let mut reload = ReloadSignal::new()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("🛑 Stopping auto-sync...");
                break;
            }
            _ = reload.recv() => {
                match service.reload().await {
                    Ok(()) if service.scheduler().is_running() => {
                        println!("🔄 Settings reloaded");
                    }
                    Ok(()) => {
                        println!("🔄 Settings reloaded; auto-sync is now disabled");
                        break;
                    }
                    Err(e) => tracing::error!("Failed to reload settings: {:#}", e),
                }
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

/// List folders or select the destination
async fn folders(store: SettingsStore, vault: Option<PathBuf>, select: Option<String>) -> Result<()> {
    let mut service = open(store, vault)?;

    if let Some(folder) = select {
        service.select_folder(&folder).await?;
        println!(
            "✓ Sync folder set to {}",
            display_folder(&service.settings().sync_folder)
        );
        return Ok(());
    }

    let folders = service.list_folders().await?;
    let current = service.settings().sync_folder.clone();

    println!("Folders in {}:", service.vault_root().display());
    for folder in &folders {
        let marker = if *folder == current { "*" } else { " " };
        println!("  {} {}", marker, display_folder(folder));
    }

    if !current.is_empty() && !folders.contains(&current) {
        println!();
        println!(
            "Sync folder {} does not exist yet; it will be created on the next sync",
            display_folder(&current)
        );
    }

    Ok(())
}

/// Probe the Jarvis Bot
async fn test_connection(store: SettingsStore, vault: Option<PathBuf>) -> Result<()> {
    let service = open(store, vault)?;
    let settings = service.settings();

    println!("Testing {}", settings.jarvis_bot_url);
    if settings.api_key.trim().is_empty() {
        println!("⚠️  No API key configured; the /health probe will likely be rejected");
    }

    let check = service
        .test_connection()
        .await
        .context("Connection test failed")?;

    println!("✓ /test-connection: HTTP {}", check.test_connection);
    println!("✓ /health:          HTTP {}", check.health);
    println!();
    println!("✅ Connection OK");

    Ok(())
}

/// Folder name for display ("/" for the vault root)
pub(crate) fn display_folder(folder: &str) -> &str {
    if folder.is_empty() {
        "/"
    } else {
        folder
    }
}

/// SIGHUP on Unix; never fires elsewhere
#[cfg(unix)]
struct ReloadSignal(tokio::signal::unix::Signal);

#[cfg(unix)]
impl ReloadSignal {
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        let hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
        Ok(Self(hangup))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
struct ReloadSignal;

#[cfg(not(unix))]
impl ReloadSignal {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await
    }
}
