//! Settings CLI commands.
//!
//! - `voicesync config show` - Show resolved settings (API key masked)
//! - `voicesync config set <key> <value>` - Change and save one setting
//! - `voicesync config path` - Print the settings file path

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;

use crate::config::SettingsStore;
use crate::core::VoiceSync;
use crate::notify::ConsoleNotifier;

use super::display_folder;

/// Settings subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings
    Show,

    /// Change one setting
    Set {
        /// Setting key (e.g. jarvisBotUrl, apiKey, syncFolder, autoSync)
        key: String,

        /// New value
        value: String,
    },

    /// Print the settings file path
    Path,
}

/// Execute a config command
pub async fn execute(
    command: ConfigCommands,
    store: SettingsStore,
    vault: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_show(store, vault),
        ConfigCommands::Set { key, value } => execute_set(store, vault, &key, &value).await,
        ConfigCommands::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
    }
}

fn execute_show(store: SettingsStore, vault: Option<PathBuf>) -> Result<()> {
    let exists = store.path().exists();
    let service = VoiceSync::open(store, vault, Arc::new(ConsoleNotifier))?;
    let settings = service.settings();

    println!();
    println!("voicesync Settings");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "Settings file: {}{}",
        service.store().path().display(),
        if exists { "" } else { " (not created yet - using defaults)" }
    );
    println!("Vault root:    {}", service.vault_root().display());
    println!();
    println!("Connection:");
    println!("  jarvisBotUrl:       {}", or_unset(&settings.jarvis_bot_url));
    println!("  apiKey:             {}", settings.masked_api_key());
    println!("  requestTimeoutSecs: {}", settings.request_timeout_secs);
    println!();
    println!("Sync:");
    println!("  syncFolder:         {}", display_folder(&settings.sync_folder));
    println!("  autoSync:           {}", settings.auto_sync);
    println!("  syncInterval:       {} minute(s)", settings.sync_interval);
    println!("  vaultPath:          {}", or_unset(&settings.vault_path));
    println!();
    println!("Formatting:");
    println!("  includeTimestamp:   {}", settings.include_timestamp);
    println!("  dateFormat:         {}", settings.date_format);
    println!();

    if settings.can_sync() {
        println!("✓ Ready to sync");
    } else {
        println!("⚠️  Set jarvisBotUrl and apiKey before syncing");
    }

    Ok(())
}

async fn execute_set(
    store: SettingsStore,
    vault: Option<PathBuf>,
    key: &str,
    value: &str,
) -> Result<()> {
    let mut service = VoiceSync::open(store, vault, Arc::new(ConsoleNotifier))?;

    let mut settings = service.settings().clone();
    settings.set(key, value)?;
    service.save_settings(settings).await?;
    service.shutdown().await;

    let shown = if key == "apiKey" {
        service.settings().masked_api_key()
    } else {
        value.to_string()
    };
    println!("✓ {} = {}", key, shown);
    println!("  Saved to {}", service.store().path().display());

    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
