//! voicesync - WhatsApp voice notes into a Markdown vault
//!
//! Pulls transcribed voice notes from a Jarvis Bot, writes each one as a
//! Markdown file in a vault folder and marks it as processed upstream.
//!
//! # Architecture
//!
//! A sync pass is a short pipeline:
//! - Fetch pending notes from the remote source
//! - Ensure the destination folder exists
//! - Write one file per note unless it is already there
//! - Acknowledge every note whose file exists afterwards
//!
//! # Modules
//!
//! - `adapters`: Remote note sources (Jarvis Bot HTTP API)
//! - `core`: Sync pipeline, rendering, auto-sync scheduler, service
//! - `domain`: Voice notes and sync outcomes
//! - `vault`: Folder and file access under the vault root
//! - `config`: Settings file discovery, loading and saving
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! voicesync config set jarvisBotUrl https://jarvis.example.com
//! voicesync config set apiKey sk-...
//! voicesync sync
//! voicesync watch --now
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod notify;
pub mod vault;

pub use adapters::{RemoteClient, VoiceNoteSource};
pub use config::{Settings, SettingsStore};
pub use core::{Scheduler, SyncPipeline, VoiceSync};
pub use domain::{SyncOutcome, SyncPhase, SyncReport, SyncTrigger, VoiceNote};
pub use error::{SyncError, VaultError};
pub use notify::{ConsoleNotifier, MemoryNotifier, Notifier};
pub use vault::{FsVault, Vault};
