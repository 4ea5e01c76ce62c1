//! Error types for the sync pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the vault (local file store).
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Invalid vault path: {0}")]
    InvalidPath(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during a sync pass or a connectivity check
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Jarvis Bot URL and API key must both be configured")]
    ConfigurationIncomplete,

    #[error("HTTP {status}: {status_text}")]
    Remote { status: u16, status_text: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from Jarvis Bot: {0}")]
    InvalidResponse(String),

    #[error("Invalid Jarvis Bot URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Local write error: {0}")]
    Vault(#[from] VaultError),

    #[error("{probe} probe failed: {reason}")]
    Probe { probe: &'static str, reason: String },
}

impl SyncError {
    /// Build a remote error from a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::Remote {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }
}
