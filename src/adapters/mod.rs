//! Adapter interfaces for external systems.
//!
//! The sync pipeline only talks to the Jarvis Bot through
//! [`VoiceNoteSource`], so tests and alternative transports can stand in
//! for the HTTP client.

pub mod remote;

use async_trait::async_trait;

use crate::domain::VoiceNote;
use crate::error::SyncError;

// Re-export the HTTP client
pub use remote::{parse_voice_notes, ConnectionCheck, RemoteClient};

/// Source of pending voice notes
#[async_trait]
pub trait VoiceNoteSource: Send + Sync {
    /// Human-readable source name (for logs)
    fn name(&self) -> &str;

    /// Notes not yet acknowledged, in delivery order
    async fn fetch_pending(&self) -> Result<Vec<VoiceNote>, SyncError>;

    /// Mark a note as processed on the remote side
    async fn acknowledge(&self, id: &str) -> Result<(), SyncError>;
}
