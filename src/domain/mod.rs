//! Domain types for voicesync.
//!
//! - VoiceNote: a transcribed voice message fetched from the Jarvis Bot
//! - Sync: pass triggers, phases and results

pub mod note;
pub mod sync;

// Re-export commonly used types
pub use note::{parse_timestamp, parse_timestamp_in, RawVoiceNote, VoiceNote};
pub use sync::{SyncOutcome, SyncPhase, SyncReport, SyncTrigger};
