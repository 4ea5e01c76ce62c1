//! Core sync logic.
//!
//! This module contains:
//! - Render: note → filename and Markdown content
//! - Pipeline: one fetch → write → acknowledge pass
//! - Scheduler: the auto-sync timer
//! - Service: settings, pipeline and scheduler under one owner

pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod service;

// Re-export commonly used types
pub use pipeline::{FixedSource, HttpConnector, SourceConnector, SyncPipeline};
pub use render::{format_date, preview_slug, render_content, render_filename, sanitize_for_filename};
pub use scheduler::Scheduler;
pub use service::VoiceSync;
