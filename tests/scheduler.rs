//! Auto-sync Scheduler Tests
//!
//! Run on a paused tokio clock so minute-long intervals elapse instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use voicesync::config::{Settings, SettingsStore};
use voicesync::core::{FixedSource, Scheduler, SyncPipeline, VoiceSync};
use voicesync::domain::VoiceNote;
use voicesync::error::SyncError;
use voicesync::notify::MemoryNotifier;
use voicesync::vault::FsVault;
use voicesync::VoiceNoteSource;

/// Source that never has anything pending and counts fetches
#[derive(Default)]
struct CountingSource {
    fetches: AtomicUsize,
}

impl CountingSource {
    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceNoteSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    async fn fetch_pending(&self) -> Result<Vec<VoiceNote>, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn acknowledge(&self, _id: &str) -> Result<(), SyncError> {
        Ok(())
    }
}

fn auto_settings(interval: u32) -> Settings {
    Settings {
        jarvis_bot_url: "https://jarvis.example.com".to_string(),
        api_key: "secret".to_string(),
        auto_sync: true,
        sync_interval: interval,
        ..Default::default()
    }
}

fn pipeline(source: Arc<CountingSource>, vault: &TempDir) -> Arc<SyncPipeline> {
    Arc::new(SyncPipeline::new(
        auto_settings(1),
        Arc::new(FixedSource::new(source)),
        Arc::new(FsVault::new(vault.path())),
        Arc::new(MemoryNotifier::new()),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_first_pass_waits_one_period() {
    let vault = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::default());
    let mut scheduler = Scheduler::new();

    scheduler.start(pipeline(source.clone(), &vault), Duration::from_secs(60));
    assert!(scheduler.is_running());
    assert_eq!(scheduler.period(), Some(Duration::from_secs(60)));

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(source.fetches(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.fetches(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.fetches(), 2);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_prevents_future_passes() {
    let vault = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::default());
    let mut scheduler = Scheduler::new();

    scheduler.start(pipeline(source.clone(), &vault), Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(source.fetches(), 1);

    scheduler.stop().await;
    assert!(!scheduler.is_running());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconfigure_replaces_timer() {
    let vault = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::default());
    let pipeline = pipeline(source.clone(), &vault);
    let mut scheduler = Scheduler::new();

    scheduler.reconfigure(pipeline.clone(), &auto_settings(5)).await;
    assert_eq!(scheduler.period(), Some(Duration::from_secs(300)));

    // Only one timer after repeated reconfiguration
    scheduler.reconfigure(pipeline.clone(), &auto_settings(2)).await;
    assert_eq!(scheduler.period(), Some(Duration::from_secs(120)));

    tokio::time::sleep(Duration::from_secs(121)).await;
    assert_eq!(source.fetches(), 1);

    let disabled = Settings {
        auto_sync: false,
        ..auto_settings(2)
    };
    scheduler.reconfigure(pipeline, &disabled).await;
    assert!(!scheduler.is_running());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_noop_when_running() {
    let vault = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::default());
    let pipeline = pipeline(source.clone(), &vault);
    let mut scheduler = Scheduler::new();

    scheduler.start(pipeline.clone(), Duration::from_secs(60));
    scheduler.start(pipeline, Duration::from_secs(10));
    assert_eq!(scheduler.period(), Some(Duration::from_secs(60)));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(source.fetches(), 1);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_saving_settings_restarts_auto_sync() {
    let dir = TempDir::new().unwrap();
    let store = SettingsStore::new(dir.path().join("config.yaml"));
    let source = Arc::new(CountingSource::default());

    let mut service = VoiceSync::with_connector(
        store.clone(),
        Some(dir.path().to_path_buf()),
        Arc::new(MemoryNotifier::new()),
        Arc::new(FixedSource::new(source.clone())),
    )
    .unwrap();

    service.start().await;
    assert!(!service.scheduler().is_running());

    service.save_settings(auto_settings(1)).await.unwrap();
    assert!(service.scheduler().is_running());
    assert_eq!(store.load().unwrap(), auto_settings(1));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(source.fetches(), 1);

    let mut settings = service.settings().clone();
    settings.set("autoSync", "false").unwrap();
    service.save_settings(settings).await.unwrap();
    assert!(!service.scheduler().is_running());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.fetches(), 1);

    service.shutdown().await;
}
