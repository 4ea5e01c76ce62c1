//! Auto-sync timer.
//!
//! A single repeating timer that triggers a pipeline pass every period. Each
//! pass runs as its own task, so stopping the timer never cancels a pass that
//! is already in flight; it only prevents future ones.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::domain::SyncTrigger;

use super::pipeline::SyncPipeline;

/// Handle to a running timer
struct TimerHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
    period: Duration,
}

/// Owns the optional auto-sync timer
#[derive(Default)]
pub struct Scheduler {
    timer: Option<TimerHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the timer is running
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Period of the running timer
    pub fn period(&self) -> Option<Duration> {
        self.timer.as_ref().map(|t| t.period)
    }

    /// Start the timer; the first pass fires one full period from now.
    ///
    /// Does nothing if the timer is already running.
    pub fn start(&mut self, pipeline: Arc<SyncPipeline>, period: Duration) {
        if self.timer.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_timer(pipeline, period, stop_rx));

        info!("Auto-sync every {} minute(s)", period.as_secs() / 60);
        self.timer = Some(TimerHandle {
            stop_tx,
            task,
            period,
        });
    }

    /// Stop the timer, waiting for the timer task (not any pass) to end
    pub async fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.stop_tx.send(());
            if let Err(e) = timer.task.await {
                warn!("Auto-sync timer ended abnormally: {}", e);
            }
            info!("Auto-sync stopped");
        }
    }

    /// Apply new settings: stop any running timer, then start a fresh one
    /// iff auto-sync is enabled.
    pub async fn reconfigure(&mut self, pipeline: Arc<SyncPipeline>, settings: &Settings) {
        self.stop().await;
        if settings.auto_sync {
            self.start(pipeline, settings.sync_period());
        }
    }
}

async fn run_timer(pipeline: Arc<SyncPipeline>, period: Duration, mut stop_rx: oneshot::Receiver<()>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                debug!("Auto-sync tick");
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    pipeline.run(SyncTrigger::Auto).await;
                });
            }
        }
    }
}
